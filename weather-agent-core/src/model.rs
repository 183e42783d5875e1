use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Timezone Open-Meteo assumes when none is given.
pub const DEFAULT_TIMEZONE: &str = "GMT";

/// Value Swagger-style clients send for an untouched `models` list.
pub const MODELS_PLACEHOLDER: &str = "string";

/// Error returned when a wire name does not match any known variant or parameter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}', expected one of: {}", .expected.join(", "))]
pub struct UnknownName {
    pub kind: &'static str,
    pub value: String,
    pub expected: Vec<&'static str>,
}

/// Declares a unit/format enum whose variants travel as lowercase strings.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $wire:literal),+ $(,)?
        }
        default = $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownName;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_lowercase().as_str() {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(UnknownName {
                        kind: $kind,
                        value: value.to_string(),
                        expected: vec![$($wire),+],
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// Temperature unit for all returned temperature values.
    TemperatureUnit ("temperature unit") {
        Celsius => "celsius",
        Fahrenheit => "fahrenheit",
    }
    default = Celsius
}

wire_enum! {
    /// Wind speed unit.
    WindSpeedUnit ("wind speed unit") {
        Kmh => "kmh",
        Ms => "ms",
        Mph => "mph",
        Kn => "kn",
    }
    default = Kmh
}

wire_enum! {
    /// Precipitation amount unit.
    PrecipitationUnit ("precipitation unit") {
        Mm => "mm",
        Inch => "inch",
    }
    default = Mm
}

wire_enum! {
    /// Encoding of returned timestamps.
    TimeFormat ("time format") {
        Iso8601 => "iso8601",
        Unixtime => "unixtime",
    }
    default = Iso8601
}

wire_enum! {
    /// Grid-cell selection preference.
    CellSelection ("cell selection") {
        Land => "land",
        Sea => "sea",
        Nearest => "nearest",
    }
    default = Land
}

/// Declares the current-weather vocabulary once and derives the three
/// records keyed by it: the request flags, the returned values and their units.
macro_rules! weather_parameters {
    ($( $(#[doc = $doc:literal])+ $name:ident ),+ $(,)?) => {
        /// Available current weather parameters for the Open-Meteo API.
        /// Every flag defaults to `false` (not requested).
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
        #[serde(default)]
        pub struct WeatherParameterSet {
            $(
                $(#[doc = $doc])+
                pub $name: bool,
            )+
        }

        impl WeatherParameterSet {
            /// Every parameter name, in declaration order.
            pub const NAMES: &'static [&'static str] = &[$(stringify!($name)),+];

            fn flags(&self) -> Vec<(&'static str, bool)> {
                vec![$((stringify!($name), self.$name)),+]
            }

            fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
                match name {
                    $(stringify!($name) => Some(&mut self.$name),)+
                    _ => None,
                }
            }
        }

        /// Current conditions returned by Open-Meteo. Only requested parameters are present.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct CurrentConditions {
            pub time: ObservationTime,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub interval: Option<i64>,
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $name: Option<f64>,
            )+
        }

        impl CurrentConditions {
            /// Value of the named parameter, if it was returned.
            pub fn value(&self, name: &str) -> Option<f64> {
                match name {
                    $(stringify!($name) => self.$name,)+
                    _ => None,
                }
            }

            /// Returned values as `(name, value)` pairs in declaration order.
            pub fn values(&self) -> Vec<(&'static str, f64)> {
                let mut out = Vec::new();
                $(
                    if let Some(value) = self.$name {
                        out.push((stringify!($name), value));
                    }
                )+
                out
            }
        }

        /// Units for the values in [`CurrentConditions`].
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct CurrentUnits {
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub time: Option<String>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub interval: Option<String>,
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $name: Option<String>,
            )+
        }

        impl CurrentUnits {
            pub fn unit(&self, name: &str) -> Option<&str> {
                match name {
                    $(stringify!($name) => self.$name.as_deref(),)+
                    _ => None,
                }
            }
        }
    };
}

weather_parameters! {
    /// Air temperature at 2 meters above ground
    temperature_2m,
    /// Relative humidity at 2 meters above ground
    relative_humidity_2m,
    /// Dew point temperature at 2 meters above ground
    dew_point_2m,
    /// Apparent temperature is the perceived feels-like temperature combining wind chill factor, relative humidity and solar radiation
    apparent_temperature,
    /// Atmospheric air pressure reduced to mean sea level (msl)
    pressure_msl,
    /// Atmospheric air pressure at surface. Surface pressure gets lower with increasing elevation
    surface_pressure,
    /// Total cloud cover as an area fraction
    cloud_cover,
    /// Low level clouds and fog up to 3 km altitude
    cloud_cover_low,
    /// Mid level clouds from 3 to 8 km altitude
    cloud_cover_mid,
    /// High level clouds from 8 km altitude
    cloud_cover_high,
    /// Wind speed at 10 meters above ground. Wind speed on 10 meters is the standard level
    wind_speed_10m,
    /// Wind speed at 80 meters above ground
    wind_speed_80m,
    /// Wind speed at 120 meters above ground
    wind_speed_120m,
    /// Wind speed at 180 meters above ground
    wind_speed_180m,
    /// Wind direction at 10 meters above ground
    wind_direction_10m,
    /// Wind direction at 80 meters above ground
    wind_direction_80m,
    /// Wind direction at 120 meters above ground
    wind_direction_120m,
    /// Wind direction at 180 meters above ground
    wind_direction_180m,
    /// Gusts at 10 meters above ground as a maximum of the preceding hour
    wind_gusts_10m,
    /// Shortwave solar radiation as average of the preceding hour. This is equal to the total global horizontal irradiation
    shortwave_radiation,
    /// Direct solar radiation as average of the preceding hour on the horizontal plane
    direct_radiation,
    /// Direct solar radiation as average of the preceding hour on the normal plane (perpendicular to the sun)
    direct_normal_irradiance,
    /// Diffuse solar radiation as average of the preceding hour
    diffuse_radiation,
    /// Total radiation received on a tilted pane as average of the preceding hour
    global_tilted_irradiance,
    /// Vapour Pressure Deficit (VPD) in kilopascal (kPa). For high VPD (>1.6), water transpiration of plants increases. For low VPD (<0.4), transpiration decreases
    vapour_pressure_deficit,
    /// Convective available potential energy
    cape,
    /// Evapotranspiration from land surface and plants that weather models assume for this location. Available soil water is considered
    evapotranspiration,
    /// ET0 reference evapotranspiration of a well watered grass field. Based on FAO-56 Penman-Monteith equations
    et0_fao_evapotranspiration,
    /// Total precipitation (rain, showers, snow) sum of the preceding hour
    precipitation,
    /// Snowfall amount of the preceding hour in centimeters. For the water equivalent in millimeter, divide by 7
    snowfall,
    /// Probability of precipitation with more than 0.1 mm of the preceding hour
    precipitation_probability,
    /// Rain from large scale weather systems of the preceding hour in millimeter
    rain,
    /// Showers from convective precipitation in millimeters from the preceding hour
    showers,
    /// Weather condition as a numeric code. Follow WMO weather interpretation codes
    weather_code,
    /// Snow depth on the ground
    snow_depth,
    /// Altitude above sea level of the 0°C level
    freezing_level_height,
    /// Viewing distance in meters. Influenced by low clouds, humidity and aerosols
    visibility,
    /// Temperature in the soil at 0 cm depth. 0 cm is the surface temperature on land or water surface temperature on water
    soil_temperature_0cm,
    /// Temperature in the soil at 6 cm depth
    soil_temperature_6cm,
    /// Temperature in the soil at 18 cm depth
    soil_temperature_18cm,
    /// Temperature in the soil at 54 cm depth
    soil_temperature_54cm,
    /// Average soil water content as volumetric mixing ratio at 0-1 cm depth
    soil_moisture_0_to_1cm,
    /// Average soil water content as volumetric mixing ratio at 1-3 cm depth
    soil_moisture_1_to_3cm,
    /// Average soil water content as volumetric mixing ratio at 3-9 cm depth
    soil_moisture_3_to_9cm,
    /// Average soil water content as volumetric mixing ratio at 9-27 cm depth
    soil_moisture_9_to_27cm,
    /// Average soil water content as volumetric mixing ratio at 27-81 cm depth
    soil_moisture_27_to_81cm,
    /// 1 if the current time step has daylight, 0 at night
    is_day,
}

impl WeatherParameterSet {
    /// Build a set with the given parameters switched on.
    pub fn from_names<I, S>(names: I) -> Result<Self, UnknownName>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            match set.flag_mut(name) {
                Some(flag) => *flag = true,
                None => {
                    return Err(UnknownName {
                        kind: "weather parameter",
                        value: name.to_string(),
                        expected: Self::NAMES.to_vec(),
                    });
                }
            }
        }
        Ok(set)
    }

    /// Names of the selected parameters, in declaration order.
    pub fn selected(&self) -> Vec<&'static str> {
        self.flags()
            .into_iter()
            .filter_map(|(name, on)| on.then_some(name))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected().is_empty()
    }
}

/// Request model for current weather data from Open-Meteo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeatherRequest {
    /// Geographical WGS84 coordinate of the location (latitude).
    pub latitude: f64,
    /// Geographical WGS84 coordinate of the location (longitude).
    pub longitude: f64,
    /// The elevation used for statistical downscaling. Per default, a 90 meter digital elevation model is used. You can manually set the elevation to correctly match mountain peaks.
    #[serde(default)]
    pub elevation: Option<f64>,
    /// A list of weather variables to get current conditions.
    #[serde(default)]
    pub current: Option<WeatherParameterSet>,
    /// If fahrenheit is set, all temperature values are converted to Fahrenheit.
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
    /// Wind speed units: kmh (default), ms, mph and kn
    #[serde(default)]
    pub wind_speed_unit: WindSpeedUnit,
    /// Precipitation amount units: mm (default) or inch
    #[serde(default)]
    pub precipitation_unit: PrecipitationUnit,
    /// If format unixtime is selected, all time values are returned in UNIX epoch time in seconds. All timestamps are in GMT+0.
    #[serde(default)]
    pub timeformat: TimeFormat,
    /// If timezone is set, all timestamps are returned as local-time. Any time zone name from the time zone database is supported. If auto is set as a time zone, the coordinates will be automatically resolved to the local time zone.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Manually select one or more weather models. Per default, the best suitable weather models will be combined.
    #[serde(default)]
    pub models: Option<Vec<String>>,
    /// Set a preference how grid-cells are selected. The default land finds a suitable grid-cell on land with similar elevation to the requested coordinates. sea prefers grid-cells on sea. nearest selects the nearest possible grid-cell.
    #[serde(default)]
    pub cell_selection: CellSelection,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl WeatherRequest {
    /// A request for the given coordinates with every other field at its default.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            current: None,
            temperature_unit: TemperatureUnit::default(),
            wind_speed_unit: WindSpeedUnit::default(),
            precipitation_unit: PrecipitationUnit::default(),
            timeformat: TimeFormat::default(),
            timezone: default_timezone(),
            models: None,
            cell_selection: CellSelection::default(),
        }
    }

    pub fn with_current(mut self, current: WeatherParameterSet) -> Self {
        self.current = Some(current);
        self
    }
}

/// Observation timestamp as Open-Meteo sends it, depending on [`TimeFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationTime {
    Unix(i64),
    Iso8601(String),
}

impl ObservationTime {
    /// Resolve to a zoned timestamp using the response's UTC offset.
    pub fn to_datetime(&self, utc_offset_seconds: i32) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(utc_offset_seconds)?;

        match self {
            ObservationTime::Unix(ts) => {
                DateTime::from_timestamp(*ts, 0).map(|dt| dt.with_timezone(&offset))
            }
            ObservationTime::Iso8601(raw) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                    return Some(dt.with_timezone(&offset));
                }
                // Open-Meteo sends local time without seconds or zone, e.g. "2024-01-01T12:00".
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
                    .ok()
                    .and_then(|naive| naive.and_local_timezone(offset).single())
            }
        }
    }
}

/// Current weather response from Open-Meteo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub generationtime_ms: f64,
    pub utc_offset_seconds: i32,
    pub timezone: String,
    pub timezone_abbreviation: String,
    pub elevation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_units: Option<CurrentUnits>,
}

impl WeatherResponse {
    pub fn observed_at(&self) -> Option<DateTime<FixedOffset>> {
        self.current
            .as_ref()
            .and_then(|c| c.time.to_datetime(self.utc_offset_seconds))
    }
}
