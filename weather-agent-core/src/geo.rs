//! Coordinate lookup: IP geolocation and place-name geocoding.

use std::{fmt::Debug, net::IpAddr, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub const DEFAULT_IPIFY_URL: &str = "https://api.ipify.org";
pub const DEFAULT_IPAPI_URL: &str = "https://ipapi.co";
pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1";

const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(5);
const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where the caller is, as far as we know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationHint {
    /// A place name to geocode, e.g. "Berlin".
    Place(String),
    /// The client's address; `None` or a non-public address means "use our own public IP".
    ClientIp(Option<IpAddr>),
}

impl LocationHint {
    /// Prefer an explicit, non-blank place; otherwise fall back to the client IP.
    pub fn from_parts(place: Option<&str>, client_ip: Option<IpAddr>) -> Self {
        match place.map(str::trim).filter(|p| !p.is_empty()) {
            Some(place) => LocationHint::Place(place.to_string()),
            None => LocationHint::ClientIp(client_ip),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("timeout while getting location from {service}")]
    Timeout { service: &'static str },

    #[error("HTTP error while getting location from {service}: {status}")]
    Status { service: &'static str, status: StatusCode },

    #[error("unable to determine public IP address")]
    NoPublicIp,

    #[error("unable to get coordinates for IP {0}")]
    MissingCoordinates(IpAddr),

    #[error("no location found for '{0}'")]
    PlaceNotFound(String),

    #[error("unexpected response from {service}")]
    Decode {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {service} failed")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    /// Coordinates for `ip`, or for this host's public IP when `ip` is `None`.
    async fn locate_ip(&self, ip: Option<IpAddr>) -> Result<Coordinates, GeoError>;

    /// Coordinates of the best match for a place name.
    async fn geocode(&self, place: &str) -> Result<Coordinates, GeoError>;

    async fn resolve(&self, hint: &LocationHint) -> Result<Coordinates, GeoError> {
        match hint {
            LocationHint::Place(place) => self.geocode(place).await,
            LocationHint::ClientIp(ip) => {
                let public = (*ip).filter(|ip| is_public(*ip));
                self.locate_ip(public).await
            }
        }
    }
}

/// Loopback, private, link-local and unspecified addresses cannot be geolocated.
pub fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation())
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80)
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpGeolocator {
    http: Client,
    ipify_url: String,
    ipapi_url: String,
    geocoding_url: String,
}

impl Default for HttpGeolocator {
    fn default() -> Self {
        Self::new(DEFAULT_IPIFY_URL, DEFAULT_IPAPI_URL, DEFAULT_GEOCODING_URL)
    }
}

#[derive(Debug, Deserialize)]
struct IpifyResponse {
    ip: Option<IpAddr>,
}

#[derive(Debug, Deserialize)]
struct IpapiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
}

impl HttpGeolocator {
    pub fn new(
        ipify_url: impl Into<String>,
        ipapi_url: impl Into<String>,
        geocoding_url: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            ipify_url: trim_url(ipify_url.into()),
            ipapi_url: trim_url(ipapi_url.into()),
            geocoding_url: trim_url(geocoding_url.into()),
        }
    }

    async fn public_ip(&self) -> Result<IpAddr, GeoError> {
        let body: IpifyResponse = self
            .get_json("ipify", &self.ipify_url, &[("format", "json")], PUBLIC_IP_TIMEOUT)
            .await?;

        body.ip.ok_or(GeoError::NoPublicIp)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<T, GeoError> {
        let classify = |source: reqwest::Error| {
            if source.is_timeout() {
                GeoError::Timeout { service }
            } else if source.is_decode() {
                GeoError::Decode { service, source }
            } else {
                GeoError::Request { service, source }
            }
        };

        let res = self
            .http
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = res.status();
        if !status.is_success() {
            return Err(GeoError::Status { service, status });
        }

        res.json::<T>().await.map_err(classify)
    }
}

#[async_trait]
impl Geolocator for HttpGeolocator {
    async fn locate_ip(&self, ip: Option<IpAddr>) -> Result<Coordinates, GeoError> {
        let ip = match ip {
            Some(ip) => ip,
            None => self.public_ip().await?,
        };
        tracing::debug!(%ip, "looking up coordinates for IP");

        let url = format!("{}/{ip}/json/", self.ipapi_url);
        let body: IpapiResponse = self.get_json("ipapi", &url, &[], IP_LOOKUP_TIMEOUT).await?;

        match (body.latitude, body.longitude) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates { latitude, longitude }),
            _ => Err(GeoError::MissingCoordinates(ip)),
        }
    }

    async fn geocode(&self, place: &str) -> Result<Coordinates, GeoError> {
        tracing::debug!(place, "geocoding place name");

        let url = format!("{}/search", self.geocoding_url);
        let body: GeocodingResponse = self
            .get_json(
                "geocoding",
                &url,
                &[("name", place), ("count", "1"), ("format", "json")],
                IP_LOOKUP_TIMEOUT,
            )
            .await?;

        body.results
            .into_iter()
            .next()
            .map(|r| Coordinates { latitude: r.latitude, longitude: r.longitude })
            .ok_or_else(|| GeoError::PlaceNotFound(place.to_string()))
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
