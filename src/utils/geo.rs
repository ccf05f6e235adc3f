use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::scan_event::UNKNOWN_LOCATION;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub country: String,
    pub city: String,
}

impl Location {
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN_LOCATION.to_string(),
            city: UNKNOWN_LOCATION.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("geolocation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geolocation lookup rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<Location, GeoError>;
}

/// Resolve `ip`, degrading any failure to an unknown location.
pub async fn locate(geo: &dyn GeoLocator, ip: &str) -> Location {
    match geo.lookup(ip).await {
        Ok(location) => location,
        Err(e) => {
            log::warn!("Geolocation lookup for {} failed: {}", ip, e);
            Location::unknown()
        }
    }
}

/// Used when no lookup service is configured.
pub struct NoopGeoLocator;

#[async_trait]
impl GeoLocator for NoopGeoLocator {
    async fn lookup(&self, _ip: &str) -> Result<Location, GeoError> {
        Ok(Location::unknown())
    }
}

/// Client for ip-api style services: `GET {base}/{ip}` answering
/// `{"status": "success", "countryCode": "US", "city": "New York"}`.
pub struct HttpGeoLocator {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    status: Option<String>,
    message: Option<String>,
    country_code: Option<String>,
    city: Option<String>,
}

impl HttpGeoLocator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Loopback and private addresses never resolve to a place.
fn is_routable(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => !(v4.is_loopback() || v4.is_private() || v4.is_link_local()),
        Ok(IpAddr::V6(v6)) => !(v6.is_loopback() || v6.is_unspecified()),
        Err(_) => false,
    }
}

#[async_trait]
impl GeoLocator for HttpGeoLocator {
    async fn lookup(&self, ip: &str) -> Result<Location, GeoError> {
        if !is_routable(ip) {
            return Ok(Location::unknown());
        }
        let response: LookupResponse = self
            .client
            .get(format!("{}/{}", self.base_url, ip))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status.as_deref().is_some_and(|s| s != "success") {
            return Err(GeoError::Rejected(
                response.message.unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        let or_unknown = |value: Option<String>| {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
        };
        Ok(Location {
            country: or_unknown(response.country_code),
            city: or_unknown(response.city),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingGeo;

    #[async_trait]
    impl GeoLocator for FailingGeo {
        async fn lookup(&self, _ip: &str) -> Result<Location, GeoError> {
            Err(GeoError::Rejected("quota exceeded".into()))
        }
    }

    #[tokio::test]
    async fn failed_lookup_degrades_to_unknown() {
        assert_eq!(locate(&FailingGeo, "8.8.8.8").await, Location::unknown());
    }

    #[tokio::test]
    async fn private_addresses_are_not_sent_upstream() {
        // Unroutable base url: a real request would error instead of returning unknown.
        let geo = HttpGeoLocator::new("http://127.0.0.1:9", Duration::from_millis(50)).unwrap();
        assert_eq!(geo.lookup("192.168.1.20").await.unwrap(), Location::unknown());
        assert_eq!(geo.lookup("127.0.0.1").await.unwrap(), Location::unknown());
        assert_eq!(geo.lookup("unknown").await.unwrap(), Location::unknown());
    }
}
