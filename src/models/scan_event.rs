use serde::{Deserialize, Serialize};

pub const UNKNOWN_LOCATION: &str = "Unknown";

/// One successful scan, appended to a code's scan log and never modified.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanEvent {
    pub timestamp: i64, // When the scan was committed (epoch millis)
    pub user_agent: Option<String>,
    pub ip: String,
    pub referer: Option<String>,
    pub country: String,
    pub city: String,
    pub tracking_id: Option<String>,
}

/// Request-side details of a scan attempt, before the location lookup.
#[derive(Debug, Clone, Default)]
pub struct ScanMetadata {
    pub user_agent: Option<String>,
    pub ip: String,
    pub referer: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub tracking_id: Option<String>,
}

impl ScanEvent {
    pub fn new(metadata: ScanMetadata, timestamp: i64) -> Self {
        Self {
            timestamp,
            user_agent: metadata.user_agent,
            ip: metadata.ip,
            referer: metadata.referer,
            country: metadata
                .country
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            city: metadata.city.unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            tracking_id: metadata.tracking_id,
        }
    }
}
