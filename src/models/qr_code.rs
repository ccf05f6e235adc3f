use std::fmt;
use std::str::FromStr;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::scan_event::ScanEvent;

/// Identifier of a stored QR code, rendered as 24 hex chars in URLs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodeId(pub ObjectId);

impl CodeId {
    pub fn new() -> Self {
        Self(ObjectId::new())
    }
}

impl Default for CodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for CodeId {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s.trim()).map(CodeId)
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

/// What the payload of a code encodes. Unknown values fall back to `Other`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QrType {
    Url,
    Text,
    Vcard,
    Wifi,
    Email,
    Sms,
    Geo,
    Event,
    #[serde(other)]
    Other,
}

impl QrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrType::Url => "url",
            QrType::Text => "text",
            QrType::Vcard => "vcard",
            QrType::Wifi => "wifi",
            QrType::Email => "email",
            QrType::Sms => "sms",
            QrType::Geo => "geo",
            QrType::Event => "event",
            QrType::Other => "other",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Security {
    #[serde(default)]
    pub is_password_protected: bool,
    #[serde(default)]
    pub password: String, // Stored as entered, compared trimmed
    #[serde(default)]
    pub expires_at: Option<i64>, // Epoch millis
    #[serde(default)]
    pub max_scans: i64, // 0 means unlimited
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Analytics {
    #[serde(default)]
    pub scan_count: i64,
    #[serde(default)]
    pub scan_log: Vec<ScanEvent>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QrCode {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: Option<String>, // Owner, used by the analytics endpoints only
    pub content_type: QrType,
    pub payload: String,
    #[serde(default)]
    pub security: Security,
    #[serde(default)]
    pub analytics: Analytics,
    #[serde(default)]
    pub manually_expired: bool,
    #[serde(default)]
    pub created_at: i64,
}

impl QrCode {
    pub fn new(content_type: QrType, payload: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            content_type,
            payload: payload.into(),
            security: Security::default(),
            analytics: Analytics::default(),
            manually_expired: false,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn code_id(&self) -> CodeId {
        CodeId(self.id)
    }

    pub fn has_scan_limit(&self) -> bool {
        self.security.max_scans > 0
    }

    /// Scans left before the limit is hit, `None` when unlimited.
    pub fn remaining_scans(&self) -> Option<i64> {
        self.has_scan_limit()
            .then(|| (self.security.max_scans - self.analytics.scan_count).max(0))
    }

    /// Url codes whose payload already carries an explicit web scheme.
    pub fn is_redirectable(&self) -> bool {
        self.content_type == QrType::Url
            && (self.payload.starts_with("http://") || self.payload.starts_with("https://"))
    }

    pub fn owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}
