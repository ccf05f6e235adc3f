use serde::Serialize;

use crate::models::qr_code::{QrCode, QrType};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub scan_count: i64,
    pub max_scans: i64,
    pub remaining_scans: Option<i64>, // null when unlimited
}

#[derive(Serialize, Debug)]
pub struct QrCodeSummary {
    pub text: String,
    #[serde(rename = "type")]
    pub qr_type: QrType,
    pub analytics: ScanStats,
}

impl From<&QrCode> for QrCodeSummary {
    fn from(code: &QrCode) -> Self {
        Self {
            text: code.payload.clone(),
            qr_type: code.content_type,
            analytics: ScanStats {
                scan_count: code.analytics.scan_count,
                max_scans: code.security.max_scans,
                remaining_scans: code.remaining_scans(),
            },
        }
    }
}

/// Body returned to API callers once content may be delivered.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ScanSuccessResponse {
    pub success: bool,
    pub recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub is_landing_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landing_page_html: Option<String>,
    pub qr_code: QrCodeSummary,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequiredResponse {
    pub requires_password: bool,
    pub qr_code_id: String,
    pub tracking_id: Option<String>,
}
