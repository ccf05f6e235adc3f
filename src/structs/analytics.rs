use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike};
use serde::Serialize;

use crate::models::qr_code::{QrCode, QrType};
use crate::models::scan_event::ScanEvent;
use crate::scan::policy::{self, ExpiryReason};
use crate::utils::hash_ip::hash_ip;

const RECENT_SCANS: usize = 10;
const DASHBOARD_ENTRIES: usize = 5;

/// A scan as shown to the code owner; the raw address is left out.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ScanEventView {
    pub timestamp: i64,
    pub country: String,
    pub city: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub tracking_id: Option<String>,
}

impl From<&ScanEvent> for ScanEventView {
    fn from(event: &ScanEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            country: event.country.clone(),
            city: event.city.clone(),
            user_agent: event.user_agent.clone(),
            referer: event.referer.clone(),
            tracking_id: event.tracking_id.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CodeAnalyticsResponse {
    pub qr_code_id: String,
    #[serde(rename = "type")]
    pub qr_type: QrType,
    pub text: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub scan_count: i64,
    pub max_scans: i64,
    pub remaining_scans: Option<i64>,
    pub unique_scanners: usize,
    pub expired: bool,
    pub expiry_reason: Option<ExpiryReason>,
    pub scans_by_country: BTreeMap<String, usize>,
    pub recent_scans: Vec<ScanEventView>,
}

impl CodeAnalyticsResponse {
    pub fn build(code: &QrCode, now: i64, ip_hash_salt: &str) -> Self {
        let log = &code.analytics.scan_log;
        let unique_scanners = log
            .iter()
            .map(|event| hash_ip(&event.ip, ip_hash_salt))
            .collect::<HashSet<_>>()
            .len();
        let mut scans_by_country = BTreeMap::new();
        for event in log {
            *scans_by_country.entry(event.country.clone()).or_insert(0) += 1;
        }
        let expiry_reason = policy::expiry_reason(code, now);

        Self {
            qr_code_id: code.id.to_hex(),
            qr_type: code.content_type,
            text: code.payload.clone(),
            created_at: code.created_at,
            expires_at: code.security.expires_at,
            scan_count: code.analytics.scan_count,
            max_scans: code.security.max_scans,
            remaining_scans: code.remaining_scans(),
            unique_scanners,
            expired: expiry_reason.is_some(),
            expiry_reason,
            scans_by_country,
            recent_scans: log.iter().rev().take(RECENT_SCANS).map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CodeSummary {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub qr_type: QrType,
    pub scans: i64,
    pub created_at: i64,
}

impl From<&QrCode> for CodeSummary {
    fn from(code: &QrCode) -> Self {
        Self {
            id: code.id.to_hex(),
            text: code.payload.clone(),
            qr_type: code.content_type,
            scans: code.analytics.scan_count,
            created_at: code.created_at,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[serde(rename = "totalQRCodes")]
    pub total_qr_codes: usize,
    pub total_scans: i64,
    #[serde(rename = "thisMonthQRCodes")]
    pub this_month_qr_codes: usize,
    pub this_month_scans: usize,
    pub type_distribution: BTreeMap<String, usize>,
    #[serde(rename = "topQRCodes")]
    pub top_qr_codes: Vec<CodeSummary>,
    pub recent_activity: Vec<CodeSummary>,
}

/// Epoch millis of the first instant of the UTC month containing `now`.
fn month_start(now: i64) -> i64 {
    DateTime::from_timestamp_millis(now)
        .and_then(|dt| dt.date_naive().with_day(1))
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|start| start.and_utc().timestamp_millis())
        .unwrap_or(now)
}

impl DashboardResponse {
    /// `codes` must be ordered newest first.
    pub fn build(codes: &[QrCode], now: i64) -> Self {
        let since = month_start(now);
        let mut type_distribution = BTreeMap::new();
        for code in codes {
            *type_distribution
                .entry(code.content_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut by_scans: Vec<&QrCode> = codes.iter().collect();
        by_scans.sort_by(|a, b| b.analytics.scan_count.cmp(&a.analytics.scan_count));

        Self {
            total_qr_codes: codes.len(),
            total_scans: codes.iter().map(|c| c.analytics.scan_count).sum(),
            this_month_qr_codes: codes.iter().filter(|c| c.created_at >= since).count(),
            this_month_scans: codes
                .iter()
                .flat_map(|c| c.analytics.scan_log.iter())
                .filter(|event| event.timestamp >= since)
                .count(),
            type_distribution,
            top_qr_codes: by_scans
                .into_iter()
                .take(DASHBOARD_ENTRIES)
                .map(CodeSummary::from)
                .collect(),
            recent_activity: codes
                .iter()
                .take(DASHBOARD_ENTRIES)
                .map(CodeSummary::from)
                .collect(),
        }
    }
}
