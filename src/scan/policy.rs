//! Scan policy: classifies a scan attempt from a code snapshot and the current time.

use std::fmt;

use serde::Serialize;

use crate::models::qr_code::QrCode;

/// Why a code no longer accepts scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    ManuallyExpired,
    ScanLimitReached,
    DateExpired,
}

impl ExpiryReason {
    pub fn describe(&self) -> &'static str {
        match self {
            ExpiryReason::ManuallyExpired => "manually expired",
            ExpiryReason::ScanLimitReached => "scan limit reached",
            ExpiryReason::DateExpired => "date expired",
        }
    }
}

impl fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    Allowed,
    RequiresPassword,
    Expired(ExpiryReason),
}

/// The expiry predicate. Every place that gates scans goes through here.
pub fn expiry_reason(code: &QrCode, now: i64) -> Option<ExpiryReason> {
    if code.manually_expired {
        return Some(ExpiryReason::ManuallyExpired);
    }
    if code.has_scan_limit() && code.analytics.scan_count >= code.security.max_scans {
        return Some(ExpiryReason::ScanLimitReached);
    }
    match code.security.expires_at {
        Some(expires_at) if now > expires_at => Some(ExpiryReason::DateExpired),
        _ => None,
    }
}

pub fn is_expired(code: &QrCode, now: i64) -> bool {
    expiry_reason(code, now).is_some()
}

/// Expiry is checked before the password so an expired protected code never prompts.
pub fn evaluate(code: &QrCode, now: i64) -> PolicyOutcome {
    if let Some(reason) = expiry_reason(code, now) {
        return PolicyOutcome::Expired(reason);
    }
    if code.security.is_password_protected {
        return PolicyOutcome::RequiresPassword;
    }
    PolicyOutcome::Allowed
}
