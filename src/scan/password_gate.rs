//! Password verification for protected codes.
//!
//! Passwords are stored and compared in plaintext after trimming both sides. This matches
//! what existing codes were created with; moving to hashed secrets changes which submissions
//! are accepted and needs a migration of stored codes.

use crate::db::{CodeStore, StoreError};
use crate::models::qr_code::{CodeId, QrCode};
use crate::models::scan_event::ScanMetadata;
use crate::scan::policy::{self, ExpiryReason};
use crate::scan::recorder::{self, RecordOutcome};
use crate::utils::geo::GeoLocator;

#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// `recorded` is false when the commit failed and the scan was lost.
    Authorized { code: QrCode, recorded: bool },
    /// Wrong or missing password, or an id that does not resolve.
    Denied,
    Expired(ExpiryReason),
    NotProtected,
    Unavailable,
}

fn passwords_match(stored: &str, supplied: &str) -> bool {
    let supplied = supplied.trim();
    !supplied.is_empty() && stored.trim() == supplied
}

/// Check `supplied` against the code and record the scan on a match. The scanner is only
/// geolocated once the password matched, so failed guesses never reach the lookup service.
pub async fn verify(
    store: &dyn CodeStore,
    geo: &dyn GeoLocator,
    code_id: &str,
    supplied: &str,
    metadata: ScanMetadata,
    now: i64,
) -> GateOutcome {
    let Ok(id) = code_id.parse::<CodeId>() else {
        return GateOutcome::Denied;
    };
    let code = match store.load_code(&id).await {
        Ok(code) => code,
        Err(StoreError::NotFound) => return GateOutcome::Denied,
        Err(e) => {
            log::error!("Failed to load code {} for password check: {}", id, e);
            return GateOutcome::Unavailable;
        }
    };

    if !code.security.is_password_protected {
        return GateOutcome::NotProtected;
    }
    // The code may have expired since the prompt was served.
    if let Some(reason) = policy::expiry_reason(&code, now) {
        log::info!("Password submitted for expired code {}: {}", id, reason);
        return GateOutcome::Expired(reason);
    }
    if !passwords_match(&code.security.password, supplied) {
        log::info!("Password mismatch for code {}", id);
        return GateOutcome::Denied;
    }

    let metadata = super::with_location(geo, metadata).await;
    match recorder::record(store, &id, metadata, now).await {
        Ok(RecordOutcome::Recorded(updated)) => GateOutcome::Authorized {
            code: updated,
            recorded: true,
        },
        Ok(RecordOutcome::Rejected(reason)) => GateOutcome::Expired(reason),
        Err(e) => {
            log::error!("Scan for {} lost after password check: {}", id, e);
            GateOutcome::Authorized {
                code,
                recorded: false,
            }
        }
    }
}
