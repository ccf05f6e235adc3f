//! Scan recording. The limit check happens inside the store's conditional update,
//! never as a read followed by a write here.

use crate::db::{CodeStore, CommitOutcome, StoreError};
use crate::models::qr_code::{CodeId, QrCode};
use crate::models::scan_event::{ScanEvent, ScanMetadata};
use crate::scan::policy::{self, ExpiryReason};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Recorded(QrCode),
    /// The commit matched nothing; carries why the code stopped accepting scans.
    Rejected(ExpiryReason),
}

/// Work out why a commit missed. A fresh read tells a code killed or expired in the
/// meantime apart from one whose last slot went to a concurrent scan.
async fn rejection_reason(store: &dyn CodeStore, code_id: &CodeId, now: i64) -> ExpiryReason {
    match store.load_code(code_id).await {
        Ok(code) => policy::expiry_reason(&code, now).unwrap_or(ExpiryReason::ScanLimitReached),
        Err(e) => {
            log::warn!("Could not reload {} after a rejected commit: {}", code_id, e);
            ExpiryReason::ScanLimitReached
        }
    }
}

pub async fn record(
    store: &dyn CodeStore,
    code_id: &CodeId,
    metadata: ScanMetadata,
    now: i64,
) -> Result<RecordOutcome, StoreError> {
    let event = ScanEvent::new(metadata, now);
    match store.commit_scan_if_under_limit(code_id, &event, now).await? {
        CommitOutcome::Updated(code) => {
            log::info!(
                "Scan recorded for {}: {} scans, {} remaining",
                code_id,
                code.analytics.scan_count,
                code.remaining_scans()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "unlimited".to_string())
            );
            Ok(RecordOutcome::Recorded(code))
        }
        CommitOutcome::LimitReached => {
            let reason = rejection_reason(store, code_id, now).await;
            log::info!("Scan for {} rejected at commit time: {}", code_id, reason);
            Ok(RecordOutcome::Rejected(reason))
        }
    }
}
