//! Persistence seam for QR codes and their scan analytics.

#[cfg(test)]
pub mod memory;
pub mod mongodb;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::qr_code::{CodeId, QrCode};
use crate::models::scan_event::ScanEvent;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<::mongodb::error::Error> for StoreError {
    fn from(e: ::mongodb::error::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Result of a conditional scan commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Updated(QrCode),
    /// The expiry predicate held at commit time, nothing was written.
    LimitReached,
}

#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn load_code(&self, id: &CodeId) -> Result<QrCode, StoreError>;

    /// Appends `event` and increments the scan count in one atomic update, only if the
    /// code is not expired at `now`. Backends must evaluate the condition themselves.
    async fn commit_scan_if_under_limit(
        &self,
        id: &CodeId,
        event: &ScanEvent,
        now: i64,
    ) -> Result<CommitOutcome, StoreError>;

    /// Codes owned by `user_id`, newest first.
    async fn list_codes_by_owner(&self, user_id: &str) -> Result<Vec<QrCode>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
