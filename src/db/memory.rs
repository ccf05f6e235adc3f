//! In-process store used by tests. The `DashMap` entry guard held across the check
//! and the mutation gives the same per-code atomicity as the MongoDB filter.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::db::{CodeStore, CommitOutcome, StoreError};
use crate::models::qr_code::{CodeId, QrCode};
use crate::models::scan_event::ScanEvent;
use crate::scan::policy;

#[derive(Default)]
pub struct MemoryCodeStore {
    codes: DashMap<CodeId, QrCode>,
    unavailable: AtomicBool,
    failing_commits: AtomicBool,
    losing_commits: AtomicBool,
}

impl MemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, code: QrCode) -> CodeId {
        let id = code.code_id();
        self.codes.insert(id, code);
        id
    }

    pub fn get(&self, id: &CodeId) -> Option<QrCode> {
        self.codes.get(id).map(|entry| entry.value().clone())
    }

    /// Make every call fail, to exercise the upstream-unavailable paths.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail only scan commits while reads keep working.
    pub fn set_failing_commits(&self, failing: bool) {
        self.failing_commits.store(failing, Ordering::SeqCst);
    }

    /// Reject every commit as if another scan had taken the last slot, while reads still
    /// show the code as scannable.
    pub fn set_losing_commits(&self, losing: bool) {
        self.losing_commits.store(losing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn load_code(&self, id: &CodeId) -> Result<QrCode, StoreError> {
        self.check_available()?;
        self.get(id).ok_or(StoreError::NotFound)
    }

    async fn commit_scan_if_under_limit(
        &self,
        id: &CodeId,
        event: &ScanEvent,
        now: i64,
    ) -> Result<CommitOutcome, StoreError> {
        self.check_available()?;
        if self.failing_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write concern failed".to_string()));
        }
        if self.losing_commits.load(Ordering::SeqCst) {
            return Ok(CommitOutcome::LimitReached);
        }
        let Some(mut entry) = self.codes.get_mut(id) else {
            return Ok(CommitOutcome::LimitReached);
        };
        if policy::is_expired(entry.value(), now) {
            return Ok(CommitOutcome::LimitReached);
        }
        let code = entry.value_mut();
        code.analytics.scan_count += 1;
        code.analytics.scan_log.push(event.clone());
        Ok(CommitOutcome::Updated(code.clone()))
    }

    async fn list_codes_by_owner(&self, user_id: &str) -> Result<Vec<QrCode>, StoreError> {
        self.check_available()?;
        let mut codes: Vec<QrCode> = self
            .codes
            .iter()
            .filter(|entry| entry.value().owned_by(user_id))
            .map(|entry| entry.value().clone())
            .collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
