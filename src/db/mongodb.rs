use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc, to_bson};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection, Database};

use crate::db::{CodeStore, CommitOutcome, StoreError};
use crate::models::qr_code::{CodeId, QrCode};
use crate::models::scan_event::ScanEvent;
use crate::state::config::AppConfig;

const QR_CODES_COLLECTION: &str = "qrcodes";

/// Connect and verify the deployment answers before serving traffic.
pub async fn get_database(config: &AppConfig) -> Result<Database> {
    let client = Client::with_uri_str(&config.mongodb_uri)
        .await
        .context("Failed to create MongoDB client")?;
    let db = client.database(&config.mongodb_database);
    db.run_command(doc! { "ping": 1 })
        .await
        .context("MongoDB ping failed")?;
    log::info!("Connected to MongoDB database {}", config.mongodb_database);
    Ok(db)
}

pub struct MongoCodeStore {
    db: Database,
    codes: Collection<QrCode>,
}

impl MongoCodeStore {
    pub fn new(db: Database) -> Self {
        let codes = db.collection::<QrCode>(QR_CODES_COLLECTION);
        Self { db, codes }
    }
}

/// Filter matching a code that still accepts scans at `now`. Mirrors
/// `scan::policy::expiry_reason`, negated, so the server evaluates it at commit time.
/// Missing fields read as their model defaults: never expired, unlimited, zero scans.
fn scannable_filter(id: &CodeId, now: i64) -> Document {
    doc! {
        "_id": id.0,
        "manually_expired": { "$ne": true },
        "$and": [
            { "$or": [
                { "security.expires_at": null },
                { "security.expires_at": { "$gte": now } },
            ] },
            { "$or": [
                { "security.max_scans": null },
                { "security.max_scans": { "$lte": 0 } },
                { "$expr": { "$lt": [
                    { "$ifNull": ["$analytics.scan_count", 0] },
                    "$security.max_scans",
                ] } },
            ] },
        ],
    }
}

#[async_trait]
impl CodeStore for MongoCodeStore {
    async fn load_code(&self, id: &CodeId) -> Result<QrCode, StoreError> {
        self.codes
            .find_one(doc! { "_id": id.0 })
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn commit_scan_if_under_limit(
        &self,
        id: &CodeId,
        event: &ScanEvent,
        now: i64,
    ) -> Result<CommitOutcome, StoreError> {
        let event = to_bson(event).map_err(|e| StoreError::Backend(e.to_string()))?;
        let updated = self
            .codes
            .find_one_and_update(
                scannable_filter(id, now),
                doc! {
                    "$inc": { "analytics.scan_count": 1 },
                    "$push": { "analytics.scan_log": event },
                },
            )
            .return_document(ReturnDocument::After)
            .await?;

        // A miss means either the predicate failed or the code vanished; both reject the scan.
        Ok(match updated {
            Some(code) => CommitOutcome::Updated(code),
            None => CommitOutcome::LimitReached,
        })
    }

    async fn list_codes_by_owner(&self, user_id: &str) -> Result<Vec<QrCode>, StoreError> {
        let codes = self
            .codes
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect::<Vec<QrCode>>()
            .await?;
        Ok(codes)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
