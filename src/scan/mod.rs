//! The scan pipeline shared by every scan endpoint: policy, password gate, recording,
//! then response resolution.

pub mod password_gate;
pub mod policy;
pub mod recorder;
pub mod renderer;
pub mod resolver;

use std::sync::Arc;

use crate::db::{CodeStore, StoreError};
use crate::models::qr_code::{CodeId, QrCode};
use crate::models::scan_event::ScanMetadata;
use crate::utils::client_info::ClientInfo;
use crate::utils::geo::{self, GeoLocator};
use password_gate::GateOutcome;
use policy::{ExpiryReason, PolicyOutcome};
use recorder::RecordOutcome;

/// Fill in where the scanner is. Only called once the scan is about to be committed.
pub(crate) async fn with_location(
    geo: &dyn GeoLocator,
    metadata: ScanMetadata,
) -> ScanMetadata {
    let location = geo::locate(geo, &metadata.ip).await;
    ScanMetadata {
        country: Some(location.country),
        city: Some(location.city),
        ..metadata
    }
}

/// The code a request is about, as it appeared in the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub code_id: String,
    pub tracking_id: Option<String>,
}

impl ScanTarget {
    /// Scanner apps sometimes append `:suffix` to the tracking segment; it is dropped.
    pub fn new(code_id: impl Into<String>, tracking_id: Option<String>) -> Self {
        let tracking_id = tracking_id
            .map(|t| t.split(':').next().unwrap_or_default().trim().to_string())
            .filter(|t| !t.is_empty());
        let code_id: String = code_id.into();
        Self {
            code_id: code_id.trim().to_string(),
            tracking_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Content may be shown. `recorded` is false when the scan could not be persisted.
    Delivered { code: QrCode, recorded: bool },
    PasswordRequired,
    Denied,
    Expired(ExpiryReason),
    NotFound,
    NotProtected,
    Unavailable,
}

impl From<GateOutcome> for ScanOutcome {
    fn from(outcome: GateOutcome) -> Self {
        match outcome {
            GateOutcome::Authorized { code, recorded } => ScanOutcome::Delivered { code, recorded },
            GateOutcome::Denied => ScanOutcome::Denied,
            GateOutcome::Expired(reason) => ScanOutcome::Expired(reason),
            GateOutcome::NotProtected => ScanOutcome::NotProtected,
            GateOutcome::Unavailable => ScanOutcome::Unavailable,
        }
    }
}

#[derive(Clone)]
pub struct ScanService {
    store: Arc<dyn CodeStore>,
    geo: Arc<dyn GeoLocator>,
}

impl ScanService {
    pub fn new(store: Arc<dyn CodeStore>, geo: Arc<dyn GeoLocator>) -> Self {
        Self { store, geo }
    }

    pub fn store(&self) -> &dyn CodeStore {
        self.store.as_ref()
    }

    fn metadata(target: &ScanTarget, client: ClientInfo) -> ScanMetadata {
        ScanMetadata {
            user_agent: client.user_agent,
            ip: client.ip,
            referer: client.referer,
            country: None,
            city: None,
            tracking_id: target.tracking_id.clone(),
        }
    }

    /// Handle a scan request up to the point where a response can be chosen.
    pub async fn scan(&self, target: &ScanTarget, client: ClientInfo, now: i64) -> ScanOutcome {
        let Ok(id) = target.code_id.parse::<CodeId>() else {
            log::info!("Scan for malformed code id {:?}", target.code_id);
            return ScanOutcome::NotFound;
        };
        let code = match self.store.load_code(&id).await {
            Ok(code) => code,
            Err(StoreError::NotFound) => {
                log::info!("Scan for unknown code {}", id);
                return ScanOutcome::NotFound;
            }
            Err(e) => {
                log::error!("Failed to load code {}: {}", id, e);
                return ScanOutcome::Unavailable;
            }
        };

        match policy::evaluate(&code, now) {
            PolicyOutcome::Expired(reason) => {
                log::info!("Scan for {} refused: {}", id, reason);
                ScanOutcome::Expired(reason)
            }
            PolicyOutcome::RequiresPassword => {
                log::info!("Code {} requires a password", id);
                ScanOutcome::PasswordRequired
            }
            PolicyOutcome::Allowed => {
                let metadata =
                    with_location(self.geo.as_ref(), Self::metadata(target, client)).await;
                match recorder::record(self.store.as_ref(), &id, metadata, now).await {
                    Ok(RecordOutcome::Recorded(updated)) => ScanOutcome::Delivered {
                        code: updated,
                        recorded: true,
                    },
                    Ok(RecordOutcome::Rejected(reason)) => ScanOutcome::Expired(reason),
                    Err(e) => {
                        // Content still goes out; the analytics entry is lost.
                        log::error!("Scan for {} lost, delivering content anyway: {}", id, e);
                        ScanOutcome::Delivered {
                            code,
                            recorded: false,
                        }
                    }
                }
            }
        }
    }

    pub async fn verify_password(
        &self,
        target: &ScanTarget,
        password: &str,
        client: ClientInfo,
        now: i64,
    ) -> ScanOutcome {
        password_gate::verify(
            self.store.as_ref(),
            self.geo.as_ref(),
            &target.code_id,
            password,
            Self::metadata(target, client),
            now,
        )
        .await
        .into()
    }
}
