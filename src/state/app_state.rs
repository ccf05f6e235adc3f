use crate::scan::ScanService;
use crate::state::config::AppConfig;

pub struct AppState {
    pub scans: ScanService,
    pub config: AppConfig,
}
