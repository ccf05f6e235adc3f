use actix_web::web;

use crate::handlers::analytics_handlers::{
    get_code_analytics, get_dashboard, list_code_analytics,
};
use crate::handlers::health_handlers::health_check;
use crate::handlers::scan_handlers::{
    api_scan_code, scan_code, scan_code_untracked, verify_password,
};
use crate::middlewares::authmw::JwtAuth;

/// Configure the routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // Public scan routes - anyone holding the link can scan
    cfg.service(
        web::scope("/scan")
            .route("/{code_id}/verify-password", web::post().to(verify_password))
            .route("/{code_id}/{tracking_id}", web::get().to(scan_code))
            .route("/{code_id}", web::get().to(scan_code_untracked)),
    );
    cfg.route("/health", web::get().to(health_check));
    cfg.route(
        "/api/scan/{code_id}/{tracking_id}",
        web::get().to(api_scan_code),
    );
    // Owner analytics - require authentication
    cfg.service(
        web::scope("/api/analytics")
            .wrap(JwtAuth)
            .route("", web::get().to(list_code_analytics))
            .route("/dashboard", web::get().to(get_dashboard))
            .route("/{code_id}", web::get().to(get_code_analytics)),
    );
}
