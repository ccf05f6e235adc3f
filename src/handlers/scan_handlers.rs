use actix_web::{Either, HttpRequest, HttpResponse, web};
use nanoid::nanoid;
use validator::Validate;

use crate::scan::resolver::{self, Convention};
use crate::scan::{ScanOutcome, ScanTarget};
use crate::state::app_state::AppState;
use crate::structs::scan_request::VerifyPasswordRequest;
use crate::utils::client_info::ClientInfo;

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn run_scan(
    app_state: &AppState,
    req: &HttpRequest,
    target: ScanTarget,
    convention: Convention,
) -> HttpResponse {
    let client = ClientInfo::from_request(req);
    let outcome = app_state.scans.scan(&target, client, now_millis()).await;
    resolver::resolve(&target, &outcome, convention).into_http_response()
}

/// Scan from a printed code: redirect or landing page
pub async fn scan_code(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (code_id, tracking_id) = path.into_inner();
    let target = ScanTarget::new(code_id, Some(tracking_id));
    run_scan(&app_state, &req, target, Convention::Html).await
}

/// Scan without a tracking segment; one is generated so the scan can still be told apart
pub async fn scan_code_untracked(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    let target = ScanTarget::new(path.into_inner(), Some(nanoid!(10)));
    run_scan(&app_state, &req, target, Convention::Html).await
}

/// Same scan flow, answered as JSON for the web client
pub async fn api_scan_code(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (code_id, tracking_id) = path.into_inner();
    let target = ScanTarget::new(code_id, Some(tracking_id));
    run_scan(&app_state, &req, target, Convention::Api).await
}

/// Password submission. JSON bodies get JSON back, form posts from the prompt page get HTML.
pub async fn verify_password(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: Either<web::Json<VerifyPasswordRequest>, web::Form<VerifyPasswordRequest>>,
) -> HttpResponse {
    let (body, convention) = match body {
        Either::Left(json) => (json.into_inner(), Convention::Api),
        Either::Right(form) => (form.into_inner(), Convention::Html),
    };
    let target = ScanTarget::new(path.into_inner(), body.tracking_id.clone());

    if let Err(errors) = body.validate() {
        return match convention {
            Convention::Api => HttpResponse::BadRequest().json(errors),
            Convention::Html => {
                resolver::resolve(&target, &ScanOutcome::Denied, convention).into_http_response()
            }
        };
    }

    let client = ClientInfo::from_request(&req);
    let outcome = app_state
        .scans
        .verify_password(&target, &body.password, client, now_millis())
        .await;
    resolver::resolve(&target, &outcome, convention).into_http_response()
}
