use actix_web::{HttpMessage, HttpRequest, HttpResponse, Result, error, web};

use crate::db::StoreError;
use crate::models::qr_code::CodeId;
use crate::state::app_state::AppState;
use crate::structs::analytics::{CodeAnalyticsResponse, DashboardResponse};
use crate::utils::jwt::Claims;

fn current_user(req: &HttpRequest) -> Result<String> {
    req.extensions()
        .get::<Claims>()
        .map(|claims| claims.user_id.clone())
        .ok_or_else(|| error::ErrorUnauthorized("Authentication required"))
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "QR code not found or unauthorized"
    }))
}

/// Get analytics for one of the caller's QR codes
pub async fn get_code_analytics(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = current_user(&req)?;
    let Ok(code_id) = path.into_inner().parse::<CodeId>() else {
        return Ok(not_found());
    };

    let code = match app_state.scans.store().load_code(&code_id).await {
        Ok(code) => code,
        Err(StoreError::NotFound) => return Ok(not_found()),
        Err(e) => {
            return Err(error::ErrorInternalServerError(format!("Database error: {}", e)));
        }
    };
    // Someone else's code looks the same as a missing one
    if !code.owned_by(&user_id) {
        return Ok(not_found());
    }

    let now = chrono::Utc::now().timestamp_millis();
    Ok(HttpResponse::Ok().json(CodeAnalyticsResponse::build(
        &code,
        now,
        &app_state.config.ip_hash_salt,
    )))
}

/// Analytics for every QR code the caller owns, newest first
pub async fn list_code_analytics(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = current_user(&req)?;
    let codes = app_state
        .scans
        .store()
        .list_codes_by_owner(&user_id)
        .await
        .map_err(|e| error::ErrorInternalServerError(format!("Database error: {}", e)))?;

    let now = chrono::Utc::now().timestamp_millis();
    let salt = &app_state.config.ip_hash_salt;
    let analytics: Vec<CodeAnalyticsResponse> = codes
        .iter()
        .map(|code| CodeAnalyticsResponse::build(code, now, salt))
        .collect();
    Ok(HttpResponse::Ok().json(analytics))
}

/// Totals across all of the caller's QR codes
pub async fn get_dashboard(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = current_user(&req)?;
    let codes = app_state
        .scans
        .store()
        .list_codes_by_owner(&user_id)
        .await
        .map_err(|e| error::ErrorInternalServerError(format!("Database error: {}", e)))?;

    let now = chrono::Utc::now().timestamp_millis();
    Ok(HttpResponse::Ok().json(DashboardResponse::build(&codes, now)))
}

#[cfg(test)]
mod tests {
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test};

    use super::*;
    use crate::models::qr_code::{QrCode, QrType};
    use crate::routes::init_routes;
    use crate::scan::test_support;
    use crate::state::config::AppConfig;
    use crate::utils::jwt::issue_test_token;

    #[actix_web::test]
    async fn analytics_require_a_token() {
        let (_store, scans) = test_support::service();
        let state = web::Data::new(AppState {
            scans,
            config: AppConfig::for_tests(),
        });
        let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/analytics/dashboard")
            .to_request();
        let resp = test::try_call_service(&app, req).await;
        let status = match resp {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn owners_see_their_code_analytics_and_others_do_not() {
        let (store, scans) = test_support::service();
        let config = AppConfig::for_tests();
        let owner_token = issue_test_token("owner", &config.jwt_secret, 3600);
        let other_token = issue_test_token("someone-else", &config.jwt_secret, 3600);
        let id = store.insert(QrCode::new(QrType::Text, "hi", Some("owner".into())));
        let state = web::Data::new(AppState { scans, config });
        let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

        // One real scan through the public endpoint first
        let req = test::TestRequest::get()
            .uri(&format!("/scan/{id}/t"))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/analytics/{id}"))
            .insert_header((header::AUTHORIZATION, format!("Bearer {owner_token}")))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["scanCount"], 1);
        assert_eq!(body["scansByCountry"]["US"], 1);
        assert_eq!(body["recentScans"][0]["city"], "New York");
        assert!(body["recentScans"][0].get("ip").is_none());

        let req = test::TestRequest::get()
            .uri(&format!("/api/analytics/{id}"))
            .insert_header((header::AUTHORIZATION, format!("Bearer {other_token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/analytics/dashboard")
            .insert_header((header::AUTHORIZATION, format!("Bearer {owner_token}")))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["totalQRCodes"], 1);
        assert_eq!(body["totalScans"], 1);
    }

    #[actix_web::test]
    async fn owners_list_analytics_for_their_codes_only() {
        let (store, scans) = test_support::service();
        let config = AppConfig::for_tests();
        let owner_token = issue_test_token("owner", &config.jwt_secret, 3600);
        let mut older = QrCode::new(QrType::Text, "older", Some("owner".into()));
        older.created_at -= 1000;
        let older = store.insert(older);
        let newer = store.insert(QrCode::new(QrType::Url, "https://example.com", Some("owner".into())));
        store.insert(QrCode::new(QrType::Text, "not mine", Some("someone-else".into())));
        let state = web::Data::new(AppState { scans, config });
        let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/scan/{older}/t"))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/api/analytics")
            .insert_header((header::AUTHORIZATION, format!("Bearer {owner_token}")))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let codes = body.as_array().unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0]["qrCodeId"], newer.to_string());
        assert_eq!(codes[0]["scanCount"], 0);
        assert_eq!(codes[1]["qrCodeId"], older.to_string());
        assert_eq!(codes[1]["scanCount"], 1);
        assert_eq!(codes[1]["recentScans"][0]["country"], "US");
    }

    #[actix_web::test]
    async fn listing_analytics_requires_a_token() {
        let (_store, scans) = test_support::service();
        let state = web::Data::new(AppState {
            scans,
            config: AppConfig::for_tests(),
        });
        let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

        let req = test::TestRequest::get().uri("/api/analytics").to_request();
        let status = match test::try_call_service(&app, req).await {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
