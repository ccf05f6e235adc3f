//! Turns a scan outcome into what the requester receives. The HTML flow and the JSON API
//! share one decision step and only differ in how the decision is serialized.

use actix_web::http::{StatusCode, header};
use actix_web::HttpResponse;
use serde_json::json;

use crate::models::qr_code::QrCode;
use crate::scan::policy::ExpiryReason;
use crate::scan::renderer::{self, RenderedContent};
use crate::scan::{ScanOutcome, ScanTarget};
use crate::structs::scan_response::{
    PasswordRequiredResponse, QrCodeSummary, ScanSuccessResponse,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    Html,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Expired(ExpiryReason),
    NotProtected,
    Unavailable,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Expired(ExpiryReason::ScanLimitReached) => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Expired(_) => StatusCode::GONE,
            ErrorKind::NotProtected => StatusCode::BAD_REQUEST,
            ErrorKind::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "QR Code Not Found",
            ErrorKind::Expired(ExpiryReason::ScanLimitReached) => "Scan Limit Reached",
            ErrorKind::Expired(_) => "QR Code Expired",
            ErrorKind::NotProtected => "Not Password Protected",
            ErrorKind::Unavailable => "Error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "This QR code does not exist or has been deleted.",
            ErrorKind::Expired(ExpiryReason::ScanLimitReached) => {
                "This QR code has reached its maximum number of allowed scans."
            }
            ErrorKind::Expired(_) => "This QR code has expired and is no longer valid.",
            ErrorKind::NotProtected => "This QR code is not password protected.",
            ErrorKind::Unavailable => {
                "An error occurred while processing this QR code. Please try again later."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExternalResponse {
    Redirect(String),
    RenderedPage(RenderedContent),
    PasswordPrompt {
        content: RenderedContent,
        retry: bool,
    },
    JsonStatus {
        status: StatusCode,
        body: serde_json::Value,
    },
    ErrorPage(ErrorKind),
}

/// What the outcome means, independent of the calling convention.
/// A delivery without a landing page is a redirect.
enum Decision<'a> {
    Deliver {
        code: &'a QrCode,
        recorded: bool,
        landing: Option<RenderedContent>,
    },
    Prompt { retry: bool },
    Fail(ErrorKind),
}

/// Payloads that cannot travel in a `Location` header (stray CR/LF from imports and the
/// like) are shown on a landing page instead.
fn redirects(code: &QrCode) -> bool {
    code.is_redirectable() && header::HeaderValue::try_from(code.payload.as_str()).is_ok()
}

fn decide(outcome: &ScanOutcome) -> Decision<'_> {
    match outcome {
        ScanOutcome::Delivered { code, recorded } => Decision::Deliver {
            code,
            recorded: *recorded,
            landing: (!redirects(code)).then(|| renderer::render(code)),
        },
        ScanOutcome::PasswordRequired => Decision::Prompt { retry: false },
        ScanOutcome::Denied => Decision::Prompt { retry: true },
        ScanOutcome::Expired(reason) => Decision::Fail(ErrorKind::Expired(*reason)),
        ScanOutcome::NotFound => Decision::Fail(ErrorKind::NotFound),
        ScanOutcome::NotProtected => Decision::Fail(ErrorKind::NotProtected),
        ScanOutcome::Unavailable => Decision::Fail(ErrorKind::Unavailable),
    }
}

pub fn resolve(
    target: &ScanTarget,
    outcome: &ScanOutcome,
    convention: Convention,
) -> ExternalResponse {
    let decision = decide(outcome);
    match convention {
        Convention::Html => match decision {
            Decision::Deliver {
                landing: Some(content),
                ..
            } => ExternalResponse::RenderedPage(content),
            Decision::Deliver { code, .. } => ExternalResponse::Redirect(code.payload.clone()),
            Decision::Prompt { retry } => ExternalResponse::PasswordPrompt {
                content: renderer::password_prompt(
                    &target.code_id,
                    target.tracking_id.as_deref(),
                    retry,
                ),
                retry,
            },
            Decision::Fail(kind) => ExternalResponse::ErrorPage(kind),
        },
        Convention::Api => api_status(target, decision),
    }
}

fn api_status(target: &ScanTarget, decision: Decision<'_>) -> ExternalResponse {
    let (status, body) = match decision {
        Decision::Deliver {
            code,
            recorded,
            landing,
        } => {
            let landing_page_html = landing.as_ref().map(renderer::landing_page);
            let body = ScanSuccessResponse {
                success: true,
                recorded,
                redirect_url: landing.is_none().then(|| code.payload.clone()),
                is_landing_page: landing_page_html.is_some(),
                landing_page_html,
                qr_code: QrCodeSummary::from(code),
            };
            (StatusCode::OK, serde_json::to_value(body).unwrap_or_default())
        }
        Decision::Prompt { retry: false } => (
            StatusCode::OK,
            serde_json::to_value(PasswordRequiredResponse {
                requires_password: true,
                qr_code_id: target.code_id.clone(),
                tracking_id: target.tracking_id.clone(),
            })
            .unwrap_or_default(),
        ),
        Decision::Prompt { retry: true } => (
            StatusCode::UNAUTHORIZED,
            json!({ "error": "The password you entered is incorrect. Please try again." }),
        ),
        Decision::Fail(ErrorKind::Expired(reason)) => (
            ErrorKind::Expired(reason).status(),
            json!({
                "expired": true,
                "reason": reason,
                "message": ErrorKind::Expired(reason).message(),
            }),
        ),
        Decision::Fail(kind) => (kind.status(), json!({ "error": kind.message() })),
    };
    ExternalResponse::JsonStatus { status, body }
}

fn html(status: StatusCode, content: &RenderedContent) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(renderer::landing_page(content))
}

impl ExternalResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            ExternalResponse::Redirect(_) => StatusCode::FOUND,
            ExternalResponse::RenderedPage(_) => StatusCode::OK,
            ExternalResponse::PasswordPrompt { retry: true, .. } => StatusCode::UNAUTHORIZED,
            ExternalResponse::PasswordPrompt { .. } => StatusCode::OK,
            ExternalResponse::JsonStatus { status, .. } => *status,
            ExternalResponse::ErrorPage(kind) => kind.status(),
        }
    }

    pub fn into_http_response(self) -> HttpResponse {
        let status = self.status();
        match self {
            ExternalResponse::Redirect(url) => HttpResponse::Found()
                .append_header((header::LOCATION, url))
                .append_header((header::CACHE_CONTROL, "no-store"))
                .finish(),
            ExternalResponse::RenderedPage(content)
            | ExternalResponse::PasswordPrompt { content, .. } => html(status, &content),
            ExternalResponse::JsonStatus { body, .. } => HttpResponse::build(status).json(body),
            ExternalResponse::ErrorPage(kind) => {
                html(status, &renderer::message_page(kind.title(), kind.message()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::qr_code::QrType;

    fn target() -> ScanTarget {
        ScanTarget::new("65f1c0ffee0000000000beef", Some("trk1".to_string()))
    }

    fn delivered(content_type: QrType, payload: &str) -> ScanOutcome {
        ScanOutcome::Delivered {
            code: QrCode::new(content_type, payload, None),
            recorded: true,
        }
    }

    #[test]
    fn url_unfit_for_a_header_gets_a_landing_page() {
        let payload = "https://example.com/\r\n";
        let html = resolve(&target(), &delivered(QrType::Url, payload), Convention::Html);
        let ExternalResponse::RenderedPage(page) = html else {
            panic!("expected a landing page, got {html:?}");
        };
        assert!(page.body_html.contains("https://example.com/"));

        let api = resolve(&target(), &delivered(QrType::Url, payload), Convention::Api);
        let ExternalResponse::JsonStatus { status, body } = api else {
            panic!("expected json");
        };
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isLandingPage"], true);
        assert!(body.get("redirectUrl").is_none());
    }

    #[test]
    fn url_with_scheme_redirects() {
        let response = resolve(
            &target(),
            &delivered(QrType::Url, "https://example.com"),
            Convention::Html,
        );
        assert_eq!(response, ExternalResponse::Redirect("https://example.com".into()));
    }

    #[test]
    fn url_without_scheme_renders_a_page() {
        let response = resolve(&target(), &delivered(QrType::Url, "example.com"), Convention::Html);
        let ExternalResponse::RenderedPage(content) = response else {
            panic!("expected a landing page");
        };
        assert!(content.body_html.contains("https://example.com"));
    }

    #[test]
    fn api_and_html_agree_on_the_decision() {
        let outcome = delivered(QrType::Url, "https://example.com");
        let ExternalResponse::JsonStatus { status, body } =
            resolve(&target(), &outcome, Convention::Api)
        else {
            panic!("expected json");
        };
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["redirectUrl"], "https://example.com");
        assert_eq!(body["isLandingPage"], false);
        assert_eq!(body["qrCode"]["type"], "url");
        assert!(body["qrCode"]["analytics"]["remainingScans"].is_null());

        let outcome = delivered(QrType::Text, "hello");
        let ExternalResponse::JsonStatus { body, .. } = resolve(&target(), &outcome, Convention::Api)
        else {
            panic!("expected json");
        };
        assert_eq!(body["isLandingPage"], true);
        assert!(body["landingPageHtml"].as_str().unwrap().contains("hello"));
    }

    #[test]
    fn expiry_statuses_separate_limit_from_date() {
        let limit = resolve(
            &target(),
            &ScanOutcome::Expired(ExpiryReason::ScanLimitReached),
            Convention::Html,
        );
        assert_eq!(limit.status(), StatusCode::TOO_MANY_REQUESTS);

        let date = resolve(
            &target(),
            &ScanOutcome::Expired(ExpiryReason::DateExpired),
            Convention::Html,
        );
        assert_eq!(date.status(), StatusCode::GONE);

        let missing = resolve(&target(), &ScanOutcome::NotFound, Convention::Html);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let ExternalResponse::JsonStatus { body, .. } = resolve(
            &target(),
            &ScanOutcome::Expired(ExpiryReason::ScanLimitReached),
            Convention::Api,
        ) else {
            panic!("expected json");
        };
        assert_eq!(body["expired"], true);
        assert_eq!(body["reason"], "scan_limit_reached");
    }

    #[test]
    fn password_prompt_is_not_an_error_page() {
        let response = resolve(&target(), &ScanOutcome::PasswordRequired, Convention::Html);
        assert!(matches!(
            response,
            ExternalResponse::PasswordPrompt { retry: false, .. }
        ));
        assert_eq!(response.status(), StatusCode::OK);

        let ExternalResponse::JsonStatus { body, .. } =
            resolve(&target(), &ScanOutcome::PasswordRequired, Convention::Api)
        else {
            panic!("expected json");
        };
        assert_eq!(body["requiresPassword"], true);
        assert_eq!(body["trackingId"], "trk1");
    }

    #[test]
    fn denied_reprompts_with_unauthorized() {
        let html = resolve(&target(), &ScanOutcome::Denied, Convention::Html);
        assert_eq!(html.status(), StatusCode::UNAUTHORIZED);
        let api = resolve(&target(), &ScanOutcome::Denied, Convention::Api);
        assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
    }
}
