use serde::Deserialize;
use validator::Validate;

/// Password submission, as JSON from API callers or as a form from the prompt page.
#[derive(Deserialize, Validate)]
pub struct VerifyPasswordRequest {
    #[serde(default)]
    #[validate(length(max = 1024, message = "Password is too long"))]
    pub password: String,
    #[serde(default, alias = "trackingId")]
    #[validate(length(max = 64, message = "Tracking id is too long"))]
    pub tracking_id: Option<String>,
}
