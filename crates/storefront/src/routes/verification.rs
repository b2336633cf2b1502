//! Email verification route handlers.
//!
//! The storefront asks for a code before checkout, then posts the code back.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::Deserialize;
use tracing::instrument;

use mring_core::Email;

use super::ApiResponse;
use crate::error::{AppError, Endpoint, Result};
use crate::state::AppState;

/// Request to send a verification code.
#[derive(Debug, Default, Deserialize)]
pub struct SendCodeRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Request to check a verification code.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Mail a fresh code, replacing any pending one.
///
/// POST /api/send-verification
#[instrument(skip_all)]
pub async fn send_code(
    State(state): State<AppState>,
    body: std::result::Result<Json<SendCodeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>> {
    let Json(req) =
        body.map_err(|e| AppError::malformed_body(Endpoint::SendVerification, &e))?;
    let email = required_email(Endpoint::SendVerification, req.email.as_deref())?;

    state.verification().issue(&email).await?;

    Ok(Json(ApiResponse::success(
        "Код подтверждения отправлен на вашу почту",
    )))
}

/// GET /api/send-verification
pub async fn send_code_alive() -> Json<ApiResponse> {
    Json(ApiResponse::success("send-verification alive"))
}

/// Check a submitted code.
///
/// POST /api/verify-email
#[instrument(skip_all)]
pub async fn verify_code(
    State(state): State<AppState>,
    body: std::result::Result<Json<VerifyCodeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>> {
    let Json(req) = body.map_err(|e| AppError::malformed_body(Endpoint::VerifyEmail, &e))?;

    let code = req
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation(Endpoint::VerifyEmail, "missing code".to_string()))?;
    let email = required_email(Endpoint::VerifyEmail, req.email.as_deref())?;

    state.verification().verify(&email, code)?;

    Ok(Json(ApiResponse::success("Email успешно подтвержден")))
}

/// GET /api/verify-email
pub async fn verify_code_alive() -> Json<ApiResponse> {
    Json(ApiResponse::success("verify-email alive"))
}

/// Parse the `email` field, treating blank as missing.
fn required_email(endpoint: Endpoint, raw: Option<&str>) -> Result<Email> {
    let raw = raw
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::Validation(endpoint, "missing email".to_string()))?;
    Email::normalize(raw).map_err(|e| AppError::Validation(endpoint, format!("email: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_email() {
        assert!(matches!(
            required_email(Endpoint::SendVerification, None),
            Err(AppError::Validation(Endpoint::SendVerification, _))
        ));
        assert!(required_email(Endpoint::VerifyEmail, Some("  ")).is_err());
        assert!(required_email(Endpoint::VerifyEmail, Some("broken")).is_err());
        assert_eq!(
            required_email(Endpoint::VerifyEmail, Some(" A@B.com "))
                .unwrap()
                .as_str(),
            "a@b.com"
        );
    }
}
