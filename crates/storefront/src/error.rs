//! Unified error handling with Sentry integration.
//!
//! Every API handler returns `Result<T, AppError>`. Errors render as
//! `{"success": false, "error": "<message>"}` with a localized message;
//! server-side details go to the log and Sentry, never to the client.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::routes::ApiResponse;
use crate::services::{IssueError, OrderError, VerifyError};

/// Which request a validation failure belongs to, for its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    SendVerification,
    VerifyEmail,
    SubmitOrder,
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Required input is missing or malformed. Nothing was changed.
    #[error("Validation failed for {0:?}: {1}")]
    Validation(Endpoint, String),

    /// Code verification refused the submitted code.
    #[error("Verification failed: {0}")]
    Verification(#[from] VerifyError),

    /// Sending the verification mail failed.
    #[error("Issue error: {0}")]
    Issue(#[from] IssueError),

    /// Order submission failed after validation.
    #[error("Order error: {0}")]
    Order(OrderError),

    /// Method not supported on this endpoint.
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::MissingField(field) => {
                Self::Validation(Endpoint::SubmitOrder, format!("missing {}", field.as_str()))
            }
            OrderError::InvalidEmail(e) => {
                Self::Validation(Endpoint::SubmitOrder, format!("email: {e}"))
            }
            other => Self::Order(other),
        }
    }
}

impl AppError {
    /// Wrap a body extraction failure for `endpoint`.
    #[must_use]
    pub fn malformed_body(endpoint: Endpoint, rejection: &JsonRejection) -> Self {
        Self::Validation(endpoint, rejection.body_text())
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(..) | Self::Verification(_) => StatusCode::BAD_REQUEST,
            Self::Issue(_) | Self::Order(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Message shown to the customer.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(Endpoint::SendVerification, _) => "Email адрес обязателен",
            Self::Validation(Endpoint::VerifyEmail, _) => "Email и код обязательны",
            Self::Validation(Endpoint::SubmitOrder, _) => {
                "Пожалуйста, заполните все обязательные поля"
            }
            Self::Verification(VerifyError::NotFound) => "Код не найден или истек",
            Self::Verification(VerifyError::Expired) => "Код истек. Запросите новый код.",
            Self::Verification(VerifyError::Mismatch) => "Неверный код подтверждения",
            Self::Issue(IssueError::NotAccepted) => "Не удалось отправить код подтверждения",
            Self::Issue(IssueError::Delivery(_)) => "Ошибка при отправке кода подтверждения",
            Self::Order(OrderError::NotDelivered) => "Не удалось отправить уведомления о заказе",
            Self::Order(_) => "Ошибка при обработке заказа",
            Self::MethodNotAllowed => "Method not allowed",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (status, Json(ApiResponse::failure(self.public_message()))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MissingField;
    use crate::services::EmailError;

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Validation(Endpoint::SendVerification, String::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Verification(VerifyError::Mismatch).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Issue(IssueError::NotAccepted).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(OrderError::NotDelivered).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::MethodNotAllowed.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_order_validation_maps_to_bad_request() {
        let err = AppError::from(OrderError::MissingField(MissingField::Phone));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.public_message(),
            "Пожалуйста, заполните все обязательные поля"
        );
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = AppError::Issue(IssueError::Delivery(EmailError::InvalidAddress(
            "smtp-internal-detail".to_string(),
        )));
        assert!(!err.public_message().contains("smtp-internal-detail"));
        assert_eq!(err.public_message(), "Ошибка при отправке кода подтверждения");
    }

    #[test]
    fn test_verification_messages_are_distinct() {
        let messages = [
            AppError::Verification(VerifyError::NotFound).public_message(),
            AppError::Verification(VerifyError::Expired).public_message(),
            AppError::Verification(VerifyError::Mismatch).public_message(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
    }
}
