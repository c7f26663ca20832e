//! Error responses.
//!
//! Every failure leaves the API as `{"error": CODE, "message": text}` with the
//! status of its `AppError` class.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};
use wallets_core::ledger::LedgerError;
use wallets_shared::AppError;

/// Message returned for any request body that cannot be decoded.
pub const BODY_DECODE_MESSAGE: &str = "failed to decode body";

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Builds a `400` for a malformed parameter.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(AppError::Validation(message.into()))
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        if let LedgerError::Storage { source, .. } = &err {
            error!(error = %err, cause = %source, "Storage failure");
        }
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "Rejected request body");
        Self::bad_request(BODY_DECODE_MESSAGE)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(error = %rejection.body_text(), "Rejected query string");
        Self::bad_request("failed to decode query string")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": self.0.message(),
            })),
        )
            .into_response()
    }
}
