use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{BytesRejection, FormRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_engine::RelayError;
use relay_logging::relay_info;
use serde::Serialize;

/// Error body returned by every endpoint: `{error, details?}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip)]
    pub status: StatusCode,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            details: None,
            status,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

// Extractor rejections keep axum's status but use the JSON error body.
macro_rules! from_rejection {
    ($($rejection:ty),+ $(,)?) => {$(
        impl From<$rejection> for ApiError {
            fn from(rejection: $rejection) -> Self {
                relay_info!("Rejected request: {}", rejection.body_text());
                Self::new(rejection.status(), rejection.body_text())
            }
        }
    )+};
}

from_rejection!(
    QueryRejection,
    BytesRejection,
    FormRejection,
    MultipartRejection,
    MultipartError,
);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self {
            error: err.public_message(),
            details: err.details(),
            status: StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
