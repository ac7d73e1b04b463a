//! # V1 API Response Envelope & Error Contract
//!
//! Every v1 endpoint answers with an [`ApiResponse<T>`] envelope:
//!
//! ```json
//! {
//!   "data": { ... },                                    // present on success
//!   "error": { "code": "not_ready", "message": "..." }  // present on error
//! }
//! ```
//!
//! Error codes are snake_case strings with a fixed HTTP status each. Clients
//! should branch on `code`, never on `message`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::KanjiError;

/// Machine-readable error code included in every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed body, missing field, or an image that cannot be used. HTTP 400.
    InvalidRequest,
    /// The request does not fit the current state. HTTP 409.
    Conflict,
    /// The dictionary is still loading. Retry later. HTTP 503.
    NotReady,
    /// Recognition did not finish in time. HTTP 504.
    Timeout,
    /// A backend (OCR engine, translation, analyzer) cannot serve the request.
    /// HTTP 503.
    Unavailable,
    /// Unexpected server-side failure. Details are never leaked. HTTP 500.
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::Conflict => write!(f, "conflict"),
            Self::NotReady => write!(f, "not_ready"),
            Self::Timeout => write!(f, "timeout"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

/// Structured error payload within the envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description, safe to show to end users.
    pub message: String,
}

/// Canonical v1 response envelope. Exactly one of `data` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success response with data (HTTP 200).
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => {
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<KanjiError> for ApiResponse<T> {
    /// Backend failures are reported by kind only; their details go to the
    /// log.
    fn from(err: KanjiError) -> Self {
        match err {
            KanjiError::Validation(ref msg) | KanjiError::Processing(ref msg) => {
                ApiResponse::error(ErrorCode::InvalidRequest, msg.clone())
            }

            KanjiError::Json(ref e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }

            KanjiError::InvalidState(ref msg) => ApiResponse::error(ErrorCode::Conflict, msg.clone()),

            KanjiError::NotReady(ref msg) => ApiResponse::error(ErrorCode::NotReady, msg.clone()),

            KanjiError::Timeout { .. } => ApiResponse::error(ErrorCode::Timeout, err.to_string()),

            KanjiError::Unconfigured(ref msg) => {
                ApiResponse::error(ErrorCode::Unavailable, msg.clone())
            }

            ref unavailable @ (KanjiError::BuildFailed(_)
            | KanjiError::DeviceUnavailable(_)
            | KanjiError::RecognitionFailed(_)
            | KanjiError::Provider(_)
            | KanjiError::Http(_)) => {
                tracing::warn!(error = %unavailable, "Backend failure mapped to v1 response");
                let message = match unavailable {
                    KanjiError::BuildFailed(_) => "Dictionary failed to load",
                    KanjiError::DeviceUnavailable(_) => "Capture device could not be opened",
                    KanjiError::RecognitionFailed(_) => "Text recognition failed",
                    _ => "Translation backend request failed",
                };
                ApiResponse::error(ErrorCode::Unavailable, message)
            }

            ref internal @ (KanjiError::Io(_) | KanjiError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to v1 response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}
