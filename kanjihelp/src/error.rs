use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::v1::response::ApiResponse;

#[derive(Error, Debug)]
pub enum KanjiError {
    /// A dependency has not finished initializing yet. Retry later.
    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Analyzer build failed: {0}")]
    BuildFailed(String),

    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("Operation timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider not configured: {0}")]
    Unconfigured(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KanjiError {
    /// Message shown to the reader. Each variant that needs a different
    /// corrective action gets its own wording.
    pub fn user_message(&self) -> &'static str {
        match self {
            KanjiError::DeviceUnavailable(_) => "カメラを　ひらけませんでした",
            KanjiError::Timeout { .. } => "じかんが　かかりすぎました。もういちど　ためしてね",
            KanjiError::RecognitionFailed(_) => "もじを　よみとれませんでした",
            KanjiError::NotReady(_) => "じゅんびちゅうです。すこし　まってね",
            KanjiError::Provider(_) | KanjiError::Unconfigured(_) | KanjiError::Http(_) => {
                "ほんやくに　しっぱいしました"
            }
            _ => "エラーが　おきました",
        }
    }

    /// True for failures the continuous scan loop downgrades to "no detection".
    pub fn is_tick_recoverable(&self) -> bool {
        matches!(
            self,
            KanjiError::RecognitionFailed(_)
                | KanjiError::Timeout { .. }
                | KanjiError::NotReady(_)
                | KanjiError::BuildFailed(_)
                | KanjiError::Processing(_)
                | KanjiError::Provider(_)
        )
    }
}

impl IntoResponse for KanjiError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, KanjiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_timeout_and_device_messages_differ() {
        let timeout = KanjiError::Timeout { secs: 30 };
        let device = KanjiError::DeviceUnavailable("permission denied".to_string());
        let recognition = KanjiError::RecognitionFailed("engine crashed".to_string());

        assert_ne!(timeout.user_message(), device.user_message());
        assert_ne!(timeout.user_message(), recognition.user_message());
        assert_ne!(device.user_message(), recognition.user_message());
    }

    #[test]
    fn test_timeout_display_includes_duration() {
        let err = KanjiError::Timeout { secs: 30 };
        assert_eq!(err.to_string(), "Operation timed out after 30 seconds");
    }

    #[test]
    fn test_tick_recoverable_classification() {
        assert!(KanjiError::RecognitionFailed("x".into()).is_tick_recoverable());
        assert!(KanjiError::NotReady("x".into()).is_tick_recoverable());
        assert!(!KanjiError::DeviceUnavailable("x".into()).is_tick_recoverable());
        assert!(!KanjiError::InvalidState("x".into()).is_tick_recoverable());
    }

    #[test]
    fn test_into_response_status_codes() {
        let response = KanjiError::NotReady("loading".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = KanjiError::Validation("missing text".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = KanjiError::Timeout { secs: 5 }.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
