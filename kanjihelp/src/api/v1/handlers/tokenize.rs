//! v1 Tokenize handler.
//!
//! `POST /api/v1/tokenize` segments Japanese text and returns furigana units.

use axum::extract::State;

use crate::api::extractors::AppJson;
use crate::api::v1::dto::{TokenizeRequest, TokenizeResponse};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::segmentation::AnalyzerStatus;

/// `POST /api/v1/tokenize`
///
/// Answers `not_ready` while the dictionary is still loading rather than
/// holding the request open.
#[utoipa::path(
    post,
    path = "/api/v1/tokenize",
    tag = "furigana",
    operation_id = "furigana.tokenize",
    request_body = TokenizeRequest,
    responses(
        (status = 200, description = "Furigana units in input order", body = TokenizeResponse),
        (status = 400, description = "Missing or blank text", body = ApiError),
        (status = 503, description = "Dictionary still loading or failed to load", body = ApiError),
    )
)]
pub async fn tokenize(
    State(state): State<AppState>,
    AppJson(req): AppJson<TokenizeRequest>,
) -> ApiResponse<TokenizeResponse> {
    if req.text.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Text cannot be empty");
    }

    if matches!(
        state.segmentation.status(),
        AnalyzerStatus::Uninitialized | AnalyzerStatus::Loading
    ) {
        return ApiResponse::error(
            ErrorCode::NotReady,
            "Dictionary is still loading, retry shortly",
        );
    }

    match state.segmentation.furigana(&req.text).await {
        Ok(furigana) => ApiResponse::success(TokenizeResponse { furigana }),
        Err(e) => e.into(),
    }
}
