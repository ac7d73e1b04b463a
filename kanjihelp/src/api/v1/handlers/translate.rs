use axum::extract::State;

use crate::api::extractors::AppJson;
use crate::api::v1::dto::{TranslateRequest, TranslateResponse, TranslatedText};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;

/// `POST /api/v1/translate`
///
/// A single text goes through the word cache; a list is sent as one batch.
#[utoipa::path(
    post,
    path = "/api/v1/translate",
    tag = "translation",
    operation_id = "translation.translate",
    request_body = TranslateRequest,
    responses(
        (status = 200, description = "One translation per input text", body = TranslateResponse),
        (status = 400, description = "No text given", body = ApiError),
        (status = 503, description = "Translation backend not configured or failing", body = ApiError),
    )
)]
pub async fn translate(
    State(state): State<AppState>,
    AppJson(req): AppJson<TranslateRequest>,
) -> ApiResponse<TranslateResponse> {
    let source = req.source_lang.as_deref();
    let target = req.target_lang.as_deref();
    let texts = req.text.into_vec();

    if texts.is_empty() || texts.iter().all(|t| t.trim().is_empty()) {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Text cannot be empty");
    }

    let result = match texts.as_slice() {
        [word] => state
            .translation
            .translate_word(word, source, target)
            .await
            .map(|translated| vec![translated]),
        _ => state.translation.translate(&texts, source, target).await,
    };

    match result {
        Ok(translations) => ApiResponse::success(TranslateResponse {
            translations: translations
                .into_iter()
                .map(|text| TranslatedText { text })
                .collect(),
        }),
        Err(e) => e.into(),
    }
}
