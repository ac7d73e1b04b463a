//! v1 OCR handler.
//!
//! `POST /api/v1/ocr` recognizes Japanese text in an uploaded image using the
//! pooled engine for the requested writing direction.

use std::time::Duration;

use axum::extract::State;
use tracing::debug;

use crate::api::extractors::AppJson;
use crate::api::v1::dto::{OcrRequest, OcrResponse};
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::AppState;
use crate::error::{KanjiError, Result};
use crate::japanese::clean_recognized_text;
use crate::ocr::{decode_upload, preprocess_image};

/// `POST /api/v1/ocr`
#[utoipa::path(
    post,
    path = "/api/v1/ocr",
    tag = "ocr",
    operation_id = "ocr.recognize",
    request_body = OcrRequest,
    responses(
        (status = 200, description = "Recognized text", body = OcrResponse),
        (status = 400, description = "Unreadable or out-of-bounds image", body = ApiError),
        (status = 503, description = "Recognition backend unavailable", body = ApiError),
        (status = 504, description = "Recognition timed out", body = ApiError),
    )
)]
pub async fn recognize(
    State(state): State<AppState>,
    AppJson(req): AppJson<OcrRequest>,
) -> ApiResponse<OcrResponse> {
    match run_ocr(&state, req).await {
        Ok(response) => ApiResponse::success(response),
        Err(e) => e.into(),
    }
}

async fn run_ocr(state: &AppState, req: OcrRequest) -> Result<OcrResponse> {
    let mode = req.mode();
    let bytes = decode_upload(&req.image)?;

    let ocr_config = state.config.ocr.clone();
    let image = tokio::task::spawn_blocking(move || preprocess_image(&bytes, &ocr_config))
        .await
        .map_err(|e| KanjiError::Internal(format!("Preprocessing task panicked: {e}")))??;

    let handle = state.engines.acquire(mode).await?;
    let limit = Duration::from_secs(state.config.ocr.timeout_secs);
    let raw = state.engines.recognize_within(&handle, &image, limit).await?;

    let text = clean_recognized_text(&raw);
    debug!(%mode, chars = text.chars().count(), "OCR request recognized");

    let furigana = if req.annotate && !text.is_empty() {
        Some(state.segmentation.furigana(&text).await?)
    } else {
        None
    };

    Ok(OcrResponse {
        text,
        mode,
        furigana,
    })
}
