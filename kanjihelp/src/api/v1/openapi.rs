use axum::Json;
use utoipa::OpenApi;

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kanjihelp API",
        version = "1.0.0",
        description = "Furigana annotation, Japanese OCR and word translation for early readers.",
    ),
    paths(
        handlers::health::health_check,
        handlers::tokenize::tokenize,
        handlers::ocr::recognize,
        handlers::translate::translate,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        // Furigana
        crate::japanese::AnnotatedUnit,
        dto::tokenize::TokenizeRequest,
        dto::tokenize::TokenizeResponse,
        // OCR
        crate::ocr::RecognitionMode,
        dto::ocr::OcrRequest,
        dto::ocr::OcrResponse,
        // Translation
        dto::translate::TranslateText,
        dto::translate::TranslateRequest,
        dto::translate::TranslatedText,
        dto::translate::TranslateResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::SegmentationStatus,
        handlers::health::OcrStatus,
        handlers::health::TranslationStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "furigana", description = "Segmentation and furigana annotation"),
        (name = "ocr", description = "Japanese text recognition from images"),
        (name = "translation", description = "Word and sentence translation"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
