use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

/// Base64 image uploads are roughly a third larger than the image itself.
const OCR_BODY_LIMIT: usize = 16 * 1024 * 1024;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .route("/tokenize", post(handlers::tokenize::tokenize))
        .route(
            "/ocr",
            post(handlers::ocr::recognize).layer(DefaultBodyLimit::max(OCR_BODY_LIMIT)),
        )
        .route("/translate", post(handlers::translate::translate))
}
