use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;
use crate::ocr::RecognitionMode;
use crate::segmentation::AnalyzerStatus;

/// Health data returned inside the v1 envelope.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub segmentation: SegmentationStatus,
    pub ocr: OcrStatus,
    pub translation: TranslationStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SegmentationStatus {
    /// `uninitialized`, `loading`, `ready` or `failed`.
    pub status: String,
    pub dictionary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OcrStatus {
    pub backend: String,
    /// Modes with an engine already built.
    pub warm_modes: Vec<RecognitionMode>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TranslationStatus {
    pub status: String,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let dictionary = state.config.segmentation.dictionary_path.clone();
    let segmentation = match state.segmentation.status() {
        AnalyzerStatus::Uninitialized => SegmentationStatus {
            status: "uninitialized".to_string(),
            dictionary,
            reason: None,
        },
        AnalyzerStatus::Loading => SegmentationStatus {
            status: "loading".to_string(),
            dictionary,
            reason: None,
        },
        AnalyzerStatus::Ready => SegmentationStatus {
            status: "ready".to_string(),
            dictionary,
            reason: None,
        },
        AnalyzerStatus::Failed { reason } => SegmentationStatus {
            status: "failed".to_string(),
            dictionary,
            reason: Some(reason),
        },
    };

    let mut warm_modes = Vec::new();
    for mode in RecognitionMode::ALL {
        if state.engines.is_warm(mode).await {
            warm_modes.push(mode);
        }
    }

    let translation = TranslationStatus {
        status: if state.translation.is_available() {
            "available".to_string()
        } else {
            "unavailable".to_string()
        },
    };

    let status = if segmentation.status == "ready" {
        "ok"
    } else {
        "degraded"
    };

    ApiResponse::success(HealthData {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        segmentation,
        ocr: OcrStatus {
            backend: state.engines.describe(),
            warm_modes,
        },
        translation,
    })
}
