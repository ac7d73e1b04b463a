use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{KanjiError, Result};

use super::engine::{RecognitionEngine, RecognitionMode};

const DEFAULT_VISION_BASE_URL: &str = "https://vision.googleapis.com/v1";

#[derive(Clone, Debug)]
pub struct VisionApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
    image_context: ImageContext,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    language_hints: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    message: String,
}

impl VisionApiClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            KanjiError::Unconfigured("API key required for Google Vision OCR".to_string())
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_VISION_BASE_URL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KanjiError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn detect_text(&self, image_bytes: &[u8]) -> Result<String> {
        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image_bytes),
                },
                features: vec![Feature {
                    kind: "TEXT_DETECTION",
                }],
                image_context: ImageContext {
                    language_hints: vec!["ja"],
                },
            }],
        };

        let resp = self
            .client
            .post(format!("{}/images:annotate", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| KanjiError::RecognitionFailed(format!("Vision request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(KanjiError::RecognitionFailed(format!(
                "Vision API request failed: {status} - {body}"
            )));
        }

        let annotated: AnnotateResponse = resp.json().await.map_err(|e| {
            KanjiError::RecognitionFailed(format!("Failed to parse Vision response: {e}"))
        })?;

        let Some(first) = annotated.responses.into_iter().next() else {
            return Ok(String::new());
        };
        if let Some(status) = first.error {
            return Err(KanjiError::RecognitionFailed(status.message));
        }

        // The first annotation is the full detected text; the rest are words.
        Ok(first
            .text_annotations
            .into_iter()
            .next()
            .map(|annotation| annotation.description)
            .unwrap_or_default())
    }
}

/// Cloud recognition. The remote service detects orientation itself, so the
/// mode is only carried for logging.
pub struct VisionApiEngine {
    client: VisionApiClient,
    mode: RecognitionMode,
}

impl VisionApiEngine {
    pub fn new(client: VisionApiClient, mode: RecognitionMode) -> Self {
        Self { client, mode }
    }
}

#[async_trait]
impl RecognitionEngine for VisionApiEngine {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        debug!(mode = %self.mode, bytes = image.len(), "Sending image to Vision API");
        self.client.detect_text(image).await
    }

    async fn terminate(&self) {}
}
