use std::sync::Arc;

use async_trait::async_trait;
use leptess::{LepTess, Variable};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{parse_ocr_provider_model, OcrConfig};
use crate::error::{KanjiError, Result};

use super::api::{VisionApiClient, VisionApiEngine};
use super::engine::{EngineFactory, RecognitionEngine, RecognitionMode};

/// Local Tesseract engine. Each instance owns one configured `LepTess`.
pub struct TesseractEngine {
    tesseract: Arc<Mutex<LepTess>>,
    mode: RecognitionMode,
}

fn create_tesseract(
    data_path: Option<&str>,
    language: &str,
    mode: RecognitionMode,
) -> std::result::Result<LepTess, String> {
    let mut lt = LepTess::new(data_path, language).map_err(|e| e.to_string())?;
    lt.set_variable(Variable::TesseditPagesegMode, mode.page_segmentation_mode())
        .map_err(|e| e.to_string())?;
    Ok(lt)
}

impl TesseractEngine {
    pub async fn create(
        data_path: Option<String>,
        language: String,
        mode: RecognitionMode,
    ) -> Result<Self> {
        let lt = tokio::task::spawn_blocking(move || {
            create_tesseract(data_path.as_deref(), &language, mode)
        })
        .await
        .map_err(|e| KanjiError::RecognitionFailed(format!("Tesseract init panicked: {e}")))?
        .map_err(|e| KanjiError::RecognitionFailed(format!("Tesseract not available: {e}")))?;

        Ok(Self {
            tesseract: Arc::new(Mutex::new(lt)),
            mode,
        })
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        let bytes = image.to_vec();
        let tesseract = Arc::clone(&self.tesseract);

        tokio::task::spawn_blocking(move || {
            let mut lt = tesseract.blocking_lock();
            lt.set_image_from_mem(&bytes).map_err(|e| {
                KanjiError::RecognitionFailed(format!("Failed to set image: {e}"))
            })?;
            lt.get_utf8_text().map_err(|e| {
                KanjiError::RecognitionFailed(format!("Failed to extract text: {e}"))
            })
        })
        .await
        .map_err(|e| KanjiError::RecognitionFailed(format!("OCR task panicked: {e}")))?
    }

    async fn terminate(&self) {
        debug!(mode = %self.mode, "Tesseract engine released");
    }
}

enum OcrBackend {
    Local,
    Vision { client: VisionApiClient },
    Unavailable { reason: String },
}

/// Builds engines for the backend selected by `OCR_MODEL`.
pub struct OcrEngineFactory {
    backend: OcrBackend,
    config: OcrConfig,
}

impl OcrEngineFactory {
    pub fn new(config: &OcrConfig) -> Self {
        let (provider, _model) = parse_ocr_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "google" => match VisionApiClient::new(config) {
                Ok(client) => {
                    info!("Google Vision OCR backend initialized");
                    OcrBackend::Vision { client }
                }
                Err(e) => {
                    let reason = format!("Google Vision OCR backend unavailable: {e}");
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
            _ => {
                info!(
                    horizontal = %config.horizontal_language,
                    vertical = %config.vertical_language,
                    "Tesseract OCR backend selected"
                );
                OcrBackend::Local
            }
        };

        Self {
            backend,
            config: config.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    fn language_for(&self, mode: RecognitionMode) -> &str {
        match mode {
            RecognitionMode::Horizontal => &self.config.horizontal_language,
            RecognitionMode::Vertical => &self.config.vertical_language,
        }
    }
}

#[async_trait]
impl EngineFactory for OcrEngineFactory {
    async fn create(&self, mode: RecognitionMode) -> Result<Arc<dyn RecognitionEngine>> {
        match &self.backend {
            OcrBackend::Local => {
                let language = self.language_for(mode).to_string();
                let engine =
                    TesseractEngine::create(self.config.data_path.clone(), language, mode).await?;
                info!(%mode, language = %self.language_for(mode), "Tesseract engine ready");
                Ok(Arc::new(engine))
            }
            OcrBackend::Vision { client } => {
                Ok(Arc::new(VisionApiEngine::new(client.clone(), mode)))
            }
            OcrBackend::Unavailable { reason } => {
                Err(KanjiError::RecognitionFailed(reason.clone()))
            }
        }
    }

    fn describe(&self) -> String {
        match &self.backend {
            OcrBackend::Local => "local/tesseract".to_string(),
            OcrBackend::Vision { .. } => "google/vision".to_string(),
            OcrBackend::Unavailable { reason } => format!("unavailable ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(model: &str, api_key: Option<&str>) -> OcrConfig {
        OcrConfig {
            model: model.to_string(),
            api_key: api_key.map(String::from),
            ..OcrConfig::default()
        }
    }

    #[test]
    fn test_google_model_without_api_key_is_unavailable() {
        let factory = OcrEngineFactory::new(&make_config("google/vision", None));
        assert!(!factory.is_available());
        assert!(factory.describe().starts_with("unavailable"));
    }

    #[test]
    fn test_google_model_with_api_key_routes_to_vision() {
        let factory = OcrEngineFactory::new(&make_config("google/vision", Some("key")));
        assert!(factory.is_available());
        assert_eq!(factory.describe(), "google/vision");
    }

    #[test]
    fn test_local_and_unknown_models_route_to_tesseract() {
        for model in ["local/tesseract", "tesseract", "acme/ocr"] {
            let factory = OcrEngineFactory::new(&make_config(model, None));
            assert!(factory.is_available(), "{model}");
            assert_eq!(factory.describe(), "local/tesseract");
        }
    }

    #[test]
    fn test_language_per_mode() {
        let factory = OcrEngineFactory::new(&make_config("local/tesseract", None));
        assert_eq!(factory.language_for(RecognitionMode::Horizontal), "jpn");
        assert_eq!(factory.language_for(RecognitionMode::Vertical), "jpn_vert");
    }

    #[tokio::test]
    async fn test_unavailable_backend_fails_at_create() {
        let factory = OcrEngineFactory::new(&make_config("google/vision", None));
        let result = factory.create(RecognitionMode::Horizontal).await;
        assert!(matches!(result, Err(KanjiError::RecognitionFailed(_))));
    }

    #[tokio::test]
    async fn test_missing_traineddata_fails_without_panic() {
        let config = OcrConfig {
            data_path: Some("/nonexistent/tessdata".to_string()),
            ..make_config("local/tesseract", None)
        };
        let factory = OcrEngineFactory::new(&config);
        let result = factory.create(RecognitionMode::Vertical).await;
        assert!(matches!(result, Err(KanjiError::RecognitionFailed(_))));
    }
}
