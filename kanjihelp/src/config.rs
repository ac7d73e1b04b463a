use serde::Deserialize;
use std::env;
use std::time::Duration;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

/// Treat an empty variable the same as an unset one.
fn env_non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub segmentation: SegmentationConfig,
    pub ocr: OcrConfig,
    pub capture: CaptureConfig,
    pub translation: TranslationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    /// Compiled IPADIC-compatible dictionary. Paths ending in `.zst` are
    /// decompressed while loading.
    pub dictionary_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Tesseract tessdata directory; `None` uses the system default.
    pub data_path: Option<String>,
    pub horizontal_language: String,
    pub vertical_language: String,
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
    /// Build both engines at server start instead of on first request.
    pub warm_start: bool,
}

/// Frame capture and polling behavior. The contrast and size values are
/// tuning knobs, not part of any wire contract.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    pub poll_interval_ms: u64,
    pub analyze_timeout_secs: u64,
    pub contrast: f32,
    pub grayscale: bool,
    pub max_dimension: Option<u32>,
    pub min_text_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub source_lang: String,
    pub target_lang: String,
    pub timeout_secs: u64,
    pub cache_size: usize,
}

impl CaptureConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn analyze_timeout(&self) -> Duration {
        Duration::from_secs(self.analyze_timeout_secs)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            analyze_timeout_secs: 30,
            contrast: 1.5,
            grayscale: true,
            max_dimension: Some(1280),
            min_text_chars: 2,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model: "local/tesseract".to_string(),
            api_key: None,
            base_url: None,
            data_path: None,
            horizontal_language: "jpn".to_string(),
            vertical_language: "jpn_vert".to_string(),
            timeout_secs: 30,
            max_image_dimension: 4096,
            min_image_dimension: 16,
            warm_start: true,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api-free.deepl.com/v2".to_string(),
            source_lang: "JA".to_string(),
            target_lang: "EN".to_string(),
            timeout_secs: 30,
            cache_size: 512,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let ocr_defaults = OcrConfig::default();
        let capture_defaults = CaptureConfig::default();
        let translation_defaults = TranslationConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("KANJIHELP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("KANJIHELP_PORT", 3001),
            },
            segmentation: SegmentationConfig {
                dictionary_path: env::var("SEGMENTATION_DICTIONARY")
                    .unwrap_or_else(|_| "dict/ipadic/system.dic.zst".to_string()),
            },
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or(ocr_defaults.model),
                api_key: env_non_empty("OCR_API_KEY"),
                base_url: env_non_empty("OCR_BASE_URL"),
                data_path: env_non_empty("OCR_DATA_PATH"),
                horizontal_language: env::var("OCR_HORIZONTAL_LANGUAGE")
                    .unwrap_or(ocr_defaults.horizontal_language),
                vertical_language: env::var("OCR_VERTICAL_LANGUAGE")
                    .unwrap_or(ocr_defaults.vertical_language),
                timeout_secs: parse_env_or("OCR_TIMEOUT", ocr_defaults.timeout_secs),
                max_image_dimension: parse_env_or(
                    "OCR_MAX_DIMENSION",
                    ocr_defaults.max_image_dimension,
                ),
                min_image_dimension: parse_env_or(
                    "OCR_MIN_DIMENSION",
                    ocr_defaults.min_image_dimension,
                ),
                warm_start: parse_env_or("OCR_WARM_START", ocr_defaults.warm_start),
            },
            capture: CaptureConfig {
                poll_interval_ms: parse_env_or(
                    "CAPTURE_POLL_INTERVAL_MS",
                    capture_defaults.poll_interval_ms,
                ),
                analyze_timeout_secs: parse_env_or(
                    "CAPTURE_ANALYZE_TIMEOUT",
                    capture_defaults.analyze_timeout_secs,
                ),
                contrast: parse_env_or("CAPTURE_CONTRAST", capture_defaults.contrast),
                grayscale: parse_env_or("CAPTURE_GRAYSCALE", capture_defaults.grayscale),
                max_dimension: match env::var("CAPTURE_MAX_DIMENSION") {
                    // "0" disables downscaling
                    Ok(_) => parse_env_opt::<u32>("CAPTURE_MAX_DIMENSION").filter(|d| *d > 0),
                    Err(_) => capture_defaults.max_dimension,
                },
                min_text_chars: parse_env_or(
                    "CAPTURE_MIN_TEXT_CHARS",
                    capture_defaults.min_text_chars,
                ),
            },
            translation: TranslationConfig {
                api_key: env_non_empty("DEEPL_API_KEY"),
                base_url: env::var("DEEPL_BASE_URL").unwrap_or(translation_defaults.base_url),
                source_lang: env::var("TRANSLATION_SOURCE_LANG")
                    .unwrap_or(translation_defaults.source_lang),
                target_lang: env::var("TRANSLATION_TARGET_LANG")
                    .unwrap_or(translation_defaults.target_lang),
                timeout_secs: parse_env_or(
                    "TRANSLATION_TIMEOUT",
                    translation_defaults.timeout_secs,
                ),
                cache_size: parse_env_or("TRANSLATION_CACHE_SIZE", translation_defaults.cache_size),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known OCR providers, selected by the prefix of `OCR_MODEL`.
pub const KNOWN_OCR_PROVIDERS: &[&str] = &["local", "google"];

/// Parse an OCR model name into (provider, model) tuple.
pub fn parse_ocr_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_OCR_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}
