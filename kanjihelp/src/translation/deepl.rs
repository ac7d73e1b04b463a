use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::TranslationConfig;
use crate::error::{KanjiError, Result};

#[derive(Clone, Debug)]
pub struct DeepLClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a [String],
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

impl DeepLClient {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| KanjiError::Unconfigured("DEEPL_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KanjiError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Translate every entry of `texts`. The output has one entry per input,
    /// in the same order.
    pub async fn translate(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>> {
        let request = TranslateRequest {
            text: texts,
            source_lang,
            target_lang,
        };

        let resp = self
            .client
            .post(format!("{}/translate", self.base_url))
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| KanjiError::Provider(format!("DeepL request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(KanjiError::Provider(format!(
                "DeepL request failed: {status} - {body}"
            )));
        }

        let parsed: TranslateResponse = resp
            .json()
            .await
            .map_err(|e| KanjiError::Provider(format!("Failed to parse DeepL response: {e}")))?;

        if parsed.translations.len() != texts.len() {
            return Err(KanjiError::Provider(format!(
                "DeepL returned {} translations for {} texts",
                parsed.translations.len(),
                texts.len()
            )));
        }

        debug!(count = texts.len(), source_lang, target_lang, "Translated texts");
        Ok(parsed.translations.into_iter().map(|t| t.text).collect())
    }
}
