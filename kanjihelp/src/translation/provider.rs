use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TranslationConfig;
use crate::error::{KanjiError, Result};
use crate::scan::ScanResult;

use super::cache::WordTranslationCache;
use super::deepl::DeepLClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WordTranslation {
    pub text: String,
    pub reading: Option<String>,
    pub translation: String,
}

#[derive(Clone)]
enum TranslationBackend {
    DeepL(DeepLClient),
    Unavailable { reason: String },
}

#[derive(Clone)]
pub struct TranslationProvider {
    backend: TranslationBackend,
    cache: WordTranslationCache,
    config: TranslationConfig,
}

impl TranslationProvider {
    pub fn new(config: &TranslationConfig) -> Self {
        let backend = match DeepLClient::new(config) {
            Ok(client) => {
                info!(base_url = %config.base_url, "DeepL translation backend initialized");
                TranslationBackend::DeepL(client)
            }
            Err(e) => {
                let reason = format!("Translation unavailable: {e}");
                warn!("{}", reason);
                TranslationBackend::Unavailable { reason }
            }
        };

        Self {
            backend,
            cache: WordTranslationCache::new(config.cache_size),
            config: config.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, TranslationBackend::Unavailable { .. })
    }

    pub fn cache(&self) -> &WordTranslationCache {
        &self.cache
    }

    /// Translate `texts`, one output per input in order. Language codes fall
    /// back to the configured pair.
    pub async fn translate(
        &self,
        texts: &[String],
        source_lang: Option<&str>,
        target_lang: Option<&str>,
    ) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let source = source_lang.unwrap_or(&self.config.source_lang);
        let target = target_lang.unwrap_or(&self.config.target_lang);

        match &self.backend {
            TranslationBackend::DeepL(client) => client.translate(texts, source, target).await,
            TranslationBackend::Unavailable { reason } => {
                Err(KanjiError::Unconfigured(reason.clone()))
            }
        }
    }

    /// Translate one word, going through the word cache.
    pub async fn translate_word(
        &self,
        word: &str,
        source_lang: Option<&str>,
        target_lang: Option<&str>,
    ) -> Result<String> {
        let source = source_lang.unwrap_or(&self.config.source_lang);
        let target = target_lang.unwrap_or(&self.config.target_lang);

        if let Some(hit) = self.cache.get(source, target, word) {
            return Ok(hit);
        }

        let translated = self
            .translate(&[word.to_string()], Some(source), Some(target))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| KanjiError::Provider("Empty translation response".to_string()))?;

        self.cache.put(source, target, word, translated.clone());
        Ok(translated)
    }

    /// Translate the kanji words of a scan result in one batch, reusing
    /// cached words. Failures are logged and leave the affected words out;
    /// this never fails the scan.
    pub async fn enrich(&self, result: &ScanResult) -> Vec<WordTranslation> {
        let source = self.config.source_lang.as_str();
        let target = self.config.target_lang.as_str();

        let mut words: Vec<(&str, Option<&str>)> = Vec::new();
        for unit in result.furigana.iter().filter(|unit| unit.has_kanji) {
            if !words.iter().any(|(text, _)| *text == unit.text) {
                words.push((unit.text.as_str(), unit.reading.as_deref()));
            }
        }

        let misses: Vec<String> = words
            .iter()
            .filter(|(text, _)| self.cache.get(source, target, text).is_none())
            .map(|(text, _)| text.to_string())
            .collect();

        if !misses.is_empty() {
            match self.translate(&misses, Some(source), Some(target)).await {
                Ok(translations) => {
                    for (word, translation) in misses.iter().zip(translations) {
                        self.cache.put(source, target, word, translation);
                    }
                }
                Err(e) => warn!(result_id = result.id, error = %e, "Word translation failed"),
            }
        }

        words
            .into_iter()
            .filter_map(|(text, reading)| {
                self.cache
                    .get(source, target, text)
                    .map(|translation| WordTranslation {
                        text: text.to_string(),
                        reading: reading.map(str::to_string),
                        translation,
                    })
            })
            .collect()
    }
}
