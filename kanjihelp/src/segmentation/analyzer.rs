use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vibrato::{Dictionary, Tokenizer};

use crate::error::{KanjiError, Result};
use crate::japanese::Token;

/// Position of the katakana reading in an IPADIC feature string
/// (`品詞,細分類1,細分類2,細分類3,活用型,活用形,原形,読み,発音`).
const IPADIC_READING_FIELD: usize = 7;

/// A ready morphological analyzer. Shared read-only between callers.
pub trait Analyzer: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>>;
}

/// Builds an [`Analyzer`] from its dictionary resource. Construction is
/// expensive and happens at most once per successful gateway init.
#[async_trait]
pub trait AnalyzerBuilder: Send + Sync {
    async fn build(&self) -> Result<Arc<dyn Analyzer>>;

    fn describe(&self) -> String;
}

pub struct VibratoAnalyzer {
    tokenizer: Tokenizer,
}

impl VibratoAnalyzer {
    pub fn from_dictionary(dictionary: Dictionary) -> Self {
        Self {
            tokenizer: Tokenizer::new(dictionary),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            KanjiError::BuildFailed(format!("Cannot open dictionary {}: {e}", path.display()))
        })?;

        let is_compressed = path.extension().is_some_and(|ext| ext == "zst");
        let dictionary = if is_compressed {
            let decoder = zstd::Decoder::new(file).map_err(|e| {
                KanjiError::BuildFailed(format!("Cannot decompress dictionary: {e}"))
            })?;
            Dictionary::read(decoder)
        } else {
            Dictionary::read(BufReader::new(file))
        }
        .map_err(|e| KanjiError::BuildFailed(format!("Invalid dictionary: {e}")))?;

        Ok(Self::from_dictionary(dictionary))
    }
}

impl Analyzer for VibratoAnalyzer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let mut worker = self.tokenizer.new_worker();
        worker.reset_sentence(text);
        worker.tokenize();

        Ok(worker
            .token_iter()
            .map(|token| Token {
                surface: token.surface().to_string(),
                reading: reading_from_feature(token.feature()),
            })
            .collect())
    }
}

/// Extract the reading from an IPADIC feature string. Unknown words carry
/// fewer fields and yield `None`.
pub fn reading_from_feature(feature: &str) -> Option<String> {
    feature
        .split(',')
        .nth(IPADIC_READING_FIELD)
        .map(str::trim)
        .filter(|reading| !reading.is_empty())
        .map(str::to_string)
}

/// Loads a compiled dictionary from disk on the blocking pool.
pub struct DictionaryFileBuilder {
    path: PathBuf,
}

impl DictionaryFileBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AnalyzerBuilder for DictionaryFileBuilder {
    async fn build(&self) -> Result<Arc<dyn Analyzer>> {
        let path = self.path.clone();
        info!(dictionary = %path.display(), "Loading segmentation dictionary");

        let analyzer = tokio::task::spawn_blocking(move || VibratoAnalyzer::load(&path))
            .await
            .map_err(|e| KanjiError::BuildFailed(format!("Dictionary loader panicked: {e}")))??;

        info!("Segmentation dictionary ready");
        Ok(Arc::new(analyzer))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
