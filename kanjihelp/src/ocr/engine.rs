use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Text orientation an engine is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionMode {
    Horizontal,
    Vertical,
}

impl RecognitionMode {
    pub const ALL: [RecognitionMode; 2] = [RecognitionMode::Horizontal, RecognitionMode::Vertical];

    /// Tesseract page segmentation mode: 6 is a single uniform block of
    /// text, 5 a single uniform block of vertically aligned text.
    pub fn page_segmentation_mode(self) -> &'static str {
        match self {
            RecognitionMode::Horizontal => "6",
            RecognitionMode::Vertical => "5",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            RecognitionMode::Horizontal => 0,
            RecognitionMode::Vertical => 1,
        }
    }
}

impl fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionMode::Horizontal => write!(f, "horizontal"),
            RecognitionMode::Vertical => write!(f, "vertical"),
        }
    }
}

/// A live recognition engine configured for one mode.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Recognize text in an encoded image (PNG or any format the backend
    /// accepts). Returns the raw text, line breaks included.
    async fn recognize(&self, image: &[u8]) -> Result<String>;

    /// Free backend resources. Called at most once by the pool.
    async fn terminate(&self);
}

#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(&self, mode: RecognitionMode) -> Result<Arc<dyn RecognitionEngine>>;

    fn describe(&self) -> String;
}
