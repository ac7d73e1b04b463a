use serde::{Deserialize, Serialize};

use crate::japanese::AnnotatedUnit;
use crate::ocr::RecognitionMode;

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OcrRequest {
    /// PNG/JPEG upload as a `data:` URL or bare base64.
    pub image: String,
    /// Recognize vertical (top-to-bottom) text.
    #[serde(default)]
    pub vertical: bool,
    /// Also return furigana for the recognized text.
    #[serde(default)]
    pub annotate: bool,
}

impl OcrRequest {
    pub fn mode(&self) -> RecognitionMode {
        if self.vertical {
            RecognitionMode::Vertical
        } else {
            RecognitionMode::Horizontal
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    /// Recognized text with all whitespace removed. Empty when nothing was
    /// detected.
    pub text: String,
    pub mode: RecognitionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub furigana: Option<Vec<AnnotatedUnit>>,
}
