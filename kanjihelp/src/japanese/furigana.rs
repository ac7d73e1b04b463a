use serde::{Deserialize, Serialize};

use super::script::{has_kanji, katakana_to_hiragana};

/// Placeholder the analyzer emits when it has no reading for a token.
pub const NO_READING: &str = "*";

/// One morphological token as produced by the segmentation analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub surface: String,
    pub reading: Option<String>,
}

impl Token {
    pub fn new(surface: impl Into<String>, reading: Option<&str>) -> Self {
        Self {
            surface: surface.into(),
            reading: reading.map(str::to_string),
        }
    }

    fn known_reading(&self) -> Option<&str> {
        self.reading
            .as_deref()
            .filter(|reading| !reading.is_empty() && *reading != NO_READING)
    }
}

/// Display unit for ruby rendering.
///
/// `reading` is `Some` exactly when `has_kanji` is true and the analyzer knew
/// the reading; it is always hiragana.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedUnit {
    pub text: String,
    pub reading: Option<String>,
    pub has_kanji: bool,
}

impl AnnotatedUnit {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            reading: None,
            has_kanji: false,
        }
    }
}

/// Convert tokens into display units, one per token, in order.
///
/// Tokens are never dropped or merged, so joining the `text` fields gives
/// back the analyzed input.
pub fn annotate(tokens: &[Token]) -> Vec<AnnotatedUnit> {
    tokens
        .iter()
        .map(|token| match token.known_reading() {
            Some(reading) if has_kanji(&token.surface) => AnnotatedUnit {
                text: token.surface.clone(),
                reading: Some(katakana_to_hiragana(reading)),
                has_kanji: true,
            },
            _ => AnnotatedUnit::plain(&token.surface),
        })
        .collect()
}

/// Strip every whitespace character, including line breaks OCR engines
/// insert between text lines.
pub fn clean_recognized_text(raw: &str) -> String {
    raw.chars().filter(|ch| !ch.is_whitespace()).collect()
}
