use serde::{Deserialize, Serialize};

/// A single word or sentence, or a batch of them.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum TranslateText {
    One(String),
    Many(Vec<String>),
}

impl TranslateText {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(text) => vec![text],
            Self::Many(texts) => texts,
        }
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: TranslateText,
    /// Defaults to `TRANSLATION_SOURCE_LANG`.
    #[serde(default)]
    pub source_lang: Option<String>,
    /// Defaults to `TRANSLATION_TARGET_LANG`.
    #[serde(default)]
    pub target_lang: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TranslatedText {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TranslateResponse {
    /// One entry per input text, in request order.
    pub translations: Vec<TranslatedText>,
}
