use serde::{Deserialize, Serialize};

use crate::japanese::AnnotatedUnit;

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct TokenizeRequest {
    /// Japanese text to segment. Must not be blank.
    pub text: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TokenizeResponse {
    /// One entry per token, in input order. Concatenating every `text`
    /// reproduces the input.
    pub furigana: Vec<AnnotatedUnit>,
}
