//! Japanese text helpers
//!
//! Pure, total functions over text: script classification and conversion of
//! morphological tokens into furigana display units. Nothing here fails or
//! touches shared state.

mod furigana;
mod script;

pub use furigana::{annotate, clean_recognized_text, AnnotatedUnit, Token, NO_READING};
pub use script::{has_kanji, is_kanji, katakana_to_hiragana};
