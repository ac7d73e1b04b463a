//! Furigana annotation and Japanese text capture.
//!
//! The crate segments Japanese text into furigana display units, recognizes
//! text in captured frames or uploaded images, and drives single-shot and
//! continuous scan sessions over a capture device. The `api` module exposes
//! the same operations over HTTP.

pub mod api;
pub mod capture;
pub mod config;
pub mod error;
pub mod japanese;
pub mod ocr;
pub mod scan;
pub mod segmentation;
pub mod translation;
