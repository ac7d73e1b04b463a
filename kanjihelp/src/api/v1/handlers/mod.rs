pub(crate) mod health;
pub mod ocr;
pub mod tokenize;
pub mod translate;

pub use health::health_check;
