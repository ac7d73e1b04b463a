//! Text recognition
//!
//! Engines are configured per [`RecognitionMode`] and pooled by
//! [`EnginePool`], which builds at most one engine per mode and retires an
//! engine as soon as it fails.
//!
//! Backends, selected by `OCR_MODEL`:
//! - `local/tesseract`: Tesseract via leptess (`jpn` / `jpn_vert`)
//! - `google/vision`: Google Cloud Vision `TEXT_DETECTION`
//!
//! ```rust,ignore
//! let pool = EnginePool::new(Arc::new(OcrEngineFactory::new(&config.ocr)));
//! let handle = pool.acquire(RecognitionMode::Vertical).await?;
//! let text = pool.recognize(&handle, &png_bytes).await?;
//! ```

mod api;
mod engine;
mod pool;
mod preprocessing;
mod provider;

pub use api::{VisionApiClient, VisionApiEngine};
pub use engine::{EngineFactory, RecognitionEngine, RecognitionMode};
pub use pool::{EngineHandle, EnginePool};
pub use preprocessing::{decode_upload, preprocess_image};
pub use provider::{OcrEngineFactory, TesseractEngine};
