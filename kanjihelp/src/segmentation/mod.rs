//! Morphological segmentation
//!
//! A single process-wide analyzer built lazily from a compiled IPADIC
//! dictionary, behind a gateway that guarantees at most one build at a time.

mod analyzer;
mod gateway;

pub use analyzer::{
    reading_from_feature, Analyzer, AnalyzerBuilder, DictionaryFileBuilder, VibratoAnalyzer,
};
pub use gateway::{AnalyzerStatus, SegmentationGateway};
