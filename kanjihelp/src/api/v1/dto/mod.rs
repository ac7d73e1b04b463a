//! v1 API Data Transfer Objects.
//!
//! Wire types only. Domain types such as [`AnnotatedUnit`](crate::japanese::AnnotatedUnit)
//! are embedded directly where their serialized shape already matches.

pub mod ocr;
pub mod tokenize;
pub mod translate;

pub use ocr::*;
pub use tokenize::*;
pub use translate::*;
