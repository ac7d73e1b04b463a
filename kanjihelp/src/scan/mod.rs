//! Scan sessions
//!
//! [`ScanOrchestrator`] ties a capture device, the engine pool and the
//! segmentation gateway together for single-shot and continuous scanning.

mod gate;
mod orchestrator;
mod result;

pub use gate::{TickGate, TickPermit};
pub use orchestrator::{ScanOrchestrator, ScanSettings, ScanState};
pub use result::{ScanResult, ScanStatus, SeenTextSet};
