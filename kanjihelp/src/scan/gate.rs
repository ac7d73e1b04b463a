use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admits one tick at a time. A tick that finds the gate occupied is
/// skipped, never queued.
#[derive(Debug, Clone)]
pub struct TickGate {
    slot: Arc<Semaphore>,
}

/// Held for the duration of a tick; dropping it reopens the gate.
#[derive(Debug)]
pub struct TickPermit {
    _permit: OwnedSemaphorePermit,
}

impl Default for TickGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TickGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn try_enter(&self) -> Option<TickPermit> {
        Arc::clone(&self.slot)
            .try_acquire_owned()
            .ok()
            .map(|permit| TickPermit { _permit: permit })
    }

    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }
}
