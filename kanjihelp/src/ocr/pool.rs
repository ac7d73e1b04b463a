use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{KanjiError, Result};

use super::engine::{EngineFactory, RecognitionEngine, RecognitionMode};

struct CachedEngine {
    generation: u64,
    engine: Arc<dyn RecognitionEngine>,
}

/// Proof of ownership for a pooled engine. Only the pool can use it.
pub struct EngineHandle {
    mode: RecognitionMode,
    generation: u64,
    engine: Arc<dyn RecognitionEngine>,
}

impl EngineHandle {
    pub fn mode(&self) -> RecognitionMode {
        self.mode
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("mode", &self.mode)
            .field("generation", &self.generation)
            .finish()
    }
}

/// At most one live engine per [`RecognitionMode`].
///
/// Construction for a mode is serialized by that mode's slot lock, so
/// concurrent `acquire` calls never build two engines for the same mode.
pub struct EnginePool {
    factory: Arc<dyn EngineFactory>,
    slots: [Mutex<Option<CachedEngine>>; 2],
    next_generation: AtomicU64,
}

impl EnginePool {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            slots: [Mutex::new(None), Mutex::new(None)],
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn describe(&self) -> String {
        self.factory.describe()
    }

    pub async fn acquire(&self, mode: RecognitionMode) -> Result<EngineHandle> {
        let mut slot = self.slots[mode.index()].lock().await;

        if let Some(cached) = slot.as_ref() {
            return Ok(EngineHandle {
                mode,
                generation: cached.generation,
                engine: Arc::clone(&cached.engine),
            });
        }

        info!(%mode, backend = %self.factory.describe(), "Creating recognition engine");
        let engine = self.factory.create(mode).await.map_err(|e| match e {
            KanjiError::RecognitionFailed(msg) => KanjiError::RecognitionFailed(msg),
            other => KanjiError::RecognitionFailed(other.to_string()),
        })?;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        *slot = Some(CachedEngine {
            generation,
            engine: Arc::clone(&engine),
        });

        Ok(EngineHandle {
            mode,
            generation,
            engine,
        })
    }

    /// Run recognition with the handle's engine. A failure retires the
    /// engine so the next `acquire` builds a fresh one; it is not retried.
    pub async fn recognize(&self, handle: &EngineHandle, image: &[u8]) -> Result<String> {
        match handle.engine.recognize(image).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(mode = %handle.mode, error = %e, "Recognition failed, retiring engine");
                self.invalidate(handle).await;
                Err(match e {
                    KanjiError::RecognitionFailed(msg) => KanjiError::RecognitionFailed(msg),
                    other => KanjiError::RecognitionFailed(other.to_string()),
                })
            }
        }
    }

    /// [`recognize`](Self::recognize) bounded by `limit`. On expiry the
    /// engine is retired and `Timeout` is returned.
    pub async fn recognize_within(
        &self,
        handle: &EngineHandle,
        image: &[u8],
        limit: Duration,
    ) -> Result<String> {
        match tokio::time::timeout(limit, self.recognize(handle, image)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(mode = %handle.mode, secs = limit.as_secs(), "Recognition timed out");
                self.invalidate(handle).await;
                Err(KanjiError::Timeout {
                    secs: limit.as_secs(),
                })
            }
        }
    }

    /// Tear down the handle's engine. A handle whose engine was already
    /// retired releases nothing.
    pub async fn release(&self, handle: &EngineHandle) {
        debug!(mode = %handle.mode, "Releasing recognition engine");
        self.invalidate(handle).await;
    }

    /// Tear down whatever engine is cached for `mode`. Safe when none is.
    pub async fn terminate(&self, mode: RecognitionMode) {
        let cached = self.slots[mode.index()].lock().await.take();
        if let Some(cached) = cached {
            info!(%mode, "Terminating recognition engine");
            cached.engine.terminate().await;
        }
    }

    pub async fn shutdown(&self) {
        for mode in RecognitionMode::ALL {
            self.terminate(mode).await;
        }
    }

    pub async fn is_warm(&self, mode: RecognitionMode) -> bool {
        self.slots[mode.index()].lock().await.is_some()
    }

    /// Drop the cached engine for the handle's mode if it is still the
    /// handle's engine. A newer engine built after a previous failure is
    /// left alone.
    async fn invalidate(&self, handle: &EngineHandle) {
        let retired = {
            let mut slot = self.slots[handle.mode.index()].lock().await;
            match slot.as_ref() {
                Some(cached) if cached.generation == handle.generation => slot.take(),
                _ => None,
            }
        };
        if let Some(cached) = retired {
            cached.engine.terminate().await;
        }
    }
}
