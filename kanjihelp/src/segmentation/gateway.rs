use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info};

use crate::error::{KanjiError, Result};
use crate::japanese::{annotate, AnnotatedUnit, Token};

use super::analyzer::{Analyzer, AnalyzerBuilder};

type BuildOutcome = std::result::Result<Arc<dyn Analyzer>, String>;
type PendingBuild = Shared<BoxFuture<'static, BuildOutcome>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerStatus {
    Uninitialized,
    Loading,
    Ready,
    Failed { reason: String },
}

/// Owns the process' single segmentation analyzer.
///
/// Cloning the gateway shares the same analyzer. The first call to
/// [`initialize`](Self::initialize) starts the build; every concurrent or
/// later caller awaits that same build instead of starting another.
#[derive(Clone)]
pub struct SegmentationGateway {
    builder: Arc<dyn AnalyzerBuilder>,
    build: Arc<Mutex<Option<PendingBuild>>>,
}

impl SegmentationGateway {
    pub fn new(builder: Arc<dyn AnalyzerBuilder>) -> Self {
        Self {
            builder,
            build: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the analyzer build if needed and wait for its outcome.
    pub async fn initialize(&self) -> Result<()> {
        let pending = self.pending_or_start()?;
        pending.await.map(|_| ()).map_err(KanjiError::BuildFailed)
    }

    /// Tokenize `text`.
    ///
    /// Fails with `NotReady` if no build was ever started, waits behind a
    /// build that is still running, and reports `BuildFailed` if the build
    /// failed. A failed build is not retried here; see [`reset`](Self::reset).
    pub async fn segment(&self, text: &str) -> Result<Vec<Token>> {
        if text.is_empty() {
            return Err(KanjiError::Validation("Text cannot be empty".to_string()));
        }

        let pending = self.current()?.ok_or_else(|| {
            KanjiError::NotReady("Segmentation analyzer is not initialized".to_string())
        })?;

        let analyzer = pending.await.map_err(KanjiError::BuildFailed)?;
        let tokens = analyzer.tokenize(text)?;
        debug!(chars = text.chars().count(), tokens = tokens.len(), "Segmented text");
        Ok(tokens)
    }

    /// Segment and annotate in one step.
    pub async fn furigana(&self, text: &str) -> Result<Vec<AnnotatedUnit>> {
        let tokens = self.segment(text).await?;
        Ok(annotate(&tokens))
    }

    /// Forget a failed build so the next `initialize` tries again. A running
    /// or successful build is left untouched. Returns whether anything was
    /// cleared.
    pub fn reset(&self) -> Result<bool> {
        let mut slot = self.lock_slot()?;
        let failed = matches!(
            slot.as_ref().and_then(|pending| pending.peek()),
            Some(Err(_))
        );
        if failed {
            info!(dictionary = %self.builder.describe(), "Clearing failed analyzer build");
            *slot = None;
        }
        Ok(failed)
    }

    pub fn status(&self) -> AnalyzerStatus {
        let Ok(slot) = self.lock_slot() else {
            return AnalyzerStatus::Failed {
                reason: "analyzer state lock poisoned".to_string(),
            };
        };
        match slot.as_ref() {
            None => AnalyzerStatus::Uninitialized,
            Some(pending) => match pending.peek() {
                None => AnalyzerStatus::Loading,
                Some(Ok(_)) => AnalyzerStatus::Ready,
                Some(Err(reason)) => AnalyzerStatus::Failed {
                    reason: reason.clone(),
                },
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == AnalyzerStatus::Ready
    }

    fn current(&self) -> Result<Option<PendingBuild>> {
        Ok(self.lock_slot()?.clone())
    }

    fn pending_or_start(&self) -> Result<PendingBuild> {
        let mut slot = self.lock_slot()?;
        if let Some(pending) = slot.as_ref() {
            return Ok(pending.clone());
        }

        let builder = Arc::clone(&self.builder);
        let pending = async move {
            match builder.build().await {
                Ok(analyzer) => Ok(analyzer),
                Err(e) => {
                    error!(dictionary = %builder.describe(), error = %e, "Analyzer build failed");
                    Err(e.to_string())
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(pending.clone());
        Ok(pending)
    }

    fn lock_slot(&self) -> Result<std::sync::MutexGuard<'_, Option<PendingBuild>>> {
        self.build
            .lock()
            .map_err(|e| KanjiError::Internal(format!("Analyzer state lock poisoned: {e}")))
    }
}
