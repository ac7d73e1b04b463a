use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use image::RgbaImage;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capture::{encode_png, normalize, CaptureDevice, FrameSource, NormalizeOptions, ScanBox};
use crate::config::CaptureConfig;
use crate::error::{KanjiError, Result};
use crate::japanese::clean_recognized_text;
use crate::ocr::{EngineHandle, EnginePool};
use crate::segmentation::SegmentationGateway;

use super::gate::TickGate;
use super::result::{ScanResult, SeenTextSet};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Streaming,
    Analyzing,
    ContinuousScanning,
    Stopped,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::Streaming => "streaming",
            ScanState::Analyzing => "analyzing",
            ScanState::ContinuousScanning => "continuous scanning",
            ScanState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub scan_box: ScanBox,
    pub normalize: NormalizeOptions,
    pub poll_interval: Duration,
    pub analyze_timeout: Duration,
    /// Shortest text, in characters, a continuous scan reports.
    pub min_text_chars: usize,
}

impl ScanSettings {
    pub fn from_config(config: &CaptureConfig, scan_box: ScanBox) -> Self {
        Self {
            scan_box,
            normalize: NormalizeOptions::from(config),
            poll_interval: config.poll_interval(),
            analyze_timeout: config.analyze_timeout(),
            min_text_chars: config.min_text_chars,
        }
    }
}

struct ScanningSession {
    token: CancellationToken,
    /// Shared with the tick in flight. Taken exactly once when the session
    /// ends; cleared by a tick whose recognition retired the engine.
    handle: Option<Arc<EngineHandle>>,
}

/// A single-shot capture in progress.
struct Analysis {
    epoch: u64,
    token: CancellationToken,
    handle: Option<Arc<EngineHandle>>,
}

struct Session {
    state: ScanState,
    source: Option<Box<dyn FrameSource>>,
    /// Most recent first.
    results: Vec<ScanResult>,
    seen: SeenTextSet,
    scanning: Option<ScanningSession>,
    analyzing: Option<Analysis>,
    /// Bumped by every `capture` so a stale one can tell it lost the session.
    capture_epoch: u64,
    preview: Option<RgbaImage>,
}

impl Session {
    fn end_scanning(&mut self) -> Option<Arc<EngineHandle>> {
        let scanning = self.scanning.take()?;
        scanning.token.cancel();
        scanning.handle
    }

    fn end_analysis(&mut self) -> Option<Arc<EngineHandle>> {
        let analysis = self.analyzing.take()?;
        analysis.token.cancel();
        analysis.handle
    }

    fn owns_analysis(&self, epoch: u64) -> bool {
        self.analyzing
            .as_ref()
            .is_some_and(|analysis| analysis.epoch == epoch)
    }

    fn stop_source(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
    }

    /// The running scan session, if `token` still belongs to it.
    fn active(&mut self, token: &CancellationToken) -> Option<&mut ScanningSession> {
        if token.is_cancelled() {
            return None;
        }
        self.scanning.as_mut()
    }
}

struct Shared {
    device: Arc<dyn CaptureDevice>,
    pool: Arc<EnginePool>,
    gateway: SegmentationGateway,
    settings: ScanSettings,
    session: Mutex<Session>,
    events: broadcast::Sender<ScanResult>,
    gate: TickGate,
}

impl Shared {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, session: &mut Session, result: ScanResult) {
        session.results.insert(0, result.clone());
        // No subscribers is fine
        let _ = self.events.send(result);
    }

    /// Normalize and encode a frame, keeping its preview for display.
    fn prepare(&self, frame: &RgbaImage) -> Result<Vec<u8>> {
        let normalized = normalize(
            frame,
            self.settings.scan_box.region(),
            &self.settings.normalize,
        )?;
        let png = encode_png(&normalized.image)?;
        self.lock_session().preview = Some(normalized.preview);
        Ok(png)
    }
}

/// Drives capture, recognition and segmentation for one screen.
///
/// ```text
/// Idle ─start_capture─▶ Streaming ─capture─▶ Analyzing ─▶ Stopped
///                          │                                 ▲
///                          └─start_scanning─▶ ContinuousScanning ─stop_scanning─┘
/// ```
///
/// `reset` returns to `Idle` from anywhere. Dropping the orchestrator
/// cancels its polling task.
pub struct ScanOrchestrator {
    shared: Arc<Shared>,
}

impl ScanOrchestrator {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        pool: Arc<EnginePool>,
        gateway: SegmentationGateway,
        settings: ScanSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                device,
                pool,
                gateway,
                settings,
                session: Mutex::new(Session {
                    state: ScanState::Idle,
                    source: None,
                    results: Vec::new(),
                    seen: SeenTextSet::default(),
                    scanning: None,
                    analyzing: None,
                    capture_epoch: 0,
                    preview: None,
                }),
                events,
                gate: TickGate::new(),
            }),
        }
    }

    pub fn state(&self) -> ScanState {
        self.shared.lock_session().state
    }

    /// Snapshot of the result history, most recent first.
    pub fn results(&self) -> Vec<ScanResult> {
        self.shared.lock_session().results.clone()
    }

    /// Unfiltered crop of the last frame sent for recognition.
    pub fn latest_preview(&self) -> Option<RgbaImage> {
        self.shared.lock_session().preview.clone()
    }

    /// Receive each result as it is recorded.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanResult> {
        self.shared.events.subscribe()
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.shared.settings
    }

    pub fn is_tick_running(&self) -> bool {
        self.shared.gate.is_busy()
    }

    /// Open the capture device. Allowed from `Idle` or `Stopped`; restarting
    /// from `Stopped` discards the previous results.
    pub async fn start_capture(&self) -> Result<()> {
        {
            let session = self.shared.lock_session();
            if !matches!(session.state, ScanState::Idle | ScanState::Stopped) {
                return Err(invalid_transition("start capture", session.state));
            }
        }

        let mut source = self.shared.device.open().await?;

        let mut session = self.shared.lock_session();
        if !matches!(session.state, ScanState::Idle | ScanState::Stopped) {
            source.stop();
            return Err(invalid_transition("start capture", session.state));
        }
        if session.state == ScanState::Stopped {
            session.results.clear();
            session.seen.clear();
        }

        let (width, height) = source.dimensions();
        session.source = Some(source);
        session.state = ScanState::Streaming;
        info!(width, height, scan_box = ?self.shared.settings.scan_box, "Capture started");
        Ok(())
    }

    /// Analyze a single frame. The device is stopped before recognition;
    /// recognition is bounded by the analyze timeout, and a timeout yields
    /// a timed-out result instead of an error. A `reset` while analyzing
    /// abandons the recognition and this returns `InvalidState`.
    pub async fn capture(&self) -> Result<ScanResult> {
        let (frame, epoch, token) = {
            let mut session = self.shared.lock_session();
            if session.state != ScanState::Streaming {
                return Err(invalid_transition("capture", session.state));
            }
            let frame = match session.source.as_mut() {
                Some(source) => source.read_frame(),
                None => Err(KanjiError::Internal(
                    "Streaming without a frame source".to_string(),
                )),
            };
            session.stop_source();
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    session.state = ScanState::Stopped;
                    return Err(e);
                }
            };

            session.capture_epoch += 1;
            let epoch = session.capture_epoch;
            let token = CancellationToken::new();
            session.analyzing = Some(Analysis {
                epoch,
                token: token.clone(),
                handle: None,
            });
            session.state = ScanState::Analyzing;
            (frame, epoch, token)
        };

        let outcome = tokio::select! {
            _ = token.cancelled() => {
                debug!("Single capture abandoned after reset");
                return Err(capture_reset());
            }
            outcome = self.analyze_frame(&frame, epoch) => outcome,
        };

        let mut session = self.shared.lock_session();
        if !session.owns_analysis(epoch) {
            return Err(capture_reset());
        }
        // The pool keeps the engine warm for the next capture
        session.analyzing = None;
        session.state = ScanState::Stopped;
        let result = outcome?;
        self.shared.record(&mut session, result.clone());
        Ok(result)
    }

    async fn analyze_frame(&self, frame: &RgbaImage, epoch: u64) -> Result<ScanResult> {
        let shared = &self.shared;
        let png = shared.prepare(frame)?;
        let handle = Arc::new(shared.pool.acquire(shared.settings.scan_box.mode()).await?);

        {
            let mut session = shared.lock_session();
            match session.analyzing.as_mut() {
                Some(analysis) if analysis.epoch == epoch => {
                    analysis.handle = Some(Arc::clone(&handle));
                }
                _ => return Err(capture_reset()),
            }
        }

        match shared
            .pool
            .recognize_within(&handle, &png, shared.settings.analyze_timeout)
            .await
        {
            Ok(raw) => {
                let text = clean_recognized_text(&raw);
                if text.is_empty() {
                    info!("No text detected");
                    return Ok(ScanResult::no_text());
                }
                let furigana = shared.gateway.furigana(&text).await?;
                info!(chars = text.chars().count(), "Text detected");
                Ok(ScanResult::detected(text, furigana))
            }
            Err(KanjiError::Timeout { secs }) => {
                warn!(secs, "Single capture timed out");
                Ok(ScanResult::timed_out())
            }
            Err(e) => Err(e),
        }
    }

    /// Begin polling the live device. One engine handle is held for the
    /// whole session and the seen-text set starts empty.
    pub async fn start_scanning(&self) -> Result<()> {
        {
            let session = self.shared.lock_session();
            if session.state != ScanState::Streaming {
                return Err(invalid_transition("start scanning", session.state));
            }
        }

        let handle = self
            .shared
            .pool
            .acquire(self.shared.settings.scan_box.mode())
            .await?;

        let started = {
            let mut session = self.shared.lock_session();
            if session.state == ScanState::Streaming {
                let token = CancellationToken::new();
                session.seen.clear();
                session.scanning = Some(ScanningSession {
                    token: token.clone(),
                    handle: Some(Arc::new(handle)),
                });
                session.state = ScanState::ContinuousScanning;
                Ok(token)
            } else {
                Err((handle, session.state))
            }
        };

        match started {
            Ok(token) => {
                info!(
                    interval_ms = self.shared.settings.poll_interval.as_millis() as u64,
                    "Continuous scanning started"
                );
                tokio::spawn(poll(Arc::clone(&self.shared), token));
                Ok(())
            }
            Err((handle, state)) => {
                // The pool hands every caller the same cached engine, which
                // the winning session may already own.
                drop(handle);
                Err(invalid_transition("start scanning", state))
            }
        }
    }

    /// Stop polling. The timer is cancelled immediately; a tick still in
    /// flight has its result discarded.
    pub async fn stop_scanning(&self) -> Result<()> {
        let handle = {
            let mut session = self.shared.lock_session();
            if session.state != ScanState::ContinuousScanning {
                return Err(invalid_transition("stop scanning", session.state));
            }
            let handle = session.end_scanning();
            session.stop_source();
            session.state = ScanState::Stopped;
            handle
        };

        if let Some(handle) = handle {
            self.shared.pool.release(&handle).await;
        }
        info!("Continuous scanning stopped");
        Ok(())
    }

    /// Leave the screen: release everything and return to `Idle` with the
    /// history cleared. Valid from any state.
    pub async fn reset(&self) {
        let handles = {
            let mut session = self.shared.lock_session();
            let handles = [session.end_scanning(), session.end_analysis()];
            session.stop_source();
            session.results.clear();
            session.seen.clear();
            session.preview = None;
            session.state = ScanState::Idle;
            handles
        };

        for handle in handles.into_iter().flatten() {
            self.shared.pool.release(&handle).await;
        }
        debug!("Scan session reset");
    }
}

impl Drop for ScanOrchestrator {
    fn drop(&mut self) {
        let mut session = self.shared.lock_session();
        // The engine stays cached in the pool; only the timer and device
        // need to stop here.
        if let Some(scanning) = session.scanning.as_ref() {
            scanning.token.cancel();
        }
        if let Some(analysis) = session.analyzing.as_ref() {
            analysis.token.cancel();
        }
        session.stop_source();
    }
}

fn capture_reset() -> KanjiError {
    KanjiError::InvalidState("Capture was reset while analyzing".to_string())
}

fn invalid_transition(action: &str, state: ScanState) -> KanjiError {
    KanjiError::InvalidState(format!("Cannot {action} while {state}"))
}

async fn poll(shared: Arc<Shared>, token: CancellationToken) {
    let period = shared.settings.poll_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(permit) = shared.gate.try_enter() else {
                    debug!("Previous scan tick still running, skipping");
                    continue;
                };

                let shared = Arc::clone(&shared);
                let token = token.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    tokio::select! {
                        _ = token.cancelled() => debug!("Scan tick abandoned after stop"),
                        _ = run_tick(&shared, &token) => {}
                    }
                });
            }
        }
    }

    debug!("Scan polling stopped");
}

async fn run_tick(shared: &Shared, token: &CancellationToken) {
    match tick(shared, token).await {
        Ok(Some(result)) => debug!(id = result.id, text = %result.text, "New text recorded"),
        Ok(None) => {}
        Err(e) if e.is_tick_recoverable() => {
            warn!(error = %e, "Scan tick failed, treating as no detection")
        }
        Err(e) => error!(error = %e, "Scan tick failed"),
    }
}

async fn tick(shared: &Shared, token: &CancellationToken) -> Result<Option<ScanResult>> {
    let Some(handle) = tick_handle(shared, token).await? else {
        return Ok(None);
    };

    let frame = {
        let mut session = shared.lock_session();
        if token.is_cancelled() {
            return Ok(None);
        }
        match session.source.as_mut() {
            Some(source) => source.read_frame()?,
            None => return Ok(None),
        }
    };

    let png = shared.prepare(&frame)?;
    let raw = match shared
        .pool
        .recognize_within(&handle, &png, shared.settings.analyze_timeout)
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            forget_handle(shared, token, &handle);
            return Err(e);
        }
    };

    let text = clean_recognized_text(&raw);
    if text.is_empty() || text.chars().count() < shared.settings.min_text_chars {
        return Ok(None);
    }

    {
        let mut session = shared.lock_session();
        if session.active(token).is_none() {
            return Ok(None);
        }
        if !session.seen.insert(&text) {
            debug!(text = %text, "Text already reported this session");
            return Ok(None);
        }
    }

    let furigana = match shared.gateway.furigana(&text).await {
        Ok(furigana) => furigana,
        Err(e) => {
            // Let a later tick report this text once segmentation works
            let mut session = shared.lock_session();
            if session.active(token).is_some() {
                session.seen.remove(&text);
            }
            return Err(e);
        }
    };

    let mut session = shared.lock_session();
    if session.active(token).is_none() {
        debug!("Discarding result from a stopped session");
        return Ok(None);
    }
    let result = ScanResult::detected(text, furigana);
    shared.record(&mut session, result.clone());
    Ok(Some(result))
}

/// The session's engine handle, reacquired if a failed recognition retired
/// the previous one.
async fn tick_handle(
    shared: &Shared,
    token: &CancellationToken,
) -> Result<Option<Arc<EngineHandle>>> {
    {
        let mut session = shared.lock_session();
        match session.active(token) {
            None => return Ok(None),
            Some(ScanningSession {
                handle: Some(handle),
                ..
            }) => return Ok(Some(Arc::clone(handle))),
            Some(_) => {}
        }
    }

    let handle = Arc::new(
        shared
            .pool
            .acquire(shared.settings.scan_box.mode())
            .await?,
    );
    debug!(mode = %handle.mode(), "Reacquired recognition engine");

    let stored = {
        let mut session = shared.lock_session();
        match session.active(token) {
            Some(scanning) => {
                scanning.handle = Some(Arc::clone(&handle));
                true
            }
            None => false,
        }
    };

    if stored {
        Ok(Some(handle))
    } else {
        // Another session may already share this cached engine
        Ok(None)
    }
}

fn forget_handle(shared: &Shared, token: &CancellationToken, handle: &Arc<EngineHandle>) {
    let mut session = shared.lock_session();
    if let Some(scanning) = session.active(token) {
        if scanning
            .handle
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            scanning.handle = None;
        }
    }
}
