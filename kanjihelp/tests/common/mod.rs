#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tokio::sync::Notify;

use kanjihelp::capture::{CaptureDevice, FrameSource, ScanBox, StillImageDevice};
use kanjihelp::config::CaptureConfig;
use kanjihelp::error::{KanjiError, Result};
use kanjihelp::japanese::Token;
use kanjihelp::ocr::{EngineFactory, EnginePool, RecognitionEngine, RecognitionMode};
use kanjihelp::scan::{ScanOrchestrator, ScanSettings};
use kanjihelp::segmentation::{Analyzer, AnalyzerBuilder, SegmentationGateway};

/// Longest-match analyzer over a tiny fixed lexicon. Characters outside the
/// lexicon become single-character tokens without a reading.
pub struct LexiconAnalyzer {
    lexicon: HashMap<&'static str, &'static str>,
}

impl LexiconAnalyzer {
    pub fn new() -> Self {
        let lexicon = HashMap::from([
            ("私", "ワタシ"),
            ("は", "ハ"),
            ("学生", "ガクセイ"),
            ("です", "デス"),
            ("空", "ソラ"),
            ("海", "ウミ"),
            ("山", "ヤマ"),
        ]);
        Self { lexicon }
    }
}

impl Analyzer for LexiconAnalyzer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let matched = (start + 1..=chars.len()).rev().find_map(|end| {
                let candidate: String = chars[start..end].iter().collect();
                self.lexicon
                    .get(candidate.as_str())
                    .map(|reading| (end, Token::new(candidate.clone(), Some(*reading))))
            });

            match matched {
                Some((end, token)) => {
                    tokens.push(token);
                    start = end;
                }
                None => {
                    tokens.push(Token::new(chars[start].to_string(), None));
                    start += 1;
                }
            }
        }

        Ok(tokens)
    }
}

/// Builds a [`LexiconAnalyzer`], optionally failing or waiting for a release
/// signal first.
pub struct FakeAnalyzerBuilder {
    pub builds: AtomicUsize,
    fail_first: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl FakeAnalyzerBuilder {
    pub fn ready() -> Arc<Self> {
        Arc::new(Self {
            builds: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
            gate: None,
        })
    }

    /// The first `failures` builds fail.
    pub fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            builds: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(failures),
            gate: None,
        })
    }

    /// Builds block until `gate` is notified.
    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            builds: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
            gate: Some(gate),
        })
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalyzerBuilder for FakeAnalyzerBuilder {
    async fn build(&self) -> Result<Arc<dyn Analyzer>> {
        let attempt = self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if attempt < self.fail_first.load(Ordering::SeqCst) {
            return Err(KanjiError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "system.dic not found",
            )));
        }
        Ok(Arc::new(LexiconAnalyzer::new()))
    }

    fn describe(&self) -> String {
        "fake lexicon".to_string()
    }
}

/// What the next recognition call does.
#[derive(Debug, Clone)]
pub enum Step {
    Text(&'static str),
    Fail,
    /// Never completes.
    Stall,
    /// Returns the text after the delay.
    Delayed(&'static str, Duration),
}

/// Engine factory whose engines follow one shared script. Once the script
/// runs out every call returns empty text.
pub struct ScriptedFactory {
    script: Mutex<VecDeque<Step>>,
    pub created: AtomicUsize,
    pub calls: AtomicUsize,
    pub terminated: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            created: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            terminated: AtomicUsize::new(0),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Option<Step> {
        self.script.lock().unwrap().pop_front()
    }
}

struct ScriptedEngine {
    factory: Arc<ScriptedFactory>,
}

#[async_trait]
impl RecognitionEngine for ScriptedEngine {
    async fn recognize(&self, _image: &[u8]) -> Result<String> {
        self.factory.calls.fetch_add(1, Ordering::SeqCst);
        match self.factory.next_step() {
            None => Ok(String::new()),
            Some(Step::Text(text)) => Ok(text.to_string()),
            Some(Step::Fail) => Err(KanjiError::RecognitionFailed(
                "engine worker crashed".to_string(),
            )),
            Some(Step::Stall) => std::future::pending().await,
            Some(Step::Delayed(text, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(text.to_string())
            }
        }
    }

    async fn terminate(&self) {
        self.factory.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

/// Lets a shared `Arc<ScriptedFactory>` act as the pool's factory while the
/// test keeps its own handle for the counters.
pub struct SharedFactory(pub Arc<ScriptedFactory>);

#[async_trait]
impl EngineFactory for SharedFactory {
    async fn create(&self, _mode: RecognitionMode) -> Result<Arc<dyn RecognitionEngine>> {
        // Builds suspend at least once, like a real engine load
        tokio::task::yield_now().await;
        self.0.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedEngine {
            factory: Arc::clone(&self.0),
        }))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// A device that can never be opened, like a camera without permission.
pub struct UnavailableDevice;

#[async_trait]
impl CaptureDevice for UnavailableDevice {
    async fn open(&self) -> Result<Box<dyn FrameSource>> {
        Err(KanjiError::DeviceUnavailable(
            "permission denied".to_string(),
        ))
    }
}

/// Black text-like stripes on white.
pub fn sample_frame() -> RgbaImage {
    RgbaImage::from_fn(120, 80, |x, y| {
        if (x / 6 + y / 10) % 3 == 0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
}

pub fn test_settings() -> ScanSettings {
    let config = CaptureConfig {
        poll_interval_ms: 1000,
        analyze_timeout_secs: 5,
        min_text_chars: 1,
        ..CaptureConfig::default()
    };
    ScanSettings::from_config(&config, ScanBox::Wide)
}

pub async fn ready_gateway() -> SegmentationGateway {
    let gateway = SegmentationGateway::new(FakeAnalyzerBuilder::ready());
    gateway.initialize().await.unwrap();
    gateway
}

pub struct Harness {
    pub orchestrator: ScanOrchestrator,
    pub factory: Arc<ScriptedFactory>,
    pub pool: Arc<EnginePool>,
    pub gateway: SegmentationGateway,
}

impl Harness {
    pub fn new(
        steps: impl IntoIterator<Item = Step>,
        gateway: SegmentationGateway,
        settings: ScanSettings,
    ) -> Self {
        let factory = ScriptedFactory::new(steps);
        let pool = Arc::new(EnginePool::new(Arc::new(SharedFactory(Arc::clone(
            &factory,
        )))));
        let orchestrator = ScanOrchestrator::new(
            Arc::new(StillImageDevice::from_image(sample_frame())),
            Arc::clone(&pool),
            gateway.clone(),
            settings,
        );
        Self {
            orchestrator,
            factory,
            pool,
            gateway,
        }
    }

    pub async fn ready(steps: impl IntoIterator<Item = Step>) -> Self {
        Self::new(steps, ready_gateway().await, test_settings())
    }
}
