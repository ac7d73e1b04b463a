use std::path::PathBuf;

use async_trait::async_trait;
use image::RgbaImage;
use tracing::{debug, info};

use crate::error::{KanjiError, Result};

use super::{CaptureDevice, FrameSource};

enum StillSource {
    File(PathBuf),
    Memory(RgbaImage),
}

/// A capture device that serves one still image as every frame.
pub struct StillImageDevice {
    source: StillSource,
}

impl StillImageDevice {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: StillSource::File(path.into()),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            source: StillSource::Memory(image),
        }
    }
}

#[async_trait]
impl CaptureDevice for StillImageDevice {
    async fn open(&self) -> Result<Box<dyn FrameSource>> {
        let frame = match &self.source {
            StillSource::Memory(image) => image.clone(),
            StillSource::File(path) => {
                let path = path.clone();
                let display = path.display().to_string();
                tokio::task::spawn_blocking(move || image::open(&path))
                    .await
                    .map_err(|e| KanjiError::Internal(format!("Image loader panicked: {e}")))?
                    .map_err(|e| {
                        KanjiError::DeviceUnavailable(format!("Cannot read {display}: {e}"))
                    })?
                    .to_rgba8()
            }
        };

        info!(
            width = frame.width(),
            height = frame.height(),
            "Still image capture opened"
        );
        Ok(Box::new(StillFrames {
            frame,
            stopped: false,
        }))
    }
}

struct StillFrames {
    frame: RgbaImage,
    stopped: bool,
}

impl FrameSource for StillFrames {
    fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn read_frame(&mut self) -> Result<RgbaImage> {
        if self.stopped {
            return Err(KanjiError::DeviceUnavailable(
                "Capture has been stopped".to_string(),
            ));
        }
        Ok(self.frame.clone())
    }

    fn stop(&mut self) {
        if !self.stopped {
            debug!("Still image capture stopped");
            self.stopped = true;
        }
    }
}
