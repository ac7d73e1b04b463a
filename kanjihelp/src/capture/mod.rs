//! Frame capture
//!
//! A [`CaptureDevice`] opens into a [`FrameSource`] that yields RGBA frames
//! until stopped. Frames are cropped to a centered [`RegionOfInterest`] and
//! normalized before recognition.

mod preprocess;
mod still;

use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ocr::RecognitionMode;

pub use preprocess::{downscale_to_fit, encode_png, normalize, NormalizeOptions, NormalizedFrame};
pub use still::StillImageDevice;

/// An open stream of frames. `stop` releases the underlying device and is
/// idempotent.
pub trait FrameSource: Send {
    fn dimensions(&self) -> (u32, u32);

    fn read_frame(&mut self) -> Result<RgbaImage>;

    fn stop(&mut self);
}

#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Fails with `DeviceUnavailable` when the device cannot be opened.
    async fn open(&self) -> Result<Box<dyn FrameSource>>;
}

/// Centered crop expressed as fractions of the frame size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionOfInterest {
    pub width_fraction: f32,
    pub height_fraction: f32,
}

impl RegionOfInterest {
    pub const FULL: RegionOfInterest = RegionOfInterest {
        width_fraction: 1.0,
        height_fraction: 1.0,
    };
}

/// On-screen scan box presets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScanBox {
    /// Narrow, long vertical strip for 縦書き text.
    Tall,
    /// Short, broad horizontal strip.
    #[default]
    Wide,
    /// The whole frame.
    Full,
}

impl ScanBox {
    pub fn region(self) -> RegionOfInterest {
        match self {
            ScanBox::Tall => RegionOfInterest {
                width_fraction: 0.3,
                height_fraction: 0.8,
            },
            ScanBox::Wide => RegionOfInterest {
                width_fraction: 0.8,
                height_fraction: 0.3,
            },
            ScanBox::Full => RegionOfInterest::FULL,
        }
    }

    pub fn mode(self) -> RecognitionMode {
        match self {
            ScanBox::Tall => RecognitionMode::Vertical,
            ScanBox::Wide | ScanBox::Full => RecognitionMode::Horizontal,
        }
    }
}
