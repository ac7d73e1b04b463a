use std::sync::Arc;

use crate::config::Config;
use crate::ocr::EnginePool;
use crate::segmentation::SegmentationGateway;
use crate::translation::TranslationProvider;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub segmentation: SegmentationGateway,
    /// Shared with any scan session running in the same process.
    pub engines: Arc<EnginePool>,
    pub translation: TranslationProvider,
}

impl AppState {
    pub fn new(
        config: Config,
        segmentation: SegmentationGateway,
        engines: Arc<EnginePool>,
        translation: TranslationProvider,
    ) -> Self {
        Self {
            config: Arc::new(config),
            segmentation,
            engines,
            translation,
        }
    }
}
