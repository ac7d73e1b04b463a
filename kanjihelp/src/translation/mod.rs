//! Word and sentence translation through DeepL, with an LRU cache for
//! single words.

mod cache;
mod deepl;
mod provider;

pub use cache::WordTranslationCache;
pub use deepl::DeepLClient;
pub use provider::{TranslationProvider, WordTranslation};
