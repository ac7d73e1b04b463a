use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

/// Thread-safe LRU cache of single-word translations, keyed by language pair.
#[derive(Clone)]
pub struct WordTranslationCache {
    cache: Arc<Mutex<LruCache<String, String>>>,
}

impl WordTranslationCache {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn get(&self, source_lang: &str, target_lang: &str, word: &str) -> Option<String> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(&cache_key(source_lang, target_lang, word)).cloned()
    }

    pub fn put(&self, source_lang: &str, target_lang: &str, word: &str, translation: String) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(cache_key(source_lang, target_lang, word), translation);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cache_key(source_lang: &str, target_lang: &str, word: &str) -> String {
    format!(
        "{}:{}:{word}",
        source_lang.to_uppercase(),
        target_lang.to_uppercase()
    )
}
