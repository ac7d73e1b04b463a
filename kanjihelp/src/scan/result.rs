use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::japanese::AnnotatedUnit;

static NEXT_RESULT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_RESULT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Unique for the lifetime of the process, increasing in creation order.
    pub id: u64,
    pub text: String,
    pub furigana: Vec<AnnotatedUnit>,
    pub timed_out: bool,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Detected,
    NoText,
    TimedOut,
}

impl ScanStatus {
    pub fn user_message(self) -> &'static str {
        match self {
            ScanStatus::Detected => "もじが　みつかりました",
            ScanStatus::NoText => "もじが　みつかりませんでした",
            ScanStatus::TimedOut => "じかんが　かかりすぎました。もういちど　ためしてね",
        }
    }
}

impl ScanResult {
    pub fn detected(text: impl Into<String>, furigana: Vec<AnnotatedUnit>) -> Self {
        Self {
            id: next_id(),
            text: text.into(),
            furigana,
            timed_out: false,
            captured_at: Utc::now(),
        }
    }

    pub fn no_text() -> Self {
        Self::detected(String::new(), Vec::new())
    }

    pub fn timed_out() -> Self {
        Self {
            timed_out: true,
            ..Self::no_text()
        }
    }

    pub fn status(&self) -> ScanStatus {
        if self.timed_out {
            ScanStatus::TimedOut
        } else if self.text.is_empty() {
            ScanStatus::NoText
        } else {
            ScanStatus::Detected
        }
    }
}

/// Texts already emitted during one continuous session.
#[derive(Debug, Default)]
pub struct SeenTextSet {
    texts: HashSet<String>,
}

impl SeenTextSet {
    /// Returns false if the text was already seen.
    pub fn insert(&mut self, text: &str) -> bool {
        if self.texts.contains(text) {
            return false;
        }
        self.texts.insert(text.to_string())
    }

    pub fn remove(&mut self, text: &str) {
        self.texts.remove(text);
    }

    pub fn contains(&self, text: &str) -> bool {
        self.texts.contains(text)
    }

    pub fn clear(&mut self) {
        self.texts.clear();
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
