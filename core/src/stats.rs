//! Usage counters, injected into the session instead of living in a global.

use std::sync::Mutex;

use ahash::AHashMap;

/// Named event counters incremented by the session layer.
///
/// Shared behind an `Arc`; increments take an interior lock so sessions can
/// hold `&self`.
#[derive(Debug, Default)]
pub struct UsageStats {
    counts: Mutex<AHashMap<String, u64>>,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, name: &str) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    pub fn count(&self, name: &str) -> u64 {
        self.counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(name).copied())
            .unwrap_or(0)
    }

    /// Snapshot of all counters, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .counts
            .lock()
            .map(|counts| counts.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default();
        entries.sort();
        entries
    }
}
