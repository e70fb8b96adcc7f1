//! Coalescing for free-text input.
//!
//! Time is passed in rather than read from a clock, so the owner decides when
//! to poll and tests stay deterministic.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(120);

/// Keeps the latest value per key until its key has been quiet for `window`.
/// Intermediate values are discarded, never queued.
#[derive(Debug)]
pub struct Debouncer<K, V> {
    window: Duration,
    pending: HashMap<K, (V, Instant)>,
}

impl<K: Eq + Hash + Clone, V> Debouncer<K, V> {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending value for `key` and restart its window.
    pub fn push(&mut self, key: K, value: V, now: Instant) {
        self.pending.insert(key, (value, now));
    }

    /// Take every value whose window has elapsed by `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, V)> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, (_, at))| now.saturating_duration_since(*at) >= self.window)
            .map(|(key, _)| key.clone())
            .collect();
        due.into_iter()
            .filter_map(|key| self.pending.remove(&key).map(|(value, _)| (key, value)))
            .collect()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> Default for Debouncer<K, V> {
    fn default() -> Self {
        Debouncer::new(DEFAULT_DEBOUNCE)
    }
}
