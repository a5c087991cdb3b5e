//! Debounced values and single-slot memoization.
//!
//! Work derived from the session (analysis, autosave) runs against a value
//! that lags the latest input until the input has been quiet for a while.
//! Nothing is cancelled: a newer input simply replaces the pending one, and
//! the computation that eventually runs sees the latest value.

use std::time::{Duration, Instant};

/// A value that settles once it stops changing for `delay`.
#[derive(Debug, Clone)]
pub struct Deferred<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
    settled: Option<T>,
}

impl<T> Deferred<T> {
    /// Creates an empty value with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            settled: None,
        }
    }

    /// Quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Records a new input at `now`, restarting the quiet period.
    pub fn set(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Settles the pending input if it has been quiet long enough and returns
    /// the latest settled value.
    pub fn poll(&mut self, now: Instant) -> Option<&T> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|(_, changed_at)| now.saturating_duration_since(*changed_at) >= self.delay);
        if ready {
            self.settled = self.pending.take().map(|(value, _)| value);
        }
        self.settled.as_ref()
    }

    /// Settles the pending input immediately.
    pub fn flush(&mut self) -> Option<&T> {
        if let Some((value, _)) = self.pending.take() {
            self.settled = Some(value);
        }
        self.settled.as_ref()
    }

    /// Whether an input is still waiting out its quiet period.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The latest settled value, without polling.
    pub fn settled(&self) -> Option<&T> {
        self.settled.as_ref()
    }
}

/// Caches the result computed for the most recent key.
#[derive(Debug, Clone)]
pub struct Memo<K, V> {
    slot: Option<(K, V)>,
    hits: u64,
    misses: u64,
}

impl<K: PartialEq, V> Memo<K, V> {
    /// Creates an empty memo.
    pub fn new() -> Self {
        Self {
            slot: None,
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the cached value for `key`, computing it if the key changed.
    pub fn get_or_compute<F>(&mut self, key: K, compute: F) -> &V
    where
        F: FnOnce(&K) -> V,
    {
        let entry = match self.slot.take() {
            Some(entry) if entry.0 == key => {
                self.hits += 1;
                entry
            }
            _ => {
                self.misses += 1;
                let value = compute(&key);
                (key, value)
            }
        };
        &self.slot.insert(entry).1
    }

    /// The cached value, if any.
    pub fn value(&self) -> Option<&V> {
        self.slot.as_ref().map(|(_, value)| value)
    }

    /// The key the cached value was computed for.
    pub fn key(&self) -> Option<&K> {
        self.slot.as_ref().map(|(key, _)| key)
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that ran the computation.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl<K: PartialEq, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
