//! Buffering primitives shared by the detectors.
//!
//! - [`TimedWindow`]: keeps items younger than a retention span, measured
//!   from the newest item
//! - [`BatchWindow`]: collects a fixed number of items and hands them over
//!   as one non-overlapping batch
//! - [`OccurrenceCounter`]: fires once enough occurrences land inside a
//!   retention span, then starts over

use std::collections::VecDeque;

/// Anything carrying a monotonic nanosecond timestamp.
pub trait Timestamped {
    fn timestamp_ns(&self) -> u64;
}

impl Timestamped for u64 {
    fn timestamp_ns(&self) -> u64 {
        *self
    }
}

/// Time-ordered buffer that evicts items older than `retention_ns`.
#[derive(Debug, Clone)]
pub struct TimedWindow<T> {
    items: VecDeque<T>,
    retention_ns: u64,
}

impl<T: Timestamped> TimedWindow<T> {
    pub fn new(retention_ns: u64) -> Self {
        Self {
            items: VecDeque::new(),
            retention_ns,
        }
    }

    /// Evict everything at least `retention_ns` older than `item`, then
    /// append it.
    pub fn push(&mut self, item: T) {
        self.evict_relative_to(item.timestamp_ns());
        self.items.push_back(item);
    }

    /// Drop items whose age relative to `newest_ns` reaches the retention.
    pub fn evict_relative_to(&mut self, newest_ns: u64) {
        let retention = self.retention_ns;
        self.items
            .retain(|item| newest_ns.saturating_sub(item.timestamp_ns()) < retention);
    }

    /// Number of items matching `predicate`.
    pub fn count_where(&self, predicate: impl Fn(&T) -> bool) -> usize {
        self.items.iter().filter(|item| predicate(item)).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Fixed-size batcher with non-overlapping windows.
#[derive(Debug, Clone)]
pub struct BatchWindow<T> {
    items: Vec<T>,
    size: usize,
}

impl<T> BatchWindow<T> {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            items: Vec::with_capacity(size),
            size,
        }
    }

    /// Add an item. Returns the full batch, and empties the window, once
    /// `size` items have been collected.
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.items.push(item);
        if self.items.len() >= self.size {
            Some(std::mem::replace(
                &mut self.items,
                Vec::with_capacity(self.size),
            ))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Counts occurrences inside a sliding span and fires on the `required`th.
#[derive(Debug, Clone)]
pub struct OccurrenceCounter {
    occurrences: TimedWindow<u64>,
    required: usize,
}

impl OccurrenceCounter {
    pub fn new(retention_ns: u64, required: usize) -> Self {
        Self {
            occurrences: TimedWindow::new(retention_ns),
            required: required.max(1),
        }
    }

    /// Record an occurrence at `timestamp_ns`.
    ///
    /// Returns true when this occurrence completes the required count; the
    /// counter is then cleared.
    pub fn record(&mut self, timestamp_ns: u64) -> bool {
        self.occurrences.push(timestamp_ns);
        if self.occurrences.len() >= self.required {
            self.occurrences.clear();
            true
        } else {
            false
        }
    }

    /// Occurrences currently counted.
    pub fn pending(&self) -> usize {
        self.occurrences.len()
    }
}
