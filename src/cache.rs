//! Memoization of interpolation results.
//!
//! A query is identified by a [`Fingerprint`]: a hash of the raw point
//! coordinates paired with a hash of the query time. Results are kept in a
//! small bounded cache that evicts strictly in insertion order; reading an
//! entry never refreshes it.

use chrono::NaiveDateTime;
use lru::LruCache;
use ndarray::ArrayView2;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::trace;

/// Default bound for scalar property caches
pub const SCALAR_CACHE_ENTRIES: usize = 4;

/// Default bound for vector property caches
pub const VECTOR_CACHE_ENTRIES: usize = 8;

/// Cheap key identifying a repeated (points, time) query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Hash of the point coordinates as raw bytes
    pub points: u64,
    /// Hash of the query time and extrapolation policy
    pub time: u64,
}

impl Fingerprint {
    /// Fingerprint a query.
    ///
    /// The time is hashed as epoch microseconds, so two equal instants always
    /// collide and two distinct instants never share a printed form. The
    /// extrapolation flag is part of the time key because it changes results
    /// for out-of-range times and underground points.
    pub fn new(points: &ArrayView2<f64>, time: NaiveDateTime, extrapolate: bool) -> Self {
        Self {
            points: hash_points(points),
            time: hash_time(time, extrapolate),
        }
    }
}

/// Hash point coordinates in logical (row-major) order
pub fn hash_points(points: &ArrayView2<f64>) -> u64 {
    let mut hasher = DefaultHasher::new();
    for value in points.iter() {
        value.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

fn hash_time(time: NaiveDateTime, extrapolate: bool) -> u64 {
    let mut hasher = DefaultHasher::new();
    time.and_utc().timestamp_micros().hash(&mut hasher);
    extrapolate.hash(&mut hasher);
    hasher.finish()
}

/// Bounded, insertion-ordered result cache.
///
/// Values are shared behind `Arc` and never mutated once stored.
#[derive(Debug)]
pub struct ResultCache<T> {
    entries: LruCache<Fingerprint, Arc<T>>,
}

impl<T: Clone> ResultCache<T> {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Shared read-only result for `fingerprint`, if present
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<Arc<T>> {
        self.entries.peek(fingerprint).cloned()
    }

    /// Owned copy of the result when `copy` is set, else the shared value
    pub fn get(&self, fingerprint: &Fingerprint, copy: bool) -> Option<Cached<T>> {
        self.entries.peek(fingerprint).map(|value| {
            if copy {
                Cached::Owned(T::clone(value))
            } else {
                Cached::Shared(Arc::clone(value))
            }
        })
    }

    /// Store a result, evicting the oldest entry when full.
    ///
    /// Re-storing an existing fingerprint replaces its value in place
    /// without moving it in the eviction order.
    pub fn store(&mut self, fingerprint: Fingerprint, value: T) -> Arc<T> {
        let value = Arc::new(value);
        if let Some(slot) = self.entries.peek_mut(&fingerprint) {
            *slot = Arc::clone(&value);
        } else if let Some((evicted, _)) = self.entries.push(fingerprint, Arc::clone(&value)) {
            trace!(points = evicted.points, time = evicted.time, "Evicted cached result");
        }
        value
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A cache hit, either shared with the cache or copied out of it
#[derive(Debug, Clone)]
pub enum Cached<T> {
    Shared(Arc<T>),
    Owned(T),
}

impl<T: Clone> Cached<T> {
    pub fn into_owned(self) -> T {
        match self {
            Cached::Shared(value) => T::clone(&value),
            Cached::Owned(value) => value,
        }
    }
}

impl<T> std::ops::Deref for Cached<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Cached::Shared(value) => value,
            Cached::Owned(value) => value,
        }
    }
}
