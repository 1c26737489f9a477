//! An interval of coordinates along one axis.

use serde::{Deserialize, Serialize};

/// A closed interval of coordinates `[start, stop]`.
///
/// A span's invariant is that `start <= stop`; all constructors
/// normalize their arguments to uphold it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    start: i64,
    stop: i64,
}

impl Span {
    /// Creates a new [`Span`] from 0 until the given stop.
    ///
    /// # Panics
    ///
    /// Panics if `stop` is less than 0.
    pub fn until(stop: i64) -> Self {
        assert!(stop >= 0);
        Self { start: 0, stop }
    }

    /// Creates a new [`Span`] between two integers.
    pub fn new(start: i64, stop: i64) -> Self {
        let (start, stop) = if start <= stop {
            (start, stop)
        } else {
            (stop, start)
        };
        Self { start, stop }
    }

    /// Creates a span of zero length encompassing the given point.
    pub const fn from_point(x: i64) -> Self {
        Self { start: x, stop: x }
    }

    /// Creates a span with the given center and length.
    ///
    /// The length must be even.
    pub fn with_center_and_length(center: i64, length: i64) -> Self {
        assert_eq!(length % 2, 0, "span length must be even");
        Self {
            start: center - length / 2,
            stop: center + length / 2,
        }
    }

    /// Gets the starting (lower) coordinate of the span.
    pub const fn start(&self) -> i64 {
        self.start
    }

    /// Gets the stopping (upper) coordinate of the span.
    pub const fn stop(&self) -> i64 {
        self.stop
    }

    /// Gets the center of the span, rounded down.
    pub const fn center(&self) -> i64 {
        (self.start + self.stop) / 2
    }

    /// Gets the length of the span.
    pub const fn length(&self) -> i64 {
        self.stop - self.start
    }

    /// Returns whether the span contains the given coordinate.
    pub const fn contains(&self, x: i64) -> bool {
        self.start <= x && x <= self.stop
    }

    /// Returns whether this span overlaps `other`.
    pub fn intersects(&self, other: &Self) -> bool {
        self.start <= other.stop && other.start <= self.stop
    }

    /// Computes the smallest span containing both spans.
    pub fn union(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }

    /// Computes the union of an iterator of spans.
    ///
    /// Returns [`None`] if the iterator is empty.
    pub fn union_all(spans: impl Iterator<Item = Self>) -> Option<Self> {
        spans.reduce(Self::union)
    }

    /// Creates a new span shifted by `amount`.
    pub const fn translate(self, amount: i64) -> Self {
        Self {
            start: self.start + amount,
            stop: self.stop + amount,
        }
    }

    /// Creates a new span expanded to include `x`.
    pub fn expand_to(self, x: i64) -> Self {
        Self {
            start: self.start.min(x),
            stop: self.stop.max(x),
        }
    }

    /// Creates a new span mirrored about 0: `[-stop, -start]`.
    pub const fn mirror(self) -> Self {
        Self {
            start: -self.stop,
            stop: -self.start,
        }
    }
}

impl From<(i64, i64)> for Span {
    fn from(value: (i64, i64)) -> Self {
        Self::new(value.0, value.1)
    }
}
