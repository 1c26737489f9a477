//! An axis-aligned rectangle.

use serde::{Deserialize, Serialize};

use crate::dir::Dir;
use crate::point::Point;
use crate::span::Span;

/// An axis-aligned rectangle, specified by its lower-left and upper-right corners.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rect {
    /// The lower-left corner.
    p0: Point,
    /// The upper-right corner.
    p1: Point,
}

impl Rect {
    /// Creates a rectangle from two corners, normalizing so that
    /// `p0` is the lower-left and `p1` the upper-right corner.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a rectangle from its left, bottom, right, and top edges.
    pub fn from_sides(left: i64, bot: i64, right: i64, top: i64) -> Self {
        Self::new(Point::new(left, bot), Point::new(right, top))
    }

    /// Creates a rectangle from a horizontal and a vertical span.
    pub fn from_spans(h: Span, v: Span) -> Self {
        Self {
            p0: Point::new(h.start(), v.start()),
            p1: Point::new(h.stop(), v.stop()),
        }
    }

    /// Returns the left edge of the rectangle.
    pub const fn left(&self) -> i64 {
        self.p0.x
    }

    /// Returns the bottom edge of the rectangle.
    pub const fn bot(&self) -> i64 {
        self.p0.y
    }

    /// Returns the right edge of the rectangle.
    pub const fn right(&self) -> i64 {
        self.p1.x
    }

    /// Returns the top edge of the rectangle.
    pub const fn top(&self) -> i64 {
        self.p1.y
    }

    /// Returns the horizontal width of the rectangle.
    pub const fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    /// Returns the vertical height of the rectangle.
    pub const fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// Returns the span of the rectangle along direction `dir`.
    pub fn span(&self, dir: Dir) -> Span {
        match dir {
            Dir::Horiz => Span::new(self.p0.x, self.p1.x),
            Dir::Vert => Span::new(self.p0.y, self.p1.y),
        }
    }

    /// Computes the smallest rectangle containing both rectangles.
    pub fn union(self, other: Self) -> Self {
        Self {
            p0: Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            p1: Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        }
    }

    /// Creates a new rectangle shifted by the given amount.
    pub fn translate(self, p: Point) -> Self {
        Self {
            p0: self.p0 + p,
            p1: self.p1 + p,
        }
    }
}
