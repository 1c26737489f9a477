//! Instance orientations in the axis-aligned plane.

use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::rect::Rect;

/// A named orientation: a rotation by a multiple of 90 degrees,
/// possibly composed with a reflection.
///
/// Only the orientations produced by abutting mirrored rows are
/// currently supported.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// The identity orientation.
    #[default]
    R0,
    /// Rotation by 180 degrees.
    R180,
    /// Reflection about the x-axis (flips the y-coordinate).
    ReflectVert,
    /// Reflection about the y-axis (flips the x-coordinate).
    ReflectHoriz,
}

impl Orientation {
    /// Returns whether this orientation flips the y-axis.
    pub const fn flips_y(&self) -> bool {
        matches!(self, Self::R180 | Self::ReflectVert)
    }

    /// Returns whether this orientation flips the x-axis.
    pub const fn flips_x(&self) -> bool {
        matches!(self, Self::R180 | Self::ReflectHoriz)
    }

    /// Applies this orientation to a point, transforming about the origin.
    pub const fn apply(&self, p: Point) -> Point {
        let x = if self.flips_x() { -p.x } else { p.x };
        let y = if self.flips_y() { -p.y } else { p.y };
        Point::new(x, y)
    }

    /// Applies this orientation to a rectangle, transforming about the origin.
    pub fn apply_rect(&self, r: Rect) -> Rect {
        Rect::new(
            self.apply(Point::new(r.left(), r.bot())),
            self.apply(Point::new(r.right(), r.top())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientations_transform_points() {
        let p = Point::new(3, 5);
        assert_eq!(Orientation::R0.apply(p), p);
        assert_eq!(Orientation::R180.apply(p), Point::new(-3, -5));
        assert_eq!(Orientation::ReflectVert.apply(p), Point::new(3, -5));
        assert_eq!(Orientation::ReflectHoriz.apply(p), Point::new(-3, 5));
    }

    #[test]
    fn reflecting_a_rect_renormalizes_corners() {
        let r = Rect::from_sides(0, 0, 10, 20);
        let flipped = Orientation::ReflectVert.apply_rect(r);
        assert_eq!(flipped, Rect::from_sides(0, -20, 10, 0));
    }
}
