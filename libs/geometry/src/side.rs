//! The sides of an axis-aligned rectangle.

use serde::{Deserialize, Serialize};

use crate::dir::Dir;

/// An enumeration of the sides of an axis-aligned rectangle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// The left side.
    Left,
    /// The right side.
    Right,
    /// The bottom side.
    Bot,
    /// The top side.
    Top,
}

impl Side {
    /// Returns the direction of the axis perpendicular to this side.
    pub fn edge_dir(&self) -> Dir {
        match self {
            Self::Left | Self::Right => Dir::Vert,
            Self::Bot | Self::Top => Dir::Horiz,
        }
    }

    /// Returns the opposite side.
    pub fn other(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Bot => Self::Top,
            Self::Top => Self::Bot,
        }
    }

    /// Returns the sign associated with moving towards this side:
    /// negative for [`Side::Left`] and [`Side::Bot`], positive otherwise.
    pub fn sign(&self) -> i64 {
        match self {
            Self::Left | Self::Bot => -1,
            Self::Right | Self::Top => 1,
        }
    }
}
