//! Axis directions: horizontal or vertical.

use std::fmt::{self, Display};
use std::ops::Not;

use serde::{Deserialize, Serialize};

/// An enumeration of axis directions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dir {
    /// The horizontal direction; the direction of the x-axis.
    Horiz,
    /// The vertical direction; the direction of the y-axis.
    Vert,
}

impl Dir {
    /// Returns the other direction.
    #[inline]
    pub fn other(&self) -> Self {
        match self {
            Self::Horiz => Self::Vert,
            Self::Vert => Self::Horiz,
        }
    }
}

impl Not for Dir {
    type Output = Self;
    /// Returns the other direction.
    #[inline]
    fn not(self) -> Self::Output {
        self.other()
    }
}

impl Display for Dir {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Horiz => write!(f, "horizontal"),
            Self::Vert => write!(f, "vertical"),
        }
    }
}
