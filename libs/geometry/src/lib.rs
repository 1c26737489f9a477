//! Integer-coordinate geometric primitives for layout generation.
#![warn(missing_docs)]

pub mod dir;
pub mod orientation;
pub mod point;
pub mod rect;
pub mod side;
pub mod span;

pub mod prelude {
    //! A prelude exporting commonly-used items.
    pub use crate::dir::Dir;
    pub use crate::orientation::Orientation;
    pub use crate::point::Point;
    pub use crate::rect::Rect;
    pub use crate::side::Side;
    pub use crate::span::Span;
}
