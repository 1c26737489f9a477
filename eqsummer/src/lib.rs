//! Placement and track allocation for multi-tap analog equalizer
//! summer columns.
//!
//! A quarter-rate receiver equalizer sums a feed-forward (FFE) chain
//! and a decision-feedback (DFE) chain into one differential output
//! per clock phase. This crate derives the summer cells of such an
//! equalizer, places them into rows, allocates the vertical signal
//! tracks between them, and stacks four rows into a ring column with
//! all inter-row routing drawn.
//!
//! The layout model is deliberately small: cells are rectangles with
//! named horizontal pin wires on a fixed finger pitch, and routing
//! happens on a single vertical track grid. What the crate computes is
//! the hard part of the floorplan: how wide each cell must be, where
//! each signal's track lands, and how the four rows of a ring share
//! those tracks.
//!
//! # Examples
//!
//! ```
//! use eqsummer::amp::AmpSegs;
//! use eqsummer::column::{ColumnParams, SummerColumn};
//! use eqsummer::config::{Tech, TrackConfig};
//! use eqsummer::digital::DivSegs;
//! use eqsummer::layout::Cell;
//! use eqsummer::tracks::{TrackGrid, TrackManager};
//!
//! let tech = Tech::default();
//! let mgr = TrackManager::new(&TrackConfig::with_wide_signals())?;
//! let grid = TrackGrid::new(tech.vm_line, tech.vm_space, tech.vm_offset);
//!
//! let sum = AmpSegs { tail: 4, input: 6, casc: 6, load: 4 };
//! let lat = AmpSegs { tail: 4, input: 6, casc: 0, load: 4 };
//! let params = ColumnParams {
//!     // two FFE taps, the last DFE tap, then two more DFE taps
//!     seg_sum_list: vec![sum; 5],
//!     seg_ffe_list: vec![lat; 2],
//!     seg_dfe_list: vec![lat; 2],
//!     flip_sign_list: vec![false, false, true, false, true],
//!     seg_div: DivSegs { nand: 2, inv: 4, sr: 2 },
//!     fg_dum: 4,
//!     fg_min_last: 0,
//! };
//! let column = SummerColumn::new(&tech, &mgr, &grid, params)?;
//! assert!(column.ports().has("outp<0>"));
//! assert!(column.ports().has("inp_d<3>"));
//! # Ok::<(), eqsummer::error::Error>(())
//! ```
#![warn(missing_docs)]

pub mod alloc;
pub mod amp;
pub mod column;
pub mod config;
mod connect;
pub mod digital;
pub mod error;
pub mod layout;
pub mod row;
pub mod tap;
pub mod tracks;
