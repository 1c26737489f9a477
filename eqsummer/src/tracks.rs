//! Routing track arithmetic on the vertical signal layer.
//!
//! Vertical wires are identified by integer track indices on a uniform
//! grid. The [`TrackManager`] answers placement queries over lists of
//! signal classes, returning relative track positions that satisfy the
//! per-class width and spacing rules; the [`TrackGrid`] converts
//! between track indices and physical coordinates.

use geometry::span::Span;
use num::Integer;
use serde::{Deserialize, Serialize};

use crate::config::TrackConfig;
use crate::error::{Error, Result};

/// The signal classes distinguished by track placement rules.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigKind {
    /// A supply shield wire.
    Shield,
    /// A differential data output wire.
    Out,
    /// A clock wire.
    Clk,
    /// A cascode bias or sign-select wire.
    Casc,
    /// An enable wire.
    En,
}

impl SigKind {
    /// All signal classes, in placement-rule order.
    pub const ALL: [SigKind; 5] = [
        SigKind::Shield,
        SigKind::Out,
        SigKind::Clk,
        SigKind::Casc,
        SigKind::En,
    ];

    const fn index(self) -> usize {
        match self {
            SigKind::Shield => 0,
            SigKind::Out => 1,
            SigKind::Clk => 2,
            SigKind::Casc => 3,
            SigKind::En => 4,
        }
    }
}

/// Computes track widths and minimum separations for signal classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackManager {
    widths: [i64; 5],
    spaces: [i64; 5],
}

impl Default for TrackManager {
    fn default() -> Self {
        Self {
            widths: [1; 5],
            spaces: [1; 5],
        }
    }
}

impl TrackManager {
    /// Creates a new [`TrackManager`] from a track configuration.
    ///
    /// All configured widths and spacings must be at least 1.
    pub fn new(cfg: &TrackConfig) -> Result<Self> {
        let mut mgr = Self::default();
        for (&kind, &w) in cfg.widths.iter() {
            if w < 1 {
                return Err(Error::InvalidTrackConfig(arcstr::format!(
                    "width {w} for {kind:?} is less than 1"
                )));
            }
            mgr.widths[kind.index()] = w;
        }
        for (&kind, &sp) in cfg.spaces.iter() {
            if sp < 1 {
                return Err(Error::InvalidTrackConfig(arcstr::format!(
                    "spacing {sp} for {kind:?} is less than 1"
                )));
            }
            mgr.spaces[kind.index()] = sp;
        }
        Ok(mgr)
    }

    /// Returns the track width of the given signal class.
    pub fn width(&self, kind: SigKind) -> i64 {
        self.widths[kind.index()]
    }

    /// Returns the track spacing between two signal classes.
    ///
    /// The spacing is the larger of the two per-class entries.
    pub fn space(&self, a: SigKind, b: SigKind) -> i64 {
        self.spaces[a.index()].max(self.spaces[b.index()])
    }

    /// The tracks below the center occupied by a width-`w` wire.
    fn extent_lo(w: i64) -> i64 {
        (w - 1) / 2
    }

    /// The tracks above the center occupied by a width-`w` wire.
    fn extent_hi(w: i64) -> i64 {
        w / 2
    }

    fn step(&self, a: SigKind, b: SigKind) -> i64 {
        Self::extent_hi(self.width(a)) + self.space(a, b) + Self::extent_lo(self.width(b))
    }

    /// Places a list of wires with the given signal classes on
    /// consecutive legal tracks, returning their relative positions.
    ///
    /// The first wire is placed on the lowest track on which it fits
    /// with its lower extent at or above track 0; each subsequent wire
    /// is placed as close to its predecessor as the spacing rules
    /// allow. Positions are strictly increasing.
    pub fn place(&self, kinds: &[SigKind]) -> Vec<i64> {
        let mut locs = Vec::with_capacity(kinds.len());
        let mut pos = 0;
        for (i, &kind) in kinds.iter().enumerate() {
            pos = if i == 0 {
                Self::extent_lo(self.width(kind))
            } else {
                pos + self.step(kinds[i - 1], kind)
            };
            locs.push(pos);
        }
        locs
    }

    /// Returns the minimum track separation between wires of classes
    /// `a` and `b`, derived from a two-wire placement query.
    pub fn sep(&self, a: SigKind, b: SigKind) -> i64 {
        let locs = self.place(&[a, b]);
        locs[1] - locs[0]
    }
}

/// A rounding mode for coordinate-to-track conversion.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RoundingMode {
    /// Rounds to the nearest track.
    Nearest,
    /// Rounds towards negative infinity.
    Down,
    /// Rounds towards positive infinity.
    Up,
}

/// A uniform grid of vertical routing tracks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackGrid {
    /// The width of a single track.
    line: i64,
    /// The spacing between adjacent tracks.
    space: i64,
    /// The coordinate at which track 0 starts.
    offset: i64,
}

impl TrackGrid {
    /// Creates a uniform track grid.
    ///
    /// # Panics
    ///
    /// Panics if the line width or spacing is not a positive even
    /// integer (odd values produce track centers off the coordinate
    /// grid).
    pub fn new(line: i64, space: i64, offset: i64) -> Self {
        assert!(line > 0, "track width must be positive");
        assert!(space > 0, "track spacing must be positive");
        assert_eq!(line % 2, 0, "track width must be even");
        assert_eq!(space % 2, 0, "track spacing must be even");
        Self {
            line,
            space,
            offset,
        }
    }

    /// The center-to-center pitch between adjacent tracks.
    pub fn pitch(&self) -> i64 {
        self.line + self.space
    }

    /// The center coordinate of the given track.
    pub fn center(&self, idx: i64) -> i64 {
        self.offset + idx * self.pitch() + self.line / 2
    }

    /// The physical extent of a track of the given index.
    pub fn track(&self, idx: i64) -> Span {
        let start = self.offset + idx * self.pitch();
        Span::new(start, start + self.line)
    }

    /// The physical width of a wire spanning `width` tracks.
    pub fn wire_width(&self, width: i64) -> i64 {
        width * self.line + (width - 1) * self.space
    }

    /// The physical extent of a wire of the given track width centered
    /// on the given track.
    pub fn wire_span(&self, idx: i64, width: i64) -> Span {
        Span::with_center_and_length(self.center(idx), self.wire_width(width))
    }

    /// Converts a physical coordinate to a track index under the given
    /// rounding mode, measured against track centers.
    pub fn to_track_idx(&self, coord: i64, mode: RoundingMode) -> i64 {
        let pitch = self.pitch();
        let x = coord - self.offset - self.line / 2;
        match mode {
            RoundingMode::Down => Integer::div_floor(&x, &pitch),
            RoundingMode::Up => Integer::div_ceil(&x, &pitch),
            RoundingMode::Nearest => Integer::div_floor(&(2 * x + pitch), &(2 * pitch)),
        }
    }

    /// Returns the lowest track index on which a wire of the given
    /// track width fits entirely at or beyond `coord`.
    pub fn find_next(&self, coord: i64, width: i64) -> i64 {
        self.to_track_idx(coord + self.wire_width(width) / 2, RoundingMode::Up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackConfig;
    use indexmap::IndexMap;

    fn wide_manager() -> TrackManager {
        TrackManager::new(&TrackConfig::with_wide_signals()).unwrap()
    }

    #[test]
    fn rejects_nonpositive_widths_and_spacings() {
        let mut cfg = TrackConfig::default();
        cfg.widths.insert(SigKind::Out, 0);
        assert!(TrackManager::new(&cfg).is_err());
        let mut cfg = TrackConfig::default();
        cfg.spaces.insert(SigKind::Clk, -1);
        assert!(TrackManager::new(&cfg).is_err());
    }

    #[test]
    fn placement_positions_are_strictly_increasing() {
        let mgr = wide_manager();
        let kinds = [
            SigKind::Shield,
            SigKind::Out,
            SigKind::Out,
            SigKind::Shield,
            SigKind::Clk,
            SigKind::Clk,
            SigKind::En,
        ];
        let locs = mgr.place(&kinds);
        assert_eq!(locs.len(), kinds.len());
        for w in locs.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn separation_matches_incremental_placement() {
        let mgr = wide_manager();
        for &a in SigKind::ALL.iter() {
            for &b in SigKind::ALL.iter() {
                let locs = mgr.place(&[a, b]);
                assert_eq!(mgr.sep(a, b), locs[1] - locs[0]);
                assert!(mgr.sep(a, b) >= 1);
            }
        }
    }

    #[test]
    fn placed_wires_do_not_overlap() {
        let mgr = wide_manager();
        let grid = TrackGrid::new(32, 32, 0);
        let kinds = [SigKind::Out, SigKind::Out, SigKind::Shield, SigKind::Clk];
        let locs = mgr.place(&kinds);
        for i in 1..kinds.len() {
            let prev = grid.wire_span(locs[i - 1], mgr.width(kinds[i - 1]));
            let cur = grid.wire_span(locs[i], mgr.width(kinds[i]));
            assert!(prev.stop() <= cur.start());
        }
    }

    #[test]
    fn default_widths_apply_when_unconfigured() {
        let mgr = TrackManager::new(&TrackConfig {
            widths: IndexMap::new(),
            spaces: IndexMap::new(),
        })
        .unwrap();
        for &kind in SigKind::ALL.iter() {
            assert_eq!(mgr.width(kind), 1);
        }
    }

    #[test]
    fn track_index_conversions() {
        let grid = TrackGrid::new(32, 32, 0);
        assert_eq!(grid.pitch(), 64);
        assert_eq!(grid.center(0), 16);
        assert_eq!(grid.center(3), 208);
        assert_eq!(grid.track(1), Span::new(64, 96));
        assert_eq!(grid.to_track_idx(16, RoundingMode::Nearest), 0);
        assert_eq!(grid.to_track_idx(17, RoundingMode::Up), 1);
        assert_eq!(grid.to_track_idx(79, RoundingMode::Down), 0);
        assert_eq!(grid.to_track_idx(49, RoundingMode::Nearest), 1);
    }

    #[test]
    fn find_next_clears_the_given_coordinate() {
        let grid = TrackGrid::new(32, 32, 0);
        for coord in [-100, 0, 1, 63, 64, 65, 500] {
            for width in [1, 2, 3] {
                let idx = grid.find_next(coord, width);
                assert!(grid.wire_span(idx, width).start() >= coord);
                if idx > i64::MIN {
                    assert!(grid.wire_span(idx - 1, width).start() < coord);
                }
            }
        }
    }

    #[test]
    fn wire_widths_are_even() {
        let grid = TrackGrid::new(32, 32, 0);
        for width in 1..6 {
            assert_eq!(grid.wire_width(width) % 2, 0);
        }
    }
}
