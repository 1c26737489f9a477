//! Per-unit signal track allocation.
//!
//! As unit cells are placed left to right, each unit claims a batch of
//! vertical tracks to the left of its output bus. Allocation threads a
//! [`PlaceState`] through the sequence: the previous unit's data-bus
//! edge constrains the horizontal position of the next unit, and the
//! previous batch's last track constrains where the next batch starts.

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tracks::{SigKind, TrackGrid, TrackManager};

/// A batch of named signal tracks requested by one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigSpec {
    kinds: Vec<SigKind>,
    names: Vec<ArcStr>,
    right_anchor: bool,
}

impl SigSpec {
    /// Creates a signal specification.
    ///
    /// `kinds` and `names` must be non-empty and of the same length. If
    /// `right_anchor` is set, the batch is packed against the unit's
    /// output bus on the right; otherwise it is packed against the
    /// previous batch on the left.
    pub fn new(
        kinds: Vec<SigKind>,
        names: Vec<ArcStr>,
        right_anchor: bool,
    ) -> Result<Self> {
        if kinds.len() != names.len() {
            return Err(Error::SignalSpecMismatch {
                num_kinds: kinds.len(),
                num_names: names.len(),
            });
        }
        if kinds.is_empty() {
            return Err(Error::EmptySignalSpec);
        }
        Ok(Self {
            kinds,
            names,
            right_anchor,
        })
    }

    /// The track kinds of this batch, in order.
    pub fn kinds(&self) -> &[SigKind] {
        &self.kinds
    }

    /// The signal names of this batch, in order.
    pub fn names(&self) -> &[ArcStr] {
        &self.names
    }

    /// Whether the batch is packed against the output bus.
    pub fn right_anchor(&self) -> bool {
        self.right_anchor
    }

    /// The kind of the first track in the batch.
    pub fn first_kind(&self) -> SigKind {
        self.kinds[0]
    }

    /// The kind of the last track in the batch.
    pub fn last_kind(&self) -> SigKind {
        self.kinds[self.kinds.len() - 1]
    }
}

/// An append-only table of named track indices.
///
/// Recording the same name twice appends; earlier records are never
/// overwritten, so repeated names (supply shields in particular)
/// accumulate every track they were assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo(IndexMap<ArcStr, Vec<i64>>);

impl TrackInfo {
    /// Creates an empty track table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a track index under the given name.
    pub fn record(&mut self, name: impl Into<ArcStr>, track: i64) {
        self.0.entry(name.into()).or_default().push(track);
    }

    /// Returns all tracks recorded under the given name.
    pub fn get(&self, name: &str) -> Result<&[i64]> {
        self.0
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingTrack(name.into()))
    }

    /// Returns the first track recorded under the given name.
    pub fn first(&self, name: &str) -> Result<i64> {
        Ok(self.get(name)?[0])
    }

    /// Returns whether any track is recorded under the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterates over all records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &[i64])> {
        self.0.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

/// Placement state threaded through a left-to-right unit sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceState {
    /// Track width of the previous unit's trailing data wire.
    pub prev_data_width: i64,
    /// Track index of the previous unit's trailing data wire, if any.
    pub prev_data_track: Option<i64>,
    /// Kind of the last allocated track, if any.
    pub prev_kind: Option<SigKind>,
    /// Index of the last allocated track.
    pub prev_track: i64,
    /// Right edge of the previously placed unit, if any.
    pub edge_x: Option<i64>,
}

impl Default for PlaceState {
    fn default() -> Self {
        Self {
            prev_data_width: 1,
            prev_data_track: None,
            prev_kind: None,
            prev_track: 0,
            edge_x: None,
        }
    }
}

/// The result of allocating one unit's signal batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// The leading track index: the lowest track of the unit's output
    /// bus region.
    pub ltr: i64,
    /// The offset applied to the batch's relative positions.
    pub offset: i64,
    /// The batch's relative track positions, before the offset.
    pub locs: Vec<i64>,
}

impl Allocation {
    /// The absolute track of the batch entry at the given position.
    pub fn track(&self, idx: usize) -> i64 {
        self.locs[idx] + self.offset
    }
}

/// Allocates one unit's signal batch and records it in `info`.
///
/// `data_xl` is the leftmost coordinate at which the unit's own
/// leading-edge bus wires may be placed. If `reserve_out` is set, room
/// for a shield and an output wire is reserved between this batch and
/// the leading track, for units whose output bus follows to the right.
pub fn allocate(
    mgr: &TrackManager,
    grid: &TrackGrid,
    spec: &SigSpec,
    data_xl: i64,
    state: &PlaceState,
    reserve_out: bool,
    info: &mut TrackInfo,
) -> Allocation {
    let w_out = mgr.width(SigKind::Out);
    let mut ltr = grid.find_next(data_xl, w_out);

    let locs = mgr.place(spec.kinds());
    let left_delta = match state.prev_kind {
        Some(kind) => mgr.sep(kind, spec.first_kind()),
        None => locs[0],
    };
    let right_delta = if reserve_out {
        let right_locs = mgr.place(&[spec.last_kind(), SigKind::Shield, SigKind::Out]);
        right_locs[2] - right_locs[0]
    } else {
        0
    };
    ltr = ltr.max(state.prev_track + left_delta + locs[locs.len() - 1] - locs[0] + right_delta);

    let offset = if spec.right_anchor() {
        ltr - right_delta - locs[locs.len() - 1]
    } else {
        state.prev_track + left_delta - locs[0]
    };
    for (name, &loc) in spec.names().iter().zip(locs.iter()) {
        info.record(name.clone(), loc + offset);
    }
    tracing::debug!(ltr, offset, n = locs.len(), "allocated signal batch");

    Allocation { ltr, offset, locs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackConfig;

    fn mgr() -> TrackManager {
        TrackManager::new(&TrackConfig::with_wide_signals()).unwrap()
    }

    fn grid() -> TrackGrid {
        TrackGrid::new(32, 32, 0)
    }

    fn spec(right_anchor: bool) -> SigSpec {
        SigSpec::new(
            vec![SigKind::Shield, SigKind::Clk, SigKind::Clk, SigKind::Shield],
            vec!["VSS".into(), "clkp".into(), "clkn".into(), "VSS".into()],
            right_anchor,
        )
        .unwrap()
    }

    #[test]
    fn spec_length_mismatch_is_rejected() {
        let err = SigSpec::new(vec![SigKind::Out], vec![], false).unwrap_err();
        assert_eq!(
            err,
            Error::SignalSpecMismatch {
                num_kinds: 1,
                num_names: 0,
            }
        );
    }

    #[test]
    fn empty_spec_is_rejected() {
        let err = SigSpec::new(vec![], vec![], false).unwrap_err();
        assert_eq!(err, Error::EmptySignalSpec);
    }

    #[test]
    fn track_info_is_append_only() {
        let mut info = TrackInfo::new();
        info.record("VSS", 3);
        info.record("clkp", 5);
        info.record("VSS", 11);
        assert_eq!(info.get("VSS").unwrap(), &[3, 11]);
        assert_eq!(info.first("clkp").unwrap(), 5);
        assert!(info.get("clkn").is_err());
    }

    #[test]
    fn left_anchored_batch_packs_against_previous_track() {
        let mgr = mgr();
        let mut info = TrackInfo::new();
        let state = PlaceState {
            prev_kind: Some(SigKind::Shield),
            prev_track: 10,
            ..PlaceState::default()
        };
        let alloc = allocate(&mgr, &grid(), &spec(false), 0, &state, true, &mut info);
        // first track sits exactly one separation past the previous one
        assert_eq!(
            alloc.track(0),
            10 + mgr.sep(SigKind::Shield, SigKind::Shield)
        );
        // consecutive batch tracks respect pairwise separations
        let kinds = spec(false);
        for i in 1..kinds.kinds().len() {
            assert!(
                alloc.track(i) - alloc.track(i - 1)
                    >= mgr.sep(kinds.kinds()[i - 1], kinds.kinds()[i])
            );
        }
        // the leading track clears the batch and the reserved output room
        assert!(alloc.ltr >= alloc.track(3));
    }

    #[test]
    fn right_anchored_batch_packs_against_leading_track() {
        let mgr = mgr();
        let mut info = TrackInfo::new();
        let state = PlaceState {
            prev_kind: Some(SigKind::Shield),
            prev_track: 0,
            ..PlaceState::default()
        };
        // large data_xl forces the leading track far right
        let alloc = allocate(&mgr, &grid(), &spec(true), 5000, &state, true, &mut info);
        let right_locs = mgr.place(&[SigKind::Shield, SigKind::Shield, SigKind::Out]);
        let right_delta = right_locs[2] - right_locs[0];
        assert_eq!(alloc.track(3), alloc.ltr - right_delta);
        assert_eq!(info.first("clkp").unwrap(), alloc.track(1));
    }

    #[test]
    fn leading_track_clears_the_data_coordinate() {
        let mgr = mgr();
        let grid = grid();
        let mut info = TrackInfo::new();
        let alloc = allocate(
            &mgr,
            &grid,
            &spec(false),
            777,
            &PlaceState::default(),
            false,
            &mut info,
        );
        let w_out = mgr.width(SigKind::Out);
        assert!(grid.wire_span(alloc.ltr, w_out).start() >= 777);
    }

    #[test]
    fn chained_batches_use_strictly_increasing_tracks() {
        let mgr = mgr();
        let grid = grid();
        let mut info = TrackInfo::new();
        let mut state = PlaceState::default();
        let specs = [
            SigSpec::new(
                vec![SigKind::Shield, SigKind::Out, SigKind::Out, SigKind::Shield],
                vec!["VSS".into(), "outp<0>".into(), "outn<0>".into(), "VSS".into()],
                false,
            )
            .unwrap(),
            spec(false),
            SigSpec::new(
                vec![SigKind::Shield, SigKind::Out, SigKind::Out, SigKind::Shield],
                vec!["VSS".into(), "outp<1>".into(), "outn<1>".into(), "VSS".into()],
                true,
            )
            .unwrap(),
        ];
        let mut data_xl = 0;
        let mut tracks = Vec::new();
        for spec in &specs {
            let alloc = allocate(&mgr, &grid, spec, data_xl, &state, true, &mut info);
            let n = spec.kinds().len();
            tracks.extend((0..n).map(|i| alloc.track(i)));
            state.prev_data_width = mgr.width(spec.kinds()[n - 2]);
            state.prev_data_track = Some(alloc.track(n - 2));
            state.prev_kind = Some(spec.last_kind());
            state.prev_track = alloc.track(n - 1);
            data_xl = grid.wire_span(alloc.ltr, mgr.width(SigKind::Out)).stop();
        }
        for pair in tracks.windows(2) {
            assert!(pair[1] > pair[0], "tracks not increasing: {tracks:?}");
        }
    }

    #[test]
    fn first_batch_starts_at_track_zero() {
        let mgr = mgr();
        let mut info = TrackInfo::new();
        let alloc = allocate(
            &mgr,
            &grid(),
            &spec(false),
            0,
            &PlaceState::default(),
            false,
            &mut info,
        );
        assert_eq!(alloc.offset, 0);
        assert_eq!(alloc.track(0), alloc.locs[0]);
    }
}
