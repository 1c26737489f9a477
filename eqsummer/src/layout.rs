//! Layout primitives: wires, ports, placed instances, and a cell builder.

use std::sync::Arc;

use arcstr::ArcStr;
use geometry::prelude::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tracks::TrackGrid;

/// A rectangular wire on a routing layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wire {
    /// The routing direction.
    pub dir: Dir,
    /// The physical center coordinate along the axis perpendicular to `dir`.
    pub center: i64,
    /// The wire width, in routing tracks.
    pub width: i64,
    /// The physical extent along `dir`.
    pub span: Span,
}

impl Wire {
    /// Creates a unit-width horizontal wire centered at `y`.
    pub fn horiz(y: i64, span: Span) -> Self {
        Self {
            dir: Dir::Horiz,
            center: y,
            width: 1,
            span,
        }
    }

    /// Creates a vertical wire of the given track width centered at `x`.
    pub fn vert(x: i64, width: i64, span: Span) -> Self {
        Self {
            dir: Dir::Vert,
            center: x,
            width,
            span,
        }
    }

    /// Transforms this wire by an instance placement.
    pub fn transformed(&self, loc: Point, orient: Orientation) -> Self {
        let (center, span) = match self.dir {
            Dir::Horiz => {
                let y = if orient.flips_y() {
                    -self.center
                } else {
                    self.center
                };
                let span = if orient.flips_x() {
                    self.span.mirror()
                } else {
                    self.span
                };
                (loc.y + y, span.translate(loc.x))
            }
            Dir::Vert => {
                let x = if orient.flips_x() {
                    -self.center
                } else {
                    self.center
                };
                let span = if orient.flips_y() {
                    self.span.mirror()
                } else {
                    self.span
                };
                (loc.x + x, span.translate(loc.y))
            }
        };
        Self {
            dir: self.dir,
            center,
            width: self.width,
            span,
        }
    }
}

/// A named collection of port wires, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ports(IndexMap<ArcStr, Vec<Wire>>);

impl Ports {
    /// Creates an empty port map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a wire to the port with the given name, creating the port
    /// if it does not yet exist.
    pub fn add(&mut self, name: impl Into<ArcStr>, wire: Wire) {
        self.0.entry(name.into()).or_default().push(wire);
    }

    /// Adds several wires to the port with the given name.
    pub fn add_all(&mut self, name: impl Into<ArcStr>, wires: impl IntoIterator<Item = Wire>) {
        self.0.entry(name.into()).or_default().extend(wires);
    }

    /// Returns whether a port with the given name exists.
    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the wires of the port with the given name.
    pub fn get(&self, name: &str) -> Result<&[Wire]> {
        self.0
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingPort(name.into()))
    }

    /// Iterates over port names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &ArcStr> {
        self.0.keys()
    }

    /// Iterates over ports in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &[Wire])> {
        self.0.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// The number of distinct port names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no ports.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A layout master: a fixed cell with a bounding box and ports.
pub trait Cell {
    /// The bounding box of the cell in its own coordinate system.
    fn bbox(&self) -> Rect;
    /// The ports of the cell in its own coordinate system.
    fn ports(&self) -> &Ports;
}

/// A placed instance of a layout master.
#[derive(Debug, Clone)]
pub struct Instance<M> {
    master: Arc<M>,
    loc: Point,
    orient: Orientation,
}

impl<M: Cell> Instance<M> {
    /// Places a master at the given location and orientation.
    ///
    /// The master's origin maps to `loc`; the master's geometry is
    /// transformed by `orient` about its origin before translation.
    pub fn new(master: Arc<M>, loc: Point, orient: Orientation) -> Self {
        Self {
            master,
            loc,
            orient,
        }
    }

    /// Returns the master of this instance.
    pub fn master(&self) -> &M {
        &self.master
    }

    /// Returns a shared handle to the master of this instance.
    pub fn master_arc(&self) -> &Arc<M> {
        &self.master
    }

    /// Returns the placement location of this instance.
    pub fn loc(&self) -> Point {
        self.loc
    }

    /// Returns the orientation of this instance.
    pub fn orient(&self) -> Orientation {
        self.orient
    }

    /// The bounding box of this instance in parent coordinates.
    pub fn bbox(&self) -> Rect {
        self.orient.apply_rect(self.master.bbox()).translate(self.loc)
    }

    /// Returns whether the master has a port with the given name.
    pub fn has_port(&self, name: &str) -> bool {
        self.master.ports().has(name)
    }

    /// Returns the wires of the named port, in parent coordinates.
    pub fn port(&self, name: &str) -> Result<Vec<Wire>> {
        Ok(self
            .master
            .ports()
            .get(name)?
            .iter()
            .map(|w| w.transformed(self.loc, self.orient))
            .collect())
    }

    /// Returns the first wire of the named port, in parent coordinates.
    pub fn port_wire(&self, name: &str) -> Result<Wire> {
        self.port(name)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::MissingPort(name.into()))
    }
}

/// Accumulates the wires and ports of a cell under construction.
#[derive(Debug, Clone)]
pub struct CellBuilder {
    grid: TrackGrid,
    wires: Vec<Wire>,
    ports: Ports,
}

impl CellBuilder {
    /// Creates a new cell builder routing on the given track grid.
    pub fn new(grid: TrackGrid) -> Self {
        Self {
            grid,
            wires: Vec::new(),
            ports: Ports::new(),
        }
    }

    /// The track grid this builder routes on.
    pub fn grid(&self) -> &TrackGrid {
        &self.grid
    }

    /// The wires drawn so far.
    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Draws a single wire.
    pub fn draw(&mut self, wire: Wire) {
        self.wires.push(wire);
    }

    /// Merges collinear wires: wires sharing a direction, center, and
    /// width are joined into one wire spanning their union. The merged
    /// wires are drawn and returned in first-seen order.
    pub fn connect_wires(&mut self, wires: impl IntoIterator<Item = Wire>) -> Vec<Wire> {
        self.merge_wires(wires, None)
    }

    /// Like [`CellBuilder::connect_wires`], but extends every merged
    /// wire to cover at least the given span.
    pub fn connect_wires_within(
        &mut self,
        wires: impl IntoIterator<Item = Wire>,
        span: Span,
    ) -> Vec<Wire> {
        self.merge_wires(wires, Some(span))
    }

    fn merge_wires(
        &mut self,
        wires: impl IntoIterator<Item = Wire>,
        within: Option<Span>,
    ) -> Vec<Wire> {
        let mut merged: IndexMap<(Dir, i64, i64), Span> = IndexMap::new();
        for w in wires {
            merged
                .entry((w.dir, w.center, w.width))
                .and_modify(|s| *s = s.union(w.span))
                .or_insert(w.span);
        }
        let out: Vec<Wire> = merged
            .into_iter()
            .map(|((dir, center, width), span)| Wire {
                dir,
                center,
                width,
                span: match within {
                    Some(s) => span.union(s),
                    None => span,
                },
            })
            .collect();
        self.wires.extend(out.iter().copied());
        out
    }

    /// Draws a vertical wire on the given track connecting the centers
    /// of the given horizontal wires.
    ///
    /// # Panics
    ///
    /// Panics if `wires` is empty.
    pub fn connect_to_tracks(&mut self, wires: &[Wire], track: i64, width: i64) -> Wire {
        let span = Span::union_all(wires.iter().map(|w| Span::from_point(w.center)));
        let span = span.expect("cannot connect zero wires to a track");
        self.connect_span_to_track(span, track, width)
    }

    /// Like [`CellBuilder::connect_to_tracks`], but extends the
    /// vertical wire to cover at least the given span.
    pub fn connect_to_tracks_within(
        &mut self,
        wires: &[Wire],
        track: i64,
        width: i64,
        within: Span,
    ) -> Wire {
        let span = wires
            .iter()
            .map(|w| Span::from_point(w.center))
            .fold(within, Span::union);
        self.connect_span_to_track(span, track, width)
    }

    fn connect_span_to_track(&mut self, span: Span, track: i64, width: i64) -> Wire {
        let wire = Wire::vert(self.grid.center(track), width, span);
        self.wires.push(wire);
        wire
    }

    /// Draws a differential pair of vertical wires on the given tracks.
    ///
    /// Both wires share a common span covering the centers of all
    /// connected horizontal wires, keeping the pair symmetric.
    pub fn connect_differential_tracks(
        &mut self,
        pwires: &[Wire],
        nwires: &[Wire],
        ptrack: i64,
        ntrack: i64,
        width: i64,
    ) -> (Wire, Wire) {
        let span = Span::union_all(
            pwires
                .iter()
                .chain(nwires.iter())
                .map(|w| Span::from_point(w.center)),
        )
        .expect("cannot connect a differential pair with no wires");
        let p = self.connect_span_to_track(span, ptrack, width);
        let n = self.connect_span_to_track(span, ntrack, width);
        (p, n)
    }

    /// Labels the given wires as a port.
    pub fn add_pin(&mut self, name: impl Into<ArcStr>, wires: impl IntoIterator<Item = Wire>) {
        self.ports.add_all(name, wires);
    }

    /// Consumes the builder, returning its ports and drawn wires.
    pub fn finish(self) -> (Ports, Vec<Wire>) {
        (self.ports, self.wires)
    }
}
