//! Clock divider and dummy fill blocks occupying the latch row of the
//! last summer cell.

use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::Tech;
use crate::error::{Error, Result};
use crate::layout::{Cell, Ports, Wire};

/// Segment counts for the single-clock divider.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DivSegs {
    /// NAND gate segments in the latch feedback.
    pub nand: i64,
    /// Inverter segments.
    pub inv: i64,
    /// Set/reset device segments.
    pub sr: i64,
}

impl DivSegs {
    fn validate(&self) -> Result<()> {
        let min_seg = self.nand.min(self.inv).min(self.sr);
        if min_seg < 0 {
            return Err(Error::NegativeFingers {
                name: "seg_div".into(),
                value: min_seg,
            });
        }
        if self.nand + self.inv + self.sr == 0 {
            return Err(Error::EmptySegments("seg_div".into()));
        }
        Ok(())
    }
}

/// Schematic-facing parameters of the divider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividerSchParams {
    /// Segment counts.
    pub segs: DivSegs,
    /// True if the divider triggers on the positive clock edge.
    pub pos_edge: bool,
}

/// Pin rows of the divider, as fractions (k/40) of its height.
const DIV_PIN_ROWS: &[(&str, i64)] = &[
    ("en", 7),
    ("scan_s", 11),
    ("clk", 17),
    ("q", 25),
    ("qb", 29),
];

/// A clock divider master.
#[derive(Debug, Clone)]
pub struct DividerMaster {
    segs: DivSegs,
    pos_edge: bool,
    fg_core: i64,
    fg_tot: i64,
    bbox: Rect,
    ports: Ports,
}

impl DividerMaster {
    /// Derives a divider master.
    ///
    /// The divider occupies `2 * (nand + inv + sr)` core columns; if
    /// `fg_min` is larger, dummy columns pad both sides.
    pub fn new(tech: &Tech, segs: DivSegs, pos_edge: bool, fg_min: i64) -> Result<Self> {
        segs.validate()?;
        let fg_core = 2 * (segs.nand + segs.inv + segs.sr);
        let fg_tot = fg_core.max(fg_min);
        let fg_duml = (fg_tot - fg_core) / 2;
        let fg_dumr = fg_tot - fg_core - fg_duml;

        tracing::debug!(fg_core, fg_tot, pos_edge, "derived divider dimensions");

        let row_y = |k: i64| tech.amp_height * k / 40;
        let full = Span::until(fg_tot * tech.sd_pitch);
        let core = Span::new(fg_duml * tech.sd_pitch, (fg_tot - fg_dumr) * tech.sd_pitch);
        let mut ports = Ports::new();
        ports.add("VSS", Wire::horiz(row_y(1), full));
        for &(name, k) in DIV_PIN_ROWS {
            ports.add(name, Wire::horiz(row_y(k), core));
        }
        ports.add("VDD", Wire::horiz(row_y(39), full));

        Ok(Self {
            segs,
            pos_edge,
            fg_core,
            fg_tot,
            bbox: Rect::from_sides(0, 0, fg_tot * tech.sd_pitch, tech.amp_height),
            ports,
        })
    }

    /// Core columns, excluding dummy padding.
    pub fn fg_core(&self) -> i64 {
        self.fg_core
    }

    /// Total columns.
    pub fn fg_tot(&self) -> i64 {
        self.fg_tot
    }

    /// True if the divider triggers on the positive clock edge.
    pub fn pos_edge(&self) -> bool {
        self.pos_edge
    }

    /// Schematic parameters of this master.
    pub fn sch_params(&self) -> DividerSchParams {
        DividerSchParams {
            segs: self.segs,
            pos_edge: self.pos_edge,
        }
    }
}

impl Cell for DividerMaster {
    fn bbox(&self) -> Rect {
        self.bbox
    }
    fn ports(&self) -> &Ports {
        &self.ports
    }
}

/// A dummy fill block with supply rails only.
#[derive(Debug, Clone)]
pub struct DummyMaster {
    fg_tot: i64,
    bbox: Rect,
    ports: Ports,
}

impl DummyMaster {
    /// Creates a dummy fill block spanning the given number of columns.
    pub fn new(tech: &Tech, fg_tot: i64) -> Result<Self> {
        if fg_tot < 0 {
            return Err(Error::NegativeFingers {
                name: "num_col".into(),
                value: fg_tot,
            });
        }
        let row_y = |k: i64| tech.amp_height * k / 40;
        let full = Span::until(fg_tot * tech.sd_pitch);
        let mut ports = Ports::new();
        ports.add("VSS", Wire::horiz(row_y(1), full));
        ports.add("VDD", Wire::horiz(row_y(39), full));
        Ok(Self {
            fg_tot,
            bbox: Rect::from_sides(0, 0, fg_tot * tech.sd_pitch, tech.amp_height),
            ports,
        })
    }

    /// Total columns.
    pub fn fg_tot(&self) -> i64 {
        self.fg_tot
    }
}

impl Cell for DummyMaster {
    fn bbox(&self) -> Rect {
        self.bbox
    }
    fn ports(&self) -> &Ports {
        &self.ports
    }
}
