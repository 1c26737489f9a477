//! The integrating amplifier dimension model.
//!
//! An amplifier master is a fixed-width block derived purely from its
//! parameters: a differential gm core flanked by edge dummy fingers.
//! Masters expose their finger counts, bounding box, pin wires, and
//! the leading-edge coordinates that constrain vertical bus placement
//! next to them.

use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::Tech;
use crate::error::{Error, Result};
use crate::layout::{Cell, Ports, Wire};
use crate::tracks::TrackGrid;

/// Segment counts for one integrating amplifier.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AmpSegs {
    /// Tail current source segments.
    pub tail: i64,
    /// Differential input pair segments.
    pub input: i64,
    /// Cascode segments; zero if the amplifier has no cascode.
    pub casc: i64,
    /// Load segments.
    pub load: i64,
}

impl AmpSegs {
    fn max_seg(&self) -> i64 {
        self.tail.max(self.input).max(self.casc).max(self.load)
    }

    fn validate(&self, name: &'static str) -> Result<()> {
        let min_seg = self.tail.min(self.input).min(self.casc).min(self.load);
        if min_seg < 0 {
            return Err(Error::NegativeFingers {
                name: name.into(),
                value: min_seg,
            });
        }
        if self.max_seg() == 0 {
            return Err(Error::EmptySegments(name.into()));
        }
        Ok(())
    }
}

/// The cascode wiring style of an amplifier.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CascMode {
    /// No cascode pins.
    #[default]
    None,
    /// A single cascode bias pin, `casc`.
    Cascode,
    /// A sign-select cascode pair, `casc<0>` and `casc<1>`.
    SignSelect,
}

/// Which outer edges of a block sit on the boundary of the full array.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeEnds {
    /// The block's left edge is the array's left boundary.
    pub left: bool,
    /// The block's right edge is the array's right boundary.
    pub right: bool,
}

/// Parameters of an amplifier master.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AmpParams {
    /// Segment counts of the gm core.
    pub segs: AmpSegs,
    /// Cascode wiring style.
    pub casc_mode: CascMode,
    /// Left edge dummy fingers.
    pub fg_duml: i64,
    /// Right edge dummy fingers.
    pub fg_dumr: i64,
    /// Minimum total finger count; extra fingers pad the dummies.
    pub fg_min: i64,
    /// Array boundary flags.
    pub end: EdgeEnds,
}

/// Schematic-facing parameters of an amplifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmpSchParams {
    /// Segment counts of the gm core.
    pub segs: AmpSegs,
    /// Cascode wiring style.
    pub casc_mode: CascMode,
    /// Total fingers, including dummies.
    pub fg_tot: i64,
}

/// Pin row positions within an amplifier, as fractions (k/40) of the
/// amplifier height. Dimensions in [`Tech`] keep these on-grid.
const PIN_ROWS: &[(&str, i64)] = &[
    ("biasp", 5),
    ("clkp", 9),
    ("clkn", 11),
    ("en<3>", 13),
    ("en<2>", 15),
    ("inp", 17),
    ("inn", 19),
    ("outp", 33),
    ("outn", 35),
];

const VSS_ROW: i64 = 1;
const VDD_ROW: i64 = 39;
const CASC0_ROW: i64 = 21;
const CASC1_ROW: i64 = 23;

/// An immutable amplifier master.
#[derive(Debug, Clone)]
pub struct AmpMaster {
    params: AmpParams,
    fg_core: i64,
    fg_tot: i64,
    fg_duml: i64,
    fg_dumr: i64,
    sd_pitch: i64,
    line_end: i64,
    bbox: Rect,
    ports: Ports,
}

impl AmpMaster {
    /// Derives an amplifier master from its parameters.
    ///
    /// The core is `2 * max(segs)` fingers wide; dummies pad each side.
    /// If the padded width falls short of `fg_min`, the shortfall is
    /// split between the two dummy regions.
    pub fn new(tech: &Tech, name: &'static str, params: AmpParams) -> Result<Self> {
        params.segs.validate(name)?;
        for (pname, value) in [
            ("fg_duml", params.fg_duml),
            ("fg_dumr", params.fg_dumr),
            ("fg_min", params.fg_min),
        ] {
            if value < 0 {
                return Err(Error::NegativeFingers {
                    name: pname.into(),
                    value,
                });
            }
        }

        let fg_core = 2 * params.segs.max_seg();
        let mut fg_duml = params.fg_duml;
        let mut fg_dumr = params.fg_dumr;
        let extra = params.fg_min - (fg_core + fg_duml + fg_dumr);
        if extra > 0 {
            fg_duml += extra / 2;
            fg_dumr += extra - extra / 2;
        }
        let fg_tot = fg_core + fg_duml + fg_dumr;

        tracing::debug!(name, fg_core, fg_tot, "derived amplifier dimensions");

        let bbox = Rect::from_sides(0, 0, fg_tot * tech.sd_pitch, tech.amp_height);
        let ports = Self::build_ports(tech, params, fg_tot, fg_duml, fg_dumr);
        Ok(Self {
            params,
            fg_core,
            fg_tot,
            fg_duml,
            fg_dumr,
            sd_pitch: tech.sd_pitch,
            line_end: tech.line_end,
            bbox,
            ports,
        })
    }

    fn build_ports(tech: &Tech, params: AmpParams, fg_tot: i64, fg_duml: i64, fg_dumr: i64) -> Ports {
        let row_y = |k: i64| tech.amp_height * k / 40;
        let full = Span::until(fg_tot * tech.sd_pitch);
        let core = Span::new(fg_duml * tech.sd_pitch, (fg_tot - fg_dumr) * tech.sd_pitch);

        let mut ports = Ports::new();
        ports.add("VSS", Wire::horiz(row_y(VSS_ROW), full));
        for &(name, k) in PIN_ROWS {
            ports.add(name, Wire::horiz(row_y(k), core));
        }
        match params.casc_mode {
            CascMode::None => {}
            CascMode::Cascode => {
                ports.add("casc", Wire::horiz(row_y(CASC0_ROW), core));
            }
            CascMode::SignSelect => {
                ports.add("casc<0>", Wire::horiz(row_y(CASC0_ROW), core));
                ports.add("casc<1>", Wire::horiz(row_y(CASC1_ROW), core));
            }
        }
        ports.add("VDD", Wire::horiz(row_y(VDD_ROW), full));
        ports
    }

    /// Rebuilds this master with the given absolute dummy finger counts.
    pub fn with_dummies(&self, tech: &Tech, fg_duml: i64, fg_dumr: i64) -> Result<Self> {
        Self::new(
            tech,
            "amp",
            AmpParams {
                fg_duml,
                fg_dumr,
                ..self.params
            },
        )
    }

    /// The parameters this master was derived from.
    pub fn params(&self) -> &AmpParams {
        &self.params
    }

    /// Core fingers, excluding dummies.
    pub fn fg_core(&self) -> i64 {
        self.fg_core
    }

    /// Total fingers, including dummies.
    pub fn fg_tot(&self) -> i64 {
        self.fg_tot
    }

    /// Effective left dummy fingers, after `fg_min` padding.
    pub fn fg_duml(&self) -> i64 {
        self.fg_duml
    }

    /// Effective right dummy fingers, after `fg_min` padding.
    pub fn fg_dumr(&self) -> i64 {
        self.fg_dumr
    }

    /// The source/drain pitch this master was built on.
    pub fn sd_pitch(&self) -> i64 {
        self.sd_pitch
    }

    /// The leading-edge coordinate for vertical wires of the given
    /// track width next to this block.
    ///
    /// For [`Side::Left`], returns the rightmost coordinate a foreign
    /// vertical wire approaching from the left may reach; for
    /// [`Side::Right`], the leftmost coordinate at which this block's
    /// own leading-edge wires may start.
    ///
    /// # Panics
    ///
    /// Panics if `side` is not a horizontal side.
    pub fn vm_coord(&self, grid: &TrackGrid, width: i64, side: Side) -> i64 {
        let clearance = self.line_end + grid.wire_width(width) / 2;
        match side {
            Side::Left => self.fg_duml * self.sd_pitch - clearance,
            Side::Right => (self.fg_tot - self.fg_dumr) * self.sd_pitch + clearance,
            _ => panic!("vm_coord is only defined for the left and right edges"),
        }
    }

    /// Schematic parameters of this master.
    pub fn sch_params(&self) -> AmpSchParams {
        AmpSchParams {
            segs: self.params.segs,
            casc_mode: self.params.casc_mode,
            fg_tot: self.fg_tot,
        }
    }
}

impl Cell for AmpMaster {
    fn bbox(&self) -> Rect {
        self.bbox
    }
    fn ports(&self) -> &Ports {
        &self.ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs() -> AmpSegs {
        AmpSegs {
            tail: 4,
            input: 6,
            casc: 4,
            load: 4,
        }
    }

    fn params() -> AmpParams {
        AmpParams {
            segs: segs(),
            casc_mode: CascMode::Cascode,
            fg_duml: 4,
            fg_dumr: 4,
            fg_min: 0,
            end: EdgeEnds::default(),
        }
    }

    #[test]
    fn core_width_follows_widest_row() {
        let tech = Tech::default();
        let amp = AmpMaster::new(&tech, "summer", params()).unwrap();
        assert_eq!(amp.fg_core(), 12);
        assert_eq!(amp.fg_tot(), 20);
        assert_eq!(amp.bbox().width(), 20 * tech.sd_pitch);
        assert!(amp.ports().has("casc"));
        assert!(!amp.ports().has("casc<0>"));
    }

    #[test]
    fn fg_min_pads_dummies_evenly() {
        let tech = Tech::default();
        let amp = AmpMaster::new(
            &tech,
            "summer",
            AmpParams {
                fg_min: 25,
                ..params()
            },
        )
        .unwrap();
        assert_eq!(amp.fg_tot(), 25);
        assert_eq!(amp.fg_duml(), 6);
        assert_eq!(amp.fg_dumr(), 7);
        // re-derivation from the same parameters is idempotent
        let again = AmpMaster::new(&tech, "summer", *amp.params()).unwrap();
        assert_eq!(again.fg_tot(), amp.fg_tot());
        assert_eq!(again.fg_duml(), amp.fg_duml());
    }

    #[test]
    fn empty_and_negative_segments_are_rejected() {
        let tech = Tech::default();
        let empty = AmpParams {
            segs: AmpSegs::default(),
            ..params()
        };
        assert!(matches!(
            AmpMaster::new(&tech, "latch", empty),
            Err(Error::EmptySegments(_))
        ));
        let negative = AmpParams {
            fg_duml: -2,
            ..params()
        };
        assert!(matches!(
            AmpMaster::new(&tech, "latch", negative),
            Err(Error::NegativeFingers { .. })
        ));
    }

    #[test]
    fn vm_coords_move_with_dummies() {
        let tech = Tech::default();
        let grid = TrackGrid::new(tech.vm_line, tech.vm_space, tech.vm_offset);
        let amp = AmpMaster::new(&tech, "summer", params()).unwrap();
        // re-deriving with the existing dummy counts changes nothing
        let same = amp.with_dummies(&tech, amp.fg_duml(), amp.fg_dumr()).unwrap();
        assert_eq!(same.fg_tot(), amp.fg_tot());
        assert_eq!(
            same.vm_coord(&grid, 1, Side::Left),
            amp.vm_coord(&grid, 1, Side::Left)
        );
        let wider = amp.with_dummies(&tech, 8, 4).unwrap();
        assert!(wider.vm_coord(&grid, 1, Side::Left) > amp.vm_coord(&grid, 1, Side::Left));
        assert_eq!(
            wider.vm_coord(&grid, 1, Side::Right),
            amp.vm_coord(&grid, 1, Side::Right) + 4 * tech.sd_pitch
        );
        // wider wires need more clearance on both sides
        assert!(amp.vm_coord(&grid, 2, Side::Left) < amp.vm_coord(&grid, 1, Side::Left));
        assert!(amp.vm_coord(&grid, 2, Side::Right) > amp.vm_coord(&grid, 1, Side::Right));
    }
}
