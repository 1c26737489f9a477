//! Summer tap cells: a summer amplifier stacked with its latch, and
//! the last-cell variant that carries a clock divider or dummy fill.

use std::sync::Arc;

use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::amp::{AmpMaster, AmpParams, AmpSchParams, AmpSegs, CascMode, EdgeEnds};
use crate::config::Tech;
use crate::digital::{DividerMaster, DividerSchParams, DivSegs, DummyMaster};
use crate::error::Result;
use crate::layout::{Cell, Instance, Ports};
use crate::tracks::TrackGrid;

/// Parameters of a summer tap cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TapCellParams {
    /// Segment counts of the summer amplifier.
    pub seg_sum: AmpSegs,
    /// Segment counts of the input latch.
    pub seg_lat: AmpSegs,
    /// Cascode wiring style of the summer amplifier.
    pub casc_mode: CascMode,
    /// True to flip the summer output sign.
    pub flip_sign: bool,
    /// Left edge dummy fingers.
    pub fg_duml: i64,
    /// Right edge dummy fingers.
    pub fg_dumr: i64,
    /// Array boundary flags.
    pub end: EdgeEnds,
}

/// Schematic-facing parameters of a tap cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapSchParams {
    /// True to flip the summer output sign.
    pub flip_sign: bool,
    /// Summer amplifier parameters.
    pub sum: AmpSchParams,
    /// Latch amplifier parameters.
    pub lat: AmpSchParams,
}

/// Splits a finger increment between the left and right dummy regions.
///
/// Half the increment, rounded down to an even count, goes to the left;
/// the remainder goes to the right.
fn split_dummy_inc(fg_inc: i64) -> (i64, i64) {
    let fg_inc2 = (fg_inc / 4) * 2;
    (fg_inc2, fg_inc - fg_inc2)
}

/// A summer tap cell: the summer amplifier at the bottom with its
/// input latch mirrored above it, negotiated to a common width.
#[derive(Debug, Clone)]
pub struct TapCell {
    params: TapCellParams,
    sum: Arc<AmpMaster>,
    lat: Arc<AmpMaster>,
    fg_tot: i64,
    sd_pitch: i64,
    bbox: Rect,
    ports: Ports,
}

impl TapCell {
    /// Derives a tap cell from its parameters.
    ///
    /// The summer and latch masters are derived independently; if
    /// their total widths differ, the narrower one is re-derived once
    /// with extra dummy fingers so both widths match.
    pub fn new(tech: &Tech, params: TapCellParams) -> Result<Self> {
        let sum_params = AmpParams {
            segs: params.seg_sum,
            casc_mode: params.casc_mode,
            fg_duml: params.fg_duml,
            fg_dumr: params.fg_dumr,
            fg_min: 0,
            end: params.end,
        };
        let lat_params = AmpParams {
            segs: params.seg_lat,
            casc_mode: CascMode::None,
            ..sum_params
        };
        let mut sum = AmpMaster::new(tech, "summer", sum_params)?;
        let mut lat = AmpMaster::new(tech, "latch", lat_params)?;

        if lat.fg_tot() < sum.fg_tot() {
            let (dl, dr) = split_dummy_inc(sum.fg_tot() - lat.fg_tot());
            lat = lat.with_dummies(tech, params.fg_duml + dl, params.fg_dumr + dr)?;
        } else if sum.fg_tot() < lat.fg_tot() {
            let (dl, dr) = split_dummy_inc(lat.fg_tot() - sum.fg_tot());
            sum = sum.with_dummies(tech, params.fg_duml + dl, params.fg_dumr + dr)?;
        }
        debug_assert_eq!(sum.fg_tot(), lat.fg_tot());
        let fg_tot = sum.fg_tot();
        tracing::debug!(fg_tot, "negotiated tap cell width");

        let sum = Arc::new(sum);
        let lat = Arc::new(lat);
        let s_inst = Instance::new(sum.clone(), Point::zero(), Orientation::R0);
        let y0 = s_inst.bbox().top() + lat.bbox().height();
        let l_inst = Instance::new(lat.clone(), Point::new(0, y0), Orientation::ReflectVert);
        let bbox = s_inst.bbox().union(l_inst.bbox());

        let mut ports = Ports::new();
        let exp_list: &[(&Instance<AmpMaster>, &str, &str)] = &[
            (&s_inst, "clkp", "clkn"),
            (&s_inst, "clkn", "clkp"),
            (&s_inst, "casc", "casc"),
            (&s_inst, "casc<1>", "casc<1>"),
            (&s_inst, "casc<0>", "casc<0>"),
            (&s_inst, "inp", "outp_l"),
            (&s_inst, "inn", "outn_l"),
            (&s_inst, "biasp", "biasn_s"),
            (&s_inst, "en<3>", "en<2>"),
            (&s_inst, "en<2>", "en<1>"),
            (&s_inst, "outp", "outp_s"),
            (&s_inst, "outn", "outn_s"),
            (&s_inst, "VDD", "VDD"),
            (&s_inst, "VSS", "VSS"),
            (&l_inst, "clkp", "clkp"),
            (&l_inst, "clkn", "clkn"),
            (&l_inst, "inp", "inp"),
            (&l_inst, "inn", "inn"),
            (&l_inst, "biasp", "biasp_l"),
            (&l_inst, "en<3>", "en<3>"),
            (&l_inst, "en<2>", "en<2>"),
            (&l_inst, "outp", "outp_l"),
            (&l_inst, "outn", "outn_l"),
            (&l_inst, "VDD", "VDD"),
            (&l_inst, "VSS", "VSS"),
        ];
        for &(inst, port_name, name) in exp_list {
            if inst.has_port(port_name) {
                ports.add_all(name, inst.port(port_name)?);
            }
        }

        Ok(Self {
            params,
            sum,
            lat,
            fg_tot,
            sd_pitch: tech.sd_pitch,
            bbox,
            ports,
        })
    }

    /// Rebuilds this cell with the given absolute left dummy count.
    pub fn with_left_dummies(&self, tech: &Tech, fg_duml: i64) -> Result<Self> {
        Self::new(
            tech,
            TapCellParams {
                fg_duml,
                ..self.params
            },
        )
    }

    /// The parameters this cell was derived from.
    pub fn params(&self) -> &TapCellParams {
        &self.params
    }

    /// Total fingers of the negotiated cell.
    pub fn fg_tot(&self) -> i64 {
        self.fg_tot
    }

    /// The source/drain pitch this cell was built on.
    pub fn sd_pitch(&self) -> i64 {
        self.sd_pitch
    }

    /// The summer amplifier master.
    pub fn sum(&self) -> &AmpMaster {
        &self.sum
    }

    /// The latch amplifier master.
    pub fn lat(&self) -> &AmpMaster {
        &self.lat
    }

    /// The leading-edge coordinate for vertical wires of the given
    /// track width next to this cell. Takes the tighter of the summer
    /// and latch constraints.
    pub fn vm_coord(&self, grid: &TrackGrid, width: i64, side: Side) -> i64 {
        let s = self.sum.vm_coord(grid, width, side);
        let l = self.lat.vm_coord(grid, width, side);
        match side {
            Side::Left => s.min(l),
            _ => s.max(l),
        }
    }

    /// Schematic parameters of this cell.
    pub fn sch_params(&self) -> TapSchParams {
        TapSchParams {
            flip_sign: self.params.flip_sign,
            sum: self.sum.sch_params(),
            lat: self.lat.sch_params(),
        }
    }
}

impl Cell for TapCell {
    fn bbox(&self) -> Rect {
        self.bbox
    }
    fn ports(&self) -> &Ports {
        &self.ports
    }
}

/// Parameters of the last summer cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TapLastParams {
    /// Segment counts of the summer amplifier.
    pub seg_sum: AmpSegs,
    /// True to flip the summer output sign.
    pub flip_sign: bool,
    /// Divider segment counts; [`None`] fills the latch row with dummies.
    pub seg_div: Option<DivSegs>,
    /// True if the divider triggers on the positive clock edge.
    pub div_pos_edge: bool,
    /// Left edge dummy fingers.
    pub fg_duml: i64,
    /// Right edge dummy fingers.
    pub fg_dumr: i64,
    /// Minimum core finger count.
    pub fg_min: i64,
    /// Array boundary flags.
    pub end: EdgeEnds,
}

/// Schematic-facing parameters of the last summer cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastSchParams {
    /// True to flip the summer output sign.
    pub flip_sign: bool,
    /// Summer amplifier parameters.
    pub sum: AmpSchParams,
    /// Divider parameters, if a divider is present.
    pub div: Option<DividerSchParams>,
}

/// The last summer cell: the last DFE tap's summer amplifier with a
/// clock divider or dummy fill in place of the input latch.
#[derive(Debug, Clone)]
pub struct TapLast {
    params: TapLastParams,
    sum: Arc<AmpMaster>,
    div: Option<Arc<DividerMaster>>,
    fg_tot: i64,
    sd_pitch: i64,
    bbox: Rect,
    ports: Ports,
}

impl TapLast {
    /// Derives the last summer cell from its parameters.
    ///
    /// The summer amplifier width must cover both `fg_min` and the
    /// divider's core columns; any shortfall pads the summer's dummy
    /// fingers, and the divider is then padded to the summer's total
    /// width.
    pub fn new(tech: &Tech, params: TapLastParams) -> Result<Self> {
        let sum_params = AmpParams {
            segs: params.seg_sum,
            casc_mode: CascMode::SignSelect,
            fg_duml: params.fg_duml,
            fg_dumr: params.fg_dumr,
            fg_min: 0,
            end: params.end,
        };
        let mut sum = AmpMaster::new(tech, "summer", sum_params)?;
        let fg_core = sum.fg_core();
        let mut fg_min = params.fg_min.max(fg_core);
        if let Some(segs) = params.seg_div {
            // constrain to the divider's core columns before padding
            let div_probe = DividerMaster::new(tech, segs, params.div_pos_edge, 0)?;
            fg_min = fg_min.max(div_probe.fg_core());
        }
        if fg_core < fg_min {
            let (dl, dr) = split_dummy_inc(fg_min - fg_core);
            sum = sum.with_dummies(tech, params.fg_duml + dl, params.fg_dumr + dr)?;
        }
        let fg_tot = sum.fg_tot();
        tracing::debug!(fg_core, fg_tot, "derived last summer cell width");

        let sum = Arc::new(sum);
        let s_inst = Instance::new(sum.clone(), Point::zero(), Orientation::R0);
        let y0 = s_inst.bbox().top() + tech.amp_height;

        let mut ports = Ports::new();
        let exp_list: &[(&str, &str)] = &[
            ("clkp", "clkn"),
            ("clkn", "clkp"),
            ("inp", "inp"),
            ("inn", "inn"),
            ("biasp", "biasn"),
            ("casc<1>", "casc<1>"),
            ("casc<0>", "casc<0>"),
            ("en<3>", "en<2>"),
            ("en<2>", "en<1>"),
            ("outp", "outp"),
            ("outn", "outn"),
            ("VDD", "VDD"),
            ("VSS", "VSS"),
        ];
        for &(port_name, name) in exp_list {
            if s_inst.has_port(port_name) {
                ports.add_all(name, s_inst.port(port_name)?);
            }
        }

        let div = match params.seg_div {
            Some(segs) => {
                let div = Arc::new(DividerMaster::new(tech, segs, params.div_pos_edge, fg_tot)?);
                let d_inst =
                    Instance::new(div.clone(), Point::new(0, y0), Orientation::ReflectVert);
                let clk_name = if params.div_pos_edge { "clkp" } else { "clkn" };
                ports.add_all(clk_name, d_inst.port("clk")?);
                ports.add_all("div", d_inst.port("q")?);
                ports.add_all("divb", d_inst.port("qb")?);
                ports.add_all("en_div", d_inst.port("en")?);
                ports.add_all("scan_div", d_inst.port("scan_s")?);
                ports.add_all("VDD", d_inst.port("VDD")?);
                ports.add_all("VSS", d_inst.port("VSS")?);
                Some(div)
            }
            None => {
                let dum = Arc::new(DummyMaster::new(tech, fg_tot)?);
                let d_inst =
                    Instance::new(dum.clone(), Point::new(0, y0), Orientation::ReflectVert);
                ports.add_all("VDD", d_inst.port("VDD")?);
                ports.add_all("VSS", d_inst.port("VSS")?);
                None
            }
        };

        let bbox = Rect::from_sides(0, 0, fg_tot * tech.sd_pitch, y0);
        Ok(Self {
            params,
            sum,
            div,
            fg_tot,
            sd_pitch: tech.sd_pitch,
            bbox,
            ports,
        })
    }

    /// Rebuilds this cell with the given absolute left dummy count.
    pub fn with_left_dummies(&self, tech: &Tech, fg_duml: i64) -> Result<Self> {
        Self::new(
            tech,
            TapLastParams {
                fg_duml,
                ..self.params
            },
        )
    }

    /// Rebuilds this cell with the given minimum core finger count.
    pub fn with_min_fingers(&self, tech: &Tech, fg_min: i64) -> Result<Self> {
        Self::new(
            tech,
            TapLastParams {
                fg_min,
                ..self.params
            },
        )
    }

    /// The parameters this cell was derived from.
    pub fn params(&self) -> &TapLastParams {
        &self.params
    }

    /// Core fingers of the summer amplifier, excluding dummies.
    pub fn fg_core(&self) -> i64 {
        self.sum.fg_core()
    }

    /// Total fingers of the cell.
    pub fn fg_tot(&self) -> i64 {
        self.fg_tot
    }

    /// The source/drain pitch this cell was built on.
    pub fn sd_pitch(&self) -> i64 {
        self.sd_pitch
    }

    /// True if this cell carries a clock divider.
    pub fn has_div(&self) -> bool {
        self.div.is_some()
    }

    /// The leading-edge coordinate for vertical wires of the given
    /// track width next to this cell.
    pub fn vm_coord(&self, grid: &TrackGrid, width: i64, side: Side) -> i64 {
        self.sum.vm_coord(grid, width, side)
    }

    /// Schematic parameters of this cell.
    pub fn sch_params(&self) -> LastSchParams {
        LastSchParams {
            flip_sign: self.params.flip_sign,
            sum: self.sum.sch_params(),
            div: self.div.as_ref().map(|d| d.sch_params()),
        }
    }
}

impl Cell for TapLast {
    fn bbox(&self) -> Rect {
        self.bbox
    }
    fn ports(&self) -> &Ports {
        &self.ports
    }
}
