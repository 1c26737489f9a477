//! A single summer row: FFE tap cells, DFE tap cells, and the last
//! summer cell placed left to right with their vertical signal tracks.
//!
//! Units are derived and placed in reverse tap order. Each unit claims
//! a batch of signal tracks to the left of its differential output
//! bus; the placement state carries the previous unit's bus edge so
//! the next unit starts clear of it, growing the next unit's left
//! dummy region when it does not.

use std::sync::Arc;

use arcstr::ArcStr;
use geometry::prelude::*;
use num::Integer;
use serde::{Deserialize, Serialize};

use crate::alloc::{allocate, PlaceState, SigSpec, TrackInfo};
use crate::amp::{AmpSegs, CascMode, EdgeEnds};
use crate::config::Tech;
use crate::digital::DivSegs;
use crate::error::{Error, Result};
use crate::layout::{Cell, CellBuilder, Instance, Ports, Wire};
use crate::tap::{LastSchParams, TapCell, TapCellParams, TapLast, TapLastParams, TapSchParams};
use crate::tracks::{SigKind, TrackGrid, TrackManager};

/// The fixed track pattern of one unit's differential output bus:
/// three shielded differential output pairs.
const ROUTE_TYPES: [SigKind; 10] = [
    SigKind::Shield,
    SigKind::Out,
    SigKind::Out,
    SigKind::Shield,
    SigKind::Out,
    SigKind::Out,
    SigKind::Shield,
    SigKind::Out,
    SigKind::Out,
    SigKind::Shield,
];

/// Parameters of a summer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowParams {
    /// Summer segment counts per tap: FFE taps, then the last DFE tap,
    /// then the remaining DFE taps.
    pub seg_sum_list: Vec<AmpSegs>,
    /// Latch segment counts of the FFE taps.
    pub seg_ffe_list: Vec<AmpSegs>,
    /// Latch segment counts of the DFE taps other than the last.
    pub seg_dfe_list: Vec<AmpSegs>,
    /// Output sign-flip flags, indexed like `seg_sum_list`.
    pub flip_sign_list: Vec<bool>,
    /// Divider segment counts; [`None`] for rows without a divider.
    pub seg_div: Option<DivSegs>,
    /// True if the divider triggers on the positive clock edge.
    pub div_pos_edge: bool,
    /// Single-sided edge dummy fingers of every cell.
    pub fg_dum: i64,
    /// Minimum core fingers of the last cell.
    pub fg_min_last: i64,
}

impl RowParams {
    /// Validates tap counts, returning `(num_ffe, num_dfe)`.
    pub fn validate(&self) -> Result<(usize, usize)> {
        let num_sum = self.seg_sum_list.len();
        let num_ffe = self.seg_ffe_list.len();
        let num_dfe = self.seg_dfe_list.len() + 1;
        if num_sum != num_ffe + num_dfe || num_sum != self.flip_sign_list.len() {
            return Err(Error::TapCountMismatch {
                num_sum,
                num_ffe,
                num_dfe,
                num_sign: self.flip_sign_list.len(),
            });
        }
        if num_ffe < 1 {
            return Err(Error::NoMainTap);
        }
        if num_dfe < 2 {
            // with one DFE tap there is no room for the biasp_d and
            // biasn_d tracks
            return Err(Error::TooFewDfeTaps(num_dfe));
        }
        Ok((num_ffe, num_dfe))
    }
}

/// Schematic-facing parameters of a summer row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSchParams {
    /// FFE tap parameters, in tap order.
    pub ffe: Vec<TapSchParams>,
    /// DFE tap parameters other than the last, in tap order.
    pub dfe: Vec<TapSchParams>,
    /// Last-cell parameters.
    pub last: LastSchParams,
}

/// Which equalizer section a unit sequence belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum UnitKind {
    Ffe,
    Dfe,
}

impl UnitKind {
    fn tag(self) -> char {
        match self {
            UnitKind::Ffe => 'a',
            UnitKind::Dfe => 'd',
        }
    }
}

/// One unit sequence of a row.
struct UnitSeq<'a> {
    seg_list: &'a [AmpSegs],
    sig_list: &'a [SigSpec],
    kind: UnitKind,
    /// Offset from unit index to signal index.
    sig_off: usize,
    /// Offset from unit index into `seg_sum_list`.
    sum_off: usize,
    /// True if the first-placed unit sits on the row's left boundary.
    is_end: bool,
    /// True if the sequence's data flows out to the left; shifts the
    /// recorded bus indices down by one when false.
    left_out: bool,
}

struct PlacedUnits {
    insts: Vec<Instance<TapCell>>,
    sch: Vec<TapSchParams>,
    info: TrackInfo,
    state: PlaceState,
    fg_tot: i64,
}

/// Builds the FFE signal batches, one per tap in tap order.
fn ffe_signals(num_ffe: usize) -> Result<Vec<SigSpec>> {
    use SigKind::*;
    if num_ffe == 1 {
        return Ok(vec![SigSpec::new(
            vec![Shield, Out, Out, Shield, Shield, Clk, Clk, Clk, Clk, Clk, Clk, Shield],
            [
                "VDD", "outp_a<0>", "outn_a<0>", "VDD", "VSS", "clkp", "biasp_a", "biasp_m",
                "biasn_m", "biasn_a", "clkn", "VSS",
            ]
            .map(ArcStr::from)
            .to_vec(),
            false,
        )?]);
    }
    let mut sig_list = vec![
        SigSpec::new(
            vec![Out, Out, Shield, Clk, Clk, Shield],
            ["outp_a<0>", "outn_a<0>", "VDD", "clkp", "clkn", "VDD"]
                .map(ArcStr::from)
                .to_vec(),
            false,
        )?,
        SigSpec::new(
            vec![Shield, Clk, Clk, Clk, Clk, Shield, Shield, Casc, Casc],
            [
                "VSS", "biasp_a", "biasp_m", "biasn_m", "biasn_a", "VSS", "VDD", "cascp<1>",
                "cascn<1>",
            ]
            .map(ArcStr::from)
            .to_vec(),
            true,
        )?,
    ];
    for idx in 2..num_ffe {
        sig_list.push(SigSpec::new(
            vec![Shield, Casc, Casc],
            vec![
                "VDD".into(),
                arcstr::format!("cascp<{idx}>"),
                arcstr::format!("cascn<{idx}>"),
            ],
            true,
        )?);
    }
    Ok(sig_list)
}

/// Builds the DFE signal batches, one per tap other than the last, in
/// tap order.
fn dfe_signals(num_dfe: usize) -> Result<Vec<SigSpec>> {
    use SigKind::*;
    if num_dfe == 2 {
        return Ok(vec![SigSpec::new(
            vec![
                Shield, Out, Out, Shield, Shield, Shield, Shield, Shield, Shield, Clk, Clk, Clk,
                Clk, Shield,
            ],
            [
                "VDD",
                "outp_d<3>",
                "outn_d<3>",
                "VDD",
                "sgnpp<3>",
                "sgnnp<3>",
                "sgnpn<3>",
                "sgnnn<3>",
                "VSS",
                "biasp_d",
                "biasp_s<3>",
                "biasn_s<3>",
                "biasn_d",
                "VSS",
            ]
            .map(ArcStr::from)
            .to_vec(),
            false,
        )?]);
    }
    let mut sig_list = vec![SigSpec::new(
        vec![Shield, Shield, Shield, Shield, Shield, Clk, Clk, Clk, Clk, Shield],
        [
            "sgnpp<3>", "sgnnp<3>", "sgnpn<3>", "sgnnn<3>", "VSS", "biasp_d", "biasp_s<3>",
            "biasn_s<3>", "biasn_d", "VSS",
        ]
        .map(ArcStr::from)
        .to_vec(),
        false,
    )?];
    for dfe_idx in 4..=num_dfe {
        sig_list.push(SigSpec::new(
            vec![Shield, Clk, Clk, Shield, Shield, Shield, Shield, Shield],
            vec![
                "VSS".into(),
                arcstr::format!("biasp_s<{dfe_idx}>"),
                arcstr::format!("biasn_s<{dfe_idx}>"),
                "VSS".into(),
                arcstr::format!("sgnpp<{dfe_idx}>"),
                arcstr::format!("sgnnp<{dfe_idx}>"),
                arcstr::format!("sgnpn<{dfe_idx}>"),
                arcstr::format!("sgnnn<{dfe_idx}>"),
            ],
            true,
        )?);
    }
    let suf = num_dfe + 1;
    sig_list.push(SigSpec::new(
        vec![Shield, Clk, Clk, Shield, Shield, Shield, Shield, Shield, Shield, Out, Out],
        vec![
            "VSS".into(),
            arcstr::format!("biasp_s<{suf}>"),
            arcstr::format!("biasn_s<{suf}>"),
            "VSS".into(),
            arcstr::format!("sgnpp<{suf}>"),
            arcstr::format!("sgnnp<{suf}>"),
            arcstr::format!("sgnpn<{suf}>"),
            arcstr::format!("sgnnn<{suf}>"),
            "VDD".into(),
            arcstr::format!("outp_d<{suf}>"),
            arcstr::format!("outn_d<{suf}>"),
        ],
        true,
    )?);
    Ok(sig_list)
}

/// The fixed signal batch of the last summer cell.
fn last_signals() -> Result<SigSpec> {
    use SigKind::*;
    SigSpec::new(
        vec![
            Shield, En, En, En, En, Shield, Clk, Clk, Clk, Clk, Shield, Shield, Shield, Shield,
            Shield, Clk, Shield,
        ],
        [
            "VSS",
            "en3",
            "en2",
            "en1",
            "en0",
            "VSS",
            "clkp",
            "biasp_s<2>",
            "biasn_s<2>",
            "clkn",
            "VSS",
            "sgnpp<2>",
            "sgnnp<2>",
            "sgnpn<2>",
            "sgnnn<2>",
            "en_div",
            "scan_div",
        ]
        .map(ArcStr::from)
        .to_vec(),
        true,
    )
}

/// Records one unit's output bus tracks: four shields under `VDD` and
/// a differential output pair for each of the four ring positions.
fn record_bus(info: &mut TrackInfo, route_locs: &[i64], offset: i64, tag: char, sig_idx: i64) {
    for x in [0usize, 3, 6, 9] {
        info.record("VDD", route_locs[x] + offset);
    }
    for cidx in 0..4 {
        let x = match cidx {
            3 => 1,
            1 => 4,
            _ => 7,
        };
        info.record(
            arcstr::format!("outp_{tag}{cidx}<{sig_idx}>"),
            route_locs[x] + offset,
        );
        info.record(
            arcstr::format!("outn_{tag}{cidx}<{sig_idx}>"),
            route_locs[x + 1] + offset,
        );
    }
}

/// Grows a cell's left dummy region until foreign vertical wires from
/// the previous unit's bus clear its internal geometry. Returns the
/// finger increment, a multiple of two.
fn dummy_increment(xcur_min: i64, xcur: i64, sd_pitch: i64) -> i64 {
    Integer::div_ceil(&(xcur_min - xcur), &(2 * sd_pitch)) * 2
}

/// Places one unit sequence, threading the placement state.
#[allow(clippy::too_many_arguments)]
fn place_units(
    tech: &Tech,
    mgr: &TrackManager,
    grid: &TrackGrid,
    params: &RowParams,
    seq: &UnitSeq,
    route_locs: &[i64],
    mut state: PlaceState,
) -> Result<PlacedUnits> {
    let w_out = mgr.width(SigKind::Out);
    let num_inst = seq.seg_list.len();
    let inc: i64 = if seq.left_out { 0 } else { -1 };
    let mut info = TrackInfo::new();
    let mut insts = Vec::with_capacity(num_inst);
    let mut sch = Vec::with_capacity(num_inst);
    let mut fg_tot = 0;

    for idx in (0..num_inst).rev() {
        let sig_idx = idx + seq.sig_off;
        let seg_sum = params.seg_sum_list[idx + seq.sum_off];
        let casc_mode = match seq.kind {
            UnitKind::Ffe if idx > 0 && seg_sum.casc > 0 => CascMode::Cascode,
            UnitKind::Ffe => CascMode::None,
            UnitKind::Dfe => CascMode::SignSelect,
        };
        let cell_params = TapCellParams {
            seg_sum,
            seg_lat: seq.seg_list[idx],
            casc_mode,
            flip_sign: params.flip_sign_list[idx + seq.sum_off],
            fg_duml: params.fg_dum,
            fg_dumr: params.fg_dum,
            end: EdgeEnds {
                left: seq.is_end && idx == num_inst - 1,
                right: false,
            },
        };
        let mut cell = TapCell::new(tech, cell_params)?;

        // grow the left dummies if the previous unit's bus wires would
        // end inside this cell
        let xcur = state.edge_x.unwrap_or(0);
        if let Some(prev_data_tr) = state.prev_data_track {
            let data_xr = grid.wire_span(prev_data_tr, state.prev_data_width).stop();
            let xcur_min = data_xr - cell.vm_coord(grid, state.prev_data_width, Side::Left);
            if xcur_min > xcur {
                let fg_inc = dummy_increment(xcur_min, xcur, cell.sd_pitch());
                tracing::debug!(sig_idx, fg_inc, "growing left dummies for bus clearance");
                cell = cell.with_left_dummies(tech, params.fg_dum + fg_inc)?;
            }
        }
        fg_tot += cell.fg_tot();

        let data_xl = xcur + cell.vm_coord(grid, w_out, Side::Right);
        let spec = &seq.sig_list[idx];
        let alloc = allocate(mgr, grid, spec, data_xl, &state, idx != 0, &mut info);

        let inst = Instance::new(Arc::new(cell), Point::new(xcur, 0), Orientation::R0);
        state.edge_x = Some(inst.bbox().right());
        sch.push(inst.master().sch_params());
        insts.push(inst);

        if idx == 0 {
            let n = spec.kinds().len();
            state.prev_data_width = mgr.width(spec.kinds()[n - 2]);
            state.prev_data_track = Some(alloc.track(n - 2));
            state.prev_kind = Some(spec.last_kind());
            state.prev_track = alloc.track(n - 1);
        } else {
            let offset = alloc.ltr - route_locs[1];
            record_bus(&mut info, route_locs, offset, seq.kind.tag(), sig_idx as i64 + inc);
            state.prev_data_width = w_out;
            state.prev_data_track = Some(route_locs[8] + offset);
            state.prev_kind = Some(SigKind::Shield);
            state.prev_track = route_locs[9] + offset;
        }
    }

    insts.reverse();
    sch.reverse();
    Ok(PlacedUnits {
        insts,
        sch,
        info,
        state,
        fg_tot,
    })
}

/// A summer row master.
#[derive(Debug, Clone)]
pub struct SummerRow {
    params: RowParams,
    num_ffe: usize,
    num_dfe: usize,
    ffe_insts: Vec<Instance<TapCell>>,
    dfe_insts: Vec<Instance<TapCell>>,
    last_inst: Instance<TapLast>,
    ffe_track_info: TrackInfo,
    dfe_track_info: TrackInfo,
    state: PlaceState,
    fg_tot: i64,
    fg_core_last: i64,
    bbox: Rect,
    ports: Ports,
    wires: Vec<Wire>,
    sch: RowSchParams,
}

impl SummerRow {
    /// Builds a summer row from its parameters.
    pub fn new(tech: &Tech, mgr: &TrackManager, grid: &TrackGrid, params: RowParams) -> Result<Self> {
        let (num_ffe, num_dfe) = params.validate()?;
        tracing::debug!(num_ffe, num_dfe, "building summer row");
        let route_locs = mgr.place(&ROUTE_TYPES);
        let w_out = mgr.width(SigKind::Out);

        // place the FFE units, then continue with the DFE units
        let ffe_sig_list = ffe_signals(num_ffe)?;
        let ffe = place_units(
            tech,
            mgr,
            grid,
            &params,
            &UnitSeq {
                seg_list: &params.seg_ffe_list,
                sig_list: &ffe_sig_list,
                kind: UnitKind::Ffe,
                sig_off: 0,
                sum_off: 0,
                is_end: true,
                left_out: true,
            },
            &route_locs,
            PlaceState::default(),
        )?;
        let dfe_sig_list = dfe_signals(num_dfe)?;
        let dfe = place_units(
            tech,
            mgr,
            grid,
            &params,
            &UnitSeq {
                seg_list: &params.seg_dfe_list,
                sig_list: &dfe_sig_list,
                kind: UnitKind::Dfe,
                sig_off: 3,
                sum_off: num_ffe + 1,
                is_end: false,
                left_out: false,
            },
            &route_locs,
            ffe.state.clone(),
        )?;
        let mut dfe_track_info = dfe.info;
        let mut state = dfe.state;

        // derive and place the last summer cell
        let last_params = TapLastParams {
            seg_sum: params.seg_sum_list[num_ffe],
            flip_sign: params.flip_sign_list[num_ffe],
            seg_div: params.seg_div,
            div_pos_edge: params.div_pos_edge,
            fg_duml: params.fg_dum,
            fg_dumr: params.fg_dum,
            fg_min: params.fg_min_last,
            end: EdgeEnds {
                left: false,
                right: true,
            },
        };
        let mut last = TapLast::new(tech, last_params)?;
        let xcur = state.edge_x.unwrap_or(0);
        if let Some(prev_data_tr) = state.prev_data_track {
            let data_xr = grid.wire_span(prev_data_tr, state.prev_data_width).stop();
            let xcur_min = data_xr - last.vm_coord(grid, state.prev_data_width, Side::Left);
            if xcur_min > xcur {
                let fg_inc = dummy_increment(xcur_min, xcur, last.sd_pitch());
                tracing::debug!(fg_inc, "growing last cell left dummies for bus clearance");
                last = last.with_left_dummies(tech, params.fg_dum + fg_inc)?;
            }
        }
        let data_xl = xcur + last.vm_coord(grid, w_out, Side::Right);
        let last_spec = last_signals()?;
        let alloc = allocate(mgr, grid, &last_spec, data_xl, &state, true, &mut dfe_track_info);
        let bus_offset = alloc.ltr - route_locs[1];
        record_bus(&mut dfe_track_info, &route_locs, bus_offset, 'd', 2);

        let fg_core_last = last.fg_core();
        let fg_tot = ffe.fg_tot + dfe.fg_tot + last.fg_tot();
        let last_inst = Instance::new(Arc::new(last), Point::new(xcur, 0), Orientation::R0);
        // continuation state for anything placed right of this row
        state.prev_data_width = w_out;
        state.prev_data_track = Some(route_locs[8] + bus_offset);
        state.prev_kind = Some(SigKind::Shield);
        state.prev_track = route_locs[9] + bus_offset;
        state.edge_x = Some(last_inst.bbox().right());

        // assemble ports
        let mut cell = CellBuilder::new(*grid);
        let mut vdd_list = Vec::new();
        let mut vss_list = Vec::new();
        let mut clkp_list = Vec::new();
        let mut clkn_list = Vec::new();
        let mut en_warrs: [Vec<Wire>; 4] = Default::default();
        let mut outs_p = Vec::new();
        let mut outs_n = Vec::new();
        let mut ports = Ports::new();

        let mut biasm_list = Vec::new();
        let mut biasa_list = Vec::new();
        for (fidx, inst) in ffe.insts.iter().enumerate() {
            if inst.has_port("casc") {
                ports.add_all(arcstr::format!("casc<{fidx}>"), inst.port("casc")?);
            }
            biasm_list.push(inst.port_wire("biasn_s")?);
            biasa_list.push(inst.port_wire("biasp_l")?);
            ports.add_all(arcstr::format!("inp_a<{fidx}>"), inst.port("inp")?);
            ports.add_all(arcstr::format!("inn_a<{fidx}>"), inst.port("inn")?);
            ports.add_all(arcstr::format!("outp_a<{fidx}>"), inst.port("outp_l")?);
            ports.add_all(arcstr::format!("outn_a<{fidx}>"), inst.port("outn_l")?);
            Self::collect_common(
                inst,
                &mut vdd_list,
                &mut vss_list,
                &mut clkp_list,
                &mut clkn_list,
                &mut en_warrs,
                &mut outs_p,
                &mut outs_n,
            )?;
        }

        let mut biasd_list = Vec::new();
        for (idx, inst) in dfe.insts.iter().enumerate() {
            let didx = idx + 3;
            ports.add_all(arcstr::format!("biasn_s<{didx}>"), inst.port("biasn_s")?);
            biasd_list.push(inst.port_wire("biasp_l")?);
            ports.add_all(arcstr::format!("inp_d<{didx}>"), inst.port("inp")?);
            ports.add_all(arcstr::format!("inn_d<{didx}>"), inst.port("inn")?);
            ports.add_all(arcstr::format!("sgnp<{didx}>"), inst.port("casc<0>")?);
            ports.add_all(arcstr::format!("sgnn<{didx}>"), inst.port("casc<1>")?);
            ports.add_all(arcstr::format!("outp_d<{didx}>"), inst.port("outp_l")?);
            ports.add_all(arcstr::format!("outn_d<{didx}>"), inst.port("outn_l")?);
            Self::collect_common(
                inst,
                &mut vdd_list,
                &mut vss_list,
                &mut clkp_list,
                &mut clkn_list,
                &mut en_warrs,
                &mut outs_p,
                &mut outs_n,
            )?;
        }

        // last cell pins; its input doubles as the DFE chain's tap-2
        // output for column stitching
        let inp_pins = last_inst.port("inp")?;
        let inn_pins = last_inst.port("inn")?;
        ports.add_all("inp_d<2>", inp_pins.iter().copied());
        ports.add_all("inn_d<2>", inn_pins.iter().copied());
        ports.add_all("outp_d<2>", inp_pins);
        ports.add_all("outn_d<2>", inn_pins);
        ports.add_all("biasn_s<2>", last_inst.port("biasn")?);
        if last_inst.has_port("casc<0>") {
            ports.add_all("sgnp<2>", last_inst.port("casc<0>")?);
            ports.add_all("sgnn<2>", last_inst.port("casc<1>")?);
        }
        if last_inst.has_port("div") {
            for name in ["en_div", "scan_div", "div", "divb"] {
                ports.add_all(name, last_inst.port(name)?);
            }
        }
        vdd_list.extend(last_inst.port("VDD")?);
        vss_list.extend(last_inst.port("VSS")?);
        outs_p.extend(last_inst.port("outp")?);
        outs_n.extend(last_inst.port("outn")?);
        if last_inst.has_port("clkp") {
            clkp_list.extend(last_inst.port("clkp")?);
        }
        if last_inst.has_port("clkn") {
            clkn_list.extend(last_inst.port("clkn")?);
        }
        en_warrs[2].extend(last_inst.port("en<2>")?);
        if last_inst.has_port("en<1>") {
            en_warrs[1].extend(last_inst.port("en<1>")?);
        }

        // connect shared rails
        let vdd = cell.connect_wires(vdd_list);
        let vss = cell.connect_wires(vss_list);
        ports.add_all("VDD", vdd);
        ports.add_all("VSS", vss);
        ports.add_all("biasn_m", cell.connect_wires(biasm_list));
        ports.add_all("biasp_a", cell.connect_wires(biasa_list));
        ports.add_all("biasp_d", cell.connect_wires(biasd_list));
        ports.add_all("outp_s", cell.connect_wires(outs_p));
        ports.add_all("outn_s", cell.connect_wires(outs_n));

        // clocks share a common horizontal extent
        let clk_span = Span::union_all(clkp_list.iter().chain(clkn_list.iter()).map(|w| w.span))
            .unwrap_or_else(|| Span::from_point(0));
        ports.add_all("clkp", cell.connect_wires_within(clkp_list, clk_span));
        ports.add_all("clkn", cell.connect_wires_within(clkn_list, clk_span));

        for (idx, en_warr) in en_warrs.into_iter().enumerate() {
            if !en_warr.is_empty() {
                ports.add_all(arcstr::format!("en<{idx}>"), cell.connect_wires(en_warr));
            }
        }

        let bbox = ffe
            .insts
            .iter()
            .map(Instance::bbox)
            .chain(dfe.insts.iter().map(Instance::bbox))
            .chain(std::iter::once(last_inst.bbox()))
            .reduce(Rect::union)
            .unwrap_or_default();

        let sch = RowSchParams {
            ffe: ffe.sch,
            dfe: dfe.sch,
            last: last_inst.master().sch_params(),
        };
        let (_, wires) = cell.finish();

        Ok(Self {
            params,
            num_ffe,
            num_dfe,
            ffe_insts: ffe.insts,
            dfe_insts: dfe.insts,
            last_inst,
            ffe_track_info: ffe.info,
            dfe_track_info,
            state,
            fg_tot,
            fg_core_last,
            bbox,
            ports,
            wires,
            sch,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_common(
        inst: &Instance<TapCell>,
        vdd_list: &mut Vec<Wire>,
        vss_list: &mut Vec<Wire>,
        clkp_list: &mut Vec<Wire>,
        clkn_list: &mut Vec<Wire>,
        en_warrs: &mut [Vec<Wire>; 4],
        outs_p: &mut Vec<Wire>,
        outs_n: &mut Vec<Wire>,
    ) -> Result<()> {
        vdd_list.extend(inst.port("VDD")?);
        vss_list.extend(inst.port("VSS")?);
        clkp_list.extend(inst.port("clkp")?);
        clkn_list.extend(inst.port("clkn")?);
        en_warrs[3].extend(inst.port("en<3>")?);
        en_warrs[2].extend(inst.port("en<2>")?);
        if inst.has_port("en<1>") {
            en_warrs[1].extend(inst.port("en<1>")?);
        }
        outs_p.extend(inst.port("outp_s")?);
        outs_n.extend(inst.port("outn_s")?);
        Ok(())
    }

    /// The parameters this row was built from.
    pub fn params(&self) -> &RowParams {
        &self.params
    }

    /// The number of FFE taps.
    pub fn num_ffe(&self) -> usize {
        self.num_ffe
    }

    /// The number of DFE taps, including the last cell.
    pub fn num_dfe(&self) -> usize {
        self.num_dfe
    }

    /// The FFE signal and bus tracks of this row.
    pub fn ffe_track_info(&self) -> &TrackInfo {
        &self.ffe_track_info
    }

    /// The DFE signal and bus tracks of this row, including the last
    /// cell's batch.
    pub fn dfe_track_info(&self) -> &TrackInfo {
        &self.dfe_track_info
    }

    /// The placement state after the last cell, for chaining further
    /// blocks to the right of this row.
    pub fn place_state(&self) -> &PlaceState {
        &self.state
    }

    /// Total fingers of all cells in the row.
    pub fn fg_tot(&self) -> i64 {
        self.fg_tot
    }

    /// Core fingers of the last cell, for cross-row width negotiation.
    pub fn fg_core_last(&self) -> i64 {
        self.fg_core_last
    }

    /// The FFE tap instances, in tap order.
    pub fn ffe_insts(&self) -> &[Instance<TapCell>] {
        &self.ffe_insts
    }

    /// The DFE tap instances other than the last, in tap order.
    pub fn dfe_insts(&self) -> &[Instance<TapCell>] {
        &self.dfe_insts
    }

    /// The last-cell instance.
    pub fn last_inst(&self) -> &Instance<TapLast> {
        &self.last_inst
    }

    /// The wires drawn inside this row.
    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Schematic parameters of this row.
    pub fn sch_params(&self) -> &RowSchParams {
        &self.sch
    }
}

impl Cell for SummerRow {
    fn bbox(&self) -> Rect {
        self.bbox
    }
    fn ports(&self) -> &Ports {
        &self.ports
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{Tech, TrackConfig};
    use itertools::Itertools;

    fn segs(n: i64) -> AmpSegs {
        AmpSegs {
            tail: n,
            input: n + 2,
            casc: n + 2,
            load: n,
        }
    }

    fn lat_segs(n: i64) -> AmpSegs {
        AmpSegs {
            tail: n,
            input: n + 2,
            casc: 0,
            load: n,
        }
    }

    pub(crate) fn row_params() -> RowParams {
        RowParams {
            // 2 FFE taps, last cell, 2 more DFE taps
            seg_sum_list: vec![segs(4), segs(4), segs(6), segs(4), segs(4)],
            seg_ffe_list: vec![lat_segs(4), lat_segs(4)],
            seg_dfe_list: vec![lat_segs(2), lat_segs(2)],
            flip_sign_list: vec![false, false, true, false, true],
            seg_div: Some(DivSegs {
                nand: 2,
                inv: 4,
                sr: 2,
            }),
            div_pos_edge: true,
            fg_dum: 4,
            fg_min_last: 0,
        }
    }

    fn build(params: RowParams) -> Result<SummerRow> {
        let tech = Tech::default();
        let mgr = TrackManager::new(&TrackConfig::with_wide_signals()).unwrap();
        let grid = TrackGrid::new(tech.vm_line, tech.vm_space, tech.vm_offset);
        SummerRow::new(&tech, &mgr, &grid, params)
    }

    #[test]
    fn tap_count_mismatches_are_fatal() {
        let mut params = row_params();
        params.flip_sign_list.pop();
        assert!(matches!(
            build(params),
            Err(Error::TapCountMismatch { .. })
        ));

        let mut params = row_params();
        params.seg_ffe_list.clear();
        params.seg_sum_list.truncate(3);
        params.flip_sign_list.truncate(3);
        // now num_sum = 3 = 0 + 3: length check passes, FFE check fires
        assert!(matches!(build(params), Err(Error::NoMainTap)));
    }

    #[test]
    fn single_dfe_tap_is_rejected() {
        let mut params = row_params();
        params.seg_dfe_list.clear();
        params.seg_sum_list.truncate(3);
        params.flip_sign_list.truncate(3);
        assert!(matches!(build(params), Err(Error::TooFewDfeTaps(1))));
    }

    #[test]
    fn units_are_placed_left_to_right_without_overlap() {
        let row = build(row_params()).unwrap();
        let boxes: Vec<_> = row
            .ffe_insts()
            .iter()
            .map(Instance::bbox)
            .chain(row.dfe_insts().iter().map(Instance::bbox))
            .chain(std::iter::once(row.last_inst().bbox()))
            .collect();
        // FFE units are reversed into tap order: tap 0 is rightmost of
        // the FFE section; DFE units continue to the right of all FFE
        // units, the last cell sits at the far right
        for (a, b) in boxes.iter().tuple_windows() {
            assert!(a.height() == b.height());
        }
        let mut sorted = boxes.clone();
        sorted.sort_by_key(Rect::left);
        for (a, b) in sorted.iter().tuple_windows() {
            assert!(a.right() <= b.left(), "units overlap: {a:?} vs {b:?}");
        }
        assert_eq!(
            row.last_inst().bbox().right(),
            sorted.last().unwrap().right()
        );
        // continuation state points past everything this row placed
        let state = row.place_state();
        assert_eq!(state.edge_x, Some(row.bbox().right()));
        let max_track = row
            .ffe_track_info()
            .iter()
            .chain(row.dfe_track_info().iter())
            .flat_map(|(_, tracks)| tracks.iter().copied())
            .max()
            .unwrap();
        assert_eq!(state.prev_track, max_track);
    }

    #[test]
    fn ffe_units_are_in_tap_order_after_reversal() {
        let row = build(row_params()).unwrap();
        // tap order: index 0 was placed last, so it sits furthest right
        // within the FFE section
        assert!(row.ffe_insts()[0].loc().x > row.ffe_insts()[1].loc().x);
        assert!(row.dfe_insts()[0].loc().x > row.dfe_insts()[1].loc().x);
    }

    #[test]
    fn track_records_are_strictly_increasing_per_name() {
        let row = build(row_params()).unwrap();
        for (name, tracks) in row.ffe_track_info().iter().chain(row.dfe_track_info().iter()) {
            for w in tracks.windows(2) {
                assert!(
                    w[1] > w[0],
                    "tracks for {name} are not increasing: {tracks:?}"
                );
            }
        }
    }

    #[test]
    fn row_records_expected_signal_tracks() {
        let row = build(row_params()).unwrap();
        let ffe = row.ffe_track_info();
        assert!(ffe.contains("outp_a<0>"));
        assert!(ffe.contains("cascp<1>"));
        assert!(ffe.contains("clkp"));
        assert!(ffe.contains("biasn_m"));
        // one inter-unit bus between the two FFE taps
        assert!(ffe.contains("outp_a0<1>"));
        let dfe = row.dfe_track_info();
        assert!(dfe.contains("biasp_s<3>"));
        assert!(dfe.contains("sgnnn<4>"));
        assert!(dfe.contains("outp_d<4>"));
        // one inter-unit bus carries signal index 3; the last cell
        // records index 2
        assert!(dfe.contains("outp_d0<3>"));
        assert!(dfe.contains("outp_d0<2>"));
        assert!(dfe.contains("en0"));
        assert!(dfe.contains("en_div"));
        assert!(!dfe.contains("outp_d0<4>"));
    }

    #[test]
    fn row_exports_expected_ports() {
        let row = build(row_params()).unwrap();
        for name in [
            "casc<1>", "inp_a<0>", "outp_a<1>", "biasn_m", "biasp_a", "biasp_d", "clkp", "clkn",
            "outp_s", "outn_s", "inp_d<2>", "outp_d<2>", "biasn_s<2>", "biasn_s<3>", "sgnp<4>",
            "en<3>", "en<2>", "en<1>", "div", "divb", "en_div", "scan_div", "VDD", "VSS",
        ] {
            assert!(row.ports().has(name), "missing port {name}");
        }
        // the main tap has no cascode
        assert!(!row.ports().has("casc<0>"));
    }

    #[test]
    fn clock_rails_share_a_common_extent() {
        let row = build(row_params()).unwrap();
        let clkp = row.ports().get("clkp").unwrap();
        let clkn = row.ports().get("clkn").unwrap();
        let span_p = Span::union_all(clkp.iter().map(|w| w.span)).unwrap();
        let span_n = Span::union_all(clkn.iter().map(|w| w.span)).unwrap();
        assert_eq!(span_p, span_n);
    }

    #[test]
    fn divider_free_row_negotiates_to_divider_row_width() {
        let with_div = build(row_params()).unwrap();
        let mut params = row_params();
        params.seg_div = None;
        params.fg_min_last = with_div.fg_core_last();
        let without_div = build(params).unwrap();
        assert!(without_div.fg_core_last() <= with_div.fg_core_last());
    }

    #[test]
    fn row_building_is_deterministic() {
        let a = build(row_params()).unwrap();
        let b = build(row_params()).unwrap();
        assert_eq!(a.fg_tot(), b.fg_tot());
        assert_eq!(a.ffe_track_info(), b.ffe_track_info());
        assert_eq!(a.dfe_track_info(), b.dfe_track_info());
        assert_eq!(a.bbox(), b.bbox());
    }
}
