//! The quarter-rate summer column: four summer rows stacked into a
//! ring, bounded by substrate end rows, with the data chains, clocks,
//! biases, enables, and shields stitched vertically.
//!
//! Ring positions 0 and 2 carry clock dividers on opposite edges; the
//! other two rows fill the divider slot with dummies. All four rows
//! share one track plan so the vertical connections line up, which
//! requires negotiating the last-cell width across the row variants
//! before any row is placed.

use std::sync::Arc;

use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::amp::AmpSegs;
use crate::config::Tech;
use crate::connect::{connect_dfe, connect_div, connect_ffe, connect_shields, connect_signals};
use crate::digital::DivSegs;
use crate::error::Result;
use crate::layout::{Cell, CellBuilder, Instance, Ports, Wire};
use crate::row::{RowParams, SummerRow};
use crate::tap::{LastSchParams, TapSchParams};
use crate::tracks::{TrackGrid, TrackManager};

/// Parameters of a summer column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnParams {
    /// Summer segment counts per tap: FFE taps, then the last DFE tap,
    /// then the remaining DFE taps.
    pub seg_sum_list: Vec<AmpSegs>,
    /// Latch segment counts of the FFE taps.
    pub seg_ffe_list: Vec<AmpSegs>,
    /// Latch segment counts of the DFE taps other than the last.
    pub seg_dfe_list: Vec<AmpSegs>,
    /// Output sign-flip flags, indexed like `seg_sum_list`.
    pub flip_sign_list: Vec<bool>,
    /// Divider segment counts, shared by both divider rows.
    pub seg_div: DivSegs,
    /// Single-sided edge dummy fingers of every cell.
    pub fg_dum: i64,
    /// Minimum core fingers of the last cells.
    pub fg_min_last: i64,
}

impl ColumnParams {
    fn row_params(&self, seg_div: Option<DivSegs>, pos_edge: bool, fg_min_last: i64) -> RowParams {
        RowParams {
            seg_sum_list: self.seg_sum_list.clone(),
            seg_ffe_list: self.seg_ffe_list.clone(),
            seg_dfe_list: self.seg_dfe_list.clone(),
            flip_sign_list: self.flip_sign_list.clone(),
            seg_div,
            div_pos_edge: pos_edge,
            fg_dum: self.fg_dum,
            fg_min_last,
        }
    }
}

/// Schematic-facing parameters of a summer column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchParams {
    /// FFE tap parameters, in tap order.
    pub ffe: Vec<TapSchParams>,
    /// DFE tap parameters other than the last, in tap order.
    pub dfe: Vec<TapSchParams>,
    /// Last-cell parameters of the four rows, in stacking order.
    pub last: Vec<LastSchParams>,
}

/// A position in the four-phase summer ring.
///
/// Data flows from each position to its successor; most pin names at
/// the column boundary are indexed by the predecessor position of the
/// row that carries them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RingPos {
    /// Phase 0.
    P0,
    /// Phase 1.
    P1,
    /// Phase 2.
    P2,
    /// Phase 3.
    P3,
}

impl RingPos {
    /// All positions, in phase order.
    pub const ALL: [RingPos; 4] = [RingPos::P0, RingPos::P1, RingPos::P2, RingPos::P3];

    /// The phase index of this position.
    pub fn index(self) -> usize {
        match self {
            RingPos::P0 => 0,
            RingPos::P1 => 1,
            RingPos::P2 => 2,
            RingPos::P3 => 3,
        }
    }

    /// The position `k` phases ahead of this one.
    pub fn rotated(self, k: usize) -> RingPos {
        Self::ALL[(self.index() + k) % 4]
    }

    /// The preceding phase.
    pub fn prev(self) -> RingPos {
        self.rotated(3)
    }
}

/// A substrate end row closing the top or bottom of the column.
#[derive(Debug, Clone)]
pub struct RowEnd {
    fg_tot: i64,
    bbox: Rect,
    ports: Ports,
}

impl RowEnd {
    /// Creates an end row spanning the given finger count.
    pub fn new(tech: &Tech, fg_tot: i64) -> Self {
        let width = fg_tot * tech.sd_pitch;
        let bbox = Rect::from_sides(0, 0, width, tech.end_height);
        let mut ports = Ports::new();
        ports.add(
            "VSS",
            Wire::horiz(tech.end_height / 2, Span::new(0, width)),
        );
        Self {
            fg_tot,
            bbox,
            ports,
        }
    }

    /// Total fingers spanned by this row.
    pub fn fg_tot(&self) -> i64 {
        self.fg_tot
    }
}

impl Cell for RowEnd {
    fn bbox(&self) -> Rect {
        self.bbox
    }
    fn ports(&self) -> &Ports {
        &self.ports
    }
}

/// A full quarter-rate summer column master.
#[derive(Debug, Clone)]
pub struct SummerColumn {
    params: ColumnParams,
    insts: Vec<Instance<SummerRow>>,
    end_insts: Vec<Instance<RowEnd>>,
    bbox: Rect,
    ports: Ports,
    wires: Vec<Wire>,
    sch: ColumnSchParams,
}

impl SummerColumn {
    /// Builds a summer column from its parameters.
    pub fn new(
        tech: &Tech,
        mgr: &TrackManager,
        grid: &TrackGrid,
        params: ColumnParams,
    ) -> Result<Self> {
        // negotiate the last-cell width across the row variants so all
        // four rows share one track plan
        let mut divn = SummerRow::new(
            tech,
            mgr,
            grid,
            params.row_params(Some(params.seg_div), true, params.fg_min_last),
        )?;
        let mut fg_min_last = divn.fg_core_last().max(params.fg_min_last);
        let endb = SummerRow::new(tech, mgr, grid, params.row_params(None, true, fg_min_last))?;
        if endb.fg_core_last() > fg_min_last {
            fg_min_last = endb.fg_core_last();
            divn = SummerRow::new(
                tech,
                mgr,
                grid,
                params.row_params(Some(params.seg_div), true, fg_min_last),
            )?;
        }
        let divp = SummerRow::new(
            tech,
            mgr,
            grid,
            params.row_params(Some(params.seg_div), false, fg_min_last),
        )?;
        tracing::debug!(fg_min_last, "negotiated column last-cell width");

        let num_ffe = endb.num_ffe();
        let num_dfe = endb.num_dfe();
        let endb = Arc::new(endb);
        let endt = endb.clone();
        let divn = Arc::new(divn);
        let divp = Arc::new(divp);
        let end_row = Arc::new(RowEnd::new(tech, endb.fg_tot()));

        // stack bottom to top: substrate, two rows, two rows, substrate;
        // mirrored rows share supply rails with their upright neighbors
        let h = endb.bbox().height();
        let y0 = tech.end_height;
        let end_bot = Instance::new(end_row.clone(), Point::zero(), Orientation::R0);
        let x3 = Instance::new(endb.clone(), Point::new(0, y0), Orientation::R0);
        let x0 = Instance::new(divp.clone(), Point::new(0, y0 + 2 * h), Orientation::ReflectVert);
        let x2 = Instance::new(divn.clone(), Point::new(0, y0 + 2 * h), Orientation::R0);
        let x1 = Instance::new(endt.clone(), Point::new(0, y0 + 4 * h), Orientation::ReflectVert);
        let end_top = Instance::new(
            end_row,
            Point::new(0, y0 + 4 * h + tech.end_height),
            Orientation::ReflectVert,
        );
        let insts = vec![x0, x1, x2, x3];
        let end_insts = vec![end_bot, end_top];

        let mut cell = CellBuilder::new(*grid);
        let mut vdd_list = Vec::new();
        let mut vss_list = Vec::new();
        for (pos, inst) in RingPos::ALL.into_iter().zip(&insts) {
            let nidx = pos.prev().index();
            cell.add_pin(arcstr::format!("outp<{nidx}>"), inst.port("outp_s")?);
            cell.add_pin(arcstr::format!("outn<{nidx}>"), inst.port("outn_s")?);
            vdd_list.extend(inst.port("VDD")?);
            vss_list.extend(inst.port("VSS")?);
        }
        for inst in &end_insts {
            vss_list.extend(inst.port("VSS")?);
        }

        // data chains
        let ffe_info = endb.ffe_track_info();
        let dfe_info = endb.dfe_track_info();
        let (inp, inn) = connect_signals(&mut cell, mgr, &insts, ffe_info, num_ffe, 'a', 0, true)?;
        for (warrp, warrn) in inp.into_iter().zip(inn) {
            cell.add_pin("inp_a", warrp);
            cell.add_pin("inn_a", warrn);
        }
        let (inp, inn) = connect_signals(&mut cell, mgr, &insts, dfe_info, num_dfe, 'd', 2, false)?;
        for (cidx, (warrp, warrn)) in inp.into_iter().zip(inn).enumerate() {
            cell.add_pin(arcstr::format!("inp_d<{cidx}>"), warrp);
            cell.add_pin(arcstr::format!("inn_d<{cidx}>"), warrn);
        }

        // biases, clocks, enables, shields
        let (clkp_list, clkn_list) = connect_ffe(&mut cell, mgr, &insts, ffe_info, num_ffe)?;
        connect_dfe(
            &mut cell,
            mgr,
            &insts,
            dfe_info,
            num_dfe,
            &clkp_list,
            &clkn_list,
        )?;
        connect_div(&mut cell, mgr, &insts, dfe_info)?;
        connect_shields(&mut cell, &vdd_list, &vss_list, ffe_info, dfe_info)?;

        cell.add_pin("VDD", vdd_list);
        cell.add_pin("VSS", vss_list);

        let bbox = insts
            .iter()
            .map(Instance::bbox)
            .chain(end_insts.iter().map(Instance::bbox))
            .reduce(Rect::union)
            .unwrap_or_default();

        let sch = ColumnSchParams {
            ffe: divp.sch_params().ffe.clone(),
            dfe: divp.sch_params().dfe.clone(),
            last: vec![
                endb.sch_params().last,
                divp.sch_params().last,
                divn.sch_params().last,
                endt.sch_params().last,
            ],
        };
        let (ports, wires) = cell.finish();

        Ok(Self {
            params,
            insts,
            end_insts,
            bbox,
            ports,
            wires,
            sch,
        })
    }

    /// The parameters this column was built from.
    pub fn params(&self) -> &ColumnParams {
        &self.params
    }

    /// The four summer row instances, in ring order.
    pub fn insts(&self) -> &[Instance<SummerRow>] {
        &self.insts
    }

    /// The substrate end row instances, bottom then top.
    pub fn end_insts(&self) -> &[Instance<RowEnd>] {
        &self.end_insts
    }

    /// The wires drawn inside this column.
    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Schematic parameters of this column.
    pub fn sch_params(&self) -> &ColumnSchParams {
        &self.sch
    }
}

impl Cell for SummerColumn {
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
    use crate::config::TrackConfig;
    use crate::row::tests::row_params;

    pub(crate) fn column_params() -> ColumnParams {
        let row = row_params();
        ColumnParams {
            seg_sum_list: row.seg_sum_list,
            seg_ffe_list: row.seg_ffe_list,
            seg_dfe_list: row.seg_dfe_list,
            flip_sign_list: row.flip_sign_list,
            seg_div: row.seg_div.unwrap(),
            fg_dum: row.fg_dum,
            fg_min_last: 0,
        }
    }

    fn build(params: ColumnParams) -> Result<SummerColumn> {
        let tech = Tech::default();
        let mgr = TrackManager::new(&TrackConfig::with_wide_signals()).unwrap();
        let grid = TrackGrid::new(tech.vm_line, tech.vm_space, tech.vm_offset);
        SummerColumn::new(&tech, &mgr, &grid, params)
    }

    #[test]
    fn column_stacks_four_rows_between_end_rows() {
        let tech = Tech::default();
        let col = build(column_params()).unwrap();
        assert_eq!(col.insts().len(), 4);
        let row_h = col.insts()[0].bbox().height();
        assert_eq!(col.bbox().height(), 4 * row_h + 2 * tech.end_height);
        // ring positions 0 and 1 are mirrored, 2 and 3 upright
        assert_eq!(col.insts()[0].orient(), Orientation::ReflectVert);
        assert_eq!(col.insts()[1].orient(), Orientation::ReflectVert);
        assert_eq!(col.insts()[2].orient(), Orientation::R0);
        assert_eq!(col.insts()[3].orient(), Orientation::R0);
        // mirrored neighbors abut
        assert_eq!(col.insts()[3].bbox().top(), col.insts()[0].bbox().bot());
        assert_eq!(col.insts()[2].bbox().top(), col.insts()[1].bbox().bot());
    }

    #[test]
    fn only_divider_rows_carry_dividers() {
        let col = build(column_params()).unwrap();
        assert!(col.insts()[0].has_port("div"));
        assert!(col.insts()[2].has_port("div"));
        assert!(!col.insts()[1].has_port("div"));
        assert!(!col.insts()[3].has_port("div"));
        // the two divider rows trigger on opposite edges
        let sch = col.sch_params();
        assert_eq!(sch.last.len(), 4);
        assert!(sch.last[0].div.is_none());
        assert!(sch.last[3].div.is_none());
        let divp = sch.last[1].div.unwrap();
        let divn = sch.last[2].div.unwrap();
        assert!(!divp.pos_edge);
        assert!(divn.pos_edge);
    }

    #[test]
    fn column_exports_ring_ports() {
        let col = build(column_params()).unwrap();
        let ports = col.ports();
        for name in [
            "outp<0>", "outn<3>", "inp_a", "inn_a", "inp_d<0>", "inp_d<3>", "clkp", "clkn",
            "biasp_a", "biasn_a", "biasp_d", "biasn_d", "bias_m<0>", "bias_m<3>", "en_div<2>",
            "scan_div<3>", "VDD", "VSS",
        ] {
            assert!(ports.has(name), "missing port {name}");
        }
        // four data inputs share the inp_a net name
        assert_eq!(ports.get("inp_a").unwrap().len(), 4);
    }

    #[test]
    fn rows_share_one_last_cell_width() {
        let col = build(column_params()).unwrap();
        let widths: Vec<_> = col
            .insts()
            .iter()
            .map(|i| i.master().fg_core_last())
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn ring_rotation_is_a_bijection() {
        for k in 0..4 {
            let mut seen = [false; 4];
            for pos in RingPos::ALL {
                seen[pos.rotated(k).index()] = true;
            }
            assert_eq!(seen, [true; 4]);
        }
        assert_eq!(RingPos::P0.rotated(0), RingPos::P0);
        assert_eq!(RingPos::P0.prev(), RingPos::P3);
        assert_eq!(RingPos::P3.rotated(2), RingPos::P1);
    }

    #[test]
    fn column_building_is_deterministic() {
        let a = build(column_params()).unwrap();
        let b = build(column_params()).unwrap();
        assert_eq!(a.bbox(), b.bbox());
        assert_eq!(a.ports(), b.ports());
        assert_eq!(a.wires(), b.wires());
    }
}
