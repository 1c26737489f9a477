//! Column-level routing: stitches the four summer rows of a quarter-rate
//! ring together on the vertical signal tracks recorded by the rows.
//!
//! Row `cidx` hands its data to row `(cidx + 1) % 4`, so most nets here
//! pair a pin of one row with the matching pin of its ring neighbor.

use indexmap::IndexMap;

use crate::alloc::TrackInfo;
use crate::error::Result;
use crate::layout::{CellBuilder, Instance, Wire};
use crate::row::SummerRow;
use crate::tracks::{SigKind, TrackManager};

/// Chains the per-tap data signals vertically through the ring.
///
/// Each tap output connects to the next tap's latch input one ring
/// position over. Returns the chain inputs, one entry per ring
/// position: the boundary latch input wires for FFE chains, or the
/// drawn vertical input wires for DFE chains.
#[allow(clippy::too_many_arguments)]
pub(crate) fn connect_signals(
    cell: &mut CellBuilder,
    mgr: &TrackManager,
    insts: &[Instance<SummerRow>],
    info: &TrackInfo,
    num_sig: usize,
    tag: char,
    sig_off: usize,
    is_ffe: bool,
) -> Result<(Vec<Vec<Wire>>, Vec<Vec<Wire>>)> {
    let w_out = mgr.width(SigKind::Out);

    // signal index and ring position of every data pin
    let mut sigp: IndexMap<(usize, usize), Vec<Wire>> = IndexMap::new();
    let mut sign: IndexMap<(usize, usize), Vec<Wire>> = IndexMap::new();
    for (cidx, inst) in insts.iter().enumerate() {
        let pcidx = (cidx + 1) % 4;
        for sidx in sig_off..num_sig + sig_off {
            sigp.entry((sidx, cidx))
                .or_default()
                .extend(inst.port(&format!("outp_{tag}<{sidx}>"))?);
            sign.entry((sidx, cidx))
                .or_default()
                .extend(inst.port(&format!("outn_{tag}<{sidx}>"))?);
            // the input one position over continues this signal
            let in_sidx = if is_ffe { sidx + 1 } else { sidx - 1 };
            sigp.entry((in_sidx, pcidx))
                .or_default()
                .extend(inst.port(&format!("inp_{tag}<{sidx}>"))?);
            sign.entry((in_sidx, pcidx))
                .or_default()
                .extend(inst.port(&format!("inn_{tag}<{sidx}>"))?);
        }
    }

    let mut inp_list = Vec::new();
    let mut inn_list = Vec::new();
    let sig_range = if is_ffe {
        // the first FFE tap's inputs leave the ring at the boundary
        let in_idx = num_sig + sig_off;
        for cidx in 0..4 {
            inp_list.push(sigp[&(in_idx, cidx)].clone());
            inn_list.push(sign[&(in_idx, cidx)].clone());
        }
        1 + sig_off..num_sig + sig_off
    } else {
        sig_off..num_sig + sig_off - 1
    };

    for sidx in sig_range {
        for cidx in 0..4 {
            let key = (sidx, cidx);
            let trp = info.first(&format!("outp_{tag}{cidx}<{sidx}>"))?;
            let trn = info.first(&format!("outn_{tag}{cidx}<{sidx}>"))?;
            let (vwp, vwn) =
                cell.connect_differential_tracks(&sigp[&key], &sign[&key], trp, trn, w_out);
            if !is_ffe && sidx == sig_off {
                // the DFE chain is driven externally at its first tap
                inp_list.push(vec![vwp]);
                inn_list.push(vec![vwn]);
            }
        }
    }

    // the chain's far end shares one track pair across the ring
    let sidx = if is_ffe {
        sig_off
    } else {
        num_sig + sig_off - 1
    };
    let trp = info.first(&format!("outp_{tag}<{sidx}>"))?;
    let trn = info.first(&format!("outn_{tag}<{sidx}>"))?;
    for cidx in 0..4 {
        let key = (sidx, cidx);
        cell.connect_differential_tracks(&sigp[&key], &sign[&key], trp, trn, w_out);
    }

    Ok((inp_list, inn_list))
}

/// Connects the FFE cascode, clock, and bias nets. Returns the gathered
/// clock wires, phase-corrected into a (clkp, clkn) pair.
pub(crate) fn connect_ffe(
    cell: &mut CellBuilder,
    mgr: &TrackManager,
    insts: &[Instance<SummerRow>],
    info: &TrackInfo,
    num_sig: usize,
) -> Result<(Vec<Wire>, Vec<Wire>)> {
    let w_casc = mgr.width(SigKind::Casc);
    let w_clk = mgr.width(SigKind::Clk);

    let mut clkp_list = Vec::new();
    let mut clkn_list = Vec::new();
    let mut bp_list = Vec::new();
    let mut bn_list = Vec::new();
    let mut m_list = Vec::new();
    for (cidx, inst) in insts.iter().enumerate() {
        let ncidx = (cidx + 3) % 4;
        // odd ring positions run on the opposite clock phase
        if cidx % 2 == 1 {
            clkp_list.extend(inst.port("clkp")?);
            clkn_list.extend(inst.port("clkn")?);
            bp_list.push(inst.port_wire("biasp_a")?);
        } else {
            clkp_list.extend(inst.port("clkn")?);
            clkn_list.extend(inst.port("clkp")?);
            bn_list.push(inst.port_wire("biasp_a")?);
        }
        m_list.push(insts[(cidx + 1) % 4].port_wire("biasn_m")?);

        for sig_idx in (1..num_sig).rev() {
            let track = if ncidx % 2 == 1 {
                info.first(&format!("cascp<{sig_idx}>"))?
            } else {
                info.first(&format!("cascn<{sig_idx}>"))?
            };
            let wires = inst.port(&format!("casc<{sig_idx}>"))?;
            let warr = cell.connect_to_tracks(&wires, track, w_casc);
            cell.add_pin(arcstr::format!("casc<{}>", ncidx + sig_idx * 4), [warr]);
        }
    }

    let (clkp, clkn) = cell.connect_differential_tracks(
        &clkp_list,
        &clkn_list,
        info.first("clkp")?,
        info.first("clkn")?,
        w_clk,
    );
    cell.add_pin("clkp", [clkp]);
    cell.add_pin("clkn", [clkn]);

    let (wp, wn) = cell.connect_differential_tracks(
        &bp_list,
        &bn_list,
        info.first("biasp_a")?,
        info.first("biasn_a")?,
        w_clk,
    );
    cell.add_pin("biasp_a", [wp]);
    cell.add_pin("biasn_a", [wn]);

    // main tap biases pair up by clock phase
    let trp = info.first("biasp_m")?;
    let trn = info.first("biasn_m")?;
    let (wp, wn) = cell.connect_differential_tracks(&m_list[1..2], &m_list[0..1], trp, trn, w_clk);
    cell.add_pin("bias_m<1>", [wp]);
    cell.add_pin("bias_m<0>", [wn]);
    let (wp, wn) = cell.connect_differential_tracks(&m_list[3..4], &m_list[2..3], trp, trn, w_clk);
    cell.add_pin("bias_m<3>", [wp]);
    cell.add_pin("bias_m<2>", [wn]);

    Ok((clkp_list, clkn_list))
}

/// Connects the DFE summer bias, sign-select, clock, and latch bias
/// nets, reusing the phase-corrected clock wires from the FFE pass.
pub(crate) fn connect_dfe(
    cell: &mut CellBuilder,
    mgr: &TrackManager,
    insts: &[Instance<SummerRow>],
    info: &TrackInfo,
    num_sig: usize,
    clkp_list: &[Wire],
    clkn_list: &[Wire],
) -> Result<()> {
    let w_clk = mgr.width(SigKind::Clk);

    let mut bp_list = Vec::new();
    let mut bn_list = Vec::new();
    for (cidx, inst) in insts.iter().enumerate() {
        if cidx % 2 == 1 {
            bp_list.push(inst.port_wire("biasp_d")?);
        } else {
            bn_list.push(inst.port_wire("biasp_d")?);
        }
    }

    for sig_idx in (2..=num_sig + 1).rev() {
        let ctrp = info.first(&format!("biasp_s<{sig_idx}>"))?;
        let ctrn = info.first(&format!("biasn_s<{sig_idx}>"))?;
        let mut strp = info.first(&format!("sgnpp<{sig_idx}>"))?;
        let mut strn = info.first(&format!("sgnnp<{sig_idx}>"))?;
        for cidx in [1usize, 3] {
            let wp = insts[(cidx + 1) % 4].port(&format!("biasn_s<{sig_idx}>"))?;
            let wn = insts[cidx].port(&format!("biasn_s<{sig_idx}>"))?;
            let (wp, wn) = cell.connect_differential_tracks(&wp, &wn, ctrp, ctrn, w_clk);
            cell.add_pin(arcstr::format!("bias_s<{}>", cidx + sig_idx * 4), [wp]);
            cell.add_pin(arcstr::format!("bias_s<{}>", cidx - 1 + sig_idx * 4), [wn]);

            let sp = insts[cidx].port(&format!("sgnp<{sig_idx}>"))?;
            let sn = insts[cidx].port(&format!("sgnn<{sig_idx}>"))?;
            let (sp, sn) = cell.connect_differential_tracks(&sp, &sn, strp, strn, 1);
            cell.add_pin(arcstr::format!("sgnp<{}>", cidx - 1 + sig_idx * 4), [sp]);
            cell.add_pin(arcstr::format!("sgnn<{}>", cidx - 1 + sig_idx * 4), [sn]);
        }
        strp = info.first(&format!("sgnpn<{sig_idx}>"))?;
        strn = info.first(&format!("sgnnn<{sig_idx}>"))?;
        for cidx in [0usize, 2] {
            let ncidx = (cidx + 3) % 4;
            let sp = insts[cidx].port(&format!("sgnp<{sig_idx}>"))?;
            let sn = insts[cidx].port(&format!("sgnn<{sig_idx}>"))?;
            let (sp, sn) = cell.connect_differential_tracks(&sp, &sn, strp, strn, 1);
            cell.add_pin(arcstr::format!("sgnp<{}>", ncidx + sig_idx * 4), [sp]);
            cell.add_pin(arcstr::format!("sgnn<{}>", ncidx + sig_idx * 4), [sn]);
        }
    }

    let (clkp, clkn) = cell.connect_differential_tracks(
        clkp_list,
        clkn_list,
        info.first("clkp")?,
        info.first("clkn")?,
        w_clk,
    );
    cell.add_pin("clkp", [clkp]);
    cell.add_pin("clkn", [clkn]);

    let (wp, wn) = cell.connect_differential_tracks(
        &bp_list,
        &bn_list,
        info.first("biasp_d")?,
        info.first("biasn_d")?,
        w_clk,
    );
    cell.add_pin("biasp_d", [wp]);
    cell.add_pin("biasn_d", [wn]);

    Ok(())
}

/// Connects the divider enables and the quarter-rate enable ring.
///
/// The two divider rows drive opposite enable phases; every row's
/// enable pins rotate by its ring position before joining the shared
/// enable tracks.
pub(crate) fn connect_div(
    cell: &mut CellBuilder,
    mgr: &TrackManager,
    insts: &[Instance<SummerRow>],
    info: &TrackInfo,
) -> Result<()> {
    let w_clk = mgr.width(SigKind::Clk);

    let mut en_warrs: [Vec<Wire>; 4] = Default::default();
    for (inst, pidx) in [(&insts[2], 2usize), (&insts[0], 3usize)] {
        for name in ["scan_div", "en_div"] {
            let wires = inst.port(name)?;
            let warr = cell.connect_to_tracks(&wires, info.first(name)?, 1);
            cell.add_pin(arcstr::format!("{name}<{pidx}>"), [warr]);
        }
        en_warrs[pidx].push(inst.port_wire("div")?);
        en_warrs[pidx - 2].push(inst.port_wire("divb")?);
    }

    for (cidx, inst) in insts.iter().enumerate() {
        for en_idx in 0..4usize {
            let cur_idx = (en_idx + (cidx + 1) % 4) % 4;
            if inst.has_port(&format!("en<{en_idx}>")) {
                en_warrs[cur_idx].extend(inst.port(&format!("en<{en_idx}>"))?);
            }
        }
    }

    for (en_idx, wires) in en_warrs.iter().enumerate() {
        let track = info.first(&format!("en{en_idx}"))?;
        cell.connect_to_tracks(wires, track, w_clk);
    }
    Ok(())
}

/// Ties the supply rails of all rows to the recorded shield tracks.
///
/// Shield wires share the vertical extent of the first VSS shield so
/// the VDD shields do not outrun the rails they protect.
pub(crate) fn connect_shields(
    cell: &mut CellBuilder,
    vdd_list: &[Wire],
    vss_list: &[Wire],
    ffe_info: &TrackInfo,
    dfe_info: &TrackInfo,
) -> Result<()> {
    let mut sh_span = None;
    for &track in ffe_info
        .get("VSS")?
        .iter()
        .chain(dfe_info.get("VSS")?.iter())
    {
        let warr = cell.connect_to_tracks(vss_list, track, 1);
        sh_span.get_or_insert(warr.span);
    }
    let sh_span = sh_span.expect("no shield tracks recorded");
    for &track in ffe_info
        .get("VDD")?
        .iter()
        .chain(dfe_info.get("VDD")?.iter())
    {
        cell.connect_to_tracks_within(vdd_list, track, 1, sh_span);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use geometry::prelude::*;

    use crate::config::{Tech, TrackConfig};
    use crate::layout::Cell;
    use crate::row::tests::row_params;
    use crate::row::SummerRow;
    use crate::tracks::TrackGrid;

    fn ring() -> (TrackManager, TrackGrid, Arc<SummerRow>, Vec<Instance<SummerRow>>) {
        let tech = Tech::default();
        let mgr = TrackManager::new(&TrackConfig::with_wide_signals()).unwrap();
        let grid = TrackGrid::new(tech.vm_line, tech.vm_space, tech.vm_offset);
        let row = Arc::new(SummerRow::new(&tech, &mgr, &grid, row_params()).unwrap());
        let h = row.bbox().height();
        let insts = (0..4)
            .map(|i| {
                let y = (i as i64 + 1) * h;
                if i % 2 == 0 {
                    Instance::new(row.clone(), Point::new(0, y), Orientation::ReflectVert)
                } else {
                    Instance::new(row.clone(), Point::new(0, y - h), Orientation::R0)
                }
            })
            .collect();
        (mgr, grid, row, insts)
    }

    #[test]
    fn signal_chains_return_four_ring_inputs() {
        let (mgr, grid, row, insts) = ring();
        let mut cell = CellBuilder::new(grid);
        let (inp, inn) = connect_signals(
            &mut cell,
            &mgr,
            &insts,
            row.ffe_track_info(),
            row.num_ffe(),
            'a',
            0,
            true,
        )
        .unwrap();
        assert_eq!(inp.len(), 4);
        assert_eq!(inn.len(), 4);
        // boundary latch inputs are horizontal pins, one per row
        for wires in &inp {
            assert!(wires.iter().all(|w| w.dir == Dir::Horiz));
        }

        let (inp, inn) = connect_signals(
            &mut cell,
            &mgr,
            &insts,
            row.dfe_track_info(),
            row.num_dfe(),
            'd',
            2,
            false,
        )
        .unwrap();
        assert_eq!(inp.len(), 4);
        assert_eq!(inn.len(), 4);
        // DFE inputs are the drawn vertical chain wires
        for wires in inp.iter().chain(inn.iter()) {
            assert_eq!(wires.len(), 1);
            assert_eq!(wires[0].dir, Dir::Vert);
        }
    }

    #[test]
    fn ffe_pass_names_cascodes_by_ring_position() {
        let (mgr, grid, row, insts) = ring();
        let mut cell = CellBuilder::new(grid);
        let (clkp, clkn) =
            connect_ffe(&mut cell, &mgr, &insts, row.ffe_track_info(), row.num_ffe()).unwrap();
        // two clock pins per row, two rows per phase
        assert_eq!(clkp.len(), clkn.len());
        let (ports, _) = cell.finish();
        for name in [
            "casc<4>", "casc<5>", "casc<6>", "casc<7>", "clkp", "clkn", "biasp_a", "biasn_a",
            "bias_m<0>", "bias_m<3>",
        ] {
            assert!(ports.has(name), "missing pin {name}");
        }
        assert!(!ports.has("casc<3>"));
    }

    #[test]
    fn dfe_pass_names_biases_and_signs_by_ring_position() {
        let (mgr, grid, row, insts) = ring();
        let mut cell = CellBuilder::new(grid);
        let (clkp, clkn) =
            connect_ffe(&mut cell, &mgr, &insts, row.ffe_track_info(), row.num_ffe()).unwrap();
        connect_dfe(
            &mut cell,
            &mgr,
            &insts,
            row.dfe_track_info(),
            row.num_dfe(),
            &clkp,
            &clkn,
        )
        .unwrap();
        let (ports, _) = cell.finish();
        // taps 2 through 4 fan out to ring positions 0 through 3
        for name in [
            "bias_s<8>", "bias_s<11>", "sgnp<8>", "sgnn<11>", "bias_s<16>", "sgnp<19>",
            "biasp_d", "biasn_d",
        ] {
            assert!(ports.has(name), "missing pin {name}");
        }
        assert!(!ports.has("bias_s<20>"));
    }

    #[test]
    fn divider_pass_routes_the_enable_ring() {
        let (mgr, grid, row, insts) = ring();
        let mut cell = CellBuilder::new(grid);
        connect_div(&mut cell, &mgr, &insts, row.dfe_track_info()).unwrap();
        let (ports, wires) = cell.finish();
        for name in ["scan_div<2>", "scan_div<3>", "en_div<2>", "en_div<3>"] {
            assert!(ports.has(name), "missing pin {name}");
        }
        // four enable tracks drawn, plus the four divider control stubs
        assert_eq!(wires.len(), 8);
    }

    #[test]
    fn shields_share_a_vertical_extent() {
        let (mgr, grid, row, insts) = ring();
        let _ = mgr;
        let mut cell = CellBuilder::new(grid);
        let mut vdd = Vec::new();
        let mut vss = Vec::new();
        for inst in &insts {
            vdd.extend(inst.port("VDD").unwrap());
            vss.extend(inst.port("VSS").unwrap());
        }
        connect_shields(
            &mut cell,
            &vdd,
            &vss,
            row.ffe_track_info(),
            row.dfe_track_info(),
        )
        .unwrap();
        let (_, wires) = cell.finish();
        let span = wires[0].span;
        assert!(wires.iter().all(|w| w.dir == Dir::Vert));
        assert!(wires.iter().all(|w| w.span.contains(span.start())));
    }
}
