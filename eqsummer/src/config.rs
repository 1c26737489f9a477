//! Technology constants and routing track configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::tracks::SigKind;

/// Technology constants consumed by the dimension model.
///
/// All coordinates are in layout database units. Transistor columns are
/// `sd_pitch` wide; vertical routing tracks have width `vm_line` and
/// spacing `vm_space`, with track 0 starting at `vm_offset`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tech {
    /// The source/drain pitch: the width of one transistor finger column.
    pub sd_pitch: i64,
    /// The width of a unit vertical routing track.
    pub vm_line: i64,
    /// The spacing between adjacent vertical routing tracks.
    pub vm_space: i64,
    /// The coordinate at which vertical track 0 starts.
    pub vm_offset: i64,
    /// The line-end clearance between a vertical wire and internal geometry.
    pub line_end: i64,
    /// The height of one amplifier row stack.
    pub amp_height: i64,
    /// The height of a boundary row.
    pub end_height: i64,
}

impl Default for Tech {
    fn default() -> Self {
        Self {
            sd_pitch: 64,
            vm_line: 32,
            vm_space: 32,
            vm_offset: 0,
            line_end: 48,
            amp_height: 1280,
            end_height: 256,
        }
    }
}

/// Per-signal-class track widths and spacings.
///
/// Widths are in units of routing tracks; a signal class absent from a
/// map uses the default of 1. Spacings are the extra whole tracks
/// required on each side of a wire of that class; the spacing between
/// two wires is the larger of their two entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Track width overrides, keyed by signal class.
    #[serde(default)]
    pub widths: IndexMap<SigKind, i64>,
    /// Track spacing overrides, keyed by signal class.
    #[serde(default)]
    pub spaces: IndexMap<SigKind, i64>,
}

impl TrackConfig {
    /// A configuration using double-width tracks for outputs and clocks.
    pub fn with_wide_signals() -> Self {
        let mut widths = IndexMap::new();
        widths.insert(SigKind::Out, 2);
        widths.insert(SigKind::Clk, 2);
        Self {
            widths,
            spaces: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tech_has_even_track_dimensions() {
        let tech = Tech::default();
        assert_eq!(tech.vm_line % 2, 0);
        assert_eq!(tech.vm_space % 2, 0);
        assert_eq!(tech.sd_pitch, tech.vm_line + tech.vm_space);
    }

    #[test]
    fn track_config_round_trips_through_serde() {
        let cfg = TrackConfig::with_wide_signals();
        let ser = serde_json::to_string(&cfg).unwrap();
        let de: TrackConfig = serde_json::from_str(&ser).unwrap();
        assert_eq!(de, cfg);
    }
}
