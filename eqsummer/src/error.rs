//! Error types for summer generation.

use arcstr::ArcStr;

/// A result type returning summer generation errors.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for summer generation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The per-tap segment lists do not describe the same number of taps.
    #[error("segment list length mismatch: {num_sum} summer stages, but {num_ffe} FFE + {num_dfe} DFE taps and {num_sign} sign flags")]
    TapCountMismatch {
        /// The number of summer stages.
        num_sum: usize,
        /// The number of FFE taps.
        num_ffe: usize,
        /// The number of DFE taps.
        num_dfe: usize,
        /// The number of sign-flip flags.
        num_sign: usize,
    },
    /// No FFE taps were specified; the last FFE tap is the main tap.
    #[error("at least one FFE tap is required; the last FFE tap is the main tap")]
    NoMainTap,
    /// Fewer than two DFE taps were specified.
    #[error("at least two DFE taps are required, got {0}")]
    TooFewDfeTaps(usize),
    /// A signal specification's kind and name lists have different lengths.
    #[error("signal spec has {num_kinds} track kinds but {num_names} names")]
    SignalSpecMismatch {
        /// The number of track kinds in the batch.
        num_kinds: usize,
        /// The number of signal names in the batch.
        num_names: usize,
    },
    /// A signal specification requests no tracks at all.
    #[error("signal spec is empty")]
    EmptySignalSpec,
    /// A segment record contains no transistor fingers.
    #[error("segment record for `{0}` has no fingers")]
    EmptySegments(ArcStr),
    /// A negative dummy-finger or minimum-finger count was supplied.
    #[error("negative finger count `{value}` for `{name}`")]
    NegativeFingers {
        /// The name of the offending parameter.
        name: ArcStr,
        /// The supplied value.
        value: i64,
    },
    /// A cell has no port with the requested name.
    #[error("no port named `{0}`")]
    MissingPort(ArcStr),
    /// A track record is missing from an allocation table.
    #[error("no track record named `{0}`")]
    MissingTrack(ArcStr),
    /// A track configuration entry is invalid.
    #[error("invalid track configuration: {0}")]
    InvalidTrackConfig(ArcStr),
}
