use std::fmt;

use crate::core::actions::smooth_field::SmoothingMode;

/// Closed set of field computation strategies.
///
/// Exactly one is selected per request; compatibility with the requested
/// smoothing mode is checked at request construction, not discovered
/// mid-computation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// Whole-field lockstep generations under a still-iterating mask.
    /// The reference fallback for unavailable backends.
    Vectorized,
    /// Point-by-point nested loop; ground truth for correctness tests.
    Scalar,
    /// Per-pixel loop distributed over rayon worker threads.
    Parallel,
    /// Compute-shader grid of independent threads; optional capability.
    Gpu,
    /// Double-double arithmetic for deep zooms; selected explicitly.
    HighPrecision,
}

impl BackendKind {
    /// Whether this backend produces the auxiliary data `mode` consumes.
    ///
    /// The GPU kernel emits counts only; the high-precision path carries
    /// |z| but not the derivative recurrence.
    #[must_use]
    pub fn supports(&self, mode: SmoothingMode) -> bool {
        match self {
            Self::Vectorized | Self::Scalar | Self::Parallel => true,
            Self::Gpu => mode == SmoothingMode::None,
            Self::HighPrecision => mode != SmoothingMode::Derivative,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Vectorized => "vectorized",
            Self::Scalar => "scalar",
            Self::Parallel => "parallel",
            Self::Gpu => "gpu",
            Self::HighPrecision => "high-precision",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
