use std::error::Error;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NormalizationSpecError {
    InvalidRange { vmin: f64, vmax: f64 },
    InvalidPivot { pivot: f64, vmin: f64, vmax: f64 },
    InvalidParameter { method: NormMethod, parameter: f64 },
}

impl fmt::Display for NormalizationSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange { vmin, vmax } => {
                write!(f, "vmax {} must be greater than vmin {}", vmax, vmin)
            }
            Self::InvalidPivot { pivot, vmin, vmax } => {
                write!(
                    f,
                    "two-slope pivot {} must lie strictly between vmin {} and vmax {}",
                    pivot, vmin, vmax
                )
            }
            Self::InvalidParameter { method, parameter } => {
                write!(
                    f,
                    "parameter {} is invalid for {:?} normalization",
                    parameter, method
                )
            }
        }
    }
}

impl Error for NormalizationSpecError {}

/// Monotonic transform selecting how [vmin, vmax] maps onto [0, 1].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NormMethod {
    Linear,
    /// Logarithmic; a non-positive vmin is lifted to 0.1.
    Log,
    /// Power law; `parameter` is the gamma exponent (> 0).
    Power,
    /// Inverse hyperbolic sine; `parameter` is the linear width (> 0).
    Asinh,
    /// Two linear slopes meeting at `parameter` (vmin < pivot < vmax).
    TwoSlope,
    /// vmin/vmax taken from the data at percentiles p and 100-p;
    /// `parameter` is p in (0, 50).
    Percentile,
    /// Mean-centered stretch by factor `parameter` (> 0), then linear.
    MeanStretch,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NormalizationSpec {
    method: NormMethod,
    vmin: f64,
    vmax: f64,
    parameter: f64,
    clip: bool,
}

impl NormalizationSpec {
    pub fn new(
        method: NormMethod,
        vmin: f64,
        vmax: f64,
        parameter: f64,
        clip: bool,
    ) -> Result<Self, NormalizationSpecError> {
        if !(vmax > vmin) {
            return Err(NormalizationSpecError::InvalidRange { vmin, vmax });
        }

        match method {
            NormMethod::TwoSlope => {
                if !(parameter > vmin && parameter < vmax) {
                    return Err(NormalizationSpecError::InvalidPivot {
                        pivot: parameter,
                        vmin,
                        vmax,
                    });
                }
            }
            NormMethod::Percentile => {
                if !(parameter > 0.0 && parameter < 50.0) {
                    return Err(NormalizationSpecError::InvalidParameter { method, parameter });
                }
            }
            NormMethod::Power | NormMethod::Asinh | NormMethod::MeanStretch => {
                if !(parameter > 0.0) {
                    return Err(NormalizationSpecError::InvalidParameter { method, parameter });
                }
            }
            NormMethod::Linear | NormMethod::Log => {}
        }

        Ok(Self {
            method,
            vmin,
            vmax,
            parameter,
            clip,
        })
    }

    /// Linear spec over [vmin, vmax]; the parameter is unused.
    pub fn linear(vmin: f64, vmax: f64, clip: bool) -> Result<Self, NormalizationSpecError> {
        Self::new(NormMethod::Linear, vmin, vmax, 0.0, clip)
    }

    #[must_use]
    pub fn method(&self) -> NormMethod {
        self.method
    }

    #[must_use]
    pub fn vmin(&self) -> f64 {
        self.vmin
    }

    #[must_use]
    pub fn vmax(&self) -> f64 {
        self.vmax
    }

    #[must_use]
    pub fn parameter(&self) -> f64 {
        self.parameter
    }

    #[must_use]
    pub fn clip(&self) -> bool {
        self.clip
    }
}
