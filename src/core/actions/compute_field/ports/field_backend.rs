use std::error::Error;
use std::fmt;

use crate::core::actions::cancellation::CancelToken;
use crate::core::actions::compute_field::backend_kind::BackendKind;
use crate::core::actions::progress::ProgressListener;
use crate::core::data::field::FieldData;
use crate::core::data::iteration_params::IterationParams;
use crate::core::data::tile::PixelSpan;
use crate::core::data::view_window::ViewWindow;

/// The rectangle of the parent grid one backend invocation fills.
///
/// `span` uses global pixel indices into `window`'s grid; a full-field
/// computation and a single tile differ only in the span. Keeping the
/// parent window here is what makes tiling bit-transparent: every pixel is
/// mapped through the same bounds regardless of which tile computes it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FieldRegion {
    pub window: ViewWindow,
    pub span: PixelSpan,
}

impl FieldRegion {
    #[must_use]
    pub fn full(window: ViewWindow) -> Self {
        Self {
            span: PixelSpan::full(&window),
            window,
        }
    }
}

#[derive(Debug)]
pub enum BackendError {
    /// The backend cannot run here (no GPU adapter, feature compiled out).
    /// The engine reports this and falls back to the vectorized backend.
    Unavailable {
        backend: BackendKind,
        reason: String,
    },
    /// The backend started but its device failed mid-computation.
    Device {
        backend: BackendKind,
        reason: String,
    },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { backend, reason } => {
                write!(f, "{} backend unavailable: {}", backend, reason)
            }
            Self::Device { backend, reason } => {
                write!(f, "{} backend device error: {}", backend, reason)
            }
        }
    }
}

impl Error for BackendError {}

/// Common contract of every field computation strategy.
///
/// All implementations must agree numerically for identical input; the CPU
/// variants share the kernel and therefore agree bit-for-bit. Cancellation
/// is cooperative and yields an `Ok` result marked
/// [`ComputeStatus::Cancelled`](crate::core::data::field::ComputeStatus),
/// with unreached cells at the pending sentinel.
pub trait FieldBackend {
    fn compute(
        &self,
        region: FieldRegion,
        params: &IterationParams,
        cancel: &dyn CancelToken,
        progress: &dyn ProgressListener,
    ) -> Result<FieldData, BackendError>;
}
