use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::core::actions::cancellation::CancelToken;
use crate::core::actions::compute_field::backend_kind::BackendKind;
#[cfg(feature = "gpu")]
use crate::core::actions::compute_field::gpu::GpuBackend;
use crate::core::actions::compute_field::high_precision::HighPrecisionBackend;
use crate::core::actions::compute_field::parallel_rayon::ParallelBackend;
use crate::core::actions::compute_field::ports::field_backend::{
    BackendError, FieldBackend, FieldRegion,
};
use crate::core::actions::compute_field::scalar::ScalarBackend;
use crate::core::actions::compute_field::tiled::TileScheduler;
use crate::core::actions::compute_field::vectorized::VectorizedBackend;
use crate::core::actions::progress::ProgressListener;
use crate::core::actions::smooth_field::{SmoothingMode, smooth_field};
use crate::core::data::field::{ComputeStatus, Field, FieldData};
use crate::core::data::iteration_params::IterationParams;
use crate::core::data::tile::TileLayout;
use crate::core::data::view_window::ViewWindow;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestError {
    UnsupportedSmoothing {
        backend: BackendKind,
        smoothing: SmoothingMode,
    },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedSmoothing { backend, smoothing } => {
                write!(
                    f,
                    "the {} backend does not support {:?} smoothing",
                    backend, smoothing
                )
            }
        }
    }
}

impl Error for RequestError {}

/// Immutable per-dispatch configuration of one field computation.
///
/// Construction rejects backend/smoothing combinations the chosen backend
/// cannot satisfy, so nothing is discovered mid-computation. The value is
/// passed by reference into every tile task; there is no shared mutable
/// configuration state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ComputeRequest {
    window: ViewWindow,
    params: IterationParams,
    backend: BackendKind,
    tiling: Option<TileLayout>,
    smoothing: SmoothingMode,
}

impl ComputeRequest {
    pub fn new(
        window: ViewWindow,
        params: IterationParams,
        backend: BackendKind,
        smoothing: SmoothingMode,
    ) -> Result<Self, RequestError> {
        if !backend.supports(smoothing) {
            return Err(RequestError::UnsupportedSmoothing { backend, smoothing });
        }

        Ok(Self {
            window,
            params: params.with_derivative(smoothing.needs_derivative()),
            backend,
            tiling: None,
            smoothing,
        })
    }

    /// Runs the backend per tile instead of over the whole field.
    #[must_use]
    pub fn with_tiling(mut self, layout: TileLayout) -> Self {
        self.tiling = Some(layout);
        self
    }

    #[must_use]
    pub fn window(&self) -> ViewWindow {
        self.window
    }

    #[must_use]
    pub fn params(&self) -> &IterationParams {
        &self.params
    }

    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    #[must_use]
    pub fn tiling(&self) -> Option<TileLayout> {
        self.tiling
    }

    #[must_use]
    pub fn smoothing(&self) -> SmoothingMode {
        self.smoothing
    }
}

/// Everything one compute call hands back to the navigation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReport {
    /// Raw escape counts plus auxiliary escape data.
    pub raw: FieldData,
    /// The continuous field after the requested smoothing.
    pub smoothed: Field,
    /// Backend the caller asked for.
    pub requested: BackendKind,
    /// Backend that actually ran; differs from `requested` only after an
    /// explicit unavailable-backend fallback.
    pub backend: BackendKind,
    pub elapsed: Duration,
}

impl FieldReport {
    #[must_use]
    pub fn fell_back(&self) -> bool {
        self.requested != self.backend
    }

    #[must_use]
    pub fn status(&self) -> ComputeStatus {
        self.raw.status
    }
}

/// The engine's synchronous-or-cancelable entry point.
///
/// Blocks until the field is complete or the cancel token fires, then
/// smooths the raw result. A cancelled computation is a normal outcome:
/// the report carries the partial field marked
/// [`ComputeStatus::Cancelled`]. An unavailable backend is logged and
/// substituted by the vectorized reference backend, never silently.
pub fn compute_field(
    request: &ComputeRequest,
    cancel: &dyn CancelToken,
    progress: &dyn ProgressListener,
) -> Result<FieldReport, BackendError> {
    let start = Instant::now();
    let (backend, raw) = dispatch(request, cancel, progress)?;
    let smoothed = smooth_field(&raw, request.params(), request.smoothing());
    let elapsed = start.elapsed();

    debug!(
        "{} {}x{} field, max_iter {}, {:?} in {:?}",
        backend,
        request.window().width(),
        request.window().height(),
        request.params().max_iter(),
        raw.status,
        elapsed
    );

    Ok(FieldReport {
        raw,
        smoothed,
        requested: request.backend(),
        backend,
        elapsed,
    })
}

fn dispatch(
    request: &ComputeRequest,
    cancel: &dyn CancelToken,
    progress: &dyn ProgressListener,
) -> Result<(BackendKind, FieldData), BackendError> {
    match request.backend() {
        BackendKind::Vectorized => run(request, VectorizedBackend, cancel, progress)
            .map(|data| (BackendKind::Vectorized, data)),
        BackendKind::Scalar => run(request, ScalarBackend::new(true), cancel, progress)
            .map(|data| (BackendKind::Scalar, data)),
        BackendKind::Parallel => run(request, ParallelBackend, cancel, progress)
            .map(|data| (BackendKind::Parallel, data)),
        BackendKind::HighPrecision => run(request, HighPrecisionBackend, cancel, progress)
            .map(|data| (BackendKind::HighPrecision, data)),
        BackendKind::Gpu => {
            #[cfg(feature = "gpu")]
            match GpuBackend::new() {
                Ok(backend) => {
                    return run(request, backend, cancel, progress)
                        .map(|data| (BackendKind::Gpu, data));
                }
                Err(error) => {
                    warn!("{}; falling back to the vectorized backend", error);
                }
            }
            #[cfg(not(feature = "gpu"))]
            warn!("gpu backend not compiled into this build; falling back to the vectorized backend");

            run(request, VectorizedBackend, cancel, progress)
                .map(|data| (BackendKind::Vectorized, data))
        }
    }
}

fn run<B: FieldBackend + Sync>(
    request: &ComputeRequest,
    backend: B,
    cancel: &dyn CancelToken,
    progress: &dyn ProgressListener,
) -> Result<FieldData, BackendError> {
    match request.tiling() {
        Some(layout) => TileScheduler::new(layout, backend).compute(
            &request.window(),
            request.params(),
            cancel,
            progress,
        ),
        None => backend.compute(
            FieldRegion::full(request.window()),
            request.params(),
            cancel,
            progress,
        ),
    }
}
