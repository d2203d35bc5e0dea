mod core;

pub use crate::core::actions::cancellation::{CancelFlag, CancelToken, Cancelled, NeverCancel};
pub use crate::core::actions::compute_field::backend_kind::BackendKind;
#[cfg(feature = "gpu")]
pub use crate::core::actions::compute_field::gpu::GpuBackend;
pub use crate::core::actions::compute_field::high_precision::HighPrecisionBackend;
pub use crate::core::actions::compute_field::parallel_rayon::ParallelBackend;
pub use crate::core::actions::compute_field::ports::field_backend::{
    BackendError, FieldBackend, FieldRegion,
};
pub use crate::core::actions::compute_field::scalar::ScalarBackend;
pub use crate::core::actions::compute_field::tiled::TileScheduler;
pub use crate::core::actions::compute_field::vectorized::VectorizedBackend;
pub use crate::core::actions::normalize_field::normalize_field;
pub use crate::core::actions::progress::{NoProgress, ProgressListener};
pub use crate::core::actions::smooth_field::{SmoothingMode, smooth_field};
pub use crate::core::data::complex::Complex;
pub use crate::core::data::double_double::DoubleDouble;
pub use crate::core::data::field::{ComputeStatus, Field, FieldData, PENDING_SENTINEL};
pub use crate::core::data::iteration_params::{
    DISTANCE_ESTIMATE_HORIZON, IterationParams, IterationParamsError, MIN_HORIZON, SeedMode,
};
pub use crate::core::data::normalization_spec::{NormMethod, NormalizationSpec, NormalizationSpecError};
pub use crate::core::data::tile::{PixelSpan, Tile, TileLayout, TileLayoutError};
pub use crate::core::data::view_window::{ComplexBounds, ViewWindow, ViewWindowError};
pub use crate::core::engine::{ComputeRequest, FieldReport, RequestError, compute_field};
