use crate::core::actions::cancellation::{CANCEL_CHECK_INTERVAL_PIXELS, CancelToken};
use crate::core::actions::compute_field::ports::field_backend::{
    BackendError, FieldBackend, FieldRegion,
};
use crate::core::actions::progress::ProgressListener;
use crate::core::data::field::{ComputeStatus, Field, FieldData, PENDING_SENTINEL};
use crate::core::data::iteration_params::{IterationParams, SeedMode};
use crate::core::fractals::interior::{in_cardioid, in_period2_bulb};
use crate::core::fractals::kernel::{PointEscape, iterate_point, iterate_point_with_derivative};
use crate::core::util::pixel_to_complex_coords::pixel_to_complex_coords;

/// Point-by-point reference backend.
///
/// Slowest strategy, used as ground truth for the others. With
/// `fast_interior` enabled, Mandelbrot seeds inside the main cardioid or
/// the period-2 bulb short-circuit to the interior count without
/// iterating; the result is unchanged because those points provably never
/// escape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarBackend {
    fast_interior: bool,
}

impl ScalarBackend {
    #[must_use]
    pub fn new(fast_interior: bool) -> Self {
        Self { fast_interior }
    }
}

impl FieldBackend for ScalarBackend {
    fn compute(
        &self,
        region: FieldRegion,
        params: &IterationParams,
        cancel: &dyn CancelToken,
        _progress: &dyn ProgressListener,
    ) -> Result<FieldData, BackendError> {
        let span = region.span;
        let mut escape = Field::filled(span.width, span.height, PENDING_SENTINEL);
        let mut z_abs = Field::zeroed(span.width, span.height);
        let mut dz_abs = params
            .derivative()
            .then(|| Field::zeroed(span.width, span.height));

        let is_mandelbrot = params.seed_mode() == SeedMode::Mandelbrot;
        let mut visited = 0usize;
        let mut cancelled = false;

        'rows: for row in 0..span.height {
            for col in 0..span.width {
                if visited % CANCEL_CHECK_INTERVAL_PIXELS == 0 && cancel.is_cancelled() {
                    cancelled = true;
                    break 'rows;
                }
                visited += 1;

                let coordinate =
                    pixel_to_complex_coords(&region.window, span.x0 + col, span.y0 + row);

                let result = if self.fast_interior
                    && is_mandelbrot
                    && (in_cardioid(coordinate.real, coordinate.imag)
                        || in_period2_bulb(coordinate.real, coordinate.imag))
                {
                    PointEscape::interior(params.max_iter())
                } else {
                    let (z0, c) = params.seed_mode().seed(coordinate);
                    if params.derivative() {
                        iterate_point_with_derivative(z0, c, params.max_iter(), params.horizon())
                    } else {
                        iterate_point(z0, c, params.max_iter(), params.horizon())
                    }
                };

                escape.set(col, row, f64::from(result.count));
                z_abs.set(col, row, result.z_abs);
                if let Some(dz) = dz_abs.as_mut() {
                    dz.set(col, row, result.dz_abs);
                }
            }
        }

        Ok(FieldData {
            escape,
            z_abs,
            dz_abs,
            status: if cancelled {
                ComputeStatus::Cancelled
            } else {
                ComputeStatus::Complete
            },
        })
    }
}
