use crate::core::actions::cancellation::CancelToken;
use crate::core::actions::compute_field::ports::field_backend::{
    BackendError, FieldBackend, FieldRegion,
};
use crate::core::actions::progress::{GENERATION_PROGRESS_INTERVAL, ProgressListener};
use crate::core::data::complex::Complex;
use crate::core::data::field::{ComputeStatus, Field, FieldData, PENDING_SENTINEL};
use crate::core::data::iteration_params::IterationParams;
use crate::core::util::pixel_to_complex_coords::pixel_to_complex_coords;

/// Whole-field lockstep backend, the engine's reference fallback.
///
/// One generation advances every still-iterating cell; a boolean mask
/// freezes escaped cells so a diverged z is never squared again. Cost is
/// O(W·H·max_iter) but the inner loop is uniform over the field, and
/// cancellation is polled once per generation, giving the interactive
/// layer a bounded response time.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorizedBackend;

impl FieldBackend for VectorizedBackend {
    fn compute(
        &self,
        region: FieldRegion,
        params: &IterationParams,
        cancel: &dyn CancelToken,
        progress: &dyn ProgressListener,
    ) -> Result<FieldData, BackendError> {
        let span = region.span;
        let cell_count = span.pixel_count();
        let one = Complex {
            real: 1.0,
            imag: 0.0,
        };

        let mut z = Vec::with_capacity(cell_count);
        let mut c = Vec::with_capacity(cell_count);
        for row in 0..span.height {
            for col in 0..span.width {
                let coordinate =
                    pixel_to_complex_coords(&region.window, span.x0 + col, span.y0 + row);
                let (z0, c0) = params.seed_mode().seed(coordinate);
                z.push(z0);
                c.push(c0);
            }
        }

        let mut dz = params.derivative().then(|| vec![one; cell_count]);
        let mut mask = vec![true; cell_count];
        let mut escape = vec![0.0f64; cell_count];
        let mut z_abs = vec![0.0f64; cell_count];
        let mut dz_abs = params.derivative().then(|| vec![0.0f64; cell_count]);

        let max_iter = params.max_iter();
        let horizon = params.horizon();
        let mut alive = cell_count;
        let mut cancelled = false;

        for generation in 1..=max_iter {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            for i in 0..cell_count {
                if !mask[i] {
                    continue;
                }

                z[i] = z[i] * z[i] + c[i];
                if let Some(dz) = dz.as_mut() {
                    dz[i] = (z[i] * dz[i]).scale(2.0) + one;
                }

                if z[i].magnitude_squared() > horizon {
                    mask[i] = false;
                    alive -= 1;
                    escape[i] = f64::from(generation);
                    z_abs[i] = z[i].magnitude();
                    if let (Some(dz), Some(dz_abs)) = (dz.as_ref(), dz_abs.as_mut()) {
                        dz_abs[i] = dz[i].magnitude();
                    }
                }
            }

            if generation % GENERATION_PROGRESS_INTERVAL == 0 {
                progress.generations_completed(generation, max_iter);
            }

            if alive == 0 {
                break;
            }
        }

        let unfinished_value = if cancelled {
            PENDING_SENTINEL
        } else {
            params.interior_value()
        };
        for i in 0..cell_count {
            if mask[i] {
                escape[i] = unfinished_value;
            }
        }

        if !cancelled {
            progress.generations_completed(max_iter, max_iter);
        }

        Ok(FieldData {
            escape: Field::from_data(span.width, span.height, escape),
            z_abs: Field::from_data(span.width, span.height, z_abs),
            dz_abs: dz_abs.map(|data| Field::from_data(span.width, span.height, data)),
            status: if cancelled {
                ComputeStatus::Cancelled
            } else {
                ComputeStatus::Complete
            },
        })
    }
}
