use rayon::prelude::*;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::actions::cancellation::{CANCEL_CHECK_INTERVAL_PIXELS, CancelToken};
use crate::core::actions::compute_field::ports::field_backend::{
    BackendError, FieldBackend, FieldRegion,
};
use crate::core::actions::progress::ProgressListener;
use crate::core::data::field::{ComputeStatus, Field, FieldData, PENDING_SENTINEL};
use crate::core::data::iteration_params::IterationParams;
use crate::core::fractals::kernel::{PointEscape, iterate_point, iterate_point_with_derivative};
use crate::core::util::pixel_to_complex_coords::pixel_to_complex_coords;

/// Per-point backend distributed over rayon's work-stealing scheduler.
///
/// Rows are independent parallel units; pixels share no mutable state, so
/// no synchronization exists inside an invocation beyond the cancellation
/// flag. Results are identical to the scalar reference because both run
/// the same kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelBackend;

impl FieldBackend for ParallelBackend {
    fn compute(
        &self,
        region: FieldRegion,
        params: &IterationParams,
        cancel: &dyn CancelToken,
        _progress: &dyn ProgressListener,
    ) -> Result<FieldData, BackendError> {
        let span = region.span;
        let saw_cancel = AtomicBool::new(false);

        // None marks a pixel the cancelled computation never reached
        let rows: Vec<Vec<Option<PointEscape>>> = (0..span.height)
            .into_par_iter()
            .map(|row| {
                let mut out: Vec<Option<PointEscape>> = Vec::with_capacity(span.width as usize);

                for (i, col) in (0..span.width).enumerate() {
                    if i % CANCEL_CHECK_INTERVAL_PIXELS == 0
                        && (saw_cancel.load(Ordering::Relaxed) || cancel.is_cancelled())
                    {
                        saw_cancel.store(true, Ordering::Relaxed);
                        out.resize(span.width as usize, None);
                        return out;
                    }

                    let coordinate =
                        pixel_to_complex_coords(&region.window, span.x0 + col, span.y0 + row);
                    let (z0, c) = params.seed_mode().seed(coordinate);
                    let result = if params.derivative() {
                        iterate_point_with_derivative(z0, c, params.max_iter(), params.horizon())
                    } else {
                        iterate_point(z0, c, params.max_iter(), params.horizon())
                    };
                    out.push(Some(result));
                }

                out
            })
            .collect();

        let mut escape = Field::filled(span.width, span.height, PENDING_SENTINEL);
        let mut z_abs = Field::zeroed(span.width, span.height);
        let mut dz_abs = params
            .derivative()
            .then(|| Field::zeroed(span.width, span.height));

        for (row, cells) in rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                if let Some(result) = cell {
                    escape.set(col as u32, row as u32, f64::from(result.count));
                    z_abs.set(col as u32, row as u32, result.z_abs);
                    if let Some(dz) = dz_abs.as_mut() {
                        dz.set(col as u32, row as u32, result.dz_abs);
                    }
                }
            }
        }

        Ok(FieldData {
            escape,
            z_abs,
            dz_abs,
            status: if saw_cancel.load(Ordering::Relaxed) {
                ComputeStatus::Cancelled
            } else {
                ComputeStatus::Complete
            },
        })
    }
}
