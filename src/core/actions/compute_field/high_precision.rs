use crate::core::actions::cancellation::{CANCEL_CHECK_INTERVAL_PIXELS, CancelToken};
use crate::core::actions::compute_field::ports::field_backend::{
    BackendError, FieldBackend, FieldRegion,
};
use crate::core::actions::progress::ProgressListener;
use crate::core::data::double_double::DoubleDouble;
use crate::core::data::field::{ComputeStatus, Field, FieldData, PENDING_SENTINEL};
use crate::core::data::iteration_params::{IterationParams, SeedMode};
use crate::core::fractals::interior::{in_cardioid, in_period2_bulb};

/// Double-double escape hatch for deep zooms.
///
/// At deltas approaching machine epsilon the f64 pixel step collapses and
/// neighboring pixels collide onto one coordinate; this backend derives
/// seeds and iterates in ~31-digit double-double arithmetic instead.
/// Substantially slower than every other strategy and therefore selected
/// explicitly, never as a silent substitute. The derivative recurrence is
/// not carried here.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighPrecisionBackend;

struct DdSeed {
    z_re: DoubleDouble,
    z_im: DoubleDouble,
    c_re: DoubleDouble,
    c_im: DoubleDouble,
}

fn dd_coordinate(region: &FieldRegion, x: u32, y: u32) -> (DoubleDouble, DoubleDouble) {
    let window = &region.window;
    let delta = DoubleDouble::from(window.delta());
    let half = delta / DoubleDouble::from(2.0);

    let re = DoubleDouble::from(window.center_x()) - half
        + DoubleDouble::from(x) * delta / DoubleDouble::from(window.width());
    let im = DoubleDouble::from(window.center_y()) - half
        + DoubleDouble::from(y) * delta / DoubleDouble::from(window.height());

    (re, im)
}

fn dd_seed(params: &IterationParams, re: DoubleDouble, im: DoubleDouble) -> DdSeed {
    match params.seed_mode() {
        SeedMode::Mandelbrot => DdSeed {
            z_re: DoubleDouble::ZERO,
            z_im: DoubleDouble::ZERO,
            c_re: re,
            c_im: im,
        },
        SeedMode::Julia { c } => DdSeed {
            z_re: re,
            z_im: im,
            c_re: DoubleDouble::from(c.real),
            c_im: DoubleDouble::from(c.imag),
        },
    }
}

// Returns (count, |z| at escape); interior points report (max_iter, 0).
fn dd_iterate(seed: &DdSeed, max_iter: u32, horizon: f64) -> (u32, f64) {
    let horizon = DoubleDouble::from(horizon);
    let two = DoubleDouble::from(2.0);

    let mut z_re = seed.z_re;
    let mut z_im = seed.z_im;
    let mut n = 0;

    while n < max_iter {
        let next_re = z_re * z_re - z_im * z_im + seed.c_re;
        z_im = two * z_re * z_im + seed.c_im;
        z_re = next_re;
        n += 1;

        let magnitude_squared = z_re * z_re + z_im * z_im;
        if magnitude_squared > horizon {
            return (n, magnitude_squared.to_f64().sqrt());
        }
    }

    (max_iter, 0.0)
}

impl FieldBackend for HighPrecisionBackend {
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

                let (re, im) = dd_coordinate(&region, span.x0 + col, span.y0 + row);

                // f64 projection is precise enough for the analytic interior
                // tests; they only skip work for provably interior points
                let (count, magnitude) = if is_mandelbrot
                    && (in_cardioid(re.to_f64(), im.to_f64())
                        || in_period2_bulb(re.to_f64(), im.to_f64()))
                {
                    (params.max_iter(), 0.0)
                } else {
                    let seed = dd_seed(params, re, im);
                    dd_iterate(&seed, params.max_iter(), params.horizon())
                };

                escape.set(col, row, f64::from(count));
                z_abs.set(col, row, magnitude);
            }
        }

        Ok(FieldData {
            escape,
            z_abs,
            dz_abs: None,
            status: if cancelled {
                ComputeStatus::Cancelled
            } else {
                ComputeStatus::Complete
            },
        })
    }
}
