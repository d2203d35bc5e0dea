use crate::core::data::field::{Field, FieldData, PENDING_SENTINEL};
use crate::core::data::iteration_params::IterationParams;

/// Floor for logarithm arguments in the smoothing formulas; keeps a
/// just-escaped |z| from driving the outer log to NaN or -inf.
pub const LOG_EPSILON: f64 = 1e-3;

/// Floor for the accumulated derivative magnitude in the distance
/// estimate; a vanishing |dz| would otherwise blow the quotient up.
pub const DERIVATIVE_EPSILON: f64 = 1e-12;

/// Gamma exponent applied to the derivative-smoothed field.
pub const DERIVATIVE_GAMMA: f64 = 0.8;

// Offset inside the smooth-iteration double log of the derivative mode.
const NU_OFFSET: f64 = 1e-8;

/// How raw escape counts become a continuous, bandless field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SmoothingMode {
    /// Pass raw integer counts through.
    None,
    /// Fractional escape count from |z| at escape.
    DistanceEstimate,
    /// Distance estimate from the accumulated derivative, gamma-corrected.
    Derivative,
}

impl SmoothingMode {
    /// Whether the kernel must run the `dz` recurrence for this mode.
    #[must_use]
    pub fn needs_derivative(&self) -> bool {
        *self == Self::Derivative
    }
}

/// Post-processes raw backend output into the continuous field handed to
/// the normalizer.
///
/// Interior points are forced to the in-set value (`max_iter`) in every
/// mode; cells a cancelled computation never reached keep their pending
/// sentinel. The epsilon clamps are documented approximations: the
/// smoothed field never carries NaN.
///
/// Derivative mode requires `data.dz_abs`; request validation guarantees
/// a backend that accumulates it.
#[must_use]
pub fn smooth_field(data: &FieldData, params: &IterationParams, mode: SmoothingMode) -> Field {
    match mode {
        SmoothingMode::None => data.escape.clone(),
        SmoothingMode::DistanceEstimate => distance_estimate(data, params),
        SmoothingMode::Derivative => derivative_estimate(data, params),
    }
}

fn distance_estimate(data: &FieldData, params: &IterationParams) -> Field {
    let interior = params.interior_value();
    let log_horizon = params.horizon().ln().log2();

    let mut out = data.escape.clone();
    for y in 0..out.height() {
        for x in 0..out.width() {
            let n = data.escape.get(x, y);
            if n == PENDING_SENTINEL {
                continue;
            }
            if n >= interior {
                out.set(x, y, interior);
                continue;
            }

            let log_z = data.z_abs.get(x, y).max(LOG_EPSILON).ln().max(LOG_EPSILON);
            let value = n + 1.0 - log_z.log2() + log_horizon;
            out.set(x, y, if value.is_finite() { value } else { 0.0 });
        }
    }
    out
}

fn derivative_estimate(data: &FieldData, params: &IterationParams) -> Field {
    let interior = params.interior_value();
    let dz_abs = data
        .dz_abs
        .as_ref()
        .expect("derivative smoothing requires a backend that accumulates dz");

    // first pass: combined smooth count + distance term per escaped cell
    let mut combined = Field::zeroed(data.escape.width(), data.escape.height());
    let mut max_combined = 0.0f64;
    for y in 0..combined.height() {
        for x in 0..combined.width() {
            let n = data.escape.get(x, y);
            if n == PENDING_SENTINEL || n >= interior {
                continue;
            }

            let z_abs = data.z_abs.get(x, y);
            let nu = n + 1.0 - (z_abs + NU_OFFSET).ln().max(LOG_EPSILON).log2();
            let distance =
                z_abs * z_abs.max(LOG_EPSILON).ln() / dz_abs.get(x, y).max(DERIVATIVE_EPSILON);
            let value = (nu + distance.max(0.0).ln_1p()).max(0.0).ln_1p();

            combined.set(x, y, value);
            if value > max_combined {
                max_combined = value;
            }
        }
    }

    // second pass: gamma-correct and rescale to [0, max_iter], keeping
    // interior cells at the in-set value and cancelled cells untouched
    let mut out = data.escape.clone();
    for y in 0..out.height() {
        for x in 0..out.width() {
            let n = data.escape.get(x, y);
            if n == PENDING_SENTINEL {
                continue;
            }
            if n >= interior {
                out.set(x, y, interior);
                continue;
            }

            let value = if max_combined > 0.0 {
                (combined.get(x, y) / max_combined).powf(DERIVATIVE_GAMMA) * interior
            } else {
                0.0
            };
            out.set(x, y, value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actions::cancellation::NeverCancel;
    use crate::core::actions::compute_field::ports::field_backend::{FieldBackend, FieldRegion};
    use crate::core::actions::compute_field::vectorized::VectorizedBackend;
    use crate::core::actions::progress::NoProgress;
    use crate::core::data::field::ComputeStatus;
    use crate::core::data::iteration_params::{DISTANCE_ESTIMATE_HORIZON, SeedMode};
    use crate::core::data::view_window::ViewWindow;

    fn boundary_ray(mode: SmoothingMode, horizon: f64) -> (Field, Field) {
        // a single pixel row on the real axis, marching c from inside the
        // set (0.25 is the cardioid cusp) out to 0.5
        let window = ViewWindow::new(0.125, 0.375, 0.75, 256, 1).unwrap();
        let params = IterationParams::new(200, horizon, SeedMode::Mandelbrot)
            .unwrap()
            .with_derivative(mode.needs_derivative());

        let data = VectorizedBackend
            .compute(FieldRegion::full(window), &params, &NeverCancel, &NoProgress)
            .unwrap();
        let smoothed = smooth_field(&data, &params, mode);
        (data.escape, smoothed)
    }

    #[test]
    fn test_none_passes_counts_through() {
        let (raw, smoothed) = boundary_ray(SmoothingMode::None, 4.0);
        assert_eq!(raw, smoothed);
    }

    #[test]
    fn test_distance_estimate_is_continuous_where_raw_steps() {
        let (raw, smoothed) = boundary_ray(
            SmoothingMode::DistanceEstimate,
            DISTANCE_ESTIMATE_HORIZON,
        );

        // compare in the far-exterior stretch where the raw field moves in
        // visible unit steps; near the boundary both fields steepen
        let mut max_raw_step = 0.0f64;
        let mut max_smooth_step = 0.0f64;
        for x in 1..256 {
            if raw.get(x - 1, 0) > 15.0 || raw.get(x, 0) > 15.0 {
                continue;
            }
            max_raw_step = max_raw_step.max((raw.get(x, 0) - raw.get(x - 1, 0)).abs());
            max_smooth_step =
                max_smooth_step.max((smoothed.get(x, 0) - smoothed.get(x - 1, 0)).abs());
        }

        // raw counts jump a whole band at a time; the smoothed field
        // crosses the same bands gradually
        assert_eq!(max_raw_step, 1.0);
        assert!(max_smooth_step > 0.0);
        assert!(max_smooth_step < 1.0);
    }

    #[test]
    fn test_distance_estimate_never_produces_nan() {
        let (_, smoothed) = boundary_ray(SmoothingMode::DistanceEstimate, 4.0);

        assert!(smoothed.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_interior_forced_to_in_set_value() {
        for mode in [
            SmoothingMode::None,
            SmoothingMode::DistanceEstimate,
            SmoothingMode::Derivative,
        ] {
            let window = ViewWindow::new(0.0, 0.0, 0.1, 4, 4).unwrap();
            let params = IterationParams::new(30, 4.0, SeedMode::Mandelbrot)
                .unwrap()
                .with_derivative(mode.needs_derivative());
            let data = VectorizedBackend
                .compute(FieldRegion::full(window), &params, &NeverCancel, &NoProgress)
                .unwrap();

            let smoothed = smooth_field(&data, &params, mode);
            assert!(smoothed.as_slice().iter().all(|&v| v == 30.0));
        }
    }

    #[test]
    fn test_derivative_mode_stays_in_output_range() {
        let (_, smoothed) = boundary_ray(SmoothingMode::Derivative, 4.0);

        assert!(
            smoothed
                .as_slice()
                .iter()
                .all(|&v| (0.0..=200.0).contains(&v) && v.is_finite())
        );
    }

    #[test]
    fn test_sentinel_cells_pass_through_unsmoothed() {
        let window = ViewWindow::new(-0.5, 0.0, 3.0, 4, 4).unwrap();
        let params = IterationParams::new(50, 4.0, SeedMode::Mandelbrot).unwrap();

        let mut data = VectorizedBackend
            .compute(FieldRegion::full(window), &params, &NeverCancel, &NoProgress)
            .unwrap();
        data.escape.set(1, 1, PENDING_SENTINEL);
        data.status = ComputeStatus::Cancelled;

        let smoothed = smooth_field(&data, &params, SmoothingMode::DistanceEstimate);
        assert_eq!(smoothed.get(1, 1), PENDING_SENTINEL);
    }
}
