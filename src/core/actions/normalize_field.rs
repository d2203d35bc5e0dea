use crate::core::data::field::Field;
use crate::core::data::normalization_spec::{NormMethod, NormalizationSpec};

// Non-positive vmin handed to the logarithmic method is lifted here.
const LOG_VMIN_FLOOR: f64 = 0.1;

/// Maps a continuous field into [0, 1] under the spec's monotonic
/// transform.
///
/// Pure with respect to the input field. With clip disabled, out-of-range
/// input passes through outside [0, 1] for the colorer to handle (cyclic
/// colormaps wrap); with clip enabled every output cell is clamped.
#[must_use]
pub fn normalize_field(field: &Field, spec: &NormalizationSpec) -> Field {
    let (vmin, vmax) = effective_range(field, spec);

    // the mean-centered stretch reshapes values before the linear map;
    // its anchors depend on the data and are computed once
    let stretch = (spec.method() == NormMethod::MeanStretch).then(|| {
        let mean = field.mean();
        let (min, _) = field.min_max();
        (mean, (min - mean) * spec.parameter())
    });

    let mut out = Field::zeroed(field.width(), field.height());
    for y in 0..field.height() {
        for x in 0..field.width() {
            let mut value = field.get(x, y);
            if let Some((mean, offset)) = stretch {
                value = ((value - mean) * spec.parameter() - offset)
                    .clamp(spec.vmin(), spec.vmax());
            }
            let value = transform(value, spec, vmin, vmax);
            out.set(x, y, if spec.clip() { value.clamp(0.0, 1.0) } else { value });
        }
    }
    out
}

fn effective_range(field: &Field, spec: &NormalizationSpec) -> (f64, f64) {
    match spec.method() {
        NormMethod::Percentile => {
            let p = spec.parameter();
            let vmin = percentile(field.as_slice(), p);
            let vmax = percentile(field.as_slice(), 100.0 - p);
            if vmax > vmin { (vmin, vmax) } else { (spec.vmin(), spec.vmax()) }
        }
        NormMethod::Log => {
            let vmin = if spec.vmin() <= 0.0 {
                LOG_VMIN_FLOOR
            } else {
                spec.vmin()
            };
            (vmin, spec.vmax())
        }
        _ => (spec.vmin(), spec.vmax()),
    }
}

fn transform(value: f64, spec: &NormalizationSpec, vmin: f64, vmax: f64) -> f64 {
    let span = vmax - vmin;
    match spec.method() {
        NormMethod::Linear | NormMethod::Percentile | NormMethod::MeanStretch => {
            (value - vmin) / span
        }
        NormMethod::Log => {
            let floor = f64::MIN_POSITIVE;
            (value.max(floor).ln() - vmin.ln()) / (vmax.ln() - vmin.ln())
        }
        NormMethod::Power => {
            let linear = (value - vmin) / span;
            linear.max(0.0).powf(spec.parameter())
        }
        NormMethod::Asinh => {
            let width = spec.parameter();
            let lo = (vmin / width).asinh();
            let hi = (vmax / width).asinh();
            ((value / width).asinh() - lo) / (hi - lo)
        }
        NormMethod::TwoSlope => {
            let pivot = spec.parameter();
            if value <= pivot {
                0.5 * (value - vmin) / (pivot - vmin)
            } else {
                0.5 + 0.5 * (value - pivot) / (vmax - pivot)
            }
        }
    }
}

// Linear-interpolated percentile, matching the conventional definition
// over sorted data.
fn percentile(data: &[f64], p: f64) -> f64 {
    let mut sorted: Vec<f64> = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("field values are never NaN"));

    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    let fraction = rank - low as f64;
    sorted[low] + (sorted[high] - sorted[low]) * fraction
}
