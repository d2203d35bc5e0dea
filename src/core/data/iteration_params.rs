use std::error::Error;
use std::fmt;

use crate::core::data::complex::Complex;

/// Smallest accepted squared-magnitude escape horizon. The distance-estimate
/// smoothing formula degrades below this.
pub const MIN_HORIZON: f64 = 4.0;

/// Horizon recommended for distance-estimate smoothing (2^40), so the
/// final |z| carries enough growth for the double logarithm.
pub const DISTANCE_ESTIMATE_HORIZON: f64 = 1_099_511_627_776.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum IterationParamsError {
    ZeroMaxIterations,
    HorizonTooSmall { horizon: f64 },
}

impl fmt::Display for IterationParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroMaxIterations => {
                write!(f, "maximum iterations must be greater than zero")
            }
            Self::HorizonTooSmall { horizon } => {
                write!(
                    f,
                    "escape horizon must be at least {}: {}",
                    MIN_HORIZON, horizon
                )
            }
        }
    }
}

impl Error for IterationParamsError {}

/// Which point of the recurrence the pixel coordinate seeds.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SeedMode {
    /// c = pixel coordinate, z0 = 0.
    Mandelbrot,
    /// c fixed, z0 = pixel coordinate.
    Julia { c: Complex },
}

impl SeedMode {
    /// Resolves a pixel coordinate into the (z0, c) pair for the kernel.
    #[must_use]
    pub fn seed(&self, coordinate: Complex) -> (Complex, Complex) {
        match self {
            Self::Mandelbrot => (Complex::ZERO, coordinate),
            Self::Julia { c } => (coordinate, *c),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IterationParams {
    max_iter: u32,
    horizon: f64,
    seed_mode: SeedMode,
    derivative: bool,
}

impl IterationParams {
    pub fn new(
        max_iter: u32,
        horizon: f64,
        seed_mode: SeedMode,
    ) -> Result<Self, IterationParamsError> {
        if max_iter == 0 {
            return Err(IterationParamsError::ZeroMaxIterations);
        }

        if !(horizon >= MIN_HORIZON) {
            return Err(IterationParamsError::HorizonTooSmall { horizon });
        }

        Ok(Self {
            max_iter,
            horizon,
            seed_mode,
            derivative: false,
        })
    }

    /// Enables the `dz <- 2*z*dz + 1` recurrence alongside the iteration,
    /// needed only for derivative-based smoothing.
    #[must_use]
    pub fn with_derivative(mut self, derivative: bool) -> Self {
        self.derivative = derivative;
        self
    }

    #[must_use]
    pub fn max_iter(&self) -> u32 {
        self.max_iter
    }

    #[must_use]
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    #[must_use]
    pub fn seed_mode(&self) -> SeedMode {
        self.seed_mode
    }

    #[must_use]
    pub fn derivative(&self) -> bool {
        self.derivative
    }

    /// The escape count reported for points that never escape.
    #[must_use]
    pub fn interior_value(&self) -> f64 {
        f64::from(self.max_iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_params() {
        let params = IterationParams::new(256, 4.0, SeedMode::Mandelbrot);

        assert!(params.is_ok());
        let value = params.unwrap();
        assert_eq!(value.max_iter(), 256);
        assert_eq!(value.horizon(), 4.0);
        assert!(!value.derivative());
    }

    #[test]
    fn test_max_iterations_must_be_greater_than_zero() {
        let params = IterationParams::new(0, 4.0, SeedMode::Mandelbrot);

        assert_eq!(params, Err(IterationParamsError::ZeroMaxIterations));
    }

    #[test]
    fn test_horizon_must_be_at_least_four() {
        let too_small = IterationParams::new(10, 3.9, SeedMode::Mandelbrot);
        let nan = IterationParams::new(10, f64::NAN, SeedMode::Mandelbrot);

        assert_eq!(
            too_small,
            Err(IterationParamsError::HorizonTooSmall { horizon: 3.9 })
        );
        assert!(nan.is_err());
    }

    #[test]
    fn test_distance_estimate_horizon_is_two_to_the_forty() {
        assert_eq!(DISTANCE_ESTIMATE_HORIZON, (2.0f64).powi(40));
    }

    #[test]
    fn test_mandelbrot_seed() {
        let coordinate = Complex {
            real: 0.3,
            imag: -0.2,
        };
        let (z0, c) = SeedMode::Mandelbrot.seed(coordinate);

        assert_eq!(z0, Complex::ZERO);
        assert_eq!(c, coordinate);
    }

    #[test]
    fn test_julia_seed() {
        let fixed = Complex {
            real: -0.7,
            imag: 0.27,
        };
        let coordinate = Complex {
            real: 0.3,
            imag: -0.2,
        };
        let (z0, c) = SeedMode::Julia { c: fixed }.seed(coordinate);

        assert_eq!(z0, coordinate);
        assert_eq!(c, fixed);
    }

    #[test]
    fn test_with_derivative() {
        let params = IterationParams::new(10, 4.0, SeedMode::Mandelbrot)
            .unwrap()
            .with_derivative(true);

        assert!(params.derivative());
    }
}
