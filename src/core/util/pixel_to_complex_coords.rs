use crate::core::data::complex::Complex;
use crate::core::data::view_window::ViewWindow;

/// Maps a pixel of the window's grid to its complex-plane coordinate.
///
/// `x` and `y` are global indices into the parent grid. Tiled backends call
/// this with the parent window and their global offsets, never with a
/// re-derived sub-window, so a recombined tiling is bit-identical to a
/// one-pass computation over the same window.
#[must_use]
pub fn pixel_to_complex_coords(window: &ViewWindow, x: u32, y: u32) -> Complex {
    let real = window.xmin() + f64::from(x) * window.delta() / f64::from(window.width());
    let imag = window.ymin() + f64::from(y) * window.delta() / f64::from(window.height());

    Complex { real, imag }
}
