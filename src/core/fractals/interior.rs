/// Closed-form membership test for the main cardioid of the Mandelbrot set.
#[inline]
#[must_use]
pub fn in_cardioid(x: f64, y: f64) -> bool {
    let xm = x - 0.25;
    let q = xm * xm + y * y;
    q * (q + xm) < 0.25 * y * y
}

/// Closed-form membership test for the period-2 bulb centered at -1.
#[inline]
#[must_use]
pub fn in_period2_bulb(x: f64, y: f64) -> bool {
    let xp = x + 1.0;
    xp * xp + y * y < 0.0625 // 1/16
}
