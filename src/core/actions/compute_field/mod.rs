pub mod backend_kind;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod high_precision;
pub mod parallel_rayon;
pub mod ports;
pub mod scalar;
pub mod tiled;
pub mod vectorized;
