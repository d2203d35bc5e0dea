pub mod cancellation;
pub mod compute_field;
pub mod normalize_field;
pub mod progress;
pub mod smooth_field;
