/// Receives partial-completion notifications during a long computation.
///
/// The tiled scheduler reports merged tiles; the vectorized backend reports
/// iteration generations in batches. Listeners are called from worker
/// threads and must be cheap.
pub trait ProgressListener: Send + Sync {
    fn tiles_completed(&self, completed: u32, total: u32);

    fn generations_completed(&self, completed: u32, total: u32);
}

/// Generations between two progress notifications of the vectorized backend.
pub const GENERATION_PROGRESS_INTERVAL: u32 = 100;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    #[inline]
    fn tiles_completed(&self, _completed: u32, _total: u32) {}

    #[inline]
    fn generations_completed(&self, _completed: u32, _total: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingListener {
        tiles: AtomicU32,
        generations: AtomicU32,
    }

    impl ProgressListener for CountingListener {
        fn tiles_completed(&self, _completed: u32, _total: u32) {
            self.tiles.fetch_add(1, Ordering::Relaxed);
        }

        fn generations_completed(&self, _completed: u32, _total: u32) {
            self.generations.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn listener_receives_both_channels() {
        let listener = CountingListener {
            tiles: AtomicU32::new(0),
            generations: AtomicU32::new(0),
        };

        listener.tiles_completed(1, 25);
        listener.generations_completed(100, 1024);

        assert_eq!(listener.tiles.load(Ordering::Relaxed), 1);
        assert_eq!(listener.generations.load(Ordering::Relaxed), 1);
    }
}
