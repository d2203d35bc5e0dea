use std::sync::Mutex;
use std::thread;

use log::trace;

use crate::core::actions::cancellation::CancelToken;
use crate::core::actions::compute_field::ports::field_backend::{
    BackendError, FieldBackend, FieldRegion,
};
use crate::core::actions::progress::{NoProgress, ProgressListener};
use crate::core::data::field::{ComputeStatus, Field, FieldData, PENDING_SENTINEL};
use crate::core::data::iteration_params::IterationParams;
use crate::core::data::tile::{Tile, TileLayout, partition};
use crate::core::data::view_window::ViewWindow;

/// Runs one inner-backend invocation per tile on its own scoped thread and
/// merges the results into a single field.
///
/// Tiles write disjoint rectangles, but the write and the completion
/// counter share one mutex; the scheduler polls the counter, yielding
/// between polls, until every tile has reported. Because each tile maps
/// its pixels through the parent window, the merged field is identical to
/// a one-pass computation regardless of tile completion order.
///
/// Cancellation is checked before each tile starts: in-flight tiles finish
/// their unit of work, unstarted tiles leave their region at
/// [`PENDING_SENTINEL`] and the result is marked cancelled.
#[derive(Debug, Clone, Copy)]
pub struct TileScheduler<B> {
    layout: TileLayout,
    inner: B,
}

struct Merge {
    escape: Field,
    z_abs: Field,
    dz_abs: Option<Field>,
    finished: u32,
    merged: u32,
    cancelled: bool,
    error: Option<BackendError>,
}

impl<B: FieldBackend + Sync> TileScheduler<B> {
    #[must_use]
    pub fn new(layout: TileLayout, inner: B) -> Self {
        Self { layout, inner }
    }

    pub fn compute(
        &self,
        window: &ViewWindow,
        params: &IterationParams,
        cancel: &dyn CancelToken,
        progress: &dyn ProgressListener,
    ) -> Result<FieldData, BackendError> {
        let tiles = partition(window, self.layout);
        let total = tiles.len() as u32;

        let state = Mutex::new(Merge {
            escape: Field::filled(window.width(), window.height(), PENDING_SENTINEL),
            z_abs: Field::zeroed(window.width(), window.height()),
            dz_abs: params
                .derivative()
                .then(|| Field::zeroed(window.width(), window.height())),
            finished: 0,
            merged: 0,
            cancelled: false,
            error: None,
        });

        let state_ref = &state;
        thread::scope(|scope| {
            for tile in &tiles {
                scope.spawn(move || {
                    self.run_tile(tile, window, params, cancel, progress, state_ref, total);
                });
            }

            // the only suspension point of the tiled path: poll the
            // completion counter and yield until every tile reported
            loop {
                {
                    let merge = state.lock().expect("tile merge lock poisoned");
                    if merge.finished == total {
                        break;
                    }
                }
                thread::yield_now();
            }
        });

        let merge = state.into_inner().expect("tile merge lock poisoned");
        if let Some(error) = merge.error {
            return Err(error);
        }

        Ok(FieldData {
            escape: merge.escape,
            z_abs: merge.z_abs,
            dz_abs: merge.dz_abs,
            status: if merge.cancelled {
                ComputeStatus::Cancelled
            } else {
                ComputeStatus::Complete
            },
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn run_tile(
        &self,
        tile: &Tile,
        window: &ViewWindow,
        params: &IterationParams,
        cancel: &dyn CancelToken,
        progress: &dyn ProgressListener,
        state: &Mutex<Merge>,
        total: u32,
    ) {
        if cancel.is_cancelled() {
            let mut merge = state.lock().expect("tile merge lock poisoned");
            merge.finished += 1;
            merge.cancelled = true;
            return;
        }

        let region = FieldRegion {
            window: *window,
            span: tile.span,
        };
        // tile progress is reported by the scheduler, not the inner backend
        let result = self.inner.compute(region, params, cancel, &NoProgress);

        let merged_count;
        {
            let mut merge = state.lock().expect("tile merge lock poisoned");
            merge.finished += 1;

            match result {
                Ok(data) => {
                    merge.escape.blit(tile.span, &data.escape);
                    merge.z_abs.blit(tile.span, &data.z_abs);
                    if let (Some(dst), Some(src)) = (merge.dz_abs.as_mut(), data.dz_abs.as_ref()) {
                        dst.blit(tile.span, src);
                    }
                    if data.status == ComputeStatus::Cancelled {
                        merge.cancelled = true;
                    }
                    merge.merged += 1;
                }
                Err(error) => {
                    if merge.error.is_none() {
                        merge.error = Some(error);
                    }
                }
            }

            merged_count = merge.merged;
        }

        trace!(
            "tile ({}, {}) merged, {}/{} done, bounds [{}, {}] x [{}, {}]",
            tile.row,
            tile.col,
            merged_count,
            total,
            tile.bounds.xmin,
            tile.bounds.xmax,
            tile.bounds.ymin,
            tile.bounds.ymax
        );
        progress.tiles_completed(merged_count, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actions::cancellation::NeverCancel;
    use crate::core::actions::compute_field::scalar::ScalarBackend;
    use crate::core::actions::compute_field::vectorized::VectorizedBackend;
    use crate::core::data::iteration_params::SeedMode;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    fn classic_window(width: u32, height: u32) -> ViewWindow {
        ViewWindow::new(-0.5, 0.0, 3.0, width, height).unwrap()
    }

    #[test]
    fn test_tiling_is_transparent() {
        // hard requirement: 5x5 tiling equals one pass, cell for cell
        let window = classic_window(40, 40);
        let params = IterationParams::new(64, 4.0, SeedMode::Mandelbrot).unwrap();

        let one_pass = VectorizedBackend
            .compute(FieldRegion::full(window), &params, &NeverCancel, &NoProgress)
            .unwrap();
        let tiled = TileScheduler::new(TileLayout::default(), VectorizedBackend)
            .compute(&window, &params, &NeverCancel, &NoProgress)
            .unwrap();

        assert_eq!(tiled, one_pass);
    }

    #[test]
    fn test_tiling_is_transparent_with_remainders() {
        // grid not divisible by the layout; last row/col tiles are larger
        let window = classic_window(37, 23);
        let params = IterationParams::new(50, 4.0, SeedMode::Mandelbrot)
            .unwrap()
            .with_derivative(true);

        let one_pass = ScalarBackend::default()
            .compute(FieldRegion::full(window), &params, &NeverCancel, &NoProgress)
            .unwrap();
        let tiled = TileScheduler::new(TileLayout::default(), ScalarBackend::default())
            .compute(&window, &params, &NeverCancel, &NoProgress)
            .unwrap();

        assert_eq!(tiled, one_pass);
    }

    #[test]
    fn test_progress_counts_every_tile() {
        struct TileCounter {
            calls: AtomicU32,
            last_total: AtomicU32,
        }

        impl ProgressListener for TileCounter {
            fn tiles_completed(&self, _completed: u32, total: u32) {
                self.calls.fetch_add(1, Ordering::Relaxed);
                self.last_total.store(total, Ordering::Relaxed);
            }
            fn generations_completed(&self, _: u32, _: u32) {}
        }

        let window = classic_window(20, 20);
        let params = IterationParams::new(32, 4.0, SeedMode::Mandelbrot).unwrap();
        let counter = TileCounter {
            calls: AtomicU32::new(0),
            last_total: AtomicU32::new(0),
        };

        TileScheduler::new(TileLayout::new(2, 2).unwrap(), VectorizedBackend)
            .compute(&window, &params, &NeverCancel, &counter)
            .unwrap();

        assert_eq!(counter.calls.load(Ordering::Relaxed), 4);
        assert_eq!(counter.last_total.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_pre_cancelled_run_is_all_sentinel() {
        let window = classic_window(20, 20);
        let params = IterationParams::new(32, 4.0, SeedMode::Mandelbrot).unwrap();

        let data = TileScheduler::new(TileLayout::default(), VectorizedBackend)
            .compute(&window, &params, &(|| true), &NoProgress)
            .unwrap();

        assert_eq!(data.status, ComputeStatus::Cancelled);
        assert!(data.escape.as_slice().iter().all(|&v| v == PENDING_SENTINEL));
    }

    #[test]
    fn test_cancellation_integrity_mid_run() {
        // cancel after a handful of tile polls; merged regions must equal
        // the uncancelled reference, unmerged regions must hold the sentinel
        let window = classic_window(30, 30);
        let params = IterationParams::new(64, 4.0, SeedMode::Mandelbrot).unwrap();

        let reference = VectorizedBackend
            .compute(FieldRegion::full(window), &params, &NeverCancel, &NoProgress)
            .unwrap();

        let polls = AtomicUsize::new(0);
        let token = || polls.fetch_add(1, Ordering::Relaxed) >= 5;

        let data = TileScheduler::new(TileLayout::new(3, 3).unwrap(), VectorizedBackend)
            .compute(&window, &params, &token, &NoProgress)
            .unwrap();

        assert_eq!(data.status, ComputeStatus::Cancelled);
        for y in 0..30 {
            for x in 0..30 {
                let v = data.escape.get(x, y);
                assert!(
                    v == PENDING_SENTINEL || v == reference.escape.get(x, y),
                    "cell ({}, {}) holds {} instead of sentinel or reference",
                    x,
                    y,
                    v
                );
            }
        }
    }

    #[test]
    fn test_single_tile_layout_degenerates_to_inner_backend() {
        let window = classic_window(16, 16);
        let params = IterationParams::new(50, 4.0, SeedMode::Mandelbrot).unwrap();

        let direct = VectorizedBackend
            .compute(FieldRegion::full(window), &params, &NeverCancel, &NoProgress)
            .unwrap();
        let tiled = TileScheduler::new(TileLayout::new(1, 1).unwrap(), VectorizedBackend)
            .compute(&window, &params, &NeverCancel, &NoProgress)
            .unwrap();

        assert_eq!(tiled, direct);
    }
}
