//! Concurrent replay of one frozen list across independent surfaces.
//!
//! The frozen list is the shared input; every worker gets its own provider
//! and destination, so no synchronization of surfaces is needed. This is the
//! concurrency contract of [`crate::DisplayList`] made executable (and
//! testable): identical destinations must come back with identical pixels.

use rayon::prelude::*;

use crate::{
    core::FrameRgba8,
    error::{EncoreError, EncoreResult},
    list::DisplayList,
    render::{BackendKind, RenderSettings, create_provider},
};

/// Replays `list` on `workers` freshly initialized `width`×`height` surfaces
/// in parallel and returns every worker's read-back frame, in worker order.
#[tracing::instrument(skip(list, settings), fields(ops = list.len()))]
pub fn replay_parallel(
    list: &DisplayList,
    width: u32,
    height: u32,
    workers: usize,
    kind: BackendKind,
    settings: &RenderSettings,
) -> EncoreResult<Vec<FrameRgba8>> {
    if workers == 0 {
        return Err(EncoreError::validation("replay workers must be >= 1"));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| EncoreError::render(format!("failed to build thread pool: {e}")))?;

    let results: Vec<EncoreResult<FrameRgba8>> = pool.install(|| {
        (0..workers)
            .into_par_iter()
            .map(|_| {
                let mut provider = create_provider(kind, settings)?;
                provider.initialize_surface(width, height)?;
                list.render_to(provider.surface()?)?;
                provider.flush_and_submit(true)?;
                provider.surface()?.read_pixels()
            })
            .collect()
    });

    results.into_iter().collect()
}
