use std::time::{Duration, Instant};

use crate::registry::{LoadState, Registry};
use crate::viewport::ViewportRange;

pub const RECLAIM_PERIOD: Duration = Duration::from_secs(60);
///No eviction happens until this many entries hold a bitmap
pub const LOADED_THRESHOLD: usize = 2000;
///Entries within this distance of the visible range are never evicted
pub const PROTECTION_MARGIN: usize = 150;
///Upper bound on evictions per pass, keeps each pass cheap
pub const MAX_EVICTIONS_PER_PASS: usize = 100;

///Periodically demotes far-offscreen `Loaded` entries to `Evicted`, dropping
///their bitmaps. Aspect ratios are left alone so no layout shift follows.
pub struct MemoryReclaimer {
    last_pass: Instant,
    loaded_threshold: usize,
    protection_margin: usize,
}

impl MemoryReclaimer {
    pub fn new(loaded_threshold: usize, protection_margin: usize) -> Self {
        Self {
            last_pass: Instant::now(),
            loaded_threshold,
            protection_margin,
        }
    }

    ///Runs a pass when the period has elapsed. Returns the eviction count.
    pub fn tick(&mut self, registry: &mut Registry, visible: Option<ViewportRange>) -> usize {
        if self.last_pass.elapsed() < RECLAIM_PERIOD {
            return 0;
        }
        self.last_pass = Instant::now();
        self.run_pass(registry, visible)
    }

    pub fn run_pass(&self, registry: &mut Registry, visible: Option<ViewportRange>) -> usize {
        let loaded = registry.loaded_count();
        if loaded <= self.loaded_threshold {
            return 0;
        }

        let protected = visible.map(|range| {
            (
                range.first.saturating_sub(self.protection_margin),
                range.last + self.protection_margin,
            )
        });

        let candidates: Vec<usize> = registry
            .entries()
            .iter()
            .filter(|e| e.state == LoadState::Loaded)
            .filter(|e| match protected {
                Some((first, last)) => e.index < first || e.index > last,
                None => true,
            })
            .map(|e| e.index)
            .collect();

        //evict the furthest-from-view entries first
        let mut by_distance = candidates;
        if let Some((first, last)) = protected {
            by_distance.sort_by_key(|&i| {
                std::cmp::Reverse(if i < first { first - i } else { i - last })
            });
        }

        let budget = (loaded - self.loaded_threshold).min(MAX_EVICTIONS_PER_PASS);
        let mut evicted = 0;
        for index in by_distance.into_iter().take(budget) {
            registry.update_load_state(index, LoadState::Evicted, None, None);
            evicted += 1;
        }

        if evicted > 0 {
            log::info!(
                "Reclaimed {evicted} thumbnails, {} still loaded",
                registry.loaded_count()
            );
        }
        evicted
    }
}
