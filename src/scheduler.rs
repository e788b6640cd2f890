use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::decode::{DecodeError, DecodeService, DecodedImage};
use crate::registry::{LoadState, Registry};
use crate::thumb_cache::ThumbCache;
use crate::viewport::ViewportRange;

struct DecodeJob {
    path: PathBuf,
    target_size: u32,
}

enum DecodeOutcome {
    Decoded(Arc<DecodedImage>),
    Failed(DecodeError),
}

struct Completion {
    path: PathBuf,
    outcome: DecodeOutcome,
}

///One applied state change, surfaced so the UI can report progress
pub struct LoadEvent {
    pub index: usize,
    pub loaded: bool,
    pub ratio_changed: bool,
}

///Bounded-concurrency decode dispatcher. A fixed pool of worker threads
///pulls jobs from a channel and reports completions back through another;
///all bookkeeping stays on the coordinator thread. Entries beyond the
///concurrency cap wait in a FIFO.
pub struct LoadScheduler {
    cache: Arc<ThumbCache>,
    job_tx: Option<Sender<DecodeJob>>,
    done_rx: Receiver<Completion>,
    pending: VecDeque<(PathBuf, u32)>,
    in_flight: usize,
    max_workers: usize,
    stop: Arc<AtomicBool>,
}

impl LoadScheduler {
    pub fn new(
        service: Arc<dyn DecodeService>,
        cache: Arc<ThumbCache>,
        max_workers: usize,
    ) -> Self {
        let max_workers = max_workers.max(1);
        let (job_tx, job_rx) = unbounded::<DecodeJob>();
        let (done_tx, done_rx) = unbounded::<Completion>();
        let stop = Arc::new(AtomicBool::new(false));

        for _ in 0..max_workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            let service = service.clone();
            let cache = cache.clone();
            let stop = stop.clone();
            thread::spawn(move || worker_loop(job_rx, done_tx, service, cache, stop));
        }

        Self {
            cache,
            job_tx: Some(job_tx),
            done_rx,
            pending: VecDeque::new(),
            in_flight: 0,
            max_workers,
            stop,
        }
    }

    ///Dispatches loads for every entry in the buffered range that is
    ///`Unloaded` or `Evicted`. Cache hits load synchronously and never
    ///consume a worker slot; the rest go to a worker or the pending FIFO.
    pub fn request_visible(
        &mut self,
        registry: &mut Registry,
        range: ViewportRange,
        buffer_before: usize,
        buffer_after: usize,
        target_size: u32,
    ) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        //no dispatch of any kind once the scheduler has been stopped
        if registry.is_empty() || self.job_tx.is_none() {
            return events;
        }

        let first = range.first.saturating_sub(buffer_before);
        let last = (range.last + buffer_after).min(registry.len() - 1);

        for i in first..=last {
            let entry = match registry.get(i) {
                Some(entry) if entry.needs_load() => entry,
                _ => continue,
            };
            let path = entry.path.clone();

            if let Some(img) = self.cache.lookup(&path, target_size) {
                events.push(Self::apply_loaded(registry, i, Arc::new(img)));
            } else if self.in_flight < self.max_workers {
                registry.update_load_state(i, LoadState::Loading, None, None);
                self.submit(path, target_size);
            } else if !self.pending.iter().any(|(p, _)| p == &path) {
                self.pending.push_back((path, target_size));
            }
        }

        events
    }

    ///Applies completed decodes in arrival order and refills freed worker
    ///slots from the pending FIFO. Results for entries that no longer exist
    ///are discarded harmlessly.
    pub fn drain_completions(&mut self, registry: &mut Registry) -> Vec<LoadEvent> {
        let mut events = Vec::new();

        while let Ok(done) = self.done_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);

            match registry.find_index(&done.path) {
                Some(i) => match done.outcome {
                    DecodeOutcome::Decoded(img) => {
                        events.push(Self::apply_loaded(registry, i, img));
                    }
                    DecodeOutcome::Failed(e) => {
                        log::warn!("{} -> decode failed: {e}", done.path.display());
                        registry.update_load_state(i, LoadState::Failed, None, None);
                        events.push(LoadEvent {
                            index: i,
                            loaded: false,
                            ratio_changed: false,
                        });
                    }
                },
                None => {
                    log::info!(
                        "Discarding decode result for removed entry {}",
                        done.path.display()
                    );
                }
            }

            self.fill_free_slots(registry, &mut events);
        }

        events
    }

    fn apply_loaded(registry: &mut Registry, index: usize, img: Arc<DecodedImage>) -> LoadEvent {
        let ratio = img.aspect_ratio();
        let ratio_changed =
            registry.update_load_state(index, LoadState::Loaded, Some(img), Some(ratio));
        LoadEvent {
            index,
            loaded: true,
            ratio_changed,
        }
    }

    fn fill_free_slots(&mut self, registry: &mut Registry, events: &mut Vec<LoadEvent>) {
        while self.job_tx.is_some() && self.in_flight < self.max_workers {
            let (path, target_size) = match self.pending.pop_front() {
                Some(next) => next,
                None => break,
            };

            //stale queue entries: removed or already satisfied meanwhile
            let index = match registry.find_index(&path) {
                Some(i) if registry.get(i).is_some_and(|e| e.needs_load()) => i,
                _ => continue,
            };

            if let Some(img) = self.cache.lookup(&path, target_size) {
                events.push(Self::apply_loaded(registry, index, Arc::new(img)));
                continue;
            }

            registry.update_load_state(index, LoadState::Loading, None, None);
            self.submit(path, target_size);
        }
    }

    fn submit(&mut self, path: PathBuf, target_size: u32) {
        if let Some(tx) = &self.job_tx {
            if tx.send(DecodeJob { path, target_size }).is_ok() {
                self.in_flight += 1;
            }
        }
    }

    ///Clears queued work after a full registry reset. In-flight decodes are
    ///allowed to finish; their results are applied or discarded by path.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    ///Abandons outstanding work: workers finish their current decode and
    ///exit once the job channel closes. Nothing blocks the coordinator.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.pending.clear();
        self.job_tx = None;
    }
}

impl Drop for LoadScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    job_rx: Receiver<DecodeJob>,
    done_tx: Sender<Completion>,
    service: Arc<dyn DecodeService>,
    cache: Arc<ThumbCache>,
    stop: Arc<AtomicBool>,
) {
    for job in job_rx.iter() {
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let outcome = match service.decode(&job.path, job.target_size, true) {
            Ok(img) => {
                if let Err(e) = cache.store(&job.path, job.target_size, &img) {
                    log::warn!("{} -> failure caching thumbnail: {e}", job.path.display());
                }
                DecodeOutcome::Decoded(Arc::new(img))
            }
            Err(e) => DecodeOutcome::Failed(e),
        };

        if done_tx
            .send(Completion {
                path: job.path,
                outcome,
            })
            .is_err()
        {
            break;
        }
    }
}
