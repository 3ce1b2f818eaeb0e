//! Persistent worker pool and the per-frame row scheduler.
//!
//! Workers are created once and parked between frames. A frame is broadcast to every worker,
//! each of which claims tile rows from a shared counter until none remain; the broadcast
//! returns after the last worker finishes, at which point the whole destination is written.
//! Dropping the pool stops the workers and joins them.

pub mod affinity;

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::sync::{Mutex, PoisonError};

use crate::config::TimewarpConfig;
use crate::dispatch::{FrameContext, FrameStats, RowScratch, warp_tile_row};
use crate::foundation::core::Eye;
use crate::foundation::error::{TimewarpError, TimewarpResult};
use crate::surface::DestImage;

/// Hands out frame rows `0 .. rows` exactly once each, in increasing order.
///
/// Rows `0 .. tiles_high` are the left eye's, the rest the right eye's.
#[derive(Debug)]
pub struct RowScheduler {
    next: AtomicU32,
    rows: u32,
}

impl RowScheduler {
    pub fn new(rows: u32) -> Self {
        Self {
            next: AtomicU32::new(0),
            rows,
        }
    }

    /// Claim the next row, or `None` once every row has been handed out.
    #[inline]
    pub fn claim(&self) -> Option<u32> {
        let row = self.next.fetch_add(1, Ordering::Relaxed);
        (row < self.rows).then_some(row)
    }

    /// Split a frame row into its eye and the tile row within that eye.
    pub fn locate(row: u32, tiles_high: u32) -> (Eye, u32) {
        let eye = if row < tiles_high {
            Eye::Left
        } else {
            Eye::Right
        };
        (eye, row % tiles_high)
    }
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    // Dropped after `pool`, which has already told the workers to exit.
    threads: WorkerThreads,
    workers: usize,
    id: usize,
}

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(0);

impl WorkerPool {
    pub fn new(config: &TimewarpConfig) -> TimewarpResult<Self> {
        config.validate()?;
        let workers = config.worker_count();
        let cpus = if config.pin_big_cores {
            affinity::big_cores(&config.sysfs_cpu_root)
        } else {
            Vec::new()
        };
        let realtime = config.realtime_priority;
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            pool = id,
            workers,
            big_cores = ?cpus,
            realtime,
            "starting timewarp workers"
        );

        let mut handles = Vec::with_capacity(workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("timewarp-{id}.{i}"))
            .start_handler(move |i| affinity::prepare_worker(i, &cpus, realtime))
            .spawn_handler(|thread| {
                let mut builder = std::thread::Builder::new();
                if let Some(name) = thread.name() {
                    builder = builder.name(name.to_owned());
                }
                handles.push(builder.spawn(|| thread.run())?);
                Ok(())
            })
            .build()
            .map_err(|e| TimewarpError::init(format!("failed to start worker pool: {e}")))?;
        Ok(Self {
            pool,
            threads: WorkerThreads(handles),
            workers,
            id,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `job` once on every worker, passing the worker index, and wait for all of them.
    pub fn broadcast<R, F>(&self, job: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync,
        R: Send,
    {
        self.pool.broadcast(|ctx| job(ctx.index()))
    }

    /// Warp every tile of `dest`. Returns after the last tile is written.
    pub fn run_frame(
        &self,
        frame: &FrameContext<'_>,
        dest: &mut DestImage<'_>,
    ) -> TimewarpResult<FrameStats> {
        let tiles = frame.tiles();
        if dest.tiles() != tiles {
            return Err(TimewarpError::misuse(format!(
                "destination is {}x{} tiles per eye, mesh is {}x{}",
                dest.tiles().wide,
                dest.tiles().high,
                tiles.wide,
                tiles.high
            )));
        }

        let strips: Vec<Mutex<Option<Vec<&mut [u8]>>>> = dest
            .tile_rows()
            .into_iter()
            .map(|strip| Mutex::new(Some(strip)))
            .collect();
        let scheduler = RowScheduler::new(tiles.frame_rows());

        let per_worker = self.broadcast(|_| -> TimewarpResult<FrameStats> {
            let mut scratch = RowScratch::new(tiles);
            let mut stats = FrameStats::default();
            while let Some(row) = scheduler.claim() {
                let taken = strips[row as usize]
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                let Some(mut strip) = taken else {
                    continue;
                };
                let (eye, ty) = RowScheduler::locate(row, tiles.high);
                stats.merge(warp_tile_row(frame, eye, ty, &mut strip, &mut scratch)?);
            }
            Ok(stats)
        });

        let mut total = FrameStats::default();
        for stats in per_worker {
            total.merge(stats?);
        }
        Ok(total)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.id)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

/// Join handles of a pool's worker threads; dropping it waits for every worker to exit.
struct WorkerThreads(Vec<JoinHandle<()>>);

impl Drop for WorkerThreads {
    fn drop(&mut self) {
        let count = self.0.len();
        for handle in self.0.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("timewarp worker panicked");
            }
        }
        tracing::debug!(workers = count, "timewarp workers joined");
    }
}
