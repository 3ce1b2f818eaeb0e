//! Frame-level entry points.
//!
//! [`Timewarper`] owns a worker pool and warps whole frames. The free functions [`init`],
//! [`shutdown`] and [`timewarp`] drive one process-wide instance for callers that prefer a global
//! lifecycle; [`timewarp_raw`] additionally speaks the integer status convention over flat
//! buffers.

use std::sync::{PoisonError, RwLock};

use crate::config::TimewarpConfig;
use crate::dispatch::{FrameContext, FrameStats};
use crate::foundation::core::{EyeTiles, MeshCoord, Sampling};
use crate::foundation::error::{TimewarpError, TimewarpResult, status_code};
use crate::matrix::{FramePoses, TimewarpMatrices};
use crate::mesh::grid::DistortionMesh;
use crate::pool::WorkerPool;
use crate::surface::{DestImage, PackedImage, PlanarImage, SourceImage};

/// Inputs for one frame.
#[derive(Clone, Copy, Debug)]
pub struct TimewarpFrame<'a> {
    pub source: SourceImage<'a>,
    pub mesh: &'a DistortionMesh,
    pub sampling: Sampling,
    pub poses: FramePoses,
}

impl<'a> TimewarpFrame<'a> {
    /// A frame with the default projection and an unchanged head pose.
    pub fn new(source: SourceImage<'a>, mesh: &'a DistortionMesh, sampling: Sampling) -> Self {
        Self {
            source,
            mesh,
            sampling,
            poses: FramePoses::default(),
        }
    }

    pub fn with_poses(mut self, poses: FramePoses) -> Self {
        self.poses = poses;
        self
    }
}

/// A worker pool ready to warp frames.
#[derive(Debug)]
pub struct Timewarper {
    pool: WorkerPool,
}

impl Timewarper {
    pub fn new(config: &TimewarpConfig) -> TimewarpResult<Self> {
        Ok(Self {
            pool: WorkerPool::new(config)?,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// Warp one frame into `dest`.
    ///
    /// Inputs are validated before any destination byte is written; on success every tile of
    /// `dest` has been written exactly once.
    #[tracing::instrument(skip_all, fields(sampling = frame.sampling.name()))]
    pub fn warp(
        &self,
        frame: &TimewarpFrame<'_>,
        dest: &mut DestImage<'_>,
    ) -> TimewarpResult<FrameStats> {
        let matrices = TimewarpMatrices::from_poses(&frame.poses);
        self.warp_with_matrices(frame, &matrices, dest)
    }

    /// As [`Timewarper::warp`], with caller-supplied time-warp matrices instead of poses.
    pub fn warp_with_matrices(
        &self,
        frame: &TimewarpFrame<'_>,
        matrices: &TimewarpMatrices,
        dest: &mut DestImage<'_>,
    ) -> TimewarpResult<FrameStats> {
        let ctx = FrameContext::new(frame.source, frame.mesh, *matrices, frame.sampling)?;
        let stats = self.pool.run_frame(&ctx, dest)?;
        tracing::debug!(
            sampled = stats.tiles_sampled,
            cleared = stats.tiles_cleared,
            "frame warped"
        );
        Ok(stats)
    }
}

static GLOBAL: RwLock<Option<Timewarper>> = RwLock::new(None);

/// Start the process-wide worker pool, replacing any previous one.
///
/// A replaced pool's workers have exited by the time this returns.
pub fn init(config: &TimewarpConfig) -> TimewarpResult<()> {
    let warper = Timewarper::new(config)?;
    let previous = GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(warper);
    if let Some(old) = previous {
        drop(old);
        tracing::info!("replaced running timewarp pool");
    }
    Ok(())
}

/// Stop the process-wide worker pool and wait for its workers to exit. Idempotent.
pub fn shutdown() -> TimewarpResult<()> {
    let previous = GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(old) = previous {
        drop(old);
        tracing::info!("timewarp pool shut down");
    }
    Ok(())
}

/// Warp one frame on the process-wide pool.
pub fn timewarp(
    frame: &TimewarpFrame<'_>,
    dest: &mut DestImage<'_>,
) -> TimewarpResult<FrameStats> {
    let guard = GLOBAL.read().unwrap_or_else(PoisonError::into_inner);
    let warper = guard
        .as_ref()
        .ok_or_else(|| TimewarpError::init("timewarp called before init"))?;
    warper.warp(frame, dest)
}

/// DSP architecture version, or 0 when the warper runs on the host CPU.
pub fn dsp_version() -> i32 {
    0
}

/// Flat-buffer form of a frame, mirroring the integer entry point.
///
/// Exactly one of `packed` and `planar` is expected; the one the sampler does not read may be
/// absent.
#[derive(Debug)]
pub struct RawFrame<'a> {
    pub packed: Option<&'a [u8]>,
    pub planar: Option<[&'a [u8]; 3]>,
    pub source_pitch: u32,
    pub source_width: u32,
    pub source_height: u32,
    pub dest: Option<&'a mut [u8]>,
    pub dest_pitch: u32,
    pub tiles_wide: u32,
    pub tiles_high: u32,
    /// Six- or nine-grid mesh blob.
    pub mesh: Option<&'a [MeshCoord]>,
    pub sampling: i32,
}

fn required<T>(v: Option<T>, what: &str) -> TimewarpResult<T> {
    v.ok_or_else(|| TimewarpError::misuse(format!("{what} is missing")))
}

fn timewarp_raw_inner(raw: RawFrame<'_>) -> TimewarpResult<FrameStats> {
    let sampling = Sampling::try_from(raw.sampling)?;
    let tiles = EyeTiles::new(raw.tiles_wide, raw.tiles_high)?;
    let mesh = DistortionMesh::from_blob(tiles, required(raw.mesh, "mesh")?)?;
    let source = if sampling.is_planar() {
        SourceImage::Planar(PlanarImage::new(
            required(raw.planar, "planar source")?,
            raw.source_width,
            raw.source_height,
            raw.source_pitch,
        )?)
    } else {
        SourceImage::Packed(PackedImage::new(
            required(raw.packed, "packed source")?,
            raw.source_width,
            raw.source_height,
            raw.source_pitch,
        )?)
    };
    let mut dest = DestImage::new(required(raw.dest, "destination")?, tiles, raw.dest_pitch)?;
    timewarp(&TimewarpFrame::new(source, &mesh, sampling), &mut dest)
}

/// [`timewarp`] over flat buffers: 0 on success, a negative status code otherwise.
pub fn timewarp_raw(raw: RawFrame<'_>) -> i32 {
    let result = timewarp_raw_inner(raw);
    if let Err(e) = &result {
        tracing::warn!(error = %e, "timewarp rejected frame");
    }
    status_code(&result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TimewarpConfig {
        TimewarpConfig {
            workers: Some(2),
            pin_big_cores: false,
            ..TimewarpConfig::default()
        }
    }

    fn raw<'a>(
        src: &'a [u8],
        dest: &'a mut [u8],
        mesh: &'a [MeshCoord],
        sampling: i32,
    ) -> RawFrame<'a> {
        RawFrame {
            packed: Some(src),
            planar: None,
            source_pitch: 64,
            source_width: 64,
            source_height: 64,
            dest: Some(dest),
            dest_pitch: 128,
            tiles_wide: 2,
            tiles_high: 2,
            mesh: Some(mesh),
            sampling,
        }
    }

    #[test]
    fn lifecycle_and_status_codes() {
        let tiles = EyeTiles::new(2, 2).unwrap();
        let mesh = DistortionMesh::identity(tiles).to_blob();
        let src = vec![90u8; 64 * 64 * 4];
        let mut dest = vec![1u8; 128 * 64 * 4];

        shutdown().unwrap();
        assert_eq!(timewarp_raw(raw(&src, &mut dest, &mesh, 0)), -1);
        assert!(dest.iter().all(|b| *b == 1));

        init(&config()).unwrap();
        assert_eq!(timewarp_raw(raw(&src, &mut dest, &mesh, 9)), -2);
        assert!(
            dest.iter().all(|b| *b == 1),
            "misuse must not touch the destination"
        );
        assert_eq!(timewarp_raw(raw(&src, &mut dest, &mesh, 3)), -2);

        let mut no_mesh = raw(&src, &mut dest, &mesh, 0);
        no_mesh.mesh = None;
        assert_eq!(timewarp_raw(no_mesh), -2);

        assert_eq!(timewarp_raw(raw(&src, &mut dest, &mesh, 0)), 0);
        assert!(dest.iter().all(|b| *b == 90));

        init(&config()).unwrap();
        shutdown().unwrap();
        shutdown().unwrap();
        assert_eq!(dsp_version(), 0);
    }

    #[test]
    fn tile_grid_mismatch_is_misuse() {
        let warper = Timewarper::new(&config()).unwrap();
        let mesh = DistortionMesh::identity(EyeTiles::new(2, 2).unwrap());
        let src = vec![0u8; 64 * 64 * 4];
        let packed = PackedImage::new(&src, 64, 64, 64).unwrap();
        let mut buf = vec![3u8; 64 * 32 * 4];
        let mut dest = DestImage::new(&mut buf, EyeTiles::new(1, 1).unwrap(), 64).unwrap();
        let frame = TimewarpFrame::new(SourceImage::Packed(packed), &mesh, Sampling::NearestPacked);
        let err = warper.warp(&frame, &mut dest).unwrap_err();
        assert_eq!(err.status_code(), -2);
        assert!(buf.iter().all(|b| *b == 3));
    }
}
