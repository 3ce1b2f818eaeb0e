//! CPU asynchronous time-warp.
//!
//! Resamples one eye buffer into a side-by-side stereo framebuffer through a lens distortion
//! mesh that has been re-projected, per display refresh, to the latest head pose. The work is
//! split into 32x32 destination tiles, each resampled by fixed-point scan conversion of the
//! source quad under its corners, and tile rows are fanned out over a persistent worker pool.
//!
//! - Build or load a [`DistortionMesh`] (see [`build_distortion_mesh`])
//! - Create a [`Timewarper`], or use the process-wide [`init`] / [`timewarp`] / [`shutdown`]
//! - Warp a [`TimewarpFrame`] into a [`DestImage`]
#![deny(unsafe_code)]

mod foundation;

pub mod config;
pub mod dispatch;
pub mod matrix;
pub mod mesh;
pub mod pool;
pub mod session;
pub mod surface;
pub mod testimage;
pub mod warp;

pub use crate::foundation::core::{
    BYTES_PER_PIXEL, ColorChannel, Eye, EyeTiles, MAX_SOURCE_DIM, MeshCoord, Sampling, TILE_SIZE,
};
pub use crate::foundation::error::{TimewarpError, TimewarpResult, status_code};
pub use crate::foundation::math::{Mat4, Vec4};

pub use crate::config::{MAX_HOST_WORKERS, TimewarpConfig};
pub use crate::dispatch::{FrameContext, FrameStats, RowScratch, warp_tile_row};
pub use crate::matrix::{FramePoses, StaticView, TimewarpMatrices, ViewPredictor};
pub use crate::mesh::{DistortionMesh, HmdInfo, build_distortion_mesh};
pub use crate::pool::{RowScheduler, WorkerPool};
pub use crate::session::{
    RawFrame, TimewarpFrame, Timewarper, dsp_version, init, shutdown, timewarp, timewarp_raw,
};
pub use crate::surface::{DestImage, PackedImage, PlanarImage, SourceImage};
pub use crate::testimage::TestImage;
pub use crate::warp::{Quad, TileDest, TilePath};
