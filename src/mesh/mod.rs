pub mod grid;
pub mod lens;
pub mod transform;

pub use grid::{DistortionMesh, MESH_BLOB_GRIDS, MESH_GRIDS};
pub use lens::{HmdInfo, build_distortion_mesh};
pub use transform::{display_refresh_fraction, transform_coord, transform_mesh};
