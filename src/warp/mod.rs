pub(crate) mod sampler;
pub mod tile;

pub use tile::{
    Quad, TileDest, TilePath, warp32_bilinear_packed, warp32_bilinear_planar,
    warp32_chromatic_bilinear_planar, warp32_linear_packed, warp32_nearest_packed,
};
