use std::ops::Range;

use crate::foundation::core::{Eye, MeshCoord, NUM_EYES};
use crate::foundation::math::Vec4;
use crate::matrix::TimewarpMatrices;

/// Position of mesh column `x` within one display refresh, in `[0, 1]`.
///
/// A landscape panel scans out left to right, left eye first, so the fraction grows with the
/// column across both eyes.
pub fn display_refresh_fraction(eye: Eye, tiles_wide: u32, x: usize) -> f32 {
    let column = eye.index() * tiles_wide as usize + x;
    column as f32 / (NUM_EYES * tiles_wide as usize) as f32
}

/// Project one mesh vertex through both time-warp matrices and blend by refresh fraction.
///
/// A vertex that projects to `w == 0` yields non-finite output; the tile warper clamps such
/// corners into its border path.
#[inline]
pub fn transform_coord(c: MeshCoord, matrices: &TimewarpMatrices, fraction: f32) -> MeshCoord {
    let v = Vec4::new(c.x, c.y, -1.0, 1.0);
    let start = matrices.start.transform(v);
    let end = matrices.end.transform(v);
    let p = start.lerp(end, fraction);
    let rcp_w = 1.0 / p.w;
    MeshCoord::new(p.x * rcp_w, p.y * rcp_w)
}

/// Time-warp the given mesh `columns` of every row in `src` into the same slots of `dst`.
///
/// `src` and `dst` hold whole rows of `stride` vertices; `x` in `columns` is the mesh column
/// within the eye, which sets the rolling-shutter blend.
pub fn transform_mesh(
    src: &[MeshCoord],
    dst: &mut [MeshCoord],
    stride: usize,
    eye: Eye,
    tiles_wide: u32,
    matrices: &TimewarpMatrices,
    columns: Range<usize>,
) {
    let rows = src.len().min(dst.len()) / stride;
    for x in columns {
        let fraction = display_refresh_fraction(eye, tiles_wide, x);
        for y in 0..rows {
            let i = y * stride + x;
            dst[i] = transform_coord(src[i], matrices, fraction);
        }
    }
}
