//! Fixed-point scan conversion of one 32x32 destination tile.
//!
//! A tile is described by the four normalised source coordinates at its corners. The edges of
//! that quad are walked in 16.16 fixed point one destination scanline at a time; each scanline
//! is then stepped in 16.`STP` fixed point relative to a scanline-local texel origin, so no
//! per-pixel coordinate ever needs more than 16 bits.

use crate::foundation::core::{BYTES_PER_PIXEL, MeshCoord, TILE_SHIFT, TILE_SIZE};
use crate::foundation::error::{TimewarpError, TimewarpResult};
use crate::foundation::math::{SCP, STP, shr_toward_zero, to_fixed16};
use crate::surface::{PackedImage, PlanarImage};
use crate::warp::sampler::{
    BilinearPacked, BilinearPlanar, ChromaticPlanar, LinearPacked, NearestPacked, Sampler, Texel,
};

/// Widest source extent, in whole texels, a tile may cover before local 8.8 coordinates would
/// overflow 16 bits.
const MAX_TILE_SPAN_TEXELS: i32 = 254;

const TILE_ROW_BYTES: usize = TILE_SIZE * BYTES_PER_PIXEL;

/// The four mesh vertices at the corners of a tile, in normalised source space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Quad {
    pub tl: MeshCoord,
    pub tr: MeshCoord,
    pub bl: MeshCoord,
    pub br: MeshCoord,
}

impl Quad {
    /// Read the quad whose top-left vertex is `grid[index]`; `stride` steps from the top pair to
    /// the bottom pair.
    pub fn from_grid(grid: &[MeshCoord], stride: usize, index: usize) -> Self {
        Self {
            tl: grid[index],
            tr: grid[index + 1],
            bl: grid[index + stride],
            br: grid[index + stride + 1],
        }
    }

    /// Axis-aligned quad spanning `[x0, x1] x [y0, y1]`.
    pub fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            tl: MeshCoord::new(x0, y0),
            tr: MeshCoord::new(x1, y0),
            bl: MeshCoord::new(x0, y1),
            br: MeshCoord::new(x1, y1),
        }
    }
}

/// Which path a tile took through the warper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TilePath {
    /// Source texels were resampled.
    Sampled,
    /// The quad collapsed at the border (or exceeded the supported extent); zeros were written.
    Cleared,
}

/// Mutable destination for one tile: `TILE_SIZE` scanlines, written from pixel column `x`.
pub struct TileDest<'r, 'd> {
    rows: &'r mut [&'d mut [u8]],
    x: usize,
}

impl<'r, 'd> TileDest<'r, 'd> {
    pub fn new(rows: &'r mut [&'d mut [u8]], x: usize) -> TimewarpResult<Self> {
        if rows.len() < TILE_SIZE {
            return Err(TimewarpError::misuse(format!(
                "tile destination needs {TILE_SIZE} rows, got {}",
                rows.len()
            )));
        }
        let end = (x + TILE_SIZE) * BYTES_PER_PIXEL;
        if let Some(short) = rows[..TILE_SIZE].iter().position(|r| r.len() < end) {
            return Err(TimewarpError::misuse(format!(
                "tile destination row {short} is shorter than {end} bytes"
            )));
        }
        Ok(Self { rows, x })
    }

    /// Caller guarantees the shape checked by [`TileDest::new`].
    pub(crate) fn new_unchecked(rows: &'r mut [&'d mut [u8]], x: usize) -> Self {
        Self { rows, x }
    }

    #[inline(always)]
    fn row(&mut self, r: usize) -> &mut [u8] {
        let start = self.x * BYTES_PER_PIXEL;
        &mut self.rows[r][start..start + TILE_ROW_BYTES]
    }

    fn clear(&mut self) {
        for r in 0..TILE_SIZE {
            self.row(r).fill(0);
        }
    }
}

/// Quad corners in 16.16 source texels, clamped to `[0, size - margin]`.
#[derive(Clone, Copy, Debug)]
struct FixedQuad {
    tl: [i32; 2],
    tr: [i32; 2],
    bl: [i32; 2],
    br: [i32; 2],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Extent {
    Degenerate,
    Normal,
    Oversize,
}

impl FixedQuad {
    fn clamped(q: &Quad, (w, h): (u32, u32), margin: i32) -> Self {
        let max_x = (w as i32 - margin) << SCP;
        let max_y = (h as i32 - margin) << SCP;
        let fix = |c: MeshCoord| {
            [
                to_fixed16(c.x, w).clamp(0, max_x),
                to_fixed16(c.y, h).clamp(0, max_y),
            ]
        };
        Self {
            tl: fix(q.tl),
            tr: fix(q.tr),
            bl: fix(q.bl),
            br: fix(q.br),
        }
    }

    /// Classify the quad by the whole-texel extent of its bounding box.
    fn extent(&self) -> Extent {
        let corners = [self.tl, self.tr, self.bl, self.br];
        let mut span = [0i32; 2];
        for (axis, s) in span.iter_mut().enumerate() {
            let lo = corners.iter().map(|c| c[axis]).min().unwrap_or(0);
            let hi = corners.iter().map(|c| c[axis]).max().unwrap_or(0);
            *s = (hi >> SCP) - (lo >> SCP);
        }
        if span.iter().any(|&s| s <= 1) {
            Extent::Degenerate
        } else if span.iter().any(|&s| s > MAX_TILE_SPAN_TEXELS) {
            Extent::Oversize
        } else {
            Extent::Normal
        }
    }
}

/// Walks the left and right edges of a quad, one destination scanline per step.
#[derive(Clone, Copy, Debug)]
struct EdgeWalker {
    left: [i32; 2],
    right: [i32; 2],
    d_left: [i32; 2],
    d_right: [i32; 2],
}

impl EdgeWalker {
    fn new(q: &FixedQuad) -> Self {
        let d_left = [
            (q.bl[0] - q.tl[0]) >> TILE_SHIFT,
            (q.bl[1] - q.tl[1]) >> TILE_SHIFT,
        ];
        let d_right = [
            (q.br[0] - q.tr[0]) >> TILE_SHIFT,
            (q.br[1] - q.tr[1]) >> TILE_SHIFT,
        ];
        // Half-row offset: sample at the centre of the first destination scanline.
        Self {
            left: [q.tl[0] + (d_left[0] >> 1), q.tl[1] + (d_left[1] >> 1)],
            right: [q.tr[0] + (d_right[0] >> 1), q.tr[1] + (d_right[1] >> 1)],
            d_left,
            d_right,
        }
    }

    fn next_span<const STP: u32>(&mut self) -> Span {
        let span = Span::new::<STP>(self.left, self.right);
        for a in 0..2 {
            self.left[a] += self.d_left[a];
            self.right[a] += self.d_right[a];
        }
        span
    }
}

/// One scanline of 32 samples in local 16.`STP` coordinates.
#[derive(Clone, Copy, Debug)]
struct Span {
    origin: [usize; 2],
    pos: [u16; 2],
    step: [i16; 2],
}

impl Span {
    fn new<const STP: u32>(left: [i32; 2], right: [i32; 2]) -> Self {
        let shift = SCP - STP;
        let mut origin = [0usize; 2];
        let mut pos = [0u16; 2];
        let mut step = [0i16; 2];
        for a in 0..2 {
            let delta = (right[a] - left[a]) >> TILE_SHIFT;
            // Half-column offset: sample at the centre of the first destination pixel.
            let mut start = shr_toward_zero(left[a] + (delta >> 1), shift);
            let d = shr_toward_zero(delta, shift);
            let last = start + d * (TILE_SIZE as i32 - 1);

            // Truncating the step can pull the far end a fraction of a texel below zero.
            let lo = start.min(last);
            if lo < 0 {
                start -= lo;
            }
            let base = start.min(start + d * (TILE_SIZE as i32 - 1)) >> STP;

            origin[a] = base as usize;
            pos[a] = (start - (base << STP)) as u16;
            step[a] = d as i16;
        }
        Self { origin, pos, step }
    }

    #[inline(always)]
    fn texel<const STP: u32>(&self) -> Texel {
        let mask = (1u16 << STP) - 1;
        Texel {
            x: self.origin[0] + usize::from(self.pos[0] >> STP),
            y: self.origin[1] + usize::from(self.pos[1] >> STP),
            fx: self.pos[0] & mask,
            fy: self.pos[1] & mask,
        }
    }

    #[inline(always)]
    fn advance(&mut self) {
        self.pos[0] = self.pos[0].wrapping_add_signed(self.step[0]);
        self.pos[1] = self.pos[1].wrapping_add_signed(self.step[1]);
    }
}

/// Shared skeleton for every sampler: clamp, early-out, then scan-convert 32 rows.
///
/// `quads[c]` drives coordinate stream `c` of the sampler.
pub(crate) fn warp_tile<const N: usize, const STP: u32, S: Sampler<N>>(
    sampler: &S,
    quads: &[Quad; N],
    dst: &mut TileDest<'_, '_>,
) -> TilePath {
    let dims = sampler.dims();
    let fixed: [FixedQuad; N] =
        std::array::from_fn(|c| FixedQuad::clamped(&quads[c], dims, S::MARGIN));

    let extents: [Extent; N] = std::array::from_fn(|c| fixed[c].extent());
    if extents.iter().all(|e| *e == Extent::Degenerate) || extents.contains(&Extent::Oversize) {
        dst.clear();
        return TilePath::Cleared;
    }

    let mut walkers: [EdgeWalker; N] = std::array::from_fn(|c| EdgeWalker::new(&fixed[c]));
    for r in 0..TILE_SIZE {
        let mut spans: [Span; N] = std::array::from_fn(|c| walkers[c].next_span::<STP>());
        let row = dst.row(r);
        for px in row.chunks_exact_mut(BYTES_PER_PIXEL) {
            let at: [Texel; N] = std::array::from_fn(|c| spans[c].texel::<STP>());
            px.copy_from_slice(&sampler.sample::<STP>(&at));
            for s in &mut spans {
                s.advance();
            }
        }
    }
    TilePath::Sampled
}

/// Nearest-neighbour resample of a packed RGBA source into one tile.
pub fn warp32_nearest_packed(
    src: &PackedImage<'_>,
    quad: &Quad,
    dst: &mut TileDest<'_, '_>,
) -> TilePath {
    warp_tile::<1, STP, _>(&NearestPacked::new(src), &[*quad], dst)
}

/// Horizontal linear, vertical nearest resample of a packed RGBA source into one tile.
pub fn warp32_linear_packed(
    src: &PackedImage<'_>,
    quad: &Quad,
    dst: &mut TileDest<'_, '_>,
) -> TilePath {
    warp_tile::<1, STP, _>(&LinearPacked::new(src), &[*quad], dst)
}

/// Bilinear resample of a packed RGBA source into one tile.
pub fn warp32_bilinear_packed(
    src: &PackedImage<'_>,
    quad: &Quad,
    dst: &mut TileDest<'_, '_>,
) -> TilePath {
    warp_tile::<1, STP, _>(&BilinearPacked::new(src), &[*quad], dst)
}

/// Bilinear resample of three planes at one shared coordinate.
pub fn warp32_bilinear_planar(
    src: &PlanarImage<'_>,
    quad: &Quad,
    dst: &mut TileDest<'_, '_>,
) -> TilePath {
    warp_tile::<1, STP, _>(&BilinearPlanar::new(src), &[*quad], dst)
}

/// Bilinear resample of three planes, each at its own quad (`[red, green, blue]`).
pub fn warp32_chromatic_bilinear_planar(
    src: &PlanarImage<'_>,
    quads: &[Quad; 3],
    dst: &mut TileDest<'_, '_>,
) -> TilePath {
    warp_tile::<3, STP, _>(&ChromaticPlanar::new(src), quads, dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                out.extend_from_slice(&[(x / 2) as u8, (y / 2) as u8, 128, 255]);
            }
        }
        out
    }

    fn run<F>(f: F) -> (Vec<u8>, TilePath)
    where
        F: FnOnce(&mut TileDest<'_, '_>) -> TilePath,
    {
        let mut buf = vec![0xAAu8; TILE_SIZE * TILE_SIZE * 4];
        let mut rows: Vec<&mut [u8]> = buf.chunks_mut(TILE_ROW_BYTES).collect();
        let mut dst = TileDest::new(&mut rows, 0).unwrap();
        let path = f(&mut dst);
        (buf, path)
    }

    #[test]
    fn one_to_one_nearest_copies_texels() {
        let data = gradient(64, 64);
        let src = PackedImage::new(&data, 64, 64, 64).unwrap();
        let quad = Quad::rect(0.25, 0.25, 0.75, 0.75);
        let (out, path) = run(|d| warp32_nearest_packed(&src, &quad, d));
        assert_eq!(path, TilePath::Sampled);
        for y in 0..TILE_SIZE {
            for x in 0..TILE_SIZE {
                let o = (y * TILE_SIZE + x) * 4;
                let i = ((y + 16) * 64 + x + 16) * 4;
                assert_eq!(&out[o..o + 4], &data[i..i + 4], "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn collapsed_quad_clears_to_zero() {
        let data = gradient(64, 64);
        let src = PackedImage::new(&data, 64, 64, 64).unwrap();
        let quad = Quad::rect(-0.5, 0.1, -0.2, 0.9);
        let (out, path) = run(|d| warp32_bilinear_packed(&src, &quad, d));
        assert_eq!(path, TilePath::Cleared);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn oversize_quad_clears_to_zero() {
        let data = vec![200u8; 1024 * 8 * 4];
        let src = PackedImage::new(&data, 1024, 8, 1024).unwrap();
        let quad = Quad::rect(0.0, 0.0, 1.0, 1.0);
        let (out, path) = run(|d| warp32_nearest_packed(&src, &quad, d));
        assert_eq!(path, TilePath::Cleared);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn mirrored_quad_stays_in_bounds() {
        let data = gradient(64, 64);
        let src = PackedImage::new(&data, 64, 64, 64).unwrap();
        // Right-to-left and bottom-to-top, touching the clamped border on both axes.
        let quad = Quad::rect(1.2, 1.2, -0.1, -0.1);
        let (out, path) = run(|d| warp32_bilinear_packed(&src, &quad, d));
        assert_eq!(path, TilePath::Sampled);
        // Top-left destination pixel reads near the bottom-right of the source.
        assert!(out[0] >= 29);
        let last = (TILE_SIZE * TILE_SIZE - 1) * 4;
        assert!(out[last] <= 1);
    }

    #[test]
    fn seven_bit_precision_tracks_eight_bit() {
        let data = gradient(96, 96);
        let src = PackedImage::new(&data, 96, 96, 96).unwrap();
        let quad = Quad {
            tl: MeshCoord::new(0.11, 0.13),
            tr: MeshCoord::new(0.52, 0.17),
            bl: MeshCoord::new(0.09, 0.61),
            br: MeshCoord::new(0.55, 0.58),
        };
        let s = BilinearPacked::new(&src);
        let (a, _) = run(|d| warp_tile::<1, 8, _>(&s, &[quad], d));
        let (b, _) = run(|d| warp_tile::<1, 7, _>(&s, &[quad], d));
        for (x, y) in a.iter().zip(&b) {
            assert!((i32::from(*x) - i32::from(*y)).abs() <= 2);
        }
    }

    #[test]
    fn tile_dest_rejects_short_rows() {
        let mut buf = vec![0u8; 32 * 100];
        let mut rows: Vec<&mut [u8]> = buf.chunks_mut(100).collect();
        assert!(TileDest::new(&mut rows, 0).is_err());

        let mut few = vec![0u8; 8 * TILE_ROW_BYTES];
        let mut rows: Vec<&mut [u8]> = few.chunks_mut(TILE_ROW_BYTES).collect();
        assert!(TileDest::new(&mut rows, 0).is_err());
    }

    #[test]
    fn tile_dest_writes_at_column_offset() {
        let data = vec![9u8; 16 * 16 * 4];
        let src = PackedImage::new(&data, 16, 16, 16).unwrap();
        let mut buf = vec![1u8; 64 * 4 * TILE_SIZE];
        {
            let mut rows: Vec<&mut [u8]> = buf.chunks_mut(64 * 4).collect();
            let mut dst = TileDest::new(&mut rows, 32).unwrap();
            warp32_nearest_packed(&src, &Quad::rect(0.0, 0.0, 1.0, 1.0), &mut dst);
        }
        for row in buf.chunks(64 * 4) {
            assert!(row[..128].iter().all(|&b| b == 1));
            assert!(row[128..].iter().all(|&b| b == 9));
        }
    }
}
