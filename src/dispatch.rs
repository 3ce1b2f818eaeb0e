//! Tile-row dispatch.
//!
//! One unit of scheduled work is a row of tiles for one eye. The dispatcher time-warps the two
//! mesh rows bounding it into worker-local scratch, one column boundary ahead of the tile that
//! needs it, and runs the frame's sampler over each tile.

use crate::foundation::core::{
    BYTES_PER_PIXEL, ColorChannel, Eye, EyeTiles, MeshCoord, NUM_COLOR_CHANNELS, Sampling,
    TILE_SIZE,
};
use crate::foundation::error::{TimewarpError, TimewarpResult};
use crate::foundation::math::STP;
use crate::matrix::TimewarpMatrices;
use crate::mesh::grid::DistortionMesh;
use crate::mesh::transform::transform_mesh;
use crate::surface::SourceImage;
use crate::warp::sampler::{
    BilinearPacked, BilinearPlanar, ChromaticPlanar, LinearPacked, NearestPacked, Sampler,
};
use crate::warp::tile::{Quad, TileDest, TilePath, warp_tile};

/// Tile outcome counts for a row or a whole frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct FrameStats {
    pub tiles_sampled: u32,
    pub tiles_cleared: u32,
}

impl FrameStats {
    pub fn tiles(&self) -> u32 {
        self.tiles_sampled + self.tiles_cleared
    }

    pub fn merge(&mut self, other: FrameStats) {
        self.tiles_sampled += other.tiles_sampled;
        self.tiles_cleared += other.tiles_cleared;
    }

    fn record(&mut self, path: TilePath) {
        match path {
            TilePath::Sampled => self.tiles_sampled += 1,
            TilePath::Cleared => self.tiles_cleared += 1,
        }
    }
}

/// The frame's source bound to the sampler that reads it.
enum BoundSampler<'a> {
    Nearest(NearestPacked<'a>),
    Linear(LinearPacked<'a>),
    Bilinear(BilinearPacked<'a>),
    Planar(BilinearPlanar<'a>),
    Chromatic(ChromaticPlanar<'a>),
}

impl<'a> BoundSampler<'a> {
    fn bind(source: &SourceImage<'a>, sampling: Sampling) -> TimewarpResult<Self> {
        Ok(match (source, sampling) {
            (SourceImage::Packed(img), Sampling::NearestPacked) => {
                Self::Nearest(NearestPacked::new(img))
            }
            (SourceImage::Packed(img), Sampling::LinearPacked) => {
                Self::Linear(LinearPacked::new(img))
            }
            (SourceImage::Packed(img), Sampling::BilinearPacked) => {
                Self::Bilinear(BilinearPacked::new(img))
            }
            (SourceImage::Planar(img), Sampling::BilinearPlanar) => {
                Self::Planar(BilinearPlanar::new(img))
            }
            (SourceImage::Planar(img), Sampling::ChromaticPlanar) => {
                Self::Chromatic(ChromaticPlanar::new(img))
            }
            (_, s) => {
                let kind = if s.is_planar() { "planar" } else { "packed" };
                return Err(TimewarpError::misuse(format!(
                    "sampling '{}' needs a {kind} source",
                    s.name()
                )));
            }
        })
    }
}

/// Read-only per-frame state shared by every worker.
pub struct FrameContext<'a> {
    sampler: BoundSampler<'a>,
    mesh: &'a DistortionMesh,
    matrices: TimewarpMatrices,
}

impl<'a> FrameContext<'a> {
    /// Bind `source` to the `sampling` variant; a packed/planar mismatch is misuse.
    pub fn new(
        source: SourceImage<'a>,
        mesh: &'a DistortionMesh,
        matrices: TimewarpMatrices,
        sampling: Sampling,
    ) -> TimewarpResult<Self> {
        Ok(Self {
            sampler: BoundSampler::bind(&source, sampling)?,
            mesh,
            matrices,
        })
    }

    pub fn tiles(&self) -> EyeTiles {
        self.mesh.tiles()
    }
}

/// Two time-warped mesh rows per channel, owned by one worker.
pub struct RowScratch {
    stride: usize,
    rows: [Vec<MeshCoord>; NUM_COLOR_CHANNELS],
}

impl RowScratch {
    pub fn new(tiles: EyeTiles) -> Self {
        let stride = tiles.vertex_stride();
        Self {
            stride,
            rows: std::array::from_fn(|_| vec![MeshCoord::default(); 2 * stride]),
        }
    }

    fn fits(&self, tiles: EyeTiles) -> bool {
        self.stride == tiles.vertex_stride()
    }
}

/// Warp tile row `ty` of `eye` into `strip`, the `TILE_SIZE` scanline segments of that row
/// (each at least `eye_width * 4` bytes, starting at the eye's left edge).
pub fn warp_tile_row(
    frame: &FrameContext<'_>,
    eye: Eye,
    ty: u32,
    strip: &mut [&mut [u8]],
    scratch: &mut RowScratch,
) -> TimewarpResult<FrameStats> {
    let tiles = frame.tiles();
    if ty >= tiles.high {
        return Err(TimewarpError::misuse(format!(
            "tile row {ty} is outside a {}-row eye",
            tiles.high
        )));
    }
    let row_bytes = tiles.eye_width() * BYTES_PER_PIXEL;
    if strip.len() < TILE_SIZE || strip[..TILE_SIZE].iter().any(|r| r.len() < row_bytes) {
        return Err(TimewarpError::misuse(format!(
            "tile row strip needs {TILE_SIZE} rows of {row_bytes} bytes"
        )));
    }
    if !scratch.fits(tiles) {
        *scratch = RowScratch::new(tiles);
    }

    let row = RowJob {
        frame,
        eye,
        ty: ty as usize,
    };
    Ok(match &frame.sampler {
        BoundSampler::Nearest(s) => row.run::<1, _>(s, strip, scratch),
        BoundSampler::Linear(s) => row.run::<1, _>(s, strip, scratch),
        BoundSampler::Bilinear(s) => row.run::<1, _>(s, strip, scratch),
        BoundSampler::Planar(s) => row.run::<1, _>(s, strip, scratch),
        BoundSampler::Chromatic(s) => row.run::<3, _>(s, strip, scratch),
    })
}

struct RowJob<'f, 'a> {
    frame: &'f FrameContext<'a>,
    eye: Eye,
    ty: usize,
}

impl RowJob<'_, '_> {
    /// Channels whose grids feed an `N`-stream sampler, in stream order.
    fn channels<const N: usize>() -> [ColorChannel; N] {
        std::array::from_fn(|c| {
            if N == 1 {
                ColorChannel::Green
            } else {
                ColorChannel::ALL[c]
            }
        })
    }

    fn transform_column<const N: usize>(&self, scratch: &mut RowScratch, x: usize) {
        let tiles = self.frame.tiles();
        let stride = scratch.stride;
        let first = self.ty * stride;
        for ch in Self::channels::<N>() {
            let grid = self.frame.mesh.grid(self.eye, ch);
            transform_mesh(
                &grid[first..first + 2 * stride],
                &mut scratch.rows[ch.index()],
                stride,
                self.eye,
                tiles.wide,
                &self.frame.matrices,
                x..x + 1,
            );
        }
    }

    fn run<const N: usize, S: Sampler<N>>(
        &self,
        sampler: &S,
        strip: &mut [&mut [u8]],
        scratch: &mut RowScratch,
    ) -> FrameStats {
        let tiles = self.frame.tiles();
        let channels = Self::channels::<N>();
        let mut stats = FrameStats::default();

        self.transform_column::<N>(scratch, 0);
        for tx in 0..tiles.wide as usize {
            self.transform_column::<N>(scratch, tx + 1);
            let quads: [Quad; N] = std::array::from_fn(|c| {
                Quad::from_grid(&scratch.rows[channels[c].index()], scratch.stride, tx)
            });
            let mut dst = TileDest::new_unchecked(&mut strip[..TILE_SIZE], tx * TILE_SIZE);
            stats.record(warp_tile::<N, STP, S>(sampler, &quads, &mut dst));
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{PackedImage, PlanarImage};

    fn tiles() -> EyeTiles {
        EyeTiles::new(2, 1).unwrap()
    }

    fn context<'a>(
        src: SourceImage<'a>,
        mesh: &'a DistortionMesh,
        sampling: Sampling,
    ) -> TimewarpResult<FrameContext<'a>> {
        FrameContext::new(src, mesh, TimewarpMatrices::identity(), sampling)
    }

    #[test]
    fn mismatched_source_is_misuse() {
        let mesh = DistortionMesh::identity(tiles());
        let packed = vec![0u8; 64 * 64 * 4];
        let src = SourceImage::Packed(PackedImage::new(&packed, 64, 64, 64).unwrap());
        let err = context(src, &mesh, Sampling::BilinearPlanar).err().unwrap();
        assert_eq!(err.status_code(), -2);

        let plane = vec![0u8; 64 * 64];
        let planes = PlanarImage::new([&plane, &plane, &plane], 64, 64, 64).unwrap();
        let src = SourceImage::Planar(planes);
        assert!(context(src, &mesh, Sampling::NearestPacked).is_err());
    }

    #[test]
    fn row_writes_every_tile_in_the_eye() {
        let tiles = tiles();
        let mesh = DistortionMesh::identity(tiles);
        let white = vec![255u8; 64 * 32 * 4];
        let src = SourceImage::Packed(PackedImage::new(&white, 64, 32, 64).unwrap());
        let frame = context(src, &mesh, Sampling::NearestPacked).unwrap();

        let mut lines: Vec<Vec<u8>> = (0..TILE_SIZE).map(|_| vec![7u8; 64 * 4 + 8]).collect();
        let mut strip: Vec<&mut [u8]> = lines.iter_mut().map(|l| l.as_mut_slice()).collect();
        let mut scratch = RowScratch::new(tiles);
        let stats = warp_tile_row(&frame, Eye::Left, 0, &mut strip, &mut scratch).unwrap();

        assert_eq!((stats.tiles_sampled, stats.tiles_cleared), (2, 0));
        for line in &lines {
            assert!(line[..64 * 4].iter().all(|b| *b == 255));
            assert!(line[64 * 4..].iter().all(|b| *b == 7), "wrote past the eye");
        }
    }

    #[test]
    fn short_strip_is_rejected() {
        let tiles = tiles();
        let mesh = DistortionMesh::identity(tiles);
        let data = vec![0u8; 64 * 32 * 4];
        let src = SourceImage::Packed(PackedImage::new(&data, 64, 32, 64).unwrap());
        let frame = context(src, &mesh, Sampling::NearestPacked).unwrap();
        let mut lines: Vec<Vec<u8>> = (0..TILE_SIZE).map(|_| vec![0u8; 60 * 4]).collect();
        let mut strip: Vec<&mut [u8]> = lines.iter_mut().map(|l| l.as_mut_slice()).collect();
        let mut scratch = RowScratch::new(tiles);
        assert!(warp_tile_row(&frame, Eye::Left, 0, &mut strip, &mut scratch).is_err());
        assert!(warp_tile_row(&frame, Eye::Left, 1, &mut strip, &mut scratch).is_err());
    }

    #[test]
    fn non_chromatic_rows_only_read_green() {
        let tiles = tiles();
        let mut mesh = DistortionMesh::identity(tiles);
        // Collapse the red grid to a point: only the chromatic sampler may notice.
        mesh.grid_mut(Eye::Left, ColorChannel::Red).fill(MeshCoord::new(0.0, 0.0));
        let plane = vec![200u8; 64 * 32];
        let planes = PlanarImage::new([&plane, &plane, &plane], 64, 32, 64).unwrap();
        let src = SourceImage::Planar(planes);

        let run = |sampling| {
            let frame = context(src, &mesh, sampling).unwrap();
            let mut lines: Vec<Vec<u8>> = (0..TILE_SIZE).map(|_| vec![0u8; 64 * 4]).collect();
            let mut strip: Vec<&mut [u8]> = lines.iter_mut().map(|l| l.as_mut_slice()).collect();
            let mut scratch = RowScratch::new(tiles);
            warp_tile_row(&frame, Eye::Left, 0, &mut strip, &mut scratch).unwrap()
        };
        assert_eq!(run(Sampling::BilinearPlanar).tiles_sampled, 2);
        // Green and blue still sample, so the chromatic tiles are not cleared.
        assert_eq!(run(Sampling::ChromaticPlanar).tiles_sampled, 2);
    }
}
