use crate::foundation::core::{BYTES_PER_PIXEL, TILE_SIZE};
use crate::foundation::error::TimewarpResult;
use crate::surface::{PackedImage, PlanarImage};

const PALETTE: [[u8; 3]; 8] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
];

/// Synthetic eye buffer: 32x32 coloured blocks, each with an inscribed circle in the
/// complementary colour. Held both packed RGBA and as three planes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestImage {
    width: u32,
    height: u32,
    packed: Vec<u8>,
    planes: [Vec<u8>; 3],
}

impl TestImage {
    pub fn blocks(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        let mut packed = Vec::with_capacity(w * h * BYTES_PER_PIXEL);
        let mut planes: [Vec<u8>; 3] = std::array::from_fn(|_| Vec::with_capacity(w * h));

        let half = TILE_SIZE as f32 / 2.0;
        let radius_sq = (half - 2.0) * (half - 2.0);
        let blocks_wide = w.div_ceil(TILE_SIZE);
        for y in 0..h {
            for x in 0..w {
                let block = (y / TILE_SIZE) * blocks_wide + x / TILE_SIZE;
                let base = PALETTE[(block * 3 + y / TILE_SIZE) % PALETTE.len()];
                let dx = (x % TILE_SIZE) as f32 + 0.5 - half;
                let dy = (y % TILE_SIZE) as f32 + 0.5 - half;
                let rgb = if dx * dx + dy * dy <= radius_sq {
                    base.map(|c| 255 - c)
                } else {
                    base
                };
                packed.extend_from_slice(&[rgb[0], rgb[1], rgb[2], u8::MAX]);
                for (plane, c) in planes.iter_mut().zip(rgb) {
                    plane.push(c);
                }
            }
        }

        Self {
            width,
            height,
            packed,
            planes,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn packed(&self) -> TimewarpResult<PackedImage<'_>> {
        PackedImage::new(&self.packed, self.width, self.height, self.width)
    }

    pub fn planar(&self) -> TimewarpResult<PlanarImage<'_>> {
        let [r, g, b] = &self.planes;
        PlanarImage::new(
            [r.as_slice(), g.as_slice(), b.as_slice()],
            self.width,
            self.height,
            self.width,
        )
    }
}
