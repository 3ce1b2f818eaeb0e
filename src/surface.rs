//! Validated views over caller-owned pixel memory.
//!
//! The warper never allocates or owns image memory; these types only check that a byte slice
//! is large enough for the stated dimensions and pitch before any texel is read or written.

use crate::foundation::core::{BYTES_PER_PIXEL, EyeTiles, MAX_SOURCE_DIM, TILE_SIZE};
use crate::foundation::error::{TimewarpError, TimewarpResult};

fn check_source_dims(width: u32, height: u32, pitch: u32) -> TimewarpResult<()> {
    // Filtered samplers reserve one texel for the right/bottom neighbour.
    if width < 2 || height < 2 {
        return Err(TimewarpError::misuse(format!(
            "source must be at least 2x2 texels, got {width}x{height}"
        )));
    }
    if width > MAX_SOURCE_DIM || height > MAX_SOURCE_DIM {
        return Err(TimewarpError::misuse(format!(
            "source {width}x{height} exceeds the {MAX_SOURCE_DIM}x{MAX_SOURCE_DIM} limit"
        )));
    }
    if pitch < width {
        return Err(TimewarpError::misuse(format!(
            "source pitch {pitch} is smaller than width {width}"
        )));
    }
    Ok(())
}

/// Minimum element count for `rows` rows of `width` elements spaced `pitch` apart.
fn required_len(width: u32, height: u32, pitch: u32, elem: usize) -> usize {
    ((height as usize - 1) * pitch as usize + width as usize) * elem
}

/// Packed RGBA8 source image.
#[derive(Clone, Copy, Debug)]
pub struct PackedImage<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    pitch: u32,
}

impl<'a> PackedImage<'a> {
    /// `pitch` is the row stride in texels.
    pub fn new(data: &'a [u8], width: u32, height: u32, pitch: u32) -> TimewarpResult<Self> {
        check_source_dims(width, height, pitch)?;
        let need = required_len(width, height, pitch, BYTES_PER_PIXEL);
        if data.len() < need {
            return Err(TimewarpError::misuse(format!(
                "packed source holds {} bytes, {width}x{height} at pitch {pitch} needs {need}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            pitch,
        })
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> u32 {
        self.pitch
    }
}

/// Three single-channel 8-bit planes (R, G, B) sharing dimensions and pitch.
#[derive(Clone, Copy, Debug)]
pub struct PlanarImage<'a> {
    planes: [&'a [u8]; 3],
    width: u32,
    height: u32,
    pitch: u32,
}

impl<'a> PlanarImage<'a> {
    pub fn new(planes: [&'a [u8]; 3], width: u32, height: u32, pitch: u32) -> TimewarpResult<Self> {
        check_source_dims(width, height, pitch)?;
        let need = required_len(width, height, pitch, 1);
        for (i, plane) in planes.iter().enumerate() {
            if plane.len() < need {
                return Err(TimewarpError::misuse(format!(
                    "plane {i} holds {} bytes, {width}x{height} at pitch {pitch} needs {need}",
                    plane.len()
                )));
            }
        }
        Ok(Self {
            planes,
            width,
            height,
            pitch,
        })
    }

    pub fn plane(&self, channel: usize) -> &'a [u8] {
        self.planes[channel]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> u32 {
        self.pitch
    }
}

/// The source handed to a frame: one representation is used, the other is absent.
#[derive(Clone, Copy, Debug)]
pub enum SourceImage<'a> {
    Packed(PackedImage<'a>),
    Planar(PlanarImage<'a>),
}

impl SourceImage<'_> {
    pub fn width(&self) -> u32 {
        match self {
            SourceImage::Packed(img) => img.width(),
            SourceImage::Planar(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            SourceImage::Packed(img) => img.height(),
            SourceImage::Planar(img) => img.height(),
        }
    }
}

/// Packed RGBA8 stereo framebuffer, both eyes side by side.
#[derive(Debug)]
pub struct DestImage<'a> {
    data: &'a mut [u8],
    tiles: EyeTiles,
    pitch: u32,
}

impl<'a> DestImage<'a> {
    /// `pitch` is the row stride in pixels; dimensions follow from the eye tile grid.
    pub fn new(data: &'a mut [u8], tiles: EyeTiles, pitch: u32) -> TimewarpResult<Self> {
        let width = tiles.frame_width();
        let height = tiles.eye_height();
        if (pitch as usize) < width {
            return Err(TimewarpError::misuse(format!(
                "destination pitch {pitch} is smaller than frame width {width}"
            )));
        }
        let need = ((height - 1) * pitch as usize + width) * BYTES_PER_PIXEL;
        if data.len() < need {
            return Err(TimewarpError::misuse(format!(
                "destination holds {} bytes, {width}x{height} at pitch {pitch} needs {need}",
                data.len()
            )));
        }
        Ok(Self { data, tiles, pitch })
    }

    pub fn tiles(&self) -> EyeTiles {
        self.tiles
    }

    pub fn width(&self) -> usize {
        self.tiles.frame_width()
    }

    pub fn height(&self) -> usize {
        self.tiles.eye_height()
    }

    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    pub fn data(&self) -> &[u8] {
        self.data
    }

    /// Split the framebuffer into per-eye tile-row strips.
    ///
    /// Entry `eye * tiles.high + ty` holds the `TILE_SIZE` scanline segments covering tile row
    /// `ty` of that eye, each `eye_width * 4` bytes long. The strips are disjoint.
    pub fn tile_rows(&mut self) -> Vec<Vec<&mut [u8]>> {
        let tiles = self.tiles;
        let eye_bytes = tiles.eye_width() * BYTES_PER_PIXEL;
        let row_bytes = self.pitch as usize * BYTES_PER_PIXEL;
        let high = tiles.high as usize;

        let mut left: Vec<Vec<&mut [u8]>> =
            (0..high).map(|_| Vec::with_capacity(TILE_SIZE)).collect();
        let mut right: Vec<Vec<&mut [u8]>> =
            (0..high).map(|_| Vec::with_capacity(TILE_SIZE)).collect();

        for (y, line) in self
            .data
            .chunks_mut(row_bytes)
            .take(tiles.eye_height())
            .enumerate()
        {
            let (l, rest) = line.split_at_mut(eye_bytes);
            let (r, _) = rest.split_at_mut(eye_bytes);
            left[y / TILE_SIZE].push(l);
            right[y / TILE_SIZE].push(r);
        }

        left.extend(right);
        left
    }
}
