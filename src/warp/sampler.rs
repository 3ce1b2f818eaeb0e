//! Per-texel samplers.
//!
//! Every sampler is a plain struct over borrowed source memory; the scan converter is
//! monomorphised per sampler so the inner loop has no dynamic dispatch. Coordinates arrive as
//! absolute texel indices plus an `STP`-bit fraction.

use crate::foundation::core::BYTES_PER_PIXEL;
use crate::surface::{PackedImage, PlanarImage};

/// One sample position: integer texel and sub-texel fraction in `STP` bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Texel {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) fx: u16,
    pub(crate) fy: u16,
}

/// A source reader driven by `N` independent coordinate streams (1, or 3 for chromatic).
pub(crate) trait Sampler<const N: usize> {
    /// Texels reserved at the right and bottom edge when clamping quad corners.
    const MARGIN: i32;

    /// Source width and height in texels.
    fn dims(&self) -> (u32, u32);

    fn sample<const STP: u32>(&self, at: &[Texel; N]) -> [u8; 4];
}

/// `a + (b - a) * f` with `f` in `STP` fractional bits; 16-bit intermediates.
#[inline(always)]
fn lerp<const STP: u32>(a: u8, b: u8, f: u16) -> u8 {
    let one = 1u16 << STP;
    ((u16::from(a) * (one - f) + u16::from(b) * f) >> STP) as u8
}

#[inline(always)]
fn bilerp<const STP: u32>(a: u8, b: u8, c: u8, d: u8, fx: u16, fy: u16) -> u8 {
    lerp::<STP>(lerp::<STP>(a, b, fx), lerp::<STP>(c, d, fx), fy)
}

#[inline(always)]
fn rgba(data: &[u8], i: usize) -> [u8; 4] {
    let p = &data[i..i + BYTES_PER_PIXEL];
    [p[0], p[1], p[2], p[3]]
}

pub(crate) struct NearestPacked<'a> {
    data: &'a [u8],
    pitch: usize,
    dims: (u32, u32),
}

impl<'a> NearestPacked<'a> {
    pub(crate) fn new(src: &PackedImage<'a>) -> Self {
        Self {
            data: src.data(),
            pitch: src.pitch() as usize,
            dims: (src.width(), src.height()),
        }
    }
}

impl Sampler<1> for NearestPacked<'_> {
    const MARGIN: i32 = 1;

    fn dims(&self) -> (u32, u32) {
        self.dims
    }

    #[inline(always)]
    fn sample<const STP: u32>(&self, at: &[Texel; 1]) -> [u8; 4] {
        let t = at[0];
        rgba(self.data, (t.y * self.pitch + t.x) * BYTES_PER_PIXEL)
    }
}

/// Horizontal linear filter; the vertical axis is nearest.
pub(crate) struct LinearPacked<'a> {
    data: &'a [u8],
    pitch: usize,
    dims: (u32, u32),
}

impl<'a> LinearPacked<'a> {
    pub(crate) fn new(src: &PackedImage<'a>) -> Self {
        Self {
            data: src.data(),
            pitch: src.pitch() as usize,
            dims: (src.width(), src.height()),
        }
    }
}

impl Sampler<1> for LinearPacked<'_> {
    const MARGIN: i32 = 2;

    fn dims(&self) -> (u32, u32) {
        self.dims
    }

    #[inline(always)]
    fn sample<const STP: u32>(&self, at: &[Texel; 1]) -> [u8; 4] {
        let t = at[0];
        let i = (t.y * self.pitch + t.x) * BYTES_PER_PIXEL;
        let a = rgba(self.data, i);
        let b = rgba(self.data, i + BYTES_PER_PIXEL);
        std::array::from_fn(|c| lerp::<STP>(a[c], b[c], t.fx))
    }
}

pub(crate) struct BilinearPacked<'a> {
    data: &'a [u8],
    pitch: usize,
    dims: (u32, u32),
}

impl<'a> BilinearPacked<'a> {
    pub(crate) fn new(src: &PackedImage<'a>) -> Self {
        Self {
            data: src.data(),
            pitch: src.pitch() as usize,
            dims: (src.width(), src.height()),
        }
    }
}

impl Sampler<1> for BilinearPacked<'_> {
    const MARGIN: i32 = 2;

    fn dims(&self) -> (u32, u32) {
        self.dims
    }

    #[inline(always)]
    fn sample<const STP: u32>(&self, at: &[Texel; 1]) -> [u8; 4] {
        let t = at[0];
        let i = (t.y * self.pitch + t.x) * BYTES_PER_PIXEL;
        let j = i + self.pitch * BYTES_PER_PIXEL;
        let a = rgba(self.data, i);
        let b = rgba(self.data, i + BYTES_PER_PIXEL);
        let c = rgba(self.data, j);
        let d = rgba(self.data, j + BYTES_PER_PIXEL);
        std::array::from_fn(|k| bilerp::<STP>(a[k], b[k], c[k], d[k], t.fx, t.fy))
    }
}

#[inline(always)]
fn bilerp_plane<const STP: u32>(plane: &[u8], pitch: usize, t: Texel) -> u8 {
    let i = t.y * pitch + t.x;
    let j = i + pitch;
    bilerp::<STP>(plane[i], plane[i + 1], plane[j], plane[j + 1], t.fx, t.fy)
}

/// Three planes filtered at one shared coordinate. Output alpha is opaque.
pub(crate) struct BilinearPlanar<'a> {
    planes: [&'a [u8]; 3],
    pitch: usize,
    dims: (u32, u32),
}

impl<'a> BilinearPlanar<'a> {
    pub(crate) fn new(src: &PlanarImage<'a>) -> Self {
        Self {
            planes: [src.plane(0), src.plane(1), src.plane(2)],
            pitch: src.pitch() as usize,
            dims: (src.width(), src.height()),
        }
    }
}

impl Sampler<1> for BilinearPlanar<'_> {
    const MARGIN: i32 = 2;

    fn dims(&self) -> (u32, u32) {
        self.dims
    }

    #[inline(always)]
    fn sample<const STP: u32>(&self, at: &[Texel; 1]) -> [u8; 4] {
        let t = at[0];
        [
            bilerp_plane::<STP>(self.planes[0], self.pitch, t),
            bilerp_plane::<STP>(self.planes[1], self.pitch, t),
            bilerp_plane::<STP>(self.planes[2], self.pitch, t),
            u8::MAX,
        ]
    }
}

/// Three planes, each filtered at its own coordinate stream.
pub(crate) struct ChromaticPlanar<'a> {
    inner: BilinearPlanar<'a>,
}

impl<'a> ChromaticPlanar<'a> {
    pub(crate) fn new(src: &PlanarImage<'a>) -> Self {
        Self {
            inner: BilinearPlanar::new(src),
        }
    }
}

impl Sampler<3> for ChromaticPlanar<'_> {
    const MARGIN: i32 = 2;

    fn dims(&self) -> (u32, u32) {
        self.inner.dims
    }

    #[inline(always)]
    fn sample<const STP: u32>(&self, at: &[Texel; 3]) -> [u8; 4] {
        let p = &self.inner;
        [
            bilerp_plane::<STP>(p.planes[0], p.pitch, at[0]),
            bilerp_plane::<STP>(p.planes[1], p.pitch, at[1]),
            bilerp_plane::<STP>(p.planes[2], p.pitch, at[2]),
            u8::MAX,
        ]
    }
}
