use crate::foundation::error::{TimewarpError, TimewarpResult};

/// Edge length of a destination tile in pixels.
pub const TILE_SIZE: usize = 32;

/// `log2(TILE_SIZE)`; edge deltas are divided by the tile size with this shift.
pub const TILE_SHIFT: u32 = 5;

/// Bytes per packed RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Hard upper bound on source width and height in texels.
pub const MAX_SOURCE_DIM: u32 = 2048;

pub const NUM_EYES: usize = 2;
pub const NUM_COLOR_CHANNELS: usize = 3;

/// Eye index. The left eye is scanned out first on a landscape display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const ALL: [Eye; NUM_EYES] = [Eye::Left, Eye::Right];

    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
}

impl ColorChannel {
    pub const ALL: [ColorChannel; NUM_COLOR_CHANNELS] =
        [ColorChannel::Red, ColorChannel::Green, ColorChannel::Blue];

    pub fn index(self) -> usize {
        match self {
            ColorChannel::Red => 0,
            ColorChannel::Green => 1,
            ColorChannel::Blue => 2,
        }
    }
}

/// Sampler selection for a frame.
///
/// The discriminants are the stable integer selector values.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Sampling {
    NearestPacked = 0,
    LinearPacked = 1,
    BilinearPacked = 2,
    BilinearPlanar = 3,
    ChromaticPlanar = 4,
}

impl Sampling {
    pub const ALL: [Sampling; 5] = [
        Sampling::NearestPacked,
        Sampling::LinearPacked,
        Sampling::BilinearPacked,
        Sampling::BilinearPlanar,
        Sampling::ChromaticPlanar,
    ];

    /// `true` when the sampler reads three single-channel planes.
    pub fn is_planar(self) -> bool {
        matches!(self, Sampling::BilinearPlanar | Sampling::ChromaticPlanar)
    }

    /// `true` when every colour channel needs its own mesh grid.
    pub fn is_chromatic(self) -> bool {
        self == Sampling::ChromaticPlanar
    }

    pub fn name(self) -> &'static str {
        match self {
            Sampling::NearestPacked => "nearest-packed",
            Sampling::LinearPacked => "linear-packed",
            Sampling::BilinearPacked => "bilinear-packed",
            Sampling::BilinearPlanar => "bilinear-planar",
            Sampling::ChromaticPlanar => "chromatic-planar",
        }
    }
}

impl TryFrom<i32> for Sampling {
    type Error = TimewarpError;

    fn try_from(value: i32) -> TimewarpResult<Self> {
        Sampling::ALL
            .into_iter()
            .find(|s| *s as i32 == value)
            .ok_or_else(|| TimewarpError::misuse(format!("unknown sampling selector {value}")))
    }
}

/// A 2D mesh vertex. Before the time-warp transform it is in tan-angle (or texture) space,
/// afterwards it is a normalised source texture coordinate with (0,0) at the top-left texel.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeshCoord {
    pub x: f32,
    pub y: f32,
}

impl MeshCoord {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Destination tile grid for one eye.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EyeTiles {
    pub wide: u32,
    pub high: u32,
}

impl EyeTiles {
    pub fn new(wide: u32, high: u32) -> TimewarpResult<Self> {
        if wide == 0 || high == 0 {
            return Err(TimewarpError::validation("eye tile grid must be at least 1x1"));
        }
        Ok(Self { wide, high })
    }

    /// Eye viewport width in pixels.
    pub fn eye_width(self) -> usize {
        self.wide as usize * TILE_SIZE
    }

    pub fn eye_height(self) -> usize {
        self.high as usize * TILE_SIZE
    }

    /// Width of the side-by-side stereo framebuffer.
    pub fn frame_width(self) -> usize {
        NUM_EYES * self.eye_width()
    }

    /// Mesh vertices per grid row.
    pub fn vertex_stride(self) -> usize {
        self.wide as usize + 1
    }

    pub fn vertices_per_grid(self) -> usize {
        self.vertex_stride() * (self.high as usize + 1)
    }

    /// Number of tile rows scheduled per frame (both eyes).
    pub fn frame_rows(self) -> u32 {
        NUM_EYES as u32 * self.high
    }
}
