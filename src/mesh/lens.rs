//! Lens distortion model and mesh construction.
//!
//! Mesh vertices are tan-angles from the eye's optical axis with Y up. Each vertex is scaled
//! radially by a Catmull-Rom spline over the squared radius, with a small per-channel
//! correction for lateral chromatic aberration.

use crate::foundation::core::{ColorChannel, Eye, EyeTiles, MeshCoord, TILE_SIZE};
use crate::foundation::error::{TimewarpError, TimewarpResult};
use crate::foundation::math::Mat4;
use crate::mesh::grid::DistortionMesh;

const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;

/// Physical description of a headset display and its lenses.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HmdInfo {
    pub display_pixels_wide: u32,
    pub display_pixels_high: u32,
    pub eye_tiles_wide: u32,
    pub eye_tiles_high: u32,
    pub display_meters_wide: f32,
    pub display_meters_high: f32,
    pub lens_separation_meters: f32,
    pub meters_per_tan_angle_at_center: f32,
    /// Radial scale knots, evenly spaced over `[0, max_r]` in squared tan-angle.
    pub k: Vec<f32>,
    pub max_r: f32,
    /// `(c0, c1)` scale red, `(c2, c3)` scale blue: `1 + c_even + rsq * c_odd`.
    pub chromatic_aberration: [f32; 4],
    pub fov_degrees: [f32; 2],
}

impl Default for HmdInfo {
    fn default() -> Self {
        let display_pixels_wide = 1920;
        let display_pixels_high = 1080;
        let eye_tiles_wide = 1920 / TILE_SIZE as u32 / 2;
        let eye_tiles_high = 1080 / TILE_SIZE as u32;
        let display_meters_wide = 0.11047;
        let visible_meters_wide = display_meters_wide
            * (eye_tiles_wide * 2 * TILE_SIZE as u32) as f32
            / display_pixels_wide as f32;
        Self {
            display_pixels_wide,
            display_pixels_high,
            eye_tiles_wide,
            eye_tiles_high,
            display_meters_wide,
            display_meters_high: 0.06214,
            lens_separation_meters: visible_meters_wide / 2.0,
            meters_per_tan_angle_at_center: 0.037,
            k: vec![
                1.0, 1.021, 1.051, 1.086, 1.128, 1.177, 1.232, 1.295, 1.368, 1.452, 1.560,
            ],
            max_r: 1.0,
            chromatic_aberration: [-0.006, 0.0, 0.014, 0.0],
            fov_degrees: [90.0, 90.0],
        }
    }
}

impl HmdInfo {
    pub fn validate(&self) -> TimewarpResult<()> {
        self.eye_tiles()?;
        if self.k.len() < 3 {
            return Err(TimewarpError::validation(format!(
                "lens spline needs at least 3 knots, got {}",
                self.k.len()
            )));
        }
        let positive = [
            ("display_meters_wide", self.display_meters_wide),
            ("display_meters_high", self.display_meters_high),
            (
                "meters_per_tan_angle_at_center",
                self.meters_per_tan_angle_at_center,
            ),
            ("max_r", self.max_r),
            ("fov_degrees[0]", self.fov_degrees[0]),
            ("fov_degrees[1]", self.fov_degrees[1]),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(TimewarpError::validation(format!(
                    "hmd '{name}' must be finite and > 0, got {v}"
                )));
            }
        }
        if self.fov_degrees.iter().any(|f| *f >= 180.0) {
            return Err(TimewarpError::validation("hmd fov must be < 180 degrees"));
        }
        let visible = self.eye_tiles()?;
        if visible.frame_width() > self.display_pixels_wide as usize
            || visible.eye_height() > self.display_pixels_high as usize
        {
            return Err(TimewarpError::validation(format!(
                "eye tiles {}x{} do not fit a {}x{} display",
                visible.wide, visible.high, self.display_pixels_wide, self.display_pixels_high
            )));
        }
        Ok(())
    }

    pub fn eye_tiles(&self) -> TimewarpResult<EyeTiles> {
        EyeTiles::new(self.eye_tiles_wide, self.eye_tiles_high)
    }

    /// Render projection for the configured field of view.
    pub fn projection(&self) -> Mat4 {
        Mat4::projection_fov(self.fov_degrees[0], self.fov_degrees[1], NEAR, FAR)
    }

    fn visible_pixels(&self) -> [f32; 2] {
        [
            (self.eye_tiles_wide as usize * TILE_SIZE * 2) as f32,
            (self.eye_tiles_high as usize * TILE_SIZE) as f32,
        ]
    }

    fn visible_meters(&self) -> [f32; 2] {
        let [pw, ph] = self.visible_pixels();
        [
            self.display_meters_wide * pw / self.display_pixels_wide as f32,
            self.display_meters_high * ph / self.display_pixels_high as f32,
        ]
    }

    /// Radial scale at squared tan-angle radius `rsq`.
    pub fn catmull_rom(&self, rsq: f32) -> f32 {
        catmull_rom(&self.k, self.max_r, rsq)
    }

    /// Per-channel scale at squared radius `rsq`, `[red, green, blue]`.
    pub fn channel_scales(&self, rsq: f32) -> [f32; 3] {
        let scale = self.catmull_rom(rsq);
        let c = self.chromatic_aberration;
        [
            scale * (1.0 + c[0] + rsq * c[1]),
            scale,
            scale * (1.0 + c[2] + rsq * c[3]),
        ]
    }
}

/// Catmull-Rom spline through `k`, evenly spaced over `[0, max_r]`.
///
/// The first segment starts at 1 with the forward difference as tangent; past the last knot
/// the curve continues as a straight line.
pub fn catmull_rom(k: &[f32], max_r: f32, value: f32) -> f32 {
    let n = k.len();
    let last = (n - 1) as f32;
    let scaled = last * value / max_r;
    let floor = scaled.floor().clamp(0.0, last);
    let t = scaled - floor;
    let i = floor as usize;

    let (p0, m0, p1, m1) = if i == 0 {
        (1.0, k[1] - k[0], k[1], 0.5 * (k[2] - k[0]))
    } else if i + 2 < n {
        (
            k[i],
            0.5 * (k[i + 1] - k[i - 1]),
            k[i + 1],
            0.5 * (k[i + 2] - k[i]),
        )
    } else if i + 2 == n {
        (k[i], 0.5 * (k[i + 1] - k[i - 1]), k[i + 1], k[i + 1] - k[i])
    } else {
        let p0 = k[n - 1];
        let m0 = k[n - 1] - k[n - 2];
        (p0, m0, p0 + m0, m0)
    };

    let omt = 1.0 - t;
    (p0 * (1.0 + 2.0 * t) + m0 * t) * omt * omt + (p1 * (1.0 + 2.0 * omt) - m1 * omt) * t * t
}

/// Build the six read-only grids for `hmd`.
pub fn build_distortion_mesh(hmd: &HmdInfo) -> TimewarpResult<DistortionMesh> {
    hmd.validate()?;
    let tiles = hmd.eye_tiles()?;
    let mut mesh = DistortionMesh::identity(tiles);

    let [vis_px_w, vis_px_h] = hmd.visible_pixels();
    let [vis_m_w, vis_m_h] = hmd.visible_meters();
    let shift_meters = hmd.lens_separation_meters / 2.0 - vis_m_w / 4.0;
    let shift_view = shift_meters / (vis_m_w / 2.0);
    let ndc_to_pixels = [vis_px_w * 0.25, vis_px_h * 0.5];
    let pixels_to_meters = [vis_m_w / vis_px_w, vis_m_h / vis_px_h];

    let stride = tiles.vertex_stride();
    for eye in Eye::ALL {
        let shift = match eye {
            Eye::Left => shift_view,
            Eye::Right => -shift_view,
        };
        for y in 0..=tiles.high as usize {
            let yf = 1.0 - y as f32 / tiles.high as f32;
            for x in 0..=tiles.wide as usize {
                let xf = x as f32 / tiles.wide as f32;
                let input = [shift + xf, yf];
                let theta: [f32; 2] = std::array::from_fn(|a| {
                    let ndc = 2.0 * input[a] - 1.0;
                    ndc * ndc_to_pixels[a] * pixels_to_meters[a]
                        / hmd.meters_per_tan_angle_at_center
                });
                let rsq = theta[0] * theta[0] + theta[1] * theta[1];
                let scales = hmd.channel_scales(rsq);
                for ch in ColorChannel::ALL {
                    let s = scales[ch.index()];
                    mesh.grid_mut(eye, ch)[y * stride + x] =
                        MeshCoord::new(s * theta[0], s * theta[1]);
                }
            }
        }
    }
    Ok(mesh)
}
