//! Time-warp matrix construction.
//!
//! A time-warp matrix maps a destination tan-angle coordinate, taken as the homogeneous point
//! `(u, v, -1, 1)`, into a homogeneous source texture coordinate: the latest view's rotation is
//! undone relative to the view the eye buffer was rendered with, and the result is projected
//! with the render projection into `[0, 1]^2` texture space (origin top-left).

use crate::foundation::math::Mat4;

/// Default render field of view, degrees (horizontal, vertical).
pub const DEFAULT_FOV_DEGREES: [f32; 2] = [90.0, 90.0];

const DEFAULT_NEAR: f32 = 0.1;
const DEFAULT_FAR: f32 = 100.0;

/// Start-of-refresh and end-of-refresh time-warp matrices.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimewarpMatrices {
    pub start: Mat4,
    pub end: Mat4,
}

impl TimewarpMatrices {
    /// Pass mesh coordinates through unchanged.
    pub fn identity() -> Self {
        Self {
            start: Mat4::IDENTITY,
            end: Mat4::IDENTITY,
        }
    }

    pub fn from_poses(poses: &FramePoses) -> Self {
        Self {
            start: timewarp_transform(&poses.projection, &poses.render_view, &poses.start_view),
            end: timewarp_transform(&poses.projection, &poses.render_view, &poses.end_view),
        }
    }
}

/// Rescale a GL projection so that clip space lands in `[0, 1]^2` texture space.
///
/// Y is flipped so texture (0, 0) is the top-left texel. The third and fourth output rows both
/// carry the negated view depth, so the perspective divide uses `w`.
pub fn ndc_to_tex_coord(projection: &Mat4) -> Mat4 {
    let p = &projection.m;
    Mat4::from_rows([
        [0.5 * p[0][0], 0.0, 0.5 * p[0][2] - 0.5, 0.0],
        [0.0, -0.5 * p[1][1], -0.5 * p[1][2] - 0.5, 0.0],
        [0.0, 0.0, -1.0, 0.0],
        [0.0, 0.0, -1.0, 0.0],
    ])
}

/// `NdcToTexCoord(P) * inv(V' * inv(V))`, translation dropped.
///
/// Eye buffers are not re-projected for parallax, so only the rotation between the rendered
/// view `render_view` and the newer `new_view` is corrected.
pub fn timewarp_transform(projection: &Mat4, render_view: &Mat4, new_view: &Mat4) -> Mat4 {
    let delta = *new_view * render_view.inverse_rigid();
    let inverse_delta = delta.inverse_rigid().without_translation();
    ndc_to_tex_coord(projection) * inverse_delta
}

/// Source of predicted head poses, as view matrices, for a display time in seconds.
pub trait ViewPredictor {
    fn view_at(&self, time_secs: f64) -> Mat4;
}

/// A head pose that never changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticView {
    view: Mat4,
}

impl StaticView {
    pub fn identity() -> Self {
        Self {
            view: Mat4::IDENTITY,
        }
    }

    pub fn new(view: Mat4) -> Self {
        Self { view }
    }

    /// View matrix for a head rotated by yaw (about +Y), then pitch, then roll, in degrees.
    pub fn from_euler_degrees(yaw: f32, pitch: f32, roll: f32) -> Self {
        let pose = Mat4::rotation_y(yaw.to_radians())
            * Mat4::rotation_x(pitch.to_radians())
            * Mat4::rotation_z(roll.to_radians());
        Self {
            view: pose.inverse_rigid(),
        }
    }
}

impl Default for StaticView {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewPredictor for StaticView {
    fn view_at(&self, _time_secs: f64) -> Mat4 {
        self.view
    }
}

/// Everything needed to derive one frame's [`TimewarpMatrices`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FramePoses {
    pub projection: Mat4,
    pub render_view: Mat4,
    pub start_view: Mat4,
    pub end_view: Mat4,
}

impl Default for FramePoses {
    fn default() -> Self {
        Self {
            projection: Mat4::projection_fov(
                DEFAULT_FOV_DEGREES[0],
                DEFAULT_FOV_DEGREES[1],
                DEFAULT_NEAR,
                DEFAULT_FAR,
            ),
            render_view: Mat4::IDENTITY,
            start_view: Mat4::IDENTITY,
            end_view: Mat4::IDENTITY,
        }
    }
}

impl FramePoses {
    /// Sample `predictor` at the start and end of the refresh interval.
    pub fn predict(
        projection: Mat4,
        render_view: Mat4,
        predictor: &dyn ViewPredictor,
        refresh_start_secs: f64,
        refresh_end_secs: f64,
    ) -> Self {
        Self {
            projection,
            render_view,
            start_view: predictor.view_at(refresh_start_secs),
            end_view: predictor.view_at(refresh_end_secs),
        }
    }
}
