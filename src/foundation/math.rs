use std::ops::Mul;

/// Fractional bits of the scan-conversion coordinates (16.16).
pub const SCP: u32 = 16;

/// Fractional bits kept per pixel step on the portable path (16.8).
pub const STP: u32 = 8;

/// Homogeneous 4-vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn lerp(self, other: Vec4, t: f32) -> Vec4 {
        Vec4 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
            w: self.w + (other.w - self.w) * t,
        }
    }
}

/// Row-major 4x4 matrix acting on column vectors (`v' = M * v`).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mat4 {
    pub m: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub const fn from_rows(m: [[f32; 4]; 4]) -> Self {
        Self { m }
    }

    pub fn transform(&self, v: Vec4) -> Vec4 {
        let r = |i: usize| {
            let row = &self.m[i];
            row[0] * v.x + row[1] * v.y + row[2] * v.z + row[3] * v.w
        };
        Vec4::new(r(0), r(1), r(2), r(3))
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut out = Self::IDENTITY;
        out.m[0][3] = x;
        out.m[1][3] = y;
        out.m[2][3] = z;
        out
    }

    /// Rotation about +X by `radians` (right-handed).
    pub fn rotation_x(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, c, -s, 0.0],
            [0.0, s, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation about +Y by `radians` (right-handed).
    pub fn rotation_y(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::from_rows([
            [c, 0.0, s, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [-s, 0.0, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation about +Z by `radians` (right-handed).
    pub fn rotation_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::from_rows([
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::IDENTITY;
        for (i, row) in out.m.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = self.m[j][i];
            }
        }
        out
    }

    /// Inverse of a rotation + translation matrix.
    ///
    /// Only valid when the upper 3x3 block is orthonormal and the bottom row is `[0, 0, 0, 1]`.
    pub fn inverse_rigid(&self) -> Self {
        let mut out = Self::IDENTITY;
        for i in 0..3 {
            for j in 0..3 {
                out.m[i][j] = self.m[j][i];
            }
        }
        for i in 0..3 {
            out.m[i][3] = -(out.m[i][0] * self.m[0][3]
                + out.m[i][1] * self.m[1][3]
                + out.m[i][2] * self.m[2][3]);
        }
        out
    }

    /// Copy with the translation column zeroed.
    pub fn without_translation(&self) -> Self {
        let mut out = *self;
        out.m[0][3] = 0.0;
        out.m[1][3] = 0.0;
        out.m[2][3] = 0.0;
        out
    }

    /// GL-style projection from a full horizontal/vertical field of view in degrees.
    pub fn projection_fov(fov_x_deg: f32, fov_y_deg: f32, near: f32, far: f32) -> Self {
        let tan_x = (fov_x_deg.to_radians() * 0.5).tan();
        let tan_y = (fov_y_deg.to_radians() * 0.5).tan();
        Self::projection_tangents(tan_x, tan_x, tan_y, tan_y, near, far)
    }

    /// GL-style projection from the tangents of the four half angles.
    pub fn projection_tangents(
        tan_left: f32,
        tan_right: f32,
        tan_up: f32,
        tan_down: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let width = tan_right + tan_left;
        let height = tan_up + tan_down;
        Self::from_rows([
            [2.0 / width, 0.0, (tan_right - tan_left) / width, 0.0],
            [0.0, 2.0 / height, (tan_up - tan_down) / height, 0.0],
            [
                0.0,
                0.0,
                -(far + near) / (far - near),
                -2.0 * far * near / (far - near),
            ],
            [0.0, 0.0, -1.0, 0.0],
        ])
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = Mat4 { m: [[0.0; 4]; 4] };
        for i in 0..4 {
            for j in 0..4 {
                out.m[i][j] = (0..4).map(|k| self.m[i][k] * rhs.m[k][j]).sum();
            }
        }
        out
    }
}

/// Convert a normalised coordinate scaled by `size` texels to 16.16 fixed point.
///
/// Saturates on overflow; NaN maps to 0.
pub(crate) fn to_fixed16(v: f32, size: u32) -> i32 {
    (v * size as f32 * (1u32 << SCP) as f32) as i32
}

/// Arithmetic shift that rounds toward zero for negative values, so that `-x` reduces to
/// exactly `-(x reduced)`.
pub(crate) fn shr_toward_zero(x: i32, shift: u32) -> i32 {
    let sign = x >> 31;
    (((x ^ sign).wrapping_sub(sign) >> shift) ^ sign).wrapping_sub(sign)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
