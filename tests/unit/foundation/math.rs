use super::*;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-5
}

fn mat_approx(a: &Mat4, b: &Mat4) -> bool {
    a.m.iter()
        .flatten()
        .zip(b.m.iter().flatten())
        .all(|(x, y)| approx(*x, *y))
}

#[test]
fn identity_is_neutral() {
    let r = Mat4::rotation_y(0.3) * Mat4::translation(1.0, 2.0, 3.0);
    assert!(mat_approx(&(Mat4::IDENTITY * r), &r));
    assert!(mat_approx(&(r * Mat4::IDENTITY), &r));
}

#[test]
fn rigid_inverse_round_trips() {
    let m = Mat4::translation(0.5, -1.0, 2.0) * Mat4::rotation_x(0.2) * Mat4::rotation_y(-0.7);
    assert!(mat_approx(&(m * m.inverse_rigid()), &Mat4::IDENTITY));
    assert!(mat_approx(&(m.inverse_rigid() * m), &Mat4::IDENTITY));
}

#[test]
fn rotation_inverse_is_transpose() {
    let r = Mat4::rotation_z(1.1) * Mat4::rotation_y(0.4);
    assert!(mat_approx(&r.inverse_rigid(), &r.transpose()));
}

#[test]
fn rotation_y_turns_forward_toward_minus_x() {
    let r = Mat4::rotation_y(std::f32::consts::FRAC_PI_2);
    let v = r.transform(Vec4::new(0.0, 0.0, -1.0, 0.0));
    assert!(approx(v.x, -1.0));
    assert!(approx(v.z, 0.0));
}

#[test]
fn without_translation_keeps_rotation() {
    let m = Mat4::translation(4.0, 5.0, 6.0) * Mat4::rotation_z(0.25);
    let r = m.without_translation();
    assert!(mat_approx(&r, &Mat4::rotation_z(0.25)));
}

#[test]
fn symmetric_projection_has_no_offcentre_terms() {
    let p = Mat4::projection_fov(90.0, 90.0, 0.1, 100.0);
    assert!(approx(p.m[0][0], 1.0));
    assert!(approx(p.m[1][1], 1.0));
    assert!(approx(p.m[0][2], 0.0));
    assert!(approx(p.m[1][2], 0.0));
    assert!(approx(p.m[3][2], -1.0));
}

#[test]
fn vec4_lerp_endpoints() {
    let a = Vec4::new(0.0, 1.0, 2.0, 3.0);
    let b = Vec4::new(4.0, 5.0, 6.0, 7.0);
    assert_eq!(a.lerp(b, 0.0), a);
    assert_eq!(a.lerp(b, 1.0), b);
    assert_eq!(a.lerp(b, 0.5), Vec4::new(2.0, 3.0, 4.0, 5.0));
}

#[test]
fn fixed16_conversion_saturates_and_zeroes_nan() {
    assert_eq!(to_fixed16(0.5, 64), 32 << 16);
    assert_eq!(to_fixed16(1e30, 2048), i32::MAX);
    assert_eq!(to_fixed16(-1e30, 2048), i32::MIN);
    assert_eq!(to_fixed16(f32::NAN, 2048), 0);
}

#[test]
fn shr_toward_zero_is_sign_symmetric() {
    for x in [0, 1, 255, 256, 257, 65_535, 1 << 20, 123_456_789] {
        assert_eq!(shr_toward_zero(x, 8), x >> 8);
        assert_eq!(shr_toward_zero(-x, 8), -(x >> 8));
    }
    assert_eq!(shr_toward_zero(-1, 8), 0);
    assert_eq!(-1 >> 8, -1);
}
