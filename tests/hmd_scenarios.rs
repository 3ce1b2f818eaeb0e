mod hmd_scenarios {
    use timewarp::{
        DestImage, DistortionMesh, FramePoses, FrameStats, HmdInfo, Mat4, PackedImage, PlanarImage,
        Sampling, SourceImage, StaticView, TestImage, TimewarpConfig, TimewarpFrame, Timewarper,
        ViewPredictor as _, build_distortion_mesh,
    };

    struct Rig {
        hmd: HmdInfo,
        mesh: DistortionMesh,
        warper: Timewarper,
    }

    impl Rig {
        fn new() -> Self {
            let hmd = HmdInfo::default();
            let mesh = build_distortion_mesh(&hmd).unwrap();
            let warper = Timewarper::new(&TimewarpConfig {
                workers: Some(4),
                pin_big_cores: false,
                ..TimewarpConfig::default()
            })
            .unwrap();
            Self { hmd, mesh, warper }
        }

        fn width(&self) -> usize {
            self.mesh.tiles().frame_width()
        }

        fn warp(
            &self,
            source: SourceImage<'_>,
            sampling: Sampling,
            yaw_deg: f32,
        ) -> (Vec<u8>, FrameStats) {
            let view = StaticView::from_euler_degrees(yaw_deg, 0.0, 0.0).view_at(0.0);
            self.warp_view(source, sampling, view)
        }

        fn warp_view(
            &self,
            source: SourceImage<'_>,
            sampling: Sampling,
            view: Mat4,
        ) -> (Vec<u8>, FrameStats) {
            let poses = FramePoses {
                projection: self.hmd.projection(),
                start_view: view,
                end_view: view,
                ..FramePoses::default()
            };
            let tiles = self.mesh.tiles();
            let mut buf = vec![0x11u8; tiles.frame_width() * tiles.eye_height() * 4];
            let stats = {
                let mut dest = DestImage::new(&mut buf, tiles, tiles.frame_width() as u32).unwrap();
                let frame = TimewarpFrame::new(source, &self.mesh, sampling).with_poses(poses);
                self.warper.warp(&frame, &mut dest).unwrap()
            };
            (buf, stats)
        }

        fn px<'b>(&self, buf: &'b [u8], x: usize, y: usize) -> &'b [u8] {
            let i = (y * self.width() + x) * 4;
            &buf[i..i + 4]
        }
    }

    /// Texel value equals its column (mod 256) in every channel.
    fn column_ramp(w: usize, h: usize, divisor: usize) -> Vec<u8> {
        (0..w * h).map(|i| ((i % w) / divisor) as u8).collect()
    }

    #[test]
    fn nearest_frame_has_black_corners_and_a_lit_centre() {
        let rig = Rig::new();
        let image = TestImage::blocks(1024, 1024);
        let (out, stats) = rig.warp(
            SourceImage::Packed(image.packed().unwrap()),
            Sampling::NearestPacked,
            0.0,
        );
        assert!(stats.tiles_cleared > 0);
        assert!(stats.tiles_sampled > stats.tiles_cleared);

        assert_eq!(rig.px(&out, 0, 0), [0, 0, 0, 0]);
        assert_eq!(rig.px(&out, rig.width() - 1, 0), [0, 0, 0, 0]);
        let last_row = rig.mesh.tiles().eye_height() - 1;
        assert_eq!(rig.px(&out, 0, last_row), [0, 0, 0, 0]);
        for eye_centre in [480, 1440] {
            assert_eq!(rig.px(&out, eye_centre, 528)[3], 255);
        }
    }

    #[test]
    fn bilinear_frame_tracks_nearest_frame() {
        let rig = Rig::new();
        let image = TestImage::blocks(1024, 1024);
        let packed = SourceImage::Packed(image.packed().unwrap());
        let (nearest, _) = rig.warp(packed, Sampling::NearestPacked, 0.0);
        let (bilinear, _) = rig.warp(packed, Sampling::BilinearPacked, 0.0);

        // Only pixels near a block or circle edge may change by more than rounding.
        let differing = nearest
            .chunks(4)
            .zip(bilinear.chunks(4))
            .filter(|(a, b)| {
                a.iter()
                    .zip(b.iter())
                    .any(|(x, y)| (i32::from(*x) - i32::from(*y)).abs() > 2)
            })
            .count();
        let total = nearest.len() / 4;
        assert!(
            differing * 3 < total,
            "{differing} of {total} pixels differ"
        );
    }

    #[test]
    fn yaw_shifts_both_eyes_the_same_way() {
        let rig = Rig::new();
        let data = column_ramp(1024 * 4, 1024, 16);
        // Packed: every channel of texel x holds x / 4.
        let src = PackedImage::new(&data, 1024, 1024, 1024).unwrap();
        let source = SourceImage::Packed(src);

        let (still, _) = rig.warp(source, Sampling::NearestPacked, 0.0);
        let (left, _) = rig.warp(source, Sampling::NearestPacked, 1.0);
        let (right, _) = rig.warp(source, Sampling::NearestPacked, -1.0);

        // Half tan(1 degree) of a 1024 texel wide source, at x / 4 per level.
        let expected = 0.5 * 1f32.to_radians().tan() * 1024.0 / 4.0;
        for x in [480, 1440] {
            let base = i32::from(rig.px(&still, x, 528)[0]);
            let dl = i32::from(rig.px(&left, x, 528)[0]) - base;
            let dr = i32::from(rig.px(&right, x, 528)[0]) - base;
            // Turning left brings content from the left of the eye buffer into view.
            assert!(dl < 0 && dr > 0, "x={x}: {dl} {dr}");
            for d in [dl, dr] {
                assert!((d.abs() as f32 - expected).abs() <= 1.5, "x={x}: shift {d}");
            }
        }
    }

    #[test]
    fn view_rotated_right_moves_content_left() {
        let rig = Rig::new();
        let data = column_ramp(1024 * 4, 1024, 16);
        let src = PackedImage::new(&data, 1024, 1024, 1024).unwrap();
        let source = SourceImage::Packed(src);

        let (still, _) = rig.warp(source, Sampling::NearestPacked, 0.0);
        let view = Mat4::rotation_y(1f32.to_radians());
        let (turned, _) = rig.warp_view(source, Sampling::NearestPacked, view);
        for x in [480, 1440] {
            let before = rig.px(&still, x, 528)[0];
            let after = rig.px(&turned, x, 528)[0];
            assert!(after > before, "x={x}: {before} -> {after}");
        }
    }

    #[test]
    fn chromatic_fringes_grow_towards_the_edge() {
        let rig = Rig::new();
        let plane = column_ramp(256, 256, 1);
        let src = PlanarImage::new([&plane, &plane, &plane], 256, 256, 256).unwrap();
        let (out, _) = rig.warp(SourceImage::Planar(src), Sampling::ChromaticPlanar, 0.0);

        let fringe = |x: usize| {
            let p = rig.px(&out, x, 528);
            i32::from(p[0]) - i32::from(p[2])
        };
        assert_eq!(fringe(480), 0, "no fringe on the lens axis");
        // Left eye, left edge: red is pulled towards the axis, blue pushed away.
        assert!(fringe(60) >= 1, "{}", fringe(60));
        assert!(fringe(60) >= fringe(300));
        // Right eye, right edge mirrors it.
        assert!(fringe(1860) <= -1, "{}", fringe(1860));
        // Green is between the two.
        let p = rig.px(&out, 60, 528);
        assert!(p[0] >= p[1] && p[1] >= p[2], "{p:?}");
    }

    #[test]
    fn small_source_takes_only_defined_paths() {
        let rig = Rig::new();
        let image = TestImage::blocks(256, 256);
        let tiles = rig.mesh.tiles();
        for sampling in Sampling::ALL {
            let source = if sampling.is_planar() {
                SourceImage::Planar(image.planar().unwrap())
            } else {
                SourceImage::Packed(image.packed().unwrap())
            };
            let (out, stats) = rig.warp(source, sampling, 0.0);
            assert_eq!(
                stats.tiles(),
                tiles.frame_rows() * tiles.wide,
                "{sampling:?}"
            );
            assert!(
                out.chunks(4).all(|p| p[3] == 255 || p == [0, 0, 0, 0]),
                "{sampling:?} left pixels unwritten"
            );
        }
    }
}
