use stereo_viewer::source::{ImageHandle, ImageInfo, StereoSource};
use stereo_viewer::stereo::mapping::{
    DEFAULT_GUARD_MARGIN, EyeSampling, ViewAdjustment, eye_aspect, map_eyes,
};

fn composite(width: u32, height: u32) -> StereoSource {
    StereoSource::Composite {
        image: ImageInfo {
            handle: ImageHandle(1),
            width,
            height,
        },
    }
}

fn pair(lw: u32, lh: u32, rw: u32, rh: u32) -> StereoSource {
    StereoSource::Pair {
        left: ImageInfo {
            handle: ImageHandle(1),
            width: lw,
            height: lh,
        },
        right: ImageInfo {
            handle: ImageHandle(2),
            width: rw,
            height: rh,
        },
    }
}

fn close(a: f32, b: f32) {
    assert!((a - b).abs() <= 1e-6, "{a} vs {b}");
}

fn sampling_close(got: EyeSampling, want: (f32, f32, f32, f32)) {
    close(got.origin_u, want.0);
    close(got.origin_v, want.1);
    close(got.extent_u, want.2);
    close(got.extent_v, want.3);
}

#[test]
fn composite_halves_with_default_guard() {
    // 2000x1000 composite, guard 0.002:
    // each half spans 0.5 - 2*0.002 = 0.496 of U
    let views = map_eyes(
        &composite(2000, 1000),
        ViewAdjustment::default(),
        DEFAULT_GUARD_MARGIN,
    );
    sampling_close(views.left.sampling, (0.002, 0.0, 0.496, 1.0));
    sampling_close(views.right.sampling, (0.502, 0.0, 0.496, 1.0));
}

#[test]
fn pair_eyes_sample_their_full_images() {
    let views = map_eyes(&pair(800, 600, 800, 600), ViewAdjustment::default(), 0.0);
    sampling_close(views.left.sampling, (0.0, 0.0, 1.0, 1.0));
    sampling_close(views.right.sampling, (0.0, 0.0, 1.0, 1.0));
    assert_eq!(views.left.image.handle, ImageHandle(1));
    assert_eq!(views.right.image.handle, ImageHandle(2));
}

#[test]
fn composite_halves_stay_disjoint_under_every_adjustment() {
    let source = composite(2000, 1000);
    for bits in 0..8u8 {
        let adjust = ViewAdjustment {
            swap_eyes: bits & 1 != 0,
            flip_horizontal: bits & 2 != 0,
            flip_vertical: bits & 4 != 0,
        };
        let views = map_eyes(&source, adjust, DEFAULT_GUARD_MARGIN);
        let (a_min, a_max) = views.left.sampling.covered_u();
        let (b_min, b_max) = views.right.sampling.covered_u();
        // One eye reads inside [0, 0.5), the other inside (0.5, 1].
        let (lo, hi) = if a_min < b_min {
            ((a_min, a_max), (b_min, b_max))
        } else {
            ((b_min, b_max), (a_min, a_max))
        };
        assert!(lo.0 >= 0.0 && lo.1 < 0.5, "{adjust:?}: {lo:?}");
        assert!(hi.0 > 0.5 && hi.1 <= 1.0, "{adjust:?}: {hi:?}");
        let (v_min, v_max) = views.left.sampling.covered_v();
        assert!((-1.0..=1.0).contains(&v_min) && v_max <= 1.0, "{adjust:?}");
    }
}

#[test]
fn swap_relabels_without_recomputing() {
    let source = composite(1200, 900);
    for bits in 0..4u8 {
        let flips = ViewAdjustment {
            swap_eyes: false,
            flip_horizontal: bits & 1 != 0,
            flip_vertical: bits & 2 != 0,
        };
        let plain = map_eyes(&source, flips, DEFAULT_GUARD_MARGIN);
        let swapped = map_eyes(
            &source,
            ViewAdjustment {
                swap_eyes: true,
                ..flips
            },
            DEFAULT_GUARD_MARGIN,
        );
        assert_eq!(swapped.left, plain.right, "{flips:?}");
        assert_eq!(swapped.right, plain.left, "{flips:?}");
    }
}

#[test]
fn horizontal_flip_mirrors_within_the_same_half() {
    let plain = map_eyes(
        &composite(2000, 1000),
        ViewAdjustment::default(),
        DEFAULT_GUARD_MARGIN,
    );
    let flipped = map_eyes(
        &composite(2000, 1000),
        ViewAdjustment {
            flip_horizontal: true,
            ..ViewAdjustment::default()
        },
        DEFAULT_GUARD_MARGIN,
    );
    // Mirroring reverses the walk direction but covers the same interval.
    assert_eq!(
        plain.left.sampling.covered_u(),
        flipped.left.sampling.covered_u()
    );
    assert!(flipped.left.sampling.extent_u < 0.0);
    // origin moved to the far edge of the half: 0.002 + 0.496 = 0.498
    close(flipped.left.sampling.origin_u, 0.498);
}

#[test]
fn vertical_flip_is_sign_only_and_the_window_shifts_it_back() {
    let flipped = map_eyes(
        &pair(800, 600, 800, 600),
        ViewAdjustment {
            flip_vertical: true,
            ..ViewAdjustment::default()
        },
        0.0,
    );
    // Sign flip leaves the origin at zero; the covered interval goes negative.
    sampling_close(flipped.left.sampling, (0.0, 0.0, 1.0, -1.0));
    assert_eq!(flipped.left.sampling.covered_v(), (-1.0, 0.0));
    // The sampler window shifts V back into [0, 1] without changing direction.
    let window = flipped.left.sampling.sampler_window();
    sampling_close(window, (0.0, 1.0, 1.0, -1.0));
    assert_eq!(window.covered_v(), (0.0, 1.0));
    // U was already in range and is untouched.
    assert_eq!(window.covered_u(), (0.0, 1.0));
}

#[test]
fn aspect_follows_one_eye_not_the_file() {
    // 2000x1000 composite: one eye sees 1000x1000.
    close(eye_aspect(&composite(2000, 1000)), 1.0);
    // Pairs follow the left image.
    close(eye_aspect(&pair(800, 600, 640, 480)), 800.0 / 600.0);
}

#[test]
fn zero_guard_splits_exactly_at_the_seam() {
    let views = map_eyes(&composite(100, 100), ViewAdjustment::default(), 0.0);
    assert_eq!(views.left.sampling.covered_u(), (0.0, 0.5));
    assert_eq!(views.right.sampling.covered_u(), (0.5, 1.0));
}
