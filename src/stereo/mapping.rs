use crate::source::{ImageInfo, StereoSource};

/// Inset applied around composite half boundaries, in UV units, so bilinear
/// sampling never bleeds across the center seam or the outer edges.
pub const DEFAULT_GUARD_MARGIN: f32 = 0.002;

/// User corrections for mis-authored sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewAdjustment {
    pub swap_eyes: bool,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

/// One eye's sampling rectangle in source UV space. Extents are signed: a
/// negative extent walks its axis mirrored, starting from `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeSampling {
    pub origin_u: f32,
    pub origin_v: f32,
    pub extent_u: f32,
    pub extent_v: f32,
}

impl EyeSampling {
    fn span(origin_u: f32, width: f32) -> Self {
        Self {
            origin_u,
            origin_v: 0.0,
            extent_u: width,
            extent_v: 1.0,
        }
    }

    /// Interval covered on U as (min, max), independent of mirroring.
    pub fn covered_u(&self) -> (f32, f32) {
        ordered(self.origin_u, self.origin_u + self.extent_u)
    }

    /// Interval covered on V as (min, max), independent of mirroring.
    pub fn covered_v(&self) -> (f32, f32) {
        ordered(self.origin_v, self.origin_v + self.extent_v)
    }

    // Horizontal mirroring shifts the origin across the rectangle before
    // negating, so the covered interval stays inside the same half.
    fn flip_u(&mut self) {
        self.origin_u += self.extent_u;
        self.extent_u = -self.extent_u;
    }

    // Vertical mirroring negates the sign only; the origin stays at 0.
    fn flip_v(&mut self) {
        self.extent_v = -self.extent_v;
    }

    /// The same rectangle with both covered intervals inside `[0, 1]`, for
    /// samplers that cannot address below zero. A mirrored V covers
    /// `[-span, 0]` and is shifted up one span; U is in range already.
    pub fn sampler_window(&self) -> Self {
        let mut window = *self;
        if window.extent_v < 0.0 {
            window.origin_v -= window.extent_v;
        }
        window
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

/// A sampling rectangle together with the image it reads from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    pub image: ImageInfo,
    pub sampling: EyeSampling,
}

/// The finished mapping for both eyes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeViews {
    pub left: EyeView,
    pub right: EyeView,
}

/// Computes the per-eye sampling rectangles for `source` under `adjust`.
///
/// Flips are applied to the rectangles of the physical halves first; the
/// eye swap then exchanges the two finished mappings. Swapping never
/// recomputes geometry, so flips stay tied to the image half they affect
/// rather than to the eye label.
pub fn map_eyes(source: &StereoSource, adjust: ViewAdjustment, guard: f32) -> EyeViews {
    let (mut left, mut right) = match *source {
        StereoSource::Composite { image } => {
            let width = 0.5 - 2.0 * guard;
            (
                EyeView {
                    image,
                    sampling: EyeSampling::span(guard, width),
                },
                EyeView {
                    image,
                    sampling: EyeSampling::span(0.5 + guard, width),
                },
            )
        }
        StereoSource::Pair {
            left: left_image,
            right: right_image,
        } => (
            EyeView {
                image: left_image,
                sampling: EyeSampling::span(0.0, 1.0),
            },
            EyeView {
                image: right_image,
                sampling: EyeSampling::span(0.0, 1.0),
            },
        ),
    };

    if adjust.flip_horizontal {
        left.sampling.flip_u();
        right.sampling.flip_u();
    }
    if adjust.flip_vertical {
        left.sampling.flip_v();
        right.sampling.flip_v();
    }
    if adjust.swap_eyes {
        std::mem::swap(&mut left, &mut right);
    }

    EyeViews { left, right }
}

/// Aspect ratio of the region one eye samples. Pairs use the left image;
/// mismatched pairs are the loader's business to warn about.
pub fn eye_aspect(source: &StereoSource) -> f32 {
    match *source {
        StereoSource::Composite { image } => {
            (image.width as f32 * 0.5) / image.height as f32
        }
        StereoSource::Pair { left, .. } => left.width as f32 / left.height as f32,
    }
}
