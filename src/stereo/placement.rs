/// User-controlled layout state. The auto-fit solver writes `zoom` only;
/// every other field is the user's alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParameters {
    pub zoom: f32,
    pub separation: f32,
    pub vertical_common: f32,
    pub vertical_differential: f32,
    /// Flat-mode manual pan, in pixels. Inert in spatial modes.
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Default for LayoutParameters {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            separation: 0.06,
            vertical_common: 0.0,
            vertical_differential: 0.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

/// Floor ratio keeping the eye surfaces from crossing at high zoom: the
/// separation actually used is never below `ratio * zoom`.
pub const SEPARATION_FLOOR_RATIO: f32 = 1.02;

/// Smallest zoom the controls may reach; zoom must stay positive.
pub const MIN_ZOOM: f32 = 0.05;

/// One eye surface's pose: centered at (x, y, z), sized (scale_x, scale_y)
/// in the same units as the viewing distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePlacement {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementPair {
    pub left: EyePlacement,
    pub right: EyePlacement,
}

/// Shared flat-mode transform: both eyes draw overlapped with the same pan
/// and zoom. Separation and the differential offset do not participate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatPlacement {
    pub pan_x: f32,
    pub pan_y: f32,
    pub zoom: f32,
}

/// The separation used for spatial placement after the zoom floor.
pub fn effective_separation(layout: &LayoutParameters, floor_ratio: f32) -> f32 {
    layout.separation.max(floor_ratio * layout.zoom)
}

/// Places both eye surfaces for immersive or fallback presentation: spread
/// on X by the effective separation, offset on Y by the common term plus a
/// per-eye differential (left +, right -), pushed back to the viewing
/// distance, scaled by zoom with the eye aspect on X.
pub fn place_spatial(
    layout: &LayoutParameters,
    eye_aspect: f32,
    viewing_distance: f32,
    floor_ratio: f32,
) -> PlacementPair {
    let separation = effective_separation(layout, floor_ratio);
    let scale_x = eye_aspect * layout.zoom;
    let scale_y = layout.zoom;
    let z = -viewing_distance;
    PlacementPair {
        left: EyePlacement {
            x: -separation * 0.5,
            y: layout.vertical_common + layout.vertical_differential,
            z,
            scale_x,
            scale_y,
        },
        right: EyePlacement {
            x: separation * 0.5,
            y: layout.vertical_common - layout.vertical_differential,
            z,
            scale_x,
            scale_y,
        },
    }
}

/// Flat-mode transform shared by both overlapped layers.
pub fn place_flat(layout: &LayoutParameters) -> FlatPlacement {
    FlatPlacement {
        pan_x: layout.pan_x,
        pan_y: layout.pan_y,
        zoom: layout.zoom,
    }
}
