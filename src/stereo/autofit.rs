/// Fraction of the vertical field a fitted surface should cover.
pub const DEFAULT_FILL_FRACTION: f32 = 0.92;

/// Zoom that makes an eye surface cover `fill` of the vertical field of
/// view: the visible height at `viewing_distance` is `2 * d * tan(fov/2)`,
/// and the surface's world height equals its zoom.
pub fn spatial_zoom(viewing_distance: f32, fov_y_radians: f32, fill: f32) -> f32 {
    2.0 * viewing_distance * (fov_y_radians * 0.5).tan() * fill
}
