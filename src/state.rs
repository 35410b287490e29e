use crate::source::StereoSource;
use crate::stereo::mapping::{self, EyeViews, ViewAdjustment};
use crate::stereo::placement::{LayoutParameters, MIN_ZOOM};

/// A user nudge to the adjustment or layout state. Deltas are already
/// scaled by the configured step sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    ZoomBy(f32),
    SetZoom(f32),
    SeparationBy(f32),
    CommonOffsetBy(f32),
    DifferentialOffsetBy(f32),
    PanBy { dx: f32, dy: f32 },
    ToggleSwapEyes,
    ToggleFlipHorizontal,
    ToggleFlipVertical,
    ToggleAutoFit,
    ResetAdjustments,
}

/// All UI-bound state, owned by the viewer and passed by reference to the
/// engines. No other copy exists.
pub struct ViewerState {
    pub source: Option<StereoSource>,
    pub adjustment: ViewAdjustment,
    pub layout: LayoutParameters,
    pub auto_fit: bool,
    defaults: LayoutParameters,
}

impl ViewerState {
    pub fn new(defaults: LayoutParameters, auto_fit: bool) -> Self {
        Self {
            source: None,
            adjustment: ViewAdjustment::default(),
            layout: defaults,
            auto_fit,
            defaults,
        }
    }

    /// Applies one command; returns true when the eye views must be
    /// recomputed before the next frame.
    pub fn apply(&mut self, cmd: ControlCommand) -> bool {
        match cmd {
            ControlCommand::ZoomBy(delta) => {
                self.layout.zoom = (self.layout.zoom + delta).max(MIN_ZOOM);
                true
            }
            ControlCommand::SetZoom(zoom) => {
                self.layout.zoom = zoom.max(MIN_ZOOM);
                true
            }
            ControlCommand::SeparationBy(delta) => {
                self.layout.separation = (self.layout.separation + delta).max(0.0);
                true
            }
            ControlCommand::CommonOffsetBy(delta) => {
                self.layout.vertical_common += delta;
                true
            }
            ControlCommand::DifferentialOffsetBy(delta) => {
                self.layout.vertical_differential += delta;
                true
            }
            ControlCommand::PanBy { dx, dy } => {
                self.layout.pan_x += dx;
                self.layout.pan_y += dy;
                true
            }
            ControlCommand::ToggleSwapEyes => {
                self.adjustment.swap_eyes = !self.adjustment.swap_eyes;
                true
            }
            ControlCommand::ToggleFlipHorizontal => {
                self.adjustment.flip_horizontal = !self.adjustment.flip_horizontal;
                true
            }
            ControlCommand::ToggleFlipVertical => {
                self.adjustment.flip_vertical = !self.adjustment.flip_vertical;
                true
            }
            ControlCommand::ToggleAutoFit => {
                self.auto_fit = !self.auto_fit;
                false
            }
            ControlCommand::ResetAdjustments => {
                self.adjustment = ViewAdjustment::default();
                self.layout = self.defaults;
                true
            }
        }
    }

    /// Installs a new source, returning the one it displaced so the caller
    /// can release its textures.
    pub fn set_source(&mut self, source: StereoSource) -> Option<StereoSource> {
        self.source.replace(source)
    }

    pub fn clear_source(&mut self) -> Option<StereoSource> {
        self.source.take()
    }

    /// Sampling rectangles for the current source, or None when there is
    /// nothing to show and the surfaces stay hidden.
    pub fn views(&self, guard: f32) -> Option<EyeViews> {
        self.source
            .as_ref()
            .map(|source| mapping::map_eyes(source, self.adjustment, guard))
    }

    pub fn eye_aspect(&self) -> Option<f32> {
        self.source.as_ref().map(mapping::eye_aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ImageHandle, ImageInfo, StereoSource};

    fn state() -> ViewerState {
        ViewerState::new(LayoutParameters::default(), true)
    }

    #[test]
    fn zoom_never_reaches_zero() {
        let mut st = state();
        for _ in 0..100 {
            st.apply(ControlCommand::ZoomBy(-0.5));
        }
        assert!(st.layout.zoom >= MIN_ZOOM);
    }

    #[test]
    fn separation_clamps_at_zero() {
        let mut st = state();
        st.apply(ControlCommand::SeparationBy(-1.0));
        assert_eq!(st.layout.separation, 0.0);
    }

    #[test]
    fn reset_restores_defaults_but_not_source() {
        let mut st = state();
        let image = ImageInfo {
            handle: ImageHandle(1),
            width: 100,
            height: 50,
        };
        st.set_source(StereoSource::Composite { image });
        st.apply(ControlCommand::ZoomBy(0.4));
        st.apply(ControlCommand::ToggleSwapEyes);
        st.apply(ControlCommand::ResetAdjustments);
        assert_eq!(st.layout, LayoutParameters::default());
        assert!(!st.adjustment.swap_eyes);
        assert!(st.source.is_some());
    }

    #[test]
    fn views_absent_without_source() {
        let st = state();
        assert!(st.views(0.002).is_none());
        assert!(st.eye_aspect().is_none());
    }

    #[test]
    fn auto_fit_toggle_needs_no_view_refresh() {
        let mut st = state();
        assert!(!st.apply(ControlCommand::ToggleAutoFit));
        assert!(!st.auto_fit);
    }
}
