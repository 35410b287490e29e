use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::Deserialize;

use crate::error::Error;
use crate::source::SourceRequest;
use crate::stereo::autofit::DEFAULT_FILL_FRACTION;
use crate::stereo::mapping::DEFAULT_GUARD_MARGIN;
use crate::stereo::placement::{LayoutParameters, SEPARATION_FLOOR_RATIO};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Initial source; CLI flags override this block wholesale.
    pub source: SourcePaths,
    pub viewing: ViewingOptions,
    pub controls: ControlSteps,
    pub window: WindowOptions,
    /// Re-run the fit solver on load, immersive entry and spatial resizes.
    pub auto_fit: bool,
    /// How long a granted session may stay frameless before demotion.
    #[serde(with = "humantime_serde")]
    pub watchdog_timeout: Duration,
    /// Decoded sources above this dimension are downscaled before upload.
    pub max_source_dimension: u32,
    pub immersive_driver: DriverKind,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            source: SourcePaths::default(),
            viewing: ViewingOptions::default(),
            controls: ControlSteps::default(),
            window: WindowOptions::default(),
            auto_fit: true,
            watchdog_timeout: Duration::from_millis(1200),
            max_source_dimension: 8192,
            immersive_driver: DriverKind::None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SourcePaths {
    pub composite: Option<PathBuf>,
    pub left: Option<PathBuf>,
    pub right: Option<PathBuf>,
}

impl SourcePaths {
    pub fn is_empty(&self) -> bool {
        self.composite.is_none() && self.left.is_none() && self.right.is_none()
    }

    /// Resolves the configured paths into load requests; an incomplete pair
    /// is an error, nothing configured is an empty list.
    pub fn requests(&self) -> Result<Vec<SourceRequest>, Error> {
        SourceRequest::from_paths(self.composite.clone(), self.left.clone(), self.right.clone())
    }
}

/// Geometry of the simulated viewing setup shared by placement, auto-fit
/// and the split-screen projection.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ViewingOptions {
    /// Distance from the viewer to the eye surfaces, in meters.
    pub distance: f32,
    pub field_of_view_deg: f32,
    /// Fraction of the vertical field auto-fit should fill.
    pub fill_fraction: f32,
    /// UV inset around composite half boundaries.
    pub guard_margin: f32,
    /// Default gap between the eye surfaces, in meters.
    pub separation: f32,
    /// Separation never drops below this ratio times the zoom.
    pub separation_floor_ratio: f32,
}

impl Default for ViewingOptions {
    fn default() -> Self {
        Self {
            distance: 0.95,
            field_of_view_deg: 74.0,
            fill_fraction: DEFAULT_FILL_FRACTION,
            guard_margin: DEFAULT_GUARD_MARGIN,
            separation: 0.06,
            separation_floor_ratio: SEPARATION_FLOOR_RATIO,
        }
    }
}

impl ViewingOptions {
    pub fn field_of_view_radians(&self) -> f32 {
        self.field_of_view_deg.to_radians()
    }

    /// Layout a fresh viewer starts from.
    pub fn initial_layout(&self) -> LayoutParameters {
        LayoutParameters {
            separation: self.separation,
            ..LayoutParameters::default()
        }
    }
}

/// Step applied per key press for each control.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ControlSteps {
    pub zoom: f32,
    pub separation: f32,
    pub vertical_offset: f32,
    pub pan_px: f32,
}

impl Default for ControlSteps {
    fn default() -> Self {
        Self {
            zoom: 0.05,
            separation: 0.005,
            vertical_offset: 0.01,
            pan_px: 16.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct WindowOptions {
    pub title: String,
    pub fullscreen: bool,
    pub hide_cursor: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "Stereo Viewer".to_string(),
            fullscreen: false,
            hide_cursor: false,
        }
    }
}

/// Which session driver answers immersive requests. `None` rejects every
/// session; the simulated drivers exist to exercise the grant and watchdog
/// paths on machines without a per-eye display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    #[default]
    None,
    Simulated,
    Stalled,
}

impl Configuration {
    pub fn from_yaml_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let cfg: Configuration = serde_yaml::from_str(&text)?;
        Ok(cfg)
    }

    pub fn validated(self) -> Result<Self, Error> {
        require(self.viewing.distance > 0.0, "viewing.distance must be positive")?;
        require(
            self.viewing.field_of_view_deg > 0.0 && self.viewing.field_of_view_deg < 180.0,
            "viewing.field-of-view-deg must be inside (0, 180)",
        )?;
        require(
            self.viewing.fill_fraction > 0.0 && self.viewing.fill_fraction <= 1.0,
            "viewing.fill-fraction must be inside (0, 1]",
        )?;
        require(
            (0.0..0.25).contains(&self.viewing.guard_margin),
            "viewing.guard-margin must be inside [0, 0.25)",
        )?;
        require(
            self.viewing.separation >= 0.0,
            "viewing.separation must not be negative",
        )?;
        require(
            self.viewing.separation_floor_ratio >= 0.0,
            "viewing.separation-floor-ratio must not be negative",
        )?;
        require(
            self.watchdog_timeout >= Duration::from_millis(50),
            "watchdog-timeout must be at least 50ms",
        )?;
        require(
            self.max_source_dimension >= 256,
            "max-source-dimension must be at least 256",
        )?;
        require(
            self.controls.zoom > 0.0
                && self.controls.separation > 0.0
                && self.controls.vertical_offset > 0.0
                && self.controls.pan_px > 0.0,
            "controls steps must be positive",
        )?;
        Ok(self)
    }
}

fn require(cond: bool, msg: &str) -> Result<(), Error> {
    if cond {
        Ok(())
    } else {
        Err(Error::InvalidConfig(msg.to_string()))
    }
}
