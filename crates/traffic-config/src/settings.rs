//! Configuration schema and validation

use config::{Config, Environment, File, FileFormat};
use control_zone::{ZoneId, ZoneSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;
use zone_geometry::Line;

use crate::{ConfigError, DisplayLocation};

/// Environment override prefix (`SPEEDTRAP__VIDEO__FPS=30`)
const ENV_PREFIX: &str = "SPEEDTRAP";

/// Video stream parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Frame width (pixels), also the rectified zone width
    pub width: u32,
    /// Frame height (pixels), also the rectified zone height
    pub height: u32,
    /// Frames per second used for dwell time
    pub fps: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 25.0,
        }
    }
}

/// Start line of a zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StartLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Exit line of a zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExitLine {
    pub x3: f64,
    pub y3: f64,
    pub x4: f64,
    pub y4: f64,
}

/// Control zone entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: ZoneId,
    /// Speed limit (km/h)
    pub speed_limit: f64,
    /// Distance between start and exit line (meters)
    pub cz_distance: f64,
    pub start: StartLine,
    pub exit: ExitLine,
    #[serde(default = "default_zone_location")]
    pub draw_loc: DisplayLocation,
}

impl ZoneConfig {
    /// Zone parameters for a frame of the given size
    pub fn to_spec(&self, video: &VideoConfig) -> ZoneSpec {
        ZoneSpec {
            id: self.id,
            start: Line::from_coords(self.start.x1, self.start.y1, self.start.x2, self.start.y2),
            exit: Line::from_coords(self.exit.x3, self.exit.y3, self.exit.x4, self.exit.y4),
            length_m: self.cz_distance,
            speed_limit_kmh: self.speed_limit,
            width: f64::from(video.width),
            height: f64::from(video.height),
        }
    }
}

/// Counting line entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default = "default_counter_location")]
    pub draw_loc: DisplayLocation,
}

impl CounterConfig {
    pub fn line(&self) -> Line {
        Line::from_coords(self.x1, self.y1, self.x2, self.y2)
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficConfig {
    #[serde(default)]
    pub video: VideoConfig,

    /// Frames a measured speed stays on display
    #[serde(default = "default_display_frames")]
    pub display_frames: u32,

    /// Classes tracked by the counters
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,

    /// Minimum detection confidence kept by the detector
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Consecutive missed updates before the tracker drops an object
    #[serde(default = "default_max_disappeared")]
    pub max_disappeared: u32,

    #[serde(default)]
    pub zones: Vec<ZoneConfig>,

    #[serde(default)]
    pub counters: Vec<CounterConfig>,
}

impl TrafficConfig {
    /// Load from a file (format from its extension) plus environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: TrafficConfig = settings.try_deserialize()?;
        config.validate()?;

        info!(
            "Loaded {} control zones and {} counters from {}",
            config.zones.len(),
            config.counters.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse TOML text without environment overrides
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: TrafficConfig = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject ambiguous or unusable settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.video.width == 0 || self.video.height == 0 {
            return Err(invalid("video", "frame size must be non-zero"));
        }
        if !(self.video.fps.is_finite() && self.video.fps > 0.0) {
            return Err(invalid("video.fps", "must be positive"));
        }
        if self.display_frames == 0 {
            return Err(invalid("display_frames", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(invalid("min_confidence", "must be within [0, 1]"));
        }

        let mut ids = HashSet::new();
        for zone in &self.zones {
            if !ids.insert(zone.id) {
                return Err(ConfigError::DuplicateZoneId(zone.id));
            }
            if !(zone.cz_distance.is_finite() && zone.cz_distance > 0.0) {
                return Err(invalid(
                    &format!("zones[{}].cz_distance", zone.id),
                    "must be positive",
                ));
            }
            if !(zone.speed_limit.is_finite() && zone.speed_limit >= 0.0) {
                return Err(invalid(
                    &format!("zones[{}].speed_limit", zone.id),
                    "must be a non-negative number",
                ));
            }
        }

        Ok(())
    }

    /// Zone parameters sized to the video frame
    pub fn zone_specs(&self) -> Vec<ZoneSpec> {
        self.zones.iter().map(|z| z.to_spec(&self.video)).collect()
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn default_zone_location() -> DisplayLocation {
    DisplayLocation::TopLeft
}

fn default_counter_location() -> DisplayLocation {
    DisplayLocation::BottomLeft
}

fn default_display_frames() -> u32 {
    20
}

fn default_classes() -> Vec<String> {
    vec!["car".into(), "truck".into(), "motorcycle".into()]
}

fn default_min_confidence() -> f64 {
    0.6
}

fn default_max_disappeared() -> u32 {
    8
}
