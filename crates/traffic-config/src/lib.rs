//! Traffic Configuration
//!
//! Loads control zones, counters and video parameters from a config file
//! layered with `SPEEDTRAP__*` environment overrides. Every check runs at
//! load time, so an invalid file never reaches frame processing.

pub mod layout;
pub mod settings;

pub use layout::DisplayLocation;
pub use settings::{
    CounterConfig, ExitLine, StartLine, TrafficConfig, VideoConfig, ZoneConfig,
};

use thiserror::Error;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Control zone id {0} is not unique")]
    DuplicateZoneId(u32),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Unknown display location '{0}', expected one of top-left, top-right, bottom-left, bottom-right")]
    UnknownLocation(String),
}
