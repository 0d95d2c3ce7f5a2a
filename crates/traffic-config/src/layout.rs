//! Display anchoring of counters and zone averages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// Screen corner where a counter or zone average is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayLocation {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl DisplayLocation {
    pub const ALL: [DisplayLocation; 4] = [
        DisplayLocation::TopLeft,
        DisplayLocation::TopRight,
        DisplayLocation::BottomLeft,
        DisplayLocation::BottomRight,
    ];

    /// Row and column offset factors.
    ///
    /// Rows: 1 for top, -1 for bottom. Columns: 1 for left, -1 for right.
    pub fn offsets(self) -> (i64, i64) {
        match self {
            DisplayLocation::TopLeft => (1, 1),
            DisplayLocation::BottomLeft => (-1, 1),
            DisplayLocation::BottomRight => (-1, -1),
            DisplayLocation::TopRight => (1, -1),
        }
    }

    /// Anchor of a zone's average speed label in a `width x height` frame
    pub fn average_anchor(self, width: u32, height: u32) -> (i64, i64) {
        let (row, col) = self.offsets();
        let (w, h) = (i64::from(width), i64::from(height));
        let x = w / 2 + col * (w / 4);
        let y = h / 2 - row * (h / 2 - 20);
        (x, y)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DisplayLocation::TopLeft => "top-left",
            DisplayLocation::TopRight => "top-right",
            DisplayLocation::BottomLeft => "bottom-left",
            DisplayLocation::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for DisplayLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayLocation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|loc| loc.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownLocation(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        assert_eq!(DisplayLocation::TopLeft.offsets(), (1, 1));
        assert_eq!(DisplayLocation::BottomLeft.offsets(), (-1, 1));
        assert_eq!(DisplayLocation::BottomRight.offsets(), (-1, -1));
        assert_eq!(DisplayLocation::TopRight.offsets(), (1, -1));
    }

    #[test]
    fn test_parse_round_trip() {
        for loc in DisplayLocation::ALL {
            assert_eq!(loc.as_str().parse::<DisplayLocation>().unwrap(), loc);
        }
    }

    #[test]
    fn test_unknown_location_rejected() {
        let err = "middle".parse::<DisplayLocation>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLocation(ref s) if s == "middle"));
    }

    #[test]
    fn test_average_anchor() {
        assert_eq!(DisplayLocation::TopLeft.average_anchor(1920, 1080), (1440, 20));
        assert_eq!(DisplayLocation::BottomRight.average_anchor(1920, 1080), (480, 1060));
    }
}
