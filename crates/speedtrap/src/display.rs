//! Per-frame display snapshot
//!
//! Everything an overlay needs to draw one frame: speed labels next to
//! objects, each zone's running average at its corner anchor and the
//! counter tallies.

use control_zone::ZoneId;
use serde::Serialize;
use speed_estimator::{FrameContext, SpeedLabel};
use std::collections::BTreeMap;
use traffic_config::{DisplayLocation, TrafficConfig};

#[derive(Debug, Clone, Serialize)]
pub struct ZoneAverage {
    pub zone: ZoneId,
    pub average_kmh: f64,
    pub location: DisplayLocation,
    pub anchor: (i64, i64),
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterView {
    pub name: String,
    pub location: DisplayLocation,
    pub tallies: BTreeMap<String, u64>,
    /// Highlight: an object was counted on this frame
    pub is_crossing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisplaySnapshot {
    pub frame: u64,
    pub labels: Vec<SpeedLabel>,
    pub averages: Vec<ZoneAverage>,
    pub counters: Vec<CounterView>,
}

impl DisplaySnapshot {
    /// Build from a processed frame.
    ///
    /// Counters in the context are in configuration order.
    pub fn from_frame(ctx: &FrameContext, config: &TrafficConfig) -> Self {
        let (width, height) = (config.video.width, config.video.height);

        let averages = config
            .zones
            .iter()
            .filter_map(|zone| {
                let average_kmh = *ctx.averages.get(&zone.id)?;
                Some(ZoneAverage {
                    zone: zone.id,
                    average_kmh,
                    location: zone.draw_loc,
                    anchor: zone.draw_loc.average_anchor(width, height),
                })
            })
            .collect();

        let counters = ctx
            .counters
            .iter()
            .zip(&config.counters)
            .map(|(snapshot, cfg)| CounterView {
                name: snapshot.name.clone(),
                location: cfg.draw_loc,
                tallies: snapshot.tallies.clone(),
                is_crossing: snapshot.is_crossing,
            })
            .collect();

        Self {
            frame: ctx.frame_index,
            labels: ctx.labels.clone(),
            averages,
            counters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossing_counter::CounterSnapshot;
    use zone_geometry::Line;

    const CONFIG: &str = r#"
        [video]
        width = 1920
        height = 1080
        fps = 25.0

        [[zones]]
        id = 4
        speed_limit = 90
        cz_distance = 40.0
        draw_loc = "top-right"
        start = { x1 = 100, y1 = 900, x2 = 1800, y2 = 900 }
        exit = { x3 = 1200, y3 = 300, x4 = 700, y4 = 300 }

        [[counters]]
        x1 = 100
        y1 = 600
        x2 = 1800
        y2 = 600
    "#;

    #[test]
    fn test_snapshot_anchors() {
        let config = TrafficConfig::from_toml_str(CONFIG).unwrap();
        let mut ctx = FrameContext::new(42, Vec::new());
        ctx.averages.insert(4, 87.5);
        ctx.counters.push(CounterSnapshot {
            name: "counter-0".into(),
            line: Line::from_coords(100.0, 600.0, 1800.0, 600.0),
            tallies: BTreeMap::from([("car".to_string(), 3)]),
            is_crossing: true,
        });

        let snapshot = DisplaySnapshot::from_frame(&ctx, &config);
        assert_eq!(snapshot.frame, 42);
        assert_eq!(snapshot.averages.len(), 1);
        assert_eq!(snapshot.averages[0].location, DisplayLocation::TopRight);
        assert_eq!(snapshot.averages[0].anchor, (960 - 480, 20));
        assert_eq!(snapshot.counters[0].location, DisplayLocation::BottomLeft);
        assert!(snapshot.counters[0].is_crossing);
    }

    #[test]
    fn test_zone_without_average_omitted() {
        let config = TrafficConfig::from_toml_str(CONFIG).unwrap();
        let ctx = FrameContext::new(0, Vec::new());
        let snapshot = DisplaySnapshot::from_frame(&ctx, &config);
        assert!(snapshot.averages.is_empty());
        assert!(snapshot.counters.is_empty());
    }
}
