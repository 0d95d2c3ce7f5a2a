//! Line crossing counter

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};
use zone_geometry::{crossing_corridor, Line, Point};

use crate::ObjectId;

/// Corridor threshold of the counting line
pub const COUNTING_LINE_THRESHOLD: f64 = 0.01;

/// Read-only view of a counter for reporting and display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub name: String,
    pub line: Line,
    pub tallies: BTreeMap<String, u64>,
    pub is_crossing: bool,
}

/// Per-class crossing counter
pub struct Counter {
    /// Label used in logs and metrics
    name: String,
    /// Counting line
    line: Line,
    /// Ids already counted
    seen: HashSet<ObjectId>,
    /// Count per class, pre-seeded with the tracked classes
    tallies: BTreeMap<String, u64>,
    /// Whether an object was counted on the last call
    is_crossing: bool,
}

impl Counter {
    /// Create a counter with zeroed tallies for `classes`
    pub fn new<I, S>(name: impl Into<String>, line: Line, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let tallies: BTreeMap<String, u64> =
            classes.into_iter().map(|c| (c.into(), 0)).collect();
        info!("Counter '{}' tracking classes {:?}", name, tallies.keys());

        Self {
            name,
            line,
            seen: HashSet::new(),
            tallies,
            is_crossing: false,
        }
    }

    /// Count objects currently on the line.
    ///
    /// Each id is counted at most once. A class outside the tracked set
    /// gets its own tally entry. Objects without a resolved class are skipped.
    pub fn count(
        &mut self,
        objects: &BTreeMap<ObjectId, Point>,
        classes: &BTreeMap<ObjectId, String>,
    ) -> &BTreeMap<String, u64> {
        self.is_crossing = false;

        for (id, centroid) in objects {
            if !crossing_corridor(centroid.x, centroid.y, &self.line, COUNTING_LINE_THRESHOLD) {
                continue;
            }
            if self.seen.contains(id) {
                continue;
            }
            let Some(class) = classes.get(id) else {
                debug!("Counter '{}': object {} has no class, skipped", self.name, id);
                continue;
            };

            *self.tallies.entry(class.clone()).or_insert(0) += 1;
            self.seen.insert(*id);
            self.is_crossing = true;

            debug!("Counter '{}': object {} counted as {}", self.name, id, class);
            metrics::counter!(
                "speedtrap_vehicles_counted_total",
                "counter" => self.name.clone(),
                "class" => class.clone()
            )
            .increment(1);
        }

        &self.tallies
    }

    /// Drop a retired id from the seen set.
    ///
    /// Only valid for ids the tracker will never hand out again.
    pub fn forget(&mut self, id: ObjectId) -> bool {
        self.seen.remove(&id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line(&self) -> &Line {
        &self.line
    }

    pub fn tallies(&self) -> &BTreeMap<String, u64> {
        &self.tallies
    }

    pub fn is_crossing(&self) -> bool {
        self.is_crossing
    }

    pub fn has_counted(&self, id: ObjectId) -> bool {
        self.seen.contains(&id)
    }

    /// Sum over all classes
    pub fn total(&self) -> u64 {
        self.tallies.values().sum()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            name: self.name.clone(),
            line: self.line,
            tallies: self.tallies.clone(),
            is_crossing: self.is_crossing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> Counter {
        Counter::new(
            "north",
            Line::from_coords(100.0, 500.0, 900.0, 500.0),
            ["car", "truck", "motorcycle"],
        )
    }

    fn frame(items: &[(ObjectId, f64, f64, &str)]) -> (BTreeMap<ObjectId, Point>, BTreeMap<ObjectId, String>) {
        let objects = items.iter().map(|(id, x, y, _)| (*id, Point::new(*x, *y))).collect();
        let classes = items.iter().map(|(id, _, _, c)| (*id, c.to_string())).collect();
        (objects, classes)
    }

    #[test]
    fn test_tallies_start_at_zero() {
        let c = counter();
        assert_eq!(c.tallies().len(), 3);
        assert_eq!(c.total(), 0);
        assert!(!c.is_crossing());
    }

    #[test]
    fn test_counts_crossing_object() {
        let mut c = counter();
        let (objects, classes) = frame(&[(1, 400.0, 500.0, "car"), (2, 400.0, 200.0, "truck")]);
        let tallies = c.count(&objects, &classes);
        assert_eq!(tallies["car"], 1);
        assert_eq!(tallies["truck"], 0);
        assert!(c.is_crossing());
        assert!(c.has_counted(1));
        assert!(!c.has_counted(2));
    }

    #[test]
    fn test_same_id_counted_once() {
        let mut c = counter();
        let (objects, classes) = frame(&[(7, 400.0, 500.0, "car")]);
        c.count(&objects, &classes);

        let (objects, classes) = frame(&[(7, 410.0, 502.0, "car")]);
        c.count(&objects, &classes);

        assert_eq!(c.tallies()["car"], 1);
        // Already counted, so nothing crossed on this call
        assert!(!c.is_crossing());
    }

    #[test]
    fn test_crossing_flag_recomputed() {
        let mut c = counter();
        let (objects, classes) = frame(&[(1, 400.0, 500.0, "car")]);
        c.count(&objects, &classes);
        assert!(c.is_crossing());

        let (objects, classes) = frame(&[(1, 400.0, 300.0, "car")]);
        c.count(&objects, &classes);
        assert!(!c.is_crossing());
    }

    #[test]
    fn test_untracked_class_gets_tally() {
        let mut c = counter();
        let (objects, classes) = frame(&[(3, 400.0, 500.0, "bus")]);
        c.count(&objects, &classes);
        assert_eq!(c.tallies()["bus"], 1);
        assert_eq!(c.total(), 1);
    }

    #[test]
    fn test_missing_class_skipped() {
        let mut c = counter();
        let objects = BTreeMap::from([(4, Point::new(400.0, 500.0))]);
        c.count(&objects, &BTreeMap::new());
        assert_eq!(c.total(), 0);
        assert!(!c.has_counted(4));
    }

    #[test]
    fn test_forget() {
        let mut c = counter();
        let (objects, classes) = frame(&[(9, 400.0, 500.0, "car")]);
        c.count(&objects, &classes);
        assert!(c.forget(9));
        assert!(!c.forget(9));
        // Tally is unaffected
        assert_eq!(c.tallies()["car"], 1);
    }
}
