//! Multi-object tracker seam and centroid tracker

use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use zone_geometry::Point;

use crate::detection::BoundingBox;
use crate::distance::{distance_matrix, first_min};
use crate::ObjectId;

/// Result of one tracker update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerUpdate {
    /// Live objects and their current centroid
    pub objects: BTreeMap<ObjectId, Point>,
    /// Objects dropped during this update; their ids are never reused
    pub removed: Vec<ObjectId>,
}

/// Assigns persistent ids to boxes across frames
pub trait ObjectTracker {
    fn update(&mut self, boxes: &[BoundingBox]) -> TrackerUpdate;
}

/// Nearest-centroid tracker.
///
/// Existing objects are matched greedily, closest first, each to its
/// nearest box. An object unmatched for more than `max_disappeared`
/// consecutive updates is dropped.
#[derive(Debug, Clone)]
pub struct CentroidTracker {
    next_id: ObjectId,
    objects: BTreeMap<ObjectId, Point>,
    disappeared: BTreeMap<ObjectId, u32>,
    max_disappeared: u32,
}

impl CentroidTracker {
    pub fn new(max_disappeared: u32) -> Self {
        Self {
            next_id: 0,
            objects: BTreeMap::new(),
            disappeared: BTreeMap::new(),
            max_disappeared,
        }
    }

    fn register(&mut self, centroid: Point) {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, centroid);
        self.disappeared.insert(id, 0);
        debug!("Tracker registered object {} at ({:.1}, {:.1})", id, centroid.x, centroid.y);
    }

    fn mark_missing(&mut self, id: ObjectId, removed: &mut Vec<ObjectId>) {
        let missing = self.disappeared.entry(id).or_insert(0);
        *missing += 1;
        if *missing > self.max_disappeared {
            self.objects.remove(&id);
            self.disappeared.remove(&id);
            removed.push(id);
            debug!("Tracker dropped object {}", id);
        }
    }

    fn snapshot(&self, removed: Vec<ObjectId>) -> TrackerUpdate {
        TrackerUpdate {
            objects: self.objects.clone(),
            removed,
        }
    }
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self::new(8)
    }
}

impl ObjectTracker for CentroidTracker {
    fn update(&mut self, boxes: &[BoundingBox]) -> TrackerUpdate {
        let mut removed = Vec::new();
        let inputs: Vec<Point> = boxes.iter().map(BoundingBox::centroid).collect();

        if inputs.is_empty() {
            let ids: Vec<ObjectId> = self.objects.keys().copied().collect();
            for id in ids {
                self.mark_missing(id, &mut removed);
            }
            return self.snapshot(removed);
        }

        if self.objects.is_empty() {
            for centroid in inputs {
                self.register(centroid);
            }
            return self.snapshot(removed);
        }

        let ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        let existing: Vec<Point> = self.objects.values().copied().collect();
        let distances = distance_matrix(&existing, &inputs);

        // Nearest box per object, objects ordered by that distance
        let nearest: Vec<(usize, f64)> = distances
            .rows()
            .into_iter()
            .map(|row| first_min(row).unwrap_or((0, f64::INFINITY)))
            .collect();
        let mut order: Vec<usize> = (0..ids.len()).collect();
        order.sort_by(|&a, &b| nearest[a].1.total_cmp(&nearest[b].1));

        let mut used_rows = HashSet::new();
        let mut used_cols = HashSet::new();
        for row in order {
            let col = nearest[row].0;
            if used_cols.contains(&col) {
                continue;
            }
            self.objects.insert(ids[row], inputs[col]);
            self.disappeared.insert(ids[row], 0);
            used_rows.insert(row);
            used_cols.insert(col);
        }

        for (row, id) in ids.iter().enumerate() {
            if !used_rows.contains(&row) {
                self.mark_missing(*id, &mut removed);
            }
        }
        for (col, centroid) in inputs.into_iter().enumerate() {
            if !used_cols.contains(&col) {
                self.register(centroid);
            }
        }

        self.snapshot(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: f64, y: f64) -> BoundingBox {
        BoundingBox::new(x - 10.0, y - 10.0, x + 10.0, y + 10.0)
    }

    #[test]
    fn test_registers_new_objects() {
        let mut tracker = CentroidTracker::new(2);
        let update = tracker.update(&[boxed(100.0, 100.0), boxed(400.0, 100.0)]);
        assert_eq!(update.objects.len(), 2);
        assert_eq!(update.objects[&0], Point::new(100.0, 100.0));
        assert_eq!(update.objects[&1], Point::new(400.0, 100.0));
        assert!(update.removed.is_empty());
    }

    #[test]
    fn test_ids_follow_motion() {
        let mut tracker = CentroidTracker::new(2);
        tracker.update(&[boxed(100.0, 100.0), boxed(400.0, 100.0)]);
        // Reverse box order, small displacement
        let update = tracker.update(&[boxed(410.0, 120.0), boxed(105.0, 115.0)]);
        assert_eq!(update.objects[&0], Point::new(105.0, 115.0));
        assert_eq!(update.objects[&1], Point::new(410.0, 120.0));
    }

    #[test]
    fn test_disappearance_reports_removal() {
        let mut tracker = CentroidTracker::new(1);
        tracker.update(&[boxed(100.0, 100.0), boxed(400.0, 100.0)]);

        let update = tracker.update(&[boxed(100.0, 105.0)]);
        assert_eq!(update.objects.len(), 2);
        assert!(update.removed.is_empty());

        let update = tracker.update(&[boxed(100.0, 110.0)]);
        assert_eq!(update.removed, vec![1]);
        assert_eq!(update.objects.keys().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_empty_update_ages_everything() {
        let mut tracker = CentroidTracker::new(0);
        tracker.update(&[boxed(100.0, 100.0)]);
        let update = tracker.update(&[]);
        assert_eq!(update.removed, vec![0]);
        assert!(update.objects.is_empty());
    }

    #[test]
    fn test_ids_never_reused() {
        let mut tracker = CentroidTracker::new(0);
        tracker.update(&[boxed(100.0, 100.0)]);
        tracker.update(&[]);
        let update = tracker.update(&[boxed(100.0, 100.0)]);
        assert_eq!(update.objects.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_extra_box_registers() {
        let mut tracker = CentroidTracker::new(3);
        tracker.update(&[boxed(100.0, 100.0)]);
        let update = tracker.update(&[boxed(102.0, 101.0), boxed(800.0, 600.0)]);
        assert_eq!(update.objects.len(), 2);
        assert_eq!(update.objects[&1], Point::new(800.0, 600.0));
    }
}
