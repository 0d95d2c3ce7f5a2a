//! Identity-class resolution
//!
//! The tracker keeps identity but not class, so every frame each tracked id
//! takes the class of the detection whose box centre is nearest to it.

use std::collections::BTreeMap;
use zone_geometry::Point;

use crate::detection::Detection;
use crate::distance::{distance_matrix, first_min};
use crate::ObjectId;

/// Class of the nearest detection centroid for every tracked id.
///
/// Ties go to the earlier detection. With no detections the map is empty.
pub fn resolve_classes(
    detections: &[Detection],
    objects: &BTreeMap<ObjectId, Point>,
) -> BTreeMap<ObjectId, String> {
    if detections.is_empty() || objects.is_empty() {
        return BTreeMap::new();
    }

    let centres: Vec<Point> = detections.iter().map(|d| d.bbox.centroid()).collect();
    let tracked: Vec<Point> = objects.values().copied().collect();
    let distances = distance_matrix(&tracked, &centres);

    objects
        .keys()
        .zip(distances.rows())
        .filter_map(|(id, row)| {
            first_min(row).map(|(col, _)| (*id, detections[col].class.clone()))
        })
        .collect()
}
