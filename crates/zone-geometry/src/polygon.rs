//! Point-in-polygon and crossing corridor tests

use crate::point::{Line, Point};

/// Even-odd ray casting test.
///
/// The polygon is closed implicitly (last vertex connects to the first).
/// Self-intersecting polygons follow the even-odd rule.
pub fn point_in_polygon(x: f64, y: f64, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n == 0 {
        return false;
    }

    let mut inside = false;
    let mut p1 = polygon[0];
    for i in 1..=n {
        let p2 = polygon[i % n];
        // Both bounds together exclude horizontal edges, so the division is safe
        if y > p1.y.min(p2.y) && y <= p1.y.max(p2.y) && x <= p1.x.max(p2.x) {
            let x_inters = (y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y) + p1.x;
            if p1.x == p2.x || x <= x_inters {
                inside = !inside;
            }
        }
        p1 = p2;
    }

    inside
}

/// Corridor quadrilateral around a line.
///
/// Each endpoint's y coordinate is scaled by `1 - thresh` and `1 + thresh`,
/// so the corridor thickness grows with the distance from the top of the
/// frame and collapses for endpoints at `y = 0` or for vertical lines.
pub fn corridor_polygon(line: &Line, thresh: f64) -> [Point; 4] {
    let down = 1.0 - thresh;
    let up = 1.0 + thresh;
    let Line { start, end } = *line;

    [
        Point::new(start.x, start.y * down),
        Point::new(end.x, end.y * down),
        Point::new(end.x, end.y * up),
        Point::new(start.x, start.y * up),
    ]
}

/// Whether `(x, y)` lies inside the crossing corridor of `line`
pub fn crossing_corridor(x: f64, y: f64, line: &Line, thresh: f64) -> bool {
    point_in_polygon(x, y, &corridor_polygon(line, thresh))
}
