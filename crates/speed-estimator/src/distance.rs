//! Pairwise centroid distances

use ndarray::{Array2, ArrayView1};
use zone_geometry::Point;

/// Euclidean distance matrix, rows from `a`, columns from `b`
pub fn distance_matrix(a: &[Point], b: &[Point]) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i].distance(&b[j]))
}

/// Index and value of the first minimum of a row
pub fn first_min(row: ArrayView1<'_, f64>) -> Option<(usize, f64)> {
    row.iter().enumerate().fold(None, |best, (i, &v)| match best {
        Some((_, b)) if v >= b => best,
        _ => Some((i, v)),
    })
}
