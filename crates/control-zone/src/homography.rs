//! Planar homography estimation
//!
//! Normalised direct linear transform with `h33 = 1`. Four correspondences
//! give an exact solve; more correspondences go through a deterministic
//! consensus search over every 4-point sample, followed by a least-squares
//! refit on the inliers of the best sample.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use tracing::debug;
use zone_geometry::Point;

use crate::ZoneError;

/// Reprojection threshold (pixels) separating inliers from outliers
pub const DEFAULT_REPROJECTION_THRESHOLD: f64 = 5.0;

/// Relative tolerance for the collinearity test
const COLLINEAR_EPS: f64 = 1e-9;

/// 3x3 planar projective transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    /// Wrap an existing matrix
    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    /// Underlying matrix
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Estimate the transform mapping `src[i]` onto `dst[i]`
    pub fn find(src: &[Point], dst: &[Point], threshold: f64) -> Result<Self, ZoneError> {
        if src.len() != dst.len() {
            return Err(ZoneError::CorrespondenceMismatch {
                src: src.len(),
                dst: dst.len(),
            });
        }
        if src.len() < 4 {
            return Err(ZoneError::InsufficientPoints(src.len()));
        }

        if src.len() == 4 {
            check_not_degenerate(src, "source")?;
            check_not_degenerate(dst, "target")?;
            return solve(src, dst);
        }

        Self::find_robust(src, dst, threshold)
    }

    fn find_robust(src: &[Point], dst: &[Point], threshold: f64) -> Result<Self, ZoneError> {
        let n = src.len();
        let mut best: Option<(Homography, Vec<usize>)> = None;

        for a in 0..n {
            for b in (a + 1)..n {
                for c in (b + 1)..n {
                    for d in (c + 1)..n {
                        let idx = [a, b, c, d];
                        let s: Vec<Point> = idx.iter().map(|&i| src[i]).collect();
                        let t: Vec<Point> = idx.iter().map(|&i| dst[i]).collect();
                        if is_degenerate(&s) || is_degenerate(&t) {
                            continue;
                        }
                        let Ok(model) = solve(&s, &t) else {
                            continue;
                        };

                        let inliers: Vec<usize> = (0..n)
                            .filter(|&i| {
                                model
                                    .project(&src[i])
                                    .map(|p| p.distance(&dst[i]) < threshold)
                                    .unwrap_or(false)
                            })
                            .collect();

                        let better = match &best {
                            Some((_, current)) => inliers.len() > current.len(),
                            None => true,
                        };
                        if better {
                            best = Some((model, inliers));
                        }
                    }
                }
            }
        }

        let (model, inliers) = best.ok_or_else(|| {
            ZoneError::Degenerate("no 4-point sample yields a valid transform".into())
        })?;
        debug!("Homography consensus: {}/{} inliers", inliers.len(), n);

        if inliers.len() <= 4 {
            return Ok(model);
        }

        let s: Vec<Point> = inliers.iter().map(|&i| src[i]).collect();
        let t: Vec<Point> = inliers.iter().map(|&i| dst[i]).collect();
        Ok(solve(&s, &t).unwrap_or(model))
    }

    /// Map a point through the transform.
    ///
    /// Returns `None` when the point lies on the vanishing line.
    pub fn project(&self, p: &Point) -> Option<Point> {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        if v.z.abs() < f64::EPSILON {
            return None;
        }
        let out = Point::new(v.x / v.z, v.y / v.z);
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }

    /// Largest distance between `project(src[i])` and `dst[i]`
    pub fn max_reprojection_error(&self, src: &[Point], dst: &[Point]) -> f64 {
        src.iter()
            .zip(dst)
            .map(|(s, d)| {
                self.project(s)
                    .map(|p| p.distance(d))
                    .unwrap_or(f64::INFINITY)
            })
            .fold(0.0, f64::max)
    }
}

/// Least-squares DLT in normalised coordinates
fn solve(src: &[Point], dst: &[Point]) -> Result<Homography, ZoneError> {
    let t_src = normalisation(src)?;
    let t_dst = normalisation(dst)?;

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 8);
    let mut b = DVector::<f64>::zeros(2 * n);

    for (i, (s, d)) in src.iter().zip(dst).enumerate() {
        let s = apply(&t_src, s);
        let d = apply(&t_dst, d);
        let r = 2 * i;

        a[(r, 0)] = s.x;
        a[(r, 1)] = s.y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -d.x * s.x;
        a[(r, 7)] = -d.x * s.y;
        b[r] = d.x;

        a[(r + 1, 3)] = s.x;
        a[(r + 1, 4)] = s.y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -d.y * s.x;
        a[(r + 1, 7)] = -d.y * s.y;
        b[r + 1] = d.y;
    }

    let h = if n == 4 {
        a.lu().solve(&b)
    } else {
        let at = a.transpose();
        (&at * &a).lu().solve(&(&at * &b))
    }
    .ok_or_else(|| ZoneError::Degenerate("singular correspondence system".into()))?;

    let normalised = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| ZoneError::Degenerate("target normalisation is not invertible".into()))?;

    let mut matrix = t_dst_inv * normalised * t_src;
    let scale = matrix[(2, 2)];
    if scale.abs() > f64::EPSILON {
        matrix /= scale;
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(ZoneError::Degenerate("transform has non-finite entries".into()));
    }

    Ok(Homography::from_matrix(matrix))
}

/// Similarity moving the centroid to the origin with mean distance sqrt(2)
fn normalisation(points: &[Point]) -> Result<Matrix3<f64>, ZoneError> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let centroid = Point::new(cx, cy);
    let mean_dist = points.iter().map(|p| p.distance(&centroid)).sum::<f64>() / n;

    if !mean_dist.is_finite() || mean_dist < f64::EPSILON {
        return Err(ZoneError::Degenerate("points are coincident".into()));
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    Ok(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

fn apply(t: &Matrix3<f64>, p: &Point) -> Point {
    let v = t * Vector3::new(p.x, p.y, 1.0);
    Point::new(v.x / v.z, v.y / v.z)
}

fn check_not_degenerate(points: &[Point], which: &str) -> Result<(), ZoneError> {
    if is_degenerate(points) {
        return Err(ZoneError::Degenerate(format!(
            "three or more {} points are collinear",
            which
        )));
    }
    Ok(())
}

/// True when any three points are (nearly) collinear
fn is_degenerate(points: &[Point]) -> bool {
    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let extent = (max_x - min_x).powi(2) + (max_y - min_y).powi(2);
    if extent < f64::EPSILON {
        return true;
    }

    let n = points.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let (a, b, c) = (points[i], points[j], points[k]);
                let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
                if cross.abs() <= COLLINEAR_EPS * extent {
                    return true;
                }
            }
        }
    }
    false
}
