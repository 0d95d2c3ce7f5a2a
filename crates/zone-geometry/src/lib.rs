//! Geometry Kernel
//!
//! Pixel-space primitives shared by control zones and counters:
//! - Point and two-point line value types
//! - Even-odd point-in-polygon test
//! - Line-crossing corridor test

mod point;
mod polygon;

pub use point::{Line, Point};
pub use polygon::{corridor_polygon, crossing_corridor, point_in_polygon};
