//! Crossing Counter
//!
//! Counts tracked objects crossing a single line, once per persistent id,
//! tallied by resolved class.

mod counter;

pub use counter::{Counter, CounterSnapshot, COUNTING_LINE_THRESHOLD};

/// Persistent object identifier assigned by the tracker
pub type ObjectId = u64;
