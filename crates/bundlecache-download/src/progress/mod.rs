//! Bundle progress aggregation.
//!
//! A bundle's progress is the weighted fraction of its files that are
//! available locally, plus the partial fraction of the file in flight.
//! Reported values never decrease within one Load attempt.

mod tracker;

pub use tracker::{ProgressTracker, ProgressUpdate};
