//! Weighted, monotonic progress tracker.

/// Raw transport progress sent through the watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Bytes written so far.
    pub loaded: u64,
    /// Expected total bytes, 0 if unknown.
    pub total: u64,
    /// Monotonically increasing sequence number for change detection.
    pub seq: u64,
}

/// Tracks one Load attempt over a bundle's files.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_weight: f64,
    completed_weight: f64,
    last_reported: Option<f64>,
}

impl ProgressTracker {
    /// Create a tracker for files with the given weights.
    pub fn new(weights: &[f64]) -> Self {
        Self {
            total_weight: weights.iter().sum(),
            completed_weight: 0.0,
            last_reported: None,
        }
    }

    /// Mark a file of `weight` as available and return the value to report.
    pub fn complete_file(&mut self, weight: f64) -> Option<f64> {
        self.completed_weight += weight;
        self.advance(self.fraction(self.completed_weight))
    }

    /// Report partial progress on the file of `weight` currently in flight.
    ///
    /// Returns `None` when the transport does not know the file size or the
    /// value would not move progress forward.
    #[allow(clippy::cast_precision_loss)]
    pub fn partial(&mut self, weight: f64, update: ProgressUpdate) -> Option<f64> {
        if update.total == 0 {
            return None;
        }
        let file_fraction = (update.loaded as f64 / update.total as f64).min(1.0);
        self.advance(
            self.fraction(file_fraction.mul_add(weight, self.completed_weight)),
        )
    }

    fn fraction(&self, done: f64) -> f64 {
        if self.total_weight <= 0.0 {
            return 1.0;
        }
        (done / self.total_weight).clamp(0.0, 1.0)
    }

    fn advance(&mut self, value: f64) -> Option<f64> {
        match self.last_reported {
            Some(last) if value < last => None,
            _ => {
                self.last_reported = Some(value);
                Some(value)
            }
        }
    }
}
