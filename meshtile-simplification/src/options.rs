//! Decimator options

use serde::{Deserialize, Serialize};

/// Tuning for [`QuadricDecimator`](crate::QuadricDecimator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimatorOptions {
    /// Never collapse an edge touching a mesh boundary vertex. Default: false
    pub preserve_borders: bool,

    /// Stop once the live vertex count reaches this floor. 0 disables the
    /// floor. Default: 0
    pub max_vertex_count: usize,

    /// Exponent of the per-pass error threshold growth. Higher values
    /// collapse faster at the cost of quality. Default: 7.0
    pub aggressiveness: f64,

    /// Passes run on the growing threshold schedule. Later passes admit
    /// every remaining candidate and repeat until nothing collapses.
    /// Default: 100
    pub max_iteration_count: usize,

    /// Rebuild vertex/face adjacency every this many passes. Default: 5
    pub update_interval: usize,
}

impl Default for DecimatorOptions {
    fn default() -> Self {
        Self {
            preserve_borders: false,
            max_vertex_count: 0,
            aggressiveness: 7.0,
            max_iteration_count: 100,
            update_interval: 5,
        }
    }
}

impl DecimatorOptions {
    #[must_use]
    pub fn with_preserve_borders(mut self, preserve: bool) -> Self {
        self.preserve_borders = preserve;
        self
    }

    #[must_use]
    pub fn with_max_vertex_count(mut self, count: usize) -> Self {
        self.max_vertex_count = count;
        self
    }

    #[must_use]
    pub fn with_aggressiveness(mut self, aggressiveness: f64) -> Self {
        self.aggressiveness = aggressiveness;
        self
    }

    #[must_use]
    pub fn with_max_iteration_count(mut self, count: usize) -> Self {
        self.max_iteration_count = count;
        self
    }

    /// A zero interval is treated as 1.
    #[must_use]
    pub fn with_update_interval(mut self, interval: usize) -> Self {
        self.update_interval = interval.max(1);
        self
    }

    /// Error threshold for collapse pass `iteration`, in squared units of the
    /// mesh's bounding-box diagonal
    pub(crate) fn threshold(&self, iteration: usize) -> f64 {
        1e-9 * ((iteration + 3) as f64).powf(self.aggressiveness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DecimatorOptions::default();
        assert!(!options.preserve_borders);
        assert_eq!(options.max_vertex_count, 0);
        assert_eq!(options.max_iteration_count, 100);
    }

    #[test]
    fn test_threshold_grows() {
        let options = DecimatorOptions::default();
        assert!(options.threshold(0) < options.threshold(1));
        assert!((options.threshold(0) - 1e-9 * 3f64.powi(7)).abs() < 1e-15);
    }

    #[test]
    fn test_builders() {
        let options = DecimatorOptions::default()
            .with_preserve_borders(true)
            .with_max_vertex_count(64)
            .with_update_interval(0);
        assert!(options.preserve_borders);
        assert_eq!(options.max_vertex_count, 64);
        assert_eq!(options.update_interval, 1);
    }
}
