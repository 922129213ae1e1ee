//! Graph configuration.

use crate::check::FNodeCheck;

/// Configuration options for feature generation and evaluation.
///
/// Use `GraphConfig::default()` for the standard settings.
///
/// # Examples
///
/// ```
/// use npfga_rs::config::GraphConfig;
/// use npfga_rs::graph::FGraph;
///
/// let config = GraphConfig {
///     max_power: 3.0,
///     ..GraphConfig::default()
/// };
/// let graph = FGraph::with_config(config);
/// assert_eq!(graph.config().min_power, 0.25);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    /// Smallest allowed magnitude of a unit exponent (default: 0.25)
    pub min_power: f64,
    /// Largest allowed magnitude of a unit exponent (default: 4.0)
    pub max_power: f64,
    /// Number of input rows from which `apply` evaluates rows in parallel (default: 1024)
    pub parallel_threshold: usize,
}

impl GraphConfig {
    /// The dimension filter applied to every generated node.
    pub fn node_check(&self) -> FNodeCheck {
        FNodeCheck::new(self.min_power, self.max_power)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_power: 0.25,
            max_power: 4.0,
            parallel_threshold: 1024,
        }
    }
}
