use crate::node::FNode;

/// Post-generation filter on the dimension of a candidate node.
///
/// Every unit exponent of the node must have a magnitude within
/// `[min_power, max_power]` (bounds inclusive). Dimensionless nodes always
/// pass, since zero exponents are erased.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FNodeCheck {
    pub min_power: f64,
    pub max_power: f64,
}

impl FNodeCheck {
    pub fn new(min_power: f64, max_power: f64) -> Self {
        assert!(
            min_power <= max_power,
            "Invalid power band [{}, {}]",
            min_power,
            max_power
        );
        Self {
            min_power,
            max_power,
        }
    }

    pub fn check(&self, node: &FNode) -> bool {
        node.dimension().iter().all(|(_, power)| {
            let p = power.abs();
            p >= self.min_power && p <= self.max_power
        })
    }
}

impl Default for FNodeCheck {
    fn default() -> Self {
        Self::new(0.25, 4.0)
    }
}
