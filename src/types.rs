//! Type-safe wrappers for node ids and root dispositions.
use std::fmt;

use crate::error::{Error, Result};

/// A node identifier (index into the graph's node pool).
///
/// Ids are assigned in registration order, so they double as output column
/// indices and as a topological order of the pool.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    /// Returns the raw value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the node index as a `usize` for array indexing.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl From<NodeId> for usize {
    fn from(id: NodeId) -> Self {
        id.index()
    }
}

/// Parses a sign spec: `"+-"` (may be negative) or `"+"` (never negative).
pub fn parse_sign_spec(spec: &str) -> Result<bool> {
    match spec {
        "+-" => Ok(true),
        "+" => Ok(false),
        _ => Err(Error::InvalidSignSpec(spec.to_string())),
    }
}

/// Parses a zero spec: `"+0"` (may be zero) or `"-0"` (never zero).
pub fn parse_zero_spec(spec: &str) -> Result<bool> {
    match spec {
        "+0" => Ok(true),
        "-0" => Ok(false),
        _ => Err(Error::InvalidZeroSpec(spec.to_string())),
    }
}
