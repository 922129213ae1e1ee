//! Feature graph to DOT (Graphviz) conversion.
//!
//! # DOT Format
//!
//! The generated DOT output follows these conventions:
//! - **Root nodes** are rendered as rectangles at the top (source rank)
//! - **Derived nodes** are rendered as ellipses, grouped by their generation
//! - **Edges** point from operands to the node built from them:
//!   - Solid lines come from the first operand
//!   - Dashed lines come from the second operand of a binary node
//!
//! # Examples
//!
//! ```
//! use npfga_rs::graph::FGraph;
//!
//! let mut graph = FGraph::default();
//! graph.add_root_node("a", "+", "-0", "").unwrap();
//! graph.add_layer("s", "").unwrap();
//! graph.generate().unwrap();
//!
//! let dot = graph.to_dot().unwrap();
//! assert!(dot.contains("a^0.5"));
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::BTreeMap;

use crate::graph::FGraph;
use crate::types::NodeId;

/// Configuration options for DOT output generation.
///
/// # Examples
///
/// ```
/// use npfga_rs::dot::DotConfig;
/// use npfga_rs::graph::FGraph;
///
/// let mut graph = FGraph::default();
/// graph.add_root_node("x", "+-", "+0", "m").unwrap();
/// let config = DotConfig {
///     node_shape: "box",
///     show_expressions: false,
///     ..DotConfig::default()
/// };
///
/// let dot = graph.to_dot_with_config(&config).unwrap();
/// assert!(dot.contains("\"x\""));
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for derived nodes (default: "ellipse")
    pub node_shape: &'static str,
    /// Shape for root nodes (default: "rect")
    pub root_shape: &'static str,
    /// Style for edges from the first operand (default: "solid")
    pub first_edge_style: &'static str,
    /// Style for edges from the second operand (default: "dashed")
    pub second_edge_style: &'static str,
    /// Label derived nodes with their canonical expression instead of the operator tag (default: true)
    pub show_expressions: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "ellipse",
            root_shape: "rect",
            first_edge_style: "solid",
            second_edge_style: "dashed",
            show_expressions: true,
        }
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

impl FGraph {
    /// Converts the feature graph to DOT (Graphviz) format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the feature graph to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        use std::fmt::Write as _;

        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        writeln!(dot, "{{ rank=source")?;
        for &root in self.roots() {
            writeln!(
                dot,
                "{} [shape={}, label=\"{}\"];",
                root.index(),
                config.root_shape,
                escape(self.expr(root))
            )?;
        }
        writeln!(dot, "}}")?;

        // Nodes of one generation share a rank
        let mut generations = BTreeMap::<u32, Vec<usize>>::new();
        for (id, node) in self.nodes() {
            if !node.is_root() {
                generations.entry(node.generation()).or_default().push(id.index());
            }
        }
        for ids in generations.values() {
            writeln!(dot, "{{ rank=same")?;
            for &i in ids.iter() {
                let id = NodeId::new(i as u32);
                let label = if config.show_expressions {
                    self.expr(id)
                } else {
                    self.tag(id)
                };
                writeln!(dot, "{} [label=\"{}\"];", i, escape(label))?;
            }
            writeln!(dot, "}}")?;
        }

        for (id, node) in self.nodes() {
            let styles = [config.first_edge_style, config.second_edge_style];
            for (operand, style) in node.operands().iter().zip(styles) {
                writeln!(dot, "{} -> {} [style={}];", operand.index(), id.index(), style)?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
