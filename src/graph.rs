//! The feature graph.
//!
//! [`FGraph`] owns the pool of retained feature nodes. It is configured with
//! root variables and a schedule of operator layers, expands the pool layer
//! by layer, and evaluates every retained feature on numeric input.
//!
//! # Generation
//!
//! Each layer first applies its unary operators to every retained node, then
//! applies its binary operators to every unordered pair `(i, j)`, `i < j`, of
//! the pool as it stands after the unary pass. Candidates are validated by
//! the operator, filtered by the dimension band of [`GraphConfig`], and
//! registered through [`FGraph::register_new_node`], which drops candidates
//! whose canonical form contains a constant or duplicates a retained node.
//!
//! After every layer the pool is kept in generation order (stable, so roots
//! stay first in declaration order). Since a node's generation exceeds those
//! of its operands, this order is topological.
//!
//! # Examples
//!
//! ```
//! use nalgebra::DMatrix;
//! use npfga_rs::graph::FGraph;
//!
//! let mut graph = FGraph::default();
//! graph.add_root_node("a", "+", "-0", "").unwrap();
//! graph.add_root_node("b", "+", "-0", "").unwrap();
//! graph.add_layer("", "+*").unwrap();
//! graph.generate().unwrap();
//!
//! assert_eq!(graph.labels(), vec!["a", "b", "a+b", "a*b"]);
//!
//! let input = DMatrix::from_row_slice(1, 2, &[2.0, 3.0]);
//! let output = graph.apply(&input).unwrap();
//! assert_eq!(output.row(0).iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0, 5.0, 6.0]);
//! ```

use std::collections::HashMap;
use std::fmt::{self, Debug};

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::check::FNodeCheck;
use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::node::FNode;
use crate::operator::{Operator, OperatorTable};
use crate::storage::Storage;
use crate::types::NodeId;

/// Operators applied in one generation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub unary: Vec<Operator>,
    pub binary: Vec<Operator>,
}

fn tags(ops: &[Operator]) -> String {
    ops.iter().map(|op| op.tag()).collect()
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unary ops = [{}] Binary ops = [{}]",
            tags(&self.unary),
            tags(&self.binary)
        )
    }
}

fn node_id(index: usize) -> NodeId {
    NodeId::new(index as u32)
}

pub struct FGraph {
    table: OperatorTable,
    config: GraphConfig,
    nodes: Storage<FNode>,
    roots: Vec<NodeId>,
    /// Canonical expression -> retained node.
    node_map: HashMap<String, NodeId>,
    layers: Vec<Layer>,
    generated: bool,
}

impl FGraph {
    pub fn new(table: OperatorTable, config: GraphConfig) -> Self {
        debug!("Creating FGraph with {:?}", config);
        Self {
            table,
            config,
            nodes: Storage::new(),
            roots: Vec::new(),
            node_map: HashMap::new(),
            layers: Vec::new(),
            generated: false,
        }
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self::new(OperatorTable::standard(), config)
    }
}

impl Default for FGraph {
    fn default() -> Self {
        Self::new(OperatorTable::standard(), GraphConfig::default())
    }
}

impl Debug for FGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FGraph")
            .field("roots", &self.roots.len())
            .field("layers", &self.layers.len())
            .field("nodes", &self.nodes.size())
            .field("generated", &self.generated)
            .finish()
    }
}

// Configuration
impl FGraph {
    pub fn table(&self) -> &OperatorTable {
        &self.table
    }
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Declares a root variable.
    ///
    /// `sign` is `"+-"` (may be negative) or `"+"`, `zero` is `"+0"` (may be
    /// zero) or `"-0"`, and `unit` is a [`Dimension`][crate::dimension::Dimension]
    /// string such as `"m^2*s^-1"`.
    pub fn add_root_node(&mut self, name: &str, sign: &str, zero: &str, unit: &str) -> Result<NodeId> {
        if self.generated {
            return Err(Error::AlreadyGenerated);
        }
        let node = FNode::root(name, sign, zero, unit)?;
        debug!(
            "Created root node '{}': units {}, may be negative: {}, may be zero: {}",
            name,
            node.dimension(),
            node.may_be_negative(),
            node.may_be_zero()
        );
        let id = self
            .register_new_node(node)
            .ok_or_else(|| Error::DuplicateRoot(name.to_string()))?;
        self.roots.push(id);
        Ok(id)
    }

    /// Appends a generation layer given as strings of operator tags,
    /// e.g. `add_layer("sr2", "*:")`.
    pub fn add_layer(&mut self, uops: &str, bops: &str) -> Result<()> {
        let unary = uops
            .chars()
            .map(|tag| self.table.unary(tag))
            .collect::<Result<Vec<_>>>()?;
        let binary = bops
            .chars()
            .map(|tag| self.table.binary(tag))
            .collect::<Result<Vec<_>>>()?;
        self.layers.push(Layer { unary, binary });
        Ok(())
    }
}

// Generation
impl FGraph {
    /// Expands the pool through every configured layer.
    pub fn generate(&mut self) -> Result<()> {
        if self.generated {
            return Err(Error::AlreadyGenerated);
        }
        self.generated = true;

        info!("Generating graph from {} root nodes", self.roots.len());
        let check = self.config.node_check();
        let layers = self.layers.clone();
        for (n, layer) in layers.iter().enumerate() {
            info!("Layer {}: {}", n + 1, layer);
            self.generate_layer(layer, &check);
            self.restore_generation_order();
            info!("Layer {} done.", n + 1);
        }
        info!("Have a total of {} nodes", self.nodes.size());
        Ok(())
    }

    fn generate_layer(&mut self, layer: &Layer, check: &FNodeCheck) {
        let mut new_nodes = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            for &op in layer.unary.iter() {
                if let Some(new_node) = op.generate_and_check_unary(node_id(i), node, check) {
                    new_nodes.push(new_node);
                }
            }
        }
        for new_node in new_nodes {
            self.register_new_node(new_node);
        }
        info!("{} nodes after unary layer", self.nodes.size());

        let mut new_nodes = Vec::new();
        let size = self.nodes.size();
        for &op in layer.binary.iter() {
            debug!("Operator {}", op);
            for i in 0..size {
                let a = self.nodes.value(i);
                for j in (i + 1)..size {
                    let b = self.nodes.value(j);
                    if let Some(new_node) =
                        op.generate_and_check_binary(node_id(i), a, node_id(j), b, check)
                    {
                        new_nodes.push(new_node);
                    }
                }
            }
        }
        for new_node in new_nodes {
            self.register_new_node(new_node);
        }
        info!("{} nodes after binary layer", self.nodes.size());
    }

    /// Registers a candidate node, unless its canonical form contains a
    /// constant or duplicates an already retained node.
    ///
    /// Returns the id of the retained node.
    pub fn register_new_node(&mut self, node: FNode) -> Option<NodeId> {
        let instruction = node.get_or_calculate_instruction(&self.nodes);
        let expr = instruction.stringify().to_string();
        let reason = if instruction.contains_constant() {
            Some("[const]")
        } else if self.node_map.contains_key(&expr) {
            Some("[dupli]")
        } else {
            None
        };
        debug!(
            "{:>10} {:>50} == {:<50}",
            reason.unwrap_or(""),
            node.calculate_tag(&self.nodes),
            expr
        );
        if reason.is_some() {
            return None;
        }

        let id = node_id(self.nodes.add(node));
        self.node_map.insert(expr, id);
        Some(id)
    }

    /// Stable-sorts the pool by generation and renumbers the node ids.
    ///
    /// Later layers take their `(i, j)` pairs in this order, so it also fixes
    /// the orientation of `-` and `:` nodes built from them.
    fn restore_generation_order(&mut self) {
        let mut order: Vec<usize> = (0..self.nodes.size()).collect();
        order.sort_by_key(|&i| self.nodes.value(i).generation());
        if order.iter().enumerate().all(|(new, &old)| new == old) {
            return;
        }
        debug!("Restoring generation order of {} nodes", order.len());

        let mut remap = vec![0; order.len()];
        for (new, &old) in order.iter().enumerate() {
            remap[old] = new;
        }
        let mut old_nodes: Vec<Option<FNode>> =
            std::mem::take(&mut self.nodes).into_vec().into_iter().map(Some).collect();
        let mut nodes = Storage::with_capacity(order.len());
        for &old in order.iter() {
            let Some(mut node) = old_nodes[old].take() else {
                panic!("Node {} moved twice while reordering", old);
            };
            node.remap_operands(|id| node_id(remap[id.index()]));
            nodes.add(node);
        }
        self.nodes = nodes;
        for id in self.node_map.values_mut() {
            *id = node_id(remap[id.index()]);
        }
        for id in self.roots.iter_mut() {
            *id = node_id(remap[id.index()]);
        }
    }
}

// Evaluation
impl FGraph {
    fn check_input(&self, input: &DMatrix<f64>) -> Result<()> {
        if input.ncols() != self.roots.len() {
            return Err(Error::InputShape {
                expected: self.roots.len(),
                found: input.ncols(),
            });
        }
        Ok(())
    }

    /// Values of the first `size` nodes for one input row.
    ///
    /// Nodes are evaluated in pool order, so every operand is ready before
    /// its dependents.
    fn evaluate_row(&self, input: &DMatrix<f64>, row: usize, size: usize) -> Vec<f64> {
        let size = size.max(self.roots.len());
        let mut values = vec![0.0; size];
        for (r, root) in self.roots.iter().enumerate() {
            values[root.index()] = input[(row, r)];
        }
        for f in self.roots.len()..size {
            let value = self.nodes.value(f).evaluate(&values);
            values[f] = value;
        }
        values
    }

    /// Evaluates every retained node on every input row.
    ///
    /// `input` has one column per root (declaration order); the output has
    /// one column per retained node (pool order) and the same rows. Root
    /// columns are copied from the input.
    pub fn apply(&self, input: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.check_input(input)?;
        let (n_rows, size) = (input.nrows(), self.nodes.size());
        debug!("Applying graph with {} nodes to {} rows", size, n_rows);

        let evaluate = |row: usize| self.evaluate_row(input, row, size);
        let rows: Vec<Vec<f64>> = if n_rows >= self.config.parallel_threshold {
            (0..n_rows).into_par_iter().map(evaluate).collect()
        } else {
            (0..n_rows).map(evaluate).collect()
        };
        Ok(DMatrix::from_fn(n_rows, size, |i, j| rows[i][j]))
    }

    /// Evaluates a single node on every input row.
    ///
    /// Only the part of the pool preceding `id` is evaluated.
    pub fn evaluate_single_node(&self, id: NodeId, input: &DMatrix<f64>) -> Result<DVector<f64>> {
        self.check_input(input)?;
        assert!(
            id.index() < self.nodes.size(),
            "Node {} is not in the graph",
            id
        );
        Ok(DVector::from_fn(input.nrows(), |row, _| {
            self.evaluate_row(input, row, id.index() + 1)[id.index()]
        }))
    }
}

// Introspection
impl FGraph {
    /// Number of retained nodes.
    pub fn len(&self) -> usize {
        self.nodes.size()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &FNode {
        self.nodes.value(id.index())
    }

    /// Retained nodes in pool order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &FNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node_id(i), node))
    }

    pub fn storage(&self) -> &Storage<FNode> {
        &self.nodes
    }

    /// Canonical expression of a retained node.
    pub fn expr(&self, id: NodeId) -> &str {
        self.node(id)
            .get_or_calculate_instruction(&self.nodes)
            .stringify()
    }

    /// Nested operator tag of a retained node, e.g. `*(a,s(b))`.
    pub fn tag(&self, id: NodeId) -> &str {
        self.node(id).calculate_tag(&self.nodes)
    }

    /// Retained node with the given canonical expression.
    pub fn find(&self, expr: &str) -> Option<NodeId> {
        self.node_map.get(expr).copied()
    }

    /// Canonical expressions of all retained nodes, i.e. the output columns
    /// of [`apply`](FGraph::apply).
    pub fn labels(&self) -> Vec<String> {
        self.nodes()
            .map(|(id, _)| self.expr(id).to_string())
            .collect()
    }
}
