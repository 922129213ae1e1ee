use std::sync::OnceLock;

use crate::dimension::Dimension;
use crate::error::Result;
use crate::instruction::Instruction;
use crate::operator::Operator;
use crate::storage::Storage;
use crate::types::{parse_sign_spec, parse_zero_spec, NodeId};

/// One feature in the generation pool.
///
/// Operands are referenced by [`NodeId`] into the graph's [`Storage`]; a
/// node is always created after its operands, so ids also give a
/// topological order.
#[derive(Debug, Clone)]
pub struct FNode {
    op: Operator,
    operands: Vec<NodeId>,
    name: Option<String>,
    dimension: Dimension,
    may_be_negative: bool,
    may_be_zero: bool,
    generation: u32,
    prefactor: f64,
    /// Operators used anywhere in this node's expression.
    contained: u16,
    tag: OnceLock<String>,
    instruction: OnceLock<Instruction>,
}

impl FNode {
    /// Creates a root node from its declaration.
    pub fn root(name: &str, sign: &str, zero: &str, unit: &str) -> Result<Self> {
        let may_be_negative = parse_sign_spec(sign)?;
        let may_be_zero = parse_zero_spec(zero)?;
        let dimension = unit.parse::<Dimension>()?;
        Ok(Self {
            op: Operator::Ident,
            operands: Vec::new(),
            name: Some(name.to_string()),
            dimension,
            may_be_negative,
            may_be_zero,
            generation: 0,
            prefactor: 1.0,
            contained: Operator::Ident.bit(),
            tag: OnceLock::new(),
            instruction: OnceLock::new(),
        })
    }

    /// Creates the node `op(operands)` with the given derived metadata.
    pub(crate) fn derived(
        op: Operator,
        operands: &[(NodeId, &FNode)],
        may_be_negative: bool,
        may_be_zero: bool,
        dimension: Dimension,
    ) -> Self {
        assert_eq!(
            operands.len(),
            op.arity(),
            "Invalid number of operands for '{}'",
            op
        );
        let generation = 1 + operands
            .iter()
            .map(|(_, node)| node.generation)
            .max()
            .unwrap_or(0);
        let contained = operands
            .iter()
            .fold(op.bit(), |mask, (_, node)| mask | node.contained);
        Self {
            op,
            operands: operands.iter().map(|&(id, _)| id).collect(),
            name: None,
            dimension,
            may_be_negative,
            may_be_zero,
            generation,
            prefactor: 1.0,
            contained,
            tag: OnceLock::new(),
            instruction: OnceLock::new(),
        }
    }

    pub fn op(&self) -> Operator {
        self.op
    }
    pub fn operands(&self) -> &[NodeId] {
        &self.operands
    }
    /// Name of a root node.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    pub fn is_root(&self) -> bool {
        self.operands.is_empty()
    }
    pub fn dimension(&self) -> &Dimension {
        &self.dimension
    }
    pub fn generation(&self) -> u32 {
        self.generation
    }
    pub fn prefactor(&self) -> f64 {
        self.prefactor
    }

    pub fn may_be_negative(&self) -> bool {
        self.may_be_negative
    }
    pub fn may_be_zero(&self) -> bool {
        self.may_be_zero
    }
    pub fn not_negative(&self) -> bool {
        !self.may_be_negative
    }
    pub fn not_zero(&self) -> bool {
        !self.may_be_zero
    }

    /// Checks whether `op` occurs in this node or any of its ancestors.
    pub fn contains_operator(&self, op: Operator) -> bool {
        self.contained & op.bit() != 0
    }

    /// Evaluates the node, given the values of all nodes created before it.
    ///
    /// Root nodes are not evaluated: their values are seeded from the input.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        let value = match self.operands[..] {
            [a] => self.op.evaluate(&[values[a.index()]]),
            [a, b] => self.op.evaluate(&[values[a.index()], values[b.index()]]),
            _ => panic!("Root node '{}' cannot be evaluated", self.name().unwrap_or("?")),
        };
        self.prefactor * value
    }

    /// Nested operator tag such as `*(a,s(b))`, cached on first use.
    pub fn calculate_tag(&self, storage: &Storage<FNode>) -> &str {
        self.tag.get_or_init(|| match &self.name {
            Some(name) => name.clone(),
            None => {
                let args: Vec<&str> = self
                    .operands
                    .iter()
                    .map(|&id| storage.value(id.index()).calculate_tag(storage))
                    .collect();
                format!("{}({})", self.op.tag(), args.join(","))
            }
        })
    }

    /// Canonical instruction of this node, built on first use.
    ///
    /// # Panics
    ///
    /// Panics if an operand's instruction has not been built yet.
    pub fn get_or_calculate_instruction(&self, storage: &Storage<FNode>) -> &Instruction {
        self.instruction.get_or_init(|| match &self.name {
            Some(name) => Instruction::leaf(name.as_str()),
            None => {
                let args = self
                    .operands
                    .iter()
                    .map(|&id| match storage.value(id.index()).instruction.get() {
                        Some(instr) => instr.clone(),
                        None => panic!(
                            "Missing instruction for operand {}: instructions must be built bottom-up",
                            id
                        ),
                    })
                    .collect();
                Instruction::compose(self.op, args)
            }
        })
    }

    /// Renumbers the operand ids after the pool has been reordered.
    pub(crate) fn remap_operands(&mut self, f: impl Fn(NodeId) -> NodeId) {
        for id in self.operands.iter_mut() {
            *id = f(*id);
        }
    }

    /// Cached canonical instruction, if it was built already.
    pub fn instruction(&self) -> Option<&Instruction> {
        self.instruction.get()
    }
}
