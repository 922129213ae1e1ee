//! The fixed operator library.
//!
//! Each [`Operator`] is identified by a single-character tag:
//!
//! | tag | operator   | arity |
//! |-----|------------|-------|
//! | `I` | identity   | 1     |
//! | `e` | exp        | 1     |
//! | `l` | log        | 1     |
//! | `\|`| abs        | 1     |
//! | `s` | sqrt       | 1     |
//! | `r` | reciprocal | 1     |
//! | `2` | square     | 1     |
//! | `+` | add        | 2     |
//! | `-` | subtract   | 2     |
//! | `*` | multiply   | 2     |
//! | `:` | divide     | 2     |
//!
//! An operator knows when it may be applied ([`Operator::check_unary`],
//! [`Operator::check_binary`]), how the sign/zero flags and the dimension of
//! its result follow from the operands ([`Operator::generate_unary`],
//! [`Operator::generate_binary`]), and how to render itself.
//!
//! The set of operators a graph may schedule is an explicit
//! [`OperatorTable`] handed to the graph at construction.

use std::fmt;

use crate::check::FNodeCheck;
use crate::dimension::Dimension;
use crate::error::{Error, Result};
use crate::node::FNode;
use crate::types::NodeId;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Operator {
    Ident,
    Exp,
    Log,
    Abs,
    Sqrt,
    Inv,
    Square,
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Ident,
        Operator::Exp,
        Operator::Log,
        Operator::Abs,
        Operator::Sqrt,
        Operator::Inv,
        Operator::Square,
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
    ];

    pub const ALL_UNARY: [Operator; 7] = [
        Operator::Ident,
        Operator::Exp,
        Operator::Log,
        Operator::Abs,
        Operator::Sqrt,
        Operator::Inv,
        Operator::Square,
    ];

    pub const ALL_BINARY: [Operator; 4] =
        [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

    pub fn tag(self) -> char {
        match self {
            Operator::Ident => 'I',
            Operator::Exp => 'e',
            Operator::Log => 'l',
            Operator::Abs => '|',
            Operator::Sqrt => 's',
            Operator::Inv => 'r',
            Operator::Square => '2',
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => ':',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        Operator::ALL.into_iter().find(|op| op.tag() == tag)
    }

    pub fn arity(self) -> usize {
        match self {
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => 2,
            _ => 1,
        }
    }

    /// Binding strength used to decide where parentheses are needed.
    pub fn priority(self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 0,
            Operator::Mul | Operator::Div => 1,
            _ => 2,
        }
    }

    /// Associative and commutative operators are flattened and reordered
    /// during canonicalization.
    pub fn commutes(self) -> bool {
        matches!(self, Operator::Add | Operator::Mul)
    }

    /// Bit of this operator in an [`FNode`]'s contained-operator mask.
    pub(crate) fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Renders the operator applied to already rendered arguments.
    pub fn format(self, args: &[String]) -> String {
        match self {
            Operator::Ident => args[0].clone(),
            Operator::Exp => format!("exp({})", args[0]),
            Operator::Log => format!("log({})", args[0]),
            Operator::Abs => format!("|{}|", args[0]),
            Operator::Sqrt => format!("sqrt({})", args[0]),
            Operator::Inv => format!("({})^-1", args[0]),
            Operator::Square => format!("({})^2", args[0]),
            Operator::Add => args.join("+"),
            Operator::Sub => format!("{}-{}", args[0], args[1]),
            Operator::Mul => args.join("*"),
            Operator::Div => format!("{}/{}", args[0], args[1]),
        }
    }

    /// Numeric value of the operator applied to `args`.
    pub fn evaluate(self, args: &[f64]) -> f64 {
        match self {
            Operator::Ident => args[0],
            Operator::Exp => args[0].exp(),
            Operator::Log => args[0].ln(),
            Operator::Abs => args[0].abs(),
            Operator::Sqrt => args[0].sqrt(),
            Operator::Inv => 1.0 / args[0],
            Operator::Square => args[0] * args[0],
            Operator::Add => args[0] + args[1],
            Operator::Sub => args[0] - args[1],
            Operator::Mul => args[0] * args[1],
            Operator::Div => args[0] / args[1],
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

// Validity and generation rules.
impl Operator {
    pub fn check_unary(self, a: &FNode) -> bool {
        match self {
            Operator::Ident => true,
            Operator::Exp => {
                a.dimension().is_dimensionless()
                    && !a.contains_operator(Operator::Exp)
                    && a.op() != Operator::Log
            }
            Operator::Log => {
                a.dimension().is_dimensionless()
                    && a.not_negative()
                    && a.not_zero()
                    && a.op() != Operator::Exp
                    && !a.contains_operator(Operator::Log)
            }
            Operator::Abs => a.may_be_negative(),
            Operator::Sqrt => a.not_negative() && a.op() != Operator::Square,
            Operator::Inv => a.not_zero() && a.op() != Operator::Inv,
            Operator::Square => a.op() != Operator::Sqrt,
            _ => panic!("Operator '{}' is not unary", self),
        }
    }

    pub fn check_binary(self, a: &FNode, b: &FNode) -> bool {
        match self {
            Operator::Add | Operator::Sub => a.dimension().matches(b.dimension(), true),
            Operator::Mul => true,
            Operator::Div => b.not_zero(),
            _ => panic!("Operator '{}' is not binary", self),
        }
    }

    /// Builds the node `self(a)` without checking its input.
    pub fn generate_unary(self, a_id: NodeId, a: &FNode) -> FNode {
        let (may_be_negative, may_be_zero, dimension) = match self {
            Operator::Ident => (a.may_be_negative(), a.may_be_zero(), a.dimension().clone()),
            Operator::Exp => (false, false, Dimension::dimensionless()),
            Operator::Log => (true, true, Dimension::dimensionless()),
            Operator::Abs => (false, a.may_be_zero(), a.dimension().clone()),
            Operator::Sqrt => (false, a.may_be_zero(), powered(a.dimension(), 0.5)),
            Operator::Inv => (a.may_be_negative(), false, powered(a.dimension(), -1.0)),
            Operator::Square => (false, a.may_be_zero(), powered(a.dimension(), 2.0)),
            _ => panic!("Operator '{}' is not unary", self),
        };
        FNode::derived(self, &[(a_id, a)], may_be_negative, may_be_zero, dimension)
    }

    /// Builds the node `self(a, b)` without checking its input.
    ///
    /// # Panics
    ///
    /// Panics if `+` or `-` is applied to operands of different dimensions.
    pub fn generate_binary(self, a_id: NodeId, a: &FNode, b_id: NodeId, b: &FNode) -> FNode {
        let (may_be_negative, may_be_zero, dimension) = match self {
            Operator::Add => {
                assert_additive(self, a, b);
                let neg = !(a.not_negative() && b.not_negative());
                let zero = !(!neg && (a.not_zero() || b.not_zero()));
                (neg, zero, a.dimension().clone())
            }
            Operator::Sub => {
                assert_additive(self, a, b);
                (true, true, a.dimension().clone())
            }
            Operator::Mul => {
                let neg = !(a.not_negative() && b.not_negative());
                let zero = !(!neg && (a.not_zero() || b.not_zero()));
                let mut dim = a.dimension().clone();
                dim.add(b.dimension());
                (neg, zero, dim)
            }
            Operator::Div => {
                let neg = !(a.not_negative() && b.not_negative());
                let mut dim = a.dimension().clone();
                dim.subtract(b.dimension());
                // a/b vanishes wherever a does
                (neg, a.may_be_zero(), dim)
            }
            _ => panic!("Operator '{}' is not binary", self),
        };
        FNode::derived(
            self,
            &[(a_id, a), (b_id, b)],
            may_be_negative,
            may_be_zero,
            dimension,
        )
    }

    /// Generates `self(a)` if the input is valid and the result passes `check`.
    pub fn generate_and_check_unary(
        self,
        a_id: NodeId,
        a: &FNode,
        check: &FNodeCheck,
    ) -> Option<FNode> {
        if !self.check_unary(a) {
            return None;
        }
        let node = self.generate_unary(a_id, a);
        check.check(&node).then_some(node)
    }

    /// Generates `self(a, b)` if the input is valid and the result passes `check`.
    pub fn generate_and_check_binary(
        self,
        a_id: NodeId,
        a: &FNode,
        b_id: NodeId,
        b: &FNode,
        check: &FNodeCheck,
    ) -> Option<FNode> {
        if !self.check_binary(a, b) {
            return None;
        }
        let node = self.generate_binary(a_id, a, b_id, b);
        check.check(&node).then_some(node)
    }
}

fn powered(dim: &Dimension, p: f64) -> Dimension {
    let mut dim = dim.clone();
    dim.raise_to_power(p);
    dim
}

fn assert_additive(op: Operator, a: &FNode, b: &FNode) {
    assert!(
        a.dimension().matches(b.dimension(), true),
        "Dimension mismatch in '{}': {} vs {}",
        op,
        a.dimension(),
        b.dimension()
    );
}

/// The operators available to a graph, split by arity.
///
/// Built once by the caller and handed to [`FGraph`][crate::graph::FGraph];
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorTable {
    unary: Vec<Operator>,
    binary: Vec<Operator>,
}

impl OperatorTable {
    /// All unary (`Iel|sr2`) and binary (`+-*:`) operators.
    pub fn standard() -> Self {
        Self {
            unary: Operator::ALL_UNARY.to_vec(),
            binary: Operator::ALL_BINARY.to_vec(),
        }
    }

    /// A table restricted to the given unary and binary tags.
    pub fn new(uops: &str, bops: &str) -> Result<Self> {
        let standard = Self::standard();
        let unary = uops
            .chars()
            .map(|c| standard.unary(c))
            .collect::<Result<Vec<_>>>()?;
        let binary = bops
            .chars()
            .map(|c| standard.binary(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { unary, binary })
    }

    /// Looks up a registered unary operator.
    pub fn unary(&self, tag: char) -> Result<Operator> {
        self.unary
            .iter()
            .copied()
            .find(|op| op.tag() == tag)
            .ok_or(Error::UnknownUnaryOperator(tag))
    }

    /// Looks up a registered binary operator.
    pub fn binary(&self, tag: char) -> Result<Operator> {
        self.binary
            .iter()
            .copied()
            .find(|op| op.tag() == tag)
            .ok_or(Error::UnknownBinaryOperator(tag))
    }

    pub fn unary_ops(&self) -> &[Operator] {
        &self.unary
    }
    pub fn binary_ops(&self) -> &[Operator] {
        &self.binary
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn root(name: &str, sign: &str, zero: &str, unit: &str) -> FNode {
        FNode::root(name, sign, zero, unit).unwrap()
    }

    const A: NodeId = NodeId::new(0);
    const B: NodeId = NodeId::new(1);

    #[test]
    fn test_tags_roundtrip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_tag(op.tag()), Some(op));
        }
        assert_eq!(Operator::from_tag('x'), None);
        assert!(Operator::ALL_UNARY.iter().all(|op| op.arity() == 1));
        assert!(Operator::ALL_BINARY.iter().all(|op| op.arity() == 2));
    }

    #[test]
    fn test_format() {
        let args = vec!["a".to_string(), "b".to_string()];
        assert_eq!(Operator::Exp.format(&args[..1]), "exp(a)");
        assert_eq!(Operator::Abs.format(&args[..1]), "|a|");
        assert_eq!(Operator::Add.format(&args), "a+b");
        assert_eq!(Operator::Div.format(&args), "a/b");
        assert_eq!(Operator::Mul.format(&args), "a*b");
    }

    #[test]
    fn test_evaluate() {
        assert_eq!(Operator::Square.evaluate(&[3.0]), 9.0);
        assert_eq!(Operator::Inv.evaluate(&[4.0]), 0.25);
        assert_eq!(Operator::Sqrt.evaluate(&[16.0]), 4.0);
        assert_eq!(Operator::Abs.evaluate(&[-2.0]), 2.0);
        assert_eq!(Operator::Sub.evaluate(&[2.0, 3.0]), -1.0);
        assert_eq!(Operator::Div.evaluate(&[3.0, 2.0]), 1.5);
        assert_eq!(Operator::Log.evaluate(&[1.0]), 0.0);
    }

    #[test]
    fn test_log_requires_positive_dimensionless() {
        let x = root("x", "+", "-0", "");
        let maybe_zero = root("y", "+", "+0", "");
        let signed = root("z", "+-", "-0", "");
        let metres = root("w", "+", "-0", "m");
        assert!(Operator::Log.check_unary(&x));
        assert!(!Operator::Log.check_unary(&maybe_zero));
        assert!(!Operator::Log.check_unary(&signed));
        assert!(!Operator::Log.check_unary(&metres));
    }

    #[test]
    fn test_exp_log_chains() {
        let x = root("x", "+", "-0", "");
        let log_x = Operator::Log.generate_unary(A, &x);
        assert!(!Operator::Exp.check_unary(&log_x));
        let exp_x = Operator::Exp.generate_unary(A, &x);
        assert!(!Operator::Log.check_unary(&exp_x));
        assert!(!Operator::Exp.check_unary(&exp_x));
    }

    #[test]
    fn test_power_chains() {
        let x = root("x", "+", "-0", "m");
        let sq = Operator::Square.generate_unary(A, &x);
        let rt = Operator::Sqrt.generate_unary(A, &x);
        let inv = Operator::Inv.generate_unary(A, &x);
        assert!(!Operator::Sqrt.check_unary(&sq));
        assert!(!Operator::Square.check_unary(&rt));
        assert!(!Operator::Inv.check_unary(&inv));
        assert!(Operator::Square.check_unary(&inv));
        assert_eq!(sq.dimension().get("m"), Some(2.0));
        assert_eq!(rt.dimension().get("m"), Some(0.5));
        assert_eq!(inv.dimension().get("m"), Some(-1.0));
    }

    #[test]
    fn test_abs_requires_signed() {
        let pos = root("x", "+", "+0", "");
        let signed = root("y", "+-", "+0", "");
        assert!(!Operator::Abs.check_unary(&pos));
        assert!(Operator::Abs.check_unary(&signed));
        let abs = Operator::Abs.generate_unary(B, &signed);
        assert!(abs.not_negative());
        assert!(abs.may_be_zero());
    }

    #[test]
    fn test_binary_flags() {
        let a = root("a", "+", "-0", "m");
        let b = root("b", "+", "+0", "m");
        let c = root("c", "+-", "-0", "s");

        let sum = Operator::Add.generate_binary(A, &a, B, &b);
        assert!(sum.not_negative());
        assert!(sum.not_zero());
        assert_eq!(sum.generation(), 1);

        let diff = Operator::Sub.generate_binary(A, &a, B, &b);
        assert!(diff.may_be_negative());
        assert!(diff.may_be_zero());

        let prod = Operator::Mul.generate_binary(A, &a, B, &c);
        assert!(prod.may_be_negative());
        assert!(prod.may_be_zero());
        assert_eq!(prod.dimension().to_string(), "m^1*s^1");

        let quot = Operator::Div.generate_binary(A, &a, B, &c);
        assert!(quot.not_zero());
        assert_eq!(quot.dimension().to_string(), "m^1*s^-1");
    }

    #[test]
    fn test_quotient_zero_follows_numerator() {
        let z = root("z", "+", "+0", "");
        let b = root("b", "+", "-0", "");
        let quot = Operator::Div.generate_binary(A, &z, B, &b);
        assert!(quot.may_be_zero());
        assert!(quot.not_negative());
        assert!(!Operator::Log.check_unary(&quot));
        assert!(!Operator::Inv.check_unary(&quot));
        assert!(!Operator::Div.check_binary(&b, &quot));
        assert!(Operator::Sqrt.check_unary(&quot));

        let inverse = Operator::Div.generate_binary(B, &b, A, &z);
        assert!(inverse.not_zero());
    }

    #[test]
    fn test_additive_dimension_check() {
        let a = root("a", "+", "-0", "m");
        let b = root("b", "+", "-0", "s");
        assert!(!Operator::Add.check_binary(&a, &b));
        assert!(!Operator::Sub.check_binary(&a, &b));
        assert!(Operator::Mul.check_binary(&a, &b));
    }

    #[test]
    #[should_panic(expected = "Dimension mismatch")]
    fn test_additive_dimension_mismatch_panics() {
        let a = root("a", "+", "-0", "m");
        let b = root("b", "+", "-0", "s");
        Operator::Add.generate_binary(A, &a, B, &b);
    }

    #[test]
    fn test_div_requires_nonzero_divisor() {
        let a = root("a", "+", "+0", "");
        let b = root("b", "+", "-0", "");
        assert!(Operator::Div.check_binary(&a, &b));
        assert!(!Operator::Div.check_binary(&b, &a));
    }

    #[test]
    fn test_generate_and_check_band() {
        let check = FNodeCheck::new(0.25, 4.0);
        let x = root("x", "+", "-0", "m^2");
        let sq = Operator::Square
            .generate_and_check_unary(A, &x, &check)
            .unwrap();
        assert_eq!(sq.dimension().get("m"), Some(4.0));
        assert!(Operator::Square
            .generate_and_check_unary(A, &sq, &check)
            .is_none());
        // Input check fails before anything is generated.
        assert!(Operator::Sqrt
            .generate_and_check_unary(A, &sq, &check)
            .is_none());
    }

    #[test]
    fn test_table() {
        let table = OperatorTable::standard();
        assert_eq!(table.unary('s'), Ok(Operator::Sqrt));
        assert_eq!(table.binary(':'), Ok(Operator::Div));
        assert_eq!(table.unary('+'), Err(Error::UnknownUnaryOperator('+')));
        assert_eq!(table.binary('e'), Err(Error::UnknownBinaryOperator('e')));

        let restricted = OperatorTable::new("s2", "*").unwrap();
        assert_eq!(restricted.unary_ops(), &[Operator::Sqrt, Operator::Square]);
        assert_eq!(restricted.binary('+'), Err(Error::UnknownBinaryOperator('+')));
        assert!(OperatorTable::new("q", "").is_err());
    }
}
