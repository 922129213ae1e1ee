//! Canonical instructions: normalized algebraic forms of feature expressions.
//!
//! An [`Instruction`] is a value-semantic expression tree in which
//!
//! - division is multiplication by a factor raised to the power `-1`,
//! - subtraction is addition of a term multiplied by `-1`,
//! - reciprocal, sqrt and square are power transforms (`-1`, `0.5`, `2`)
//!   applied to the operand itself,
//! - `+` and `*` are flattened (n-ary) and their arguments sorted,
//! - like factors of a product are merged by adding exponents, factors with
//!   a vanishing exponent are folded into the prefactor, and prefactors of
//!   factors are hoisted into the product,
//! - like terms of a sum are merged by adding prefactors,
//! - a product or sum with a single argument left collapses to that argument,
//!   and an empty one collapses to the constant `1`.
//!
//! Every instruction is built from canonical children, so one construction
//! pass yields a fixed point (see [`Instruction::renormalize`]).
//!
//! Two expressions that are equal under these rewrites render to the same
//! string ([`Instruction::stringify`]), which is the deduplication key of the
//! feature graph.
//!
//! # Examples
//!
//! ```
//! use npfga_rs::instruction::Instruction;
//! use npfga_rs::operator::Operator;
//!
//! let a = Instruction::leaf("a");
//! let b = Instruction::leaf("b");
//! let ab = Instruction::compose(Operator::Mul, vec![a.clone(), b.clone()]);
//! let ba = Instruction::compose(Operator::Mul, vec![b.clone(), a.clone()]);
//! assert_eq!(ab.stringify(), "a*b");
//! assert_eq!(ab, ba);
//!
//! let q = Instruction::compose(Operator::Div, vec![a.clone(), b]);
//! assert_eq!(q.stringify(), "a*b^-1");
//!
//! let one = Instruction::compose(Operator::Div, vec![a.clone(), a]);
//! assert!(one.contains_constant());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::operator::Operator;

/// Exponents and prefactors below this magnitude are treated as zero.
const EPS_ZERO: f64 = 1e-10;
/// Prefactors and powers this close to one are not rendered.
const EPS_IDENTITY: f64 = 1e-20;

#[derive(Debug, Clone, PartialEq)]
enum Head {
    Leaf(String),
    Constant,
    Op(Operator),
}

/// Canonical form of an expression: `prefactor * head(args)^power`.
#[derive(Debug, Clone)]
pub struct Instruction {
    head: Head,
    prefactor: f64,
    power: f64,
    args: Vec<Instruction>,
    expr: OnceLock<String>,
}

impl Instruction {
    fn new(head: Head, args: Vec<Instruction>) -> Self {
        Self {
            head,
            prefactor: 1.0,
            power: 1.0,
            args,
            expr: OnceLock::new(),
        }
    }

    /// A root variable.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(Head::Leaf(name.into()), Vec::new())
    }

    /// The constant `1`.
    pub fn constant() -> Self {
        Self::new(Head::Constant, Vec::new())
    }

    /// Canonical form of `op` applied to the canonical forms `args`.
    ///
    /// # Panics
    ///
    /// Panics if the number of arguments does not match the arity of `op`.
    pub fn compose(op: Operator, mut args: Vec<Instruction>) -> Self {
        assert_eq!(
            args.len(),
            op.arity(),
            "Invalid number of arguments for '{}'",
            op
        );

        let op = match op {
            Operator::Ident => return args.remove(0),
            Operator::Inv | Operator::Sqrt | Operator::Square => {
                let p = match op {
                    Operator::Inv => -1.0,
                    Operator::Sqrt => 0.5,
                    _ => 2.0,
                };
                let mut inner = args.remove(0);
                inner.raise_to_power(p);
                return inner;
            }
            Operator::Div => {
                args[1].raise_to_power(-1.0);
                Operator::Mul
            }
            Operator::Sub => {
                args[1].multiply_by(-1.0);
                Operator::Add
            }
            op => op,
        };
        Self::combine(op, args)
    }

    /// Applies `op` to any number of canonical arguments: sums and products
    /// are flattened and simplified, other operators wrap their arguments.
    fn combine(op: Operator, mut args: Vec<Instruction>) -> Self {
        let mut this = Self::new(Head::Op(op), Vec::new());
        if op.commutes() {
            args = this.flatten(op, args);
        }
        match op {
            Operator::Mul => this.simplify_product(args),
            Operator::Add => this.simplify_sum(args),
            _ => {
                this.args = args;
                this
            }
        }
    }

    /// Unpacks arguments that are themselves `op`,
    /// e.g. `*(*(a1,a2),+(b1,b2)) -> *(a1,a2,+(b1,b2))`.
    fn flatten(&mut self, op: Operator, args: Vec<Instruction>) -> Vec<Instruction> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            let nested = arg.head == Head::Op(op) && (arg.power - 1.0).abs() < EPS_ZERO;
            if !nested {
                out.push(arg);
                continue;
            }
            let factor = arg.prefactor;
            match op {
                Operator::Mul => {
                    self.prefactor *= factor;
                    out.extend(arg.args);
                }
                _ => out.extend(arg.args.into_iter().map(|mut sub| {
                    sub.multiply_by(factor);
                    sub
                })),
            }
        }
        out
    }

    fn simplify_product(mut self, args: Vec<Instruction>) -> Instruction {
        // Add exponents of matching bases
        let mut merged: Vec<Instruction> = Vec::with_capacity(args.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        for mut arg in args {
            self.prefactor *= arg.prefactor;
            arg.prefactor = 1.0;
            let base = arg.basename();
            match index.get(&base) {
                Some(&i) => {
                    merged[i].power += arg.power;
                    merged[i].invalidate();
                }
                None => {
                    arg.invalidate();
                    index.insert(base, merged.len());
                    merged.push(arg);
                }
            }
        }
        // b^0 == 1
        merged.retain(|arg| arg.power.abs() >= EPS_ZERO);

        match merged.len() {
            0 => {
                let mut one = Instruction::constant();
                one.multiply_by(self.prefactor);
                one
            }
            1 => {
                let mut single = merged.remove(0);
                single.multiply_by(self.prefactor);
                single
            }
            _ => {
                self.args = merged;
                self.sort_args();
                self
            }
        }
    }

    fn simplify_sum(mut self, args: Vec<Instruction>) -> Instruction {
        // Add prefactors of matching terms
        let mut merged: Vec<Instruction> = Vec::with_capacity(args.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        for arg in args {
            let body = arg.render(false);
            match index.get(&body) {
                Some(&i) => merged[i].multiply_to_sum(arg.prefactor),
                None => {
                    index.insert(body, merged.len());
                    merged.push(arg);
                }
            }
        }
        merged.retain(|arg| arg.prefactor.abs() >= EPS_ZERO);

        match merged.len() {
            0 => {
                let mut zero = Instruction::constant();
                zero.multiply_by(0.0);
                zero
            }
            1 => {
                let mut single = merged.remove(0);
                single.multiply_by(self.prefactor);
                single
            }
            _ => {
                self.args = merged;
                self.sort_args();
                self
            }
        }
    }

    fn multiply_to_sum(&mut self, prefactor: f64) {
        self.prefactor += prefactor;
        self.invalidate();
    }

    fn sort_args(&mut self) {
        self.args.sort_by(|a, b| a.stringify().cmp(b.stringify()));
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.expr.take();
    }

    /// Raises the instruction to the power `p`.
    ///
    /// Products distribute the power into their factors; everything else
    /// folds it into its own prefactor and power.
    pub fn raise_to_power(&mut self, p: f64) {
        if self.head == Head::Op(Operator::Mul) {
            for arg in self.args.iter_mut() {
                arg.raise_to_power(p);
            }
            self.prefactor = self.prefactor.powf(p);
            self.sort_args();
        } else {
            self.prefactor = self.prefactor.powf(p);
            self.power *= p;
        }
        self.invalidate();
    }

    pub fn multiply_by(&mut self, factor: f64) {
        self.prefactor *= factor;
        self.invalidate();
    }

    /// Checks whether the constant marker appears anywhere in the tree.
    pub fn contains_constant(&self) -> bool {
        self.head == Head::Constant || self.args.iter().any(|arg| arg.contains_constant())
    }

    pub fn is_constant(&self) -> bool {
        self.head == Head::Constant
    }

    /// The operator at the top, `None` for leaves and constants.
    pub fn op(&self) -> Option<Operator> {
        match self.head {
            Head::Op(op) => Some(op),
            _ => None,
        }
    }

    /// The variable name of a leaf.
    pub fn name(&self) -> Option<&str> {
        match &self.head {
            Head::Leaf(name) => Some(name),
            _ => None,
        }
    }

    pub fn prefactor(&self) -> f64 {
        self.prefactor
    }
    pub fn power(&self) -> f64 {
        self.power
    }
    pub fn args(&self) -> &[Instruction] {
        &self.args
    }

    fn priority(&self) -> u8 {
        match self.head {
            Head::Op(op) => op.priority(),
            _ => Operator::Ident.priority(),
        }
    }

    fn is_decorated(&self) -> bool {
        (self.prefactor - 1.0).abs() > EPS_IDENTITY || (self.power - 1.0).abs() > EPS_IDENTITY
    }

    /// Renders the head and arguments, ignoring this instruction's own
    /// prefactor and power.
    pub fn basename(&self) -> String {
        match &self.head {
            Head::Leaf(name) => name.clone(),
            Head::Constant => "1".to_string(),
            Head::Op(op) => {
                let argstrs: Vec<String> = self
                    .args
                    .iter()
                    .map(|arg| {
                        let s = arg.stringify();
                        if self.args.len() > 1
                            && op.priority() > arg.priority()
                            && !arg.is_decorated()
                        {
                            format!("({})", s)
                        } else {
                            s.to_string()
                        }
                    })
                    .collect();
                op.format(&argstrs)
            }
        }
    }

    fn render(&self, with_prefactor: bool) -> String {
        let base = self.basename();
        let pre = if with_prefactor && (self.prefactor - 1.0).abs() > EPS_IDENTITY {
            format!("{:+}*", self.prefactor)
        } else {
            String::new()
        };
        let pow = if (self.power - 1.0).abs() > EPS_IDENTITY {
            format!("^{}", self.power)
        } else {
            String::new()
        };
        if pre.is_empty() && pow.is_empty() {
            base
        } else if self.priority() >= Operator::Mul.priority() {
            format!("{}{}{}", pre, base, pow)
        } else {
            format!("{}({}){}", pre, base, pow)
        }
    }

    /// The canonical string of this instruction (memoized).
    pub fn stringify(&self) -> &str {
        self.expr.get_or_init(|| self.render(true))
    }

    /// Rebuilds the instruction bottom-up from its children.
    ///
    /// Since construction only ever combines canonical children, the result
    /// renders identically to `self`.
    pub fn renormalize(&self) -> Instruction {
        let op = match self.head {
            Head::Op(op) => op,
            _ => return self.clone(),
        };
        let args = self.args.iter().map(|arg| arg.renormalize()).collect();
        let mut out = Self::combine(op, args);
        if (self.power - 1.0).abs() > EPS_IDENTITY {
            out.raise_to_power(self.power);
        }
        if (self.prefactor - 1.0).abs() > EPS_IDENTITY {
            out.multiply_by(self.prefactor);
        }
        out
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.stringify() == other.stringify()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stringify())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn leaf(name: &str) -> Instruction {
        Instruction::leaf(name)
    }

    fn unary(op: Operator, a: &Instruction) -> Instruction {
        Instruction::compose(op, vec![a.clone()])
    }

    fn binary(op: Operator, a: &Instruction, b: &Instruction) -> Instruction {
        Instruction::compose(op, vec![a.clone(), b.clone()])
    }

    fn assert_fixed_point(instr: &Instruction) {
        assert_eq!(instr.renormalize().stringify(), instr.stringify());
    }

    #[test]
    fn test_leaf() {
        let a = leaf("a");
        assert_eq!(a.stringify(), "a");
        assert_eq!(a.name(), Some("a"));
        assert_eq!(a.op(), None);
        assert!(!a.contains_constant());
        assert_eq!(unary(Operator::Ident, &a), a);
    }

    #[test]
    fn test_commutative() {
        let (a, b, c) = (leaf("a"), leaf("b"), leaf("c"));
        assert_eq!(binary(Operator::Add, &a, &b).stringify(), "a+b");
        assert_eq!(binary(Operator::Add, &b, &a).stringify(), "a+b");
        let left = binary(Operator::Mul, &binary(Operator::Mul, &c, &a), &b);
        let right = binary(Operator::Mul, &a, &binary(Operator::Mul, &b, &c));
        assert_eq!(left.stringify(), "a*b*c");
        assert_eq!(left, right);
        assert_eq!(left.args().len(), 3);
    }

    #[test]
    fn test_division_and_subtraction() {
        let (a, b) = (leaf("a"), leaf("b"));
        assert_eq!(binary(Operator::Div, &a, &b).stringify(), "a*b^-1");
        assert_eq!(binary(Operator::Sub, &a, &b).stringify(), "-1*b+a");
        let inv = unary(Operator::Inv, &b);
        assert_eq!(binary(Operator::Mul, &a, &inv), binary(Operator::Div, &a, &b));
    }

    #[test]
    fn test_constants() {
        let (a, b) = (leaf("a"), leaf("b"));
        let one = binary(Operator::Div, &a, &a);
        assert!(one.is_constant());
        assert!(one.contains_constant());
        assert_eq!(one.stringify(), "1");

        let zero = binary(Operator::Sub, &a, &a);
        assert!(zero.contains_constant());

        let ab = binary(Operator::Mul, &a, &b);
        let nested = binary(Operator::Add, &binary(Operator::Div, &ab, &ab), &a);
        assert!(nested.contains_constant());
    }

    #[test]
    fn test_like_factors_merge() {
        let (a, b) = (leaf("a"), leaf("b"));
        let ba = binary(Operator::Div, &b, &a);
        assert_eq!(binary(Operator::Mul, &a, &ba).stringify(), "b");

        let sq = unary(Operator::Square, &a);
        assert_eq!(binary(Operator::Mul, &sq, &ba).stringify(), "a*b");
        assert_eq!(binary(Operator::Mul, &sq, &a).stringify(), "a^3");
    }

    #[test]
    fn test_like_terms_merge() {
        let (a, b, c) = (leaf("a"), leaf("b"), leaf("c"));
        let ab = binary(Operator::Add, &a, &b);
        assert_eq!(binary(Operator::Sub, &ab, &b).stringify(), "a");

        let bc = binary(Operator::Add, &b, &c);
        let diff = binary(Operator::Sub, &a, &bc);
        assert_eq!(diff.stringify(), "-1*b+-1*c+a");
        assert_ne!(diff, binary(Operator::Add, &a, &bc));
    }

    #[test]
    fn test_power_transforms() {
        let (a, b) = (leaf("a"), leaf("b"));
        let chain = unary(
            Operator::Square,
            &unary(Operator::Inv, &unary(Operator::Sqrt, &a)),
        );
        assert_eq!(chain.stringify(), "a^-1");
        assert_eq!(chain, unary(Operator::Inv, &a));

        let root_ab = unary(Operator::Sqrt, &binary(Operator::Mul, &a, &b));
        assert_eq!(root_ab.stringify(), "a^0.5*b^0.5");

        let back = unary(Operator::Square, &root_ab);
        assert_eq!(back.stringify(), "a*b");
    }

    #[test]
    fn test_parentheses() {
        let (a, b, c) = (leaf("a"), leaf("b"), leaf("c"));
        let ab = binary(Operator::Add, &a, &b);
        assert_eq!(binary(Operator::Mul, &ab, &c).stringify(), "(a+b)*c");
        assert_eq!(unary(Operator::Square, &ab).stringify(), "(a+b)^2");
        assert_eq!(unary(Operator::Sqrt, &ab).stringify(), "(a+b)^0.5");
        assert_eq!(unary(Operator::Exp, &ab).stringify(), "exp(a+b)");
        assert_eq!(unary(Operator::Abs, &ab).stringify(), "|a+b|");
        let bc = binary(Operator::Mul, &b, &c);
        assert_eq!(binary(Operator::Add, &a, &bc).stringify(), "a+b*c");
    }

    #[test]
    fn test_sum_powers_merge_in_products() {
        let (a, b) = (leaf("a"), leaf("b"));
        let ab = binary(Operator::Add, &a, &b);
        let sq = unary(Operator::Square, &ab);
        assert_eq!(binary(Operator::Div, &sq, &ab), ab);
    }

    #[test]
    fn test_prefactors_hoisted_from_factors() {
        let (a, z) = (leaf("a"), leaf("z"));
        let mut neg_z = z.clone();
        neg_z.multiply_by(-1.0);
        let mut neg_a = a.clone();
        neg_a.multiply_by(-1.0);

        let p1 = binary(Operator::Mul, &neg_z, &a);
        let p2 = binary(Operator::Mul, &z, &neg_a);
        assert_eq!(p1.stringify(), "-1*a*z");
        assert_eq!(p1, p2);

        let sq = unary(Operator::Square, &p1);
        let direct = binary(
            Operator::Mul,
            &unary(Operator::Square, &z),
            &unary(Operator::Square, &a),
        );
        assert_eq!(sq.stringify(), "a^2*z^2");
        assert_eq!(sq, direct);
    }

    #[test]
    fn test_renormalize_is_fixed_point() {
        let (a, b, c) = (leaf("a"), leaf("b"), leaf("c"));
        let ab = binary(Operator::Add, &a, &b);
        let samples = vec![
            a.clone(),
            binary(Operator::Sub, &a, &b),
            binary(Operator::Div, &ab, &c),
            unary(Operator::Sqrt, &binary(Operator::Mul, &ab, &c)),
            unary(Operator::Log, &unary(Operator::Inv, &ab)),
            binary(Operator::Sub, &c, &binary(Operator::Sub, &a, &b)),
            unary(Operator::Square, &binary(Operator::Sub, &a, &c)),
        ];
        for instr in &samples {
            assert_fixed_point(instr);
        }
    }

    #[test]
    fn test_renormalize_many_arguments() {
        let (a, b, c, d) = (leaf("a"), leaf("b"), leaf("c"), leaf("d"));
        let abc = binary(Operator::Mul, &binary(Operator::Mul, &a, &b), &c);
        let terms = binary(Operator::Sub, &c, &binary(Operator::Sub, &a, &b));
        assert_eq!(abc.args().len(), 3);
        assert_eq!(terms.stringify(), "-1*a+b+c");
        assert_eq!(terms.args().len(), 3);

        let chain = unary(
            Operator::Square,
            &unary(Operator::Inv, &unary(Operator::Sqrt, &d)),
        );
        let with_chain = binary(Operator::Mul, &abc, &chain);
        assert_eq!(with_chain.stringify(), "a*b*c*d^-1");

        let ab = binary(Operator::Add, &a, &b);
        let samples = vec![
            abc.clone(),
            terms.clone(),
            with_chain,
            binary(Operator::Mul, &terms, &abc),
            binary(Operator::Div, &terms, &unary(Operator::Square, &abc)),
            binary(Operator::Add, &terms, &binary(Operator::Mul, &ab, &d)),
            unary(Operator::Exp, &binary(Operator::Sub, &abc, &d)),
            unary(Operator::Square, &binary(Operator::Add, &terms, &d)),
        ];
        for instr in &samples {
            assert_fixed_point(instr);
        }
    }

    #[test]
    fn test_memoized_string_is_invalidated() {
        let mut a = leaf("a");
        assert_eq!(a.stringify(), "a");
        a.raise_to_power(2.0);
        assert_eq!(a.stringify(), "a^2");
        a.multiply_by(-1.0);
        assert_eq!(a.stringify(), "-1*a^2");
    }

    #[test]
    #[should_panic(expected = "Invalid number of arguments")]
    fn test_wrong_arity() {
        Instruction::compose(Operator::Add, vec![leaf("a")]);
    }
}
