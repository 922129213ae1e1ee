//! # npfga-rs: Nonlinear Physical Feature Generation in Rust
//!
//! **`npfga-rs`** grows a pool of candidate features from a handful of physical
//! input variables by repeatedly applying unary and binary operators. Every
//! feature is tracked symbolically, so algebraically equivalent expressions are
//! recognized and kept only once, and physical units are propagated so that
//! dimensionally meaningless combinations are never generated.
//!
//! ## Key Features
//!
//! - **Graph-Centric Architecture**: All nodes live in the [`FGraph`][crate::graph::FGraph] pool and are
//!   referenced by lightweight [`NodeId`][crate::types::NodeId] handles.
//! - **Canonical Forms**: Each node carries an [`Instruction`][crate::instruction::Instruction] tree whose
//!   rendering is a canonical string. Equal strings mean equal features.
//! - **Unit Algebra**: [`Dimension`][crate::dimension::Dimension] tracks unit exponents through every operator.
//! - **Batch Evaluation**: Features are evaluated on `nalgebra` matrices, row-parallel for large inputs.
//!
//! ## Basic Usage
//!
//! ```rust
//! use nalgebra::DMatrix;
//! use npfga_rs::graph::FGraph;
//!
//! // 1. Declare the root variables: name, sign, zero, unit
//! let mut graph = FGraph::default();
//! graph.add_root_node("x", "+", "-0", "m").unwrap();
//! graph.add_root_node("t", "+", "-0", "s").unwrap();
//!
//! // 2. Schedule a layer: reciprocal and square, then division and product
//! graph.add_layer("r2", ":*").unwrap();
//!
//! // 3. Expand the pool
//! graph.generate().unwrap();
//! let velocity = graph.find("t^-1*x").unwrap();
//! assert_eq!(graph.node(velocity).dimension().to_string(), "m^1*s^-1");
//!
//! // 4. Evaluate: one column per root in, one column per feature out
//! let input = DMatrix::from_row_slice(1, 2, &[10.0, 2.0]);
//! let output = graph.apply(&input).unwrap();
//! assert_eq!(output[(0, velocity.index())], 5.0);
//! ```
//!
//! ## Core Components
//!
//! - **[`graph`]**: The [`FGraph`][crate::graph::FGraph] orchestrator: configuration, generation, evaluation.
//! - **[`operator`]**: The closed operator library and its validity rules.
//! - **[`instruction`]**: Canonical symbolic forms.
//! - **[`dot`]**: Visualizing feature graphs using Graphviz.

pub mod check;
pub mod config;
pub mod dimension;
pub mod dot;
pub mod error;
pub mod graph;
pub mod instruction;
pub mod node;
pub mod operator;
pub mod storage;
pub mod types;
