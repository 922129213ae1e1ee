//! Feature generation from the command line.
//!
//! Declares root variables, expands them through operator layers and
//! evaluates every generated feature on random positive inputs.
//!
//! Run with:
//! ```bash
//! cargo run --example features -- \
//!     --root x,+,-0,m --root t,+,-0,s --root c,+-,+0, \
//!     --layer sr2/*: --layer /+-
//! ```

use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use log::info;
use nalgebra::DMatrix;
use npfga_rs::config::GraphConfig;
use npfga_rs::graph::FGraph;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Parser)]
#[command(author, version, about = "Generate physical features from root variables")]
struct Cli {
    /// Root variable as `name,sign,zero,unit`, e.g. `x,+-,-0,m*s^-1`
    #[arg(long = "root", required = true)]
    roots: Vec<String>,

    /// Operator layer as `unary/binary`, e.g. `elsr2/+-*:`
    #[arg(long = "layer")]
    layers: Vec<String>,

    /// Number of random input rows to evaluate
    #[arg(long, default_value = "4")]
    rows: usize,

    /// Smallest allowed magnitude of a unit exponent
    #[arg(long, default_value = "0.25")]
    min_power: f64,

    /// Largest allowed magnitude of a unit exponent
    #[arg(long, default_value = "4.0")]
    max_power: f64,

    /// Print the graph in DOT format instead of evaluating it
    #[arg(long)]
    dot: bool,

    /// Random seed for the inputs
    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let cli = Cli::parse();

    let config = GraphConfig {
        min_power: cli.min_power,
        max_power: cli.max_power,
        ..GraphConfig::default()
    };
    let mut graph = FGraph::with_config(config);

    for root in cli.roots.iter() {
        let parts: Vec<&str> = root.split(',').collect();
        let [name, sign, zero, unit] = parts[..] else {
            bail!("Root '{}' must have the form name,sign,zero,unit", root);
        };
        graph
            .add_root_node(name, sign, zero, unit)
            .wrap_err_with(|| format!("Invalid root '{}'", root))?;
    }
    for layer in cli.layers.iter() {
        let Some((uops, bops)) = layer.split_once('/') else {
            bail!("Layer '{}' must have the form unary/binary", layer);
        };
        graph
            .add_layer(uops, bops)
            .wrap_err_with(|| format!("Invalid layer '{}'", layer))?;
    }

    let start = Instant::now();
    graph.generate()?;
    info!("Generated {} features in {:?}", graph.len(), start.elapsed());

    if cli.dot {
        println!("{}", graph.to_dot()?);
        return Ok(());
    }

    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
    let input = DMatrix::from_fn(cli.rows, graph.roots().len(), |_, _| rng.random_range(0.5..2.0));
    let output = graph.apply(&input)?;

    println!("{:>6} {:>40} {:>24}  values", "id", "feature", "tag");
    println!("{}", "-".repeat(100));
    for (id, node) in graph.nodes() {
        let values: Vec<String> = output
            .column(id.index())
            .iter()
            .map(|value| format!("{:.4}", value))
            .collect();
        println!(
            "{:>6} {:>40} {:>24}  [{}]  ({})",
            id,
            graph.expr(id),
            graph.tag(id),
            values.join(", "),
            node.dimension()
        );
    }

    Ok(())
}
