//! Trains a small multi layer perceptron on a fixed four example dataset
//! using the library provided by `scalar_grad`
//!
//! # Usage
//! Runnable via
//! ```sh
//! cargo run -- -h
//! RUST_LOG=info cargo run -- --seed 42 --plot
//! ```
//!
//! Supports a custom learning rate, number of generations and network shape.

use std::error::Error;

use scalar_grad::{
    nn::{MLP, Module},
    plot::plot_loss,
    trace::Trace,
    train::{TrainConfig, toy_dataset, train},
    values::Value,
};

use clap::Parser;

#[derive(Parser)]
struct Args {
    #[clap(short, long, default_value_t = 0.05)]
    lr: f64,
    #[clap(short, long, default_value_t = 100)]
    generations: usize,
    /// Outputs of each layer, comma separated
    #[clap(long, value_delimiter = ',', default_value = "4,4,1")]
    layers: Vec<usize>,
    /// Seed for the initial weights, random when not set
    #[clap(short, long)]
    seed: Option<u64>,
    #[clap(short, long, default_value_t = 10)]
    print_every: usize,
    #[clap(short, long, default_value_t = format!("output"))]
    output_dir: String,
    /// Save a plot of the loss of each generation
    #[clap(long, default_value_t = false)]
    plot: bool,
    /// Log the computation graph of the trained network on the first example
    #[clap(long, default_value_t = false)]
    trace: bool,
}

impl From<&Args> for TrainConfig {
    fn from(args: &Args) -> Self {
        Self {
            lr: args.lr,
            generations: args.generations,
            layer_sizes: args.layers.clone(),
            seed: args.seed,
            print_every: args.print_every,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = TrainConfig::from(&args);
    let (xs, ys) = toy_dataset();
    let n_inputs = xs[0].len();

    let model = match config.seed {
        Some(seed) => MLP::from_seed(n_inputs, &config.layer_sizes, seed)?,
        None => MLP::new(n_inputs, &config.layer_sizes)?,
    };
    log::info!(
        "training {} parameters for {} generations at lr {}",
        model.parameters().len(),
        config.generations,
        config.lr
    );

    let history = train(&model, &xs, &ys, &config)?;
    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        log::info!("loss went from {:.4} to {:.4}", first, last);
    }

    for (x, y) in xs.iter().zip(ys.iter()) {
        let input = x.iter().map(|v| Value::new(*v)).collect::<Vec<_>>();
        let pred = model
            .forward(&input)?
            .iter()
            .map(|v| v.data())
            .collect::<Vec<_>>();
        log::info!("input: {:?}, target: {}, prediction: {:?}", x, y, pred);
    }

    if args.trace {
        let input = xs[0].iter().map(|v| Value::new(*v)).collect::<Vec<_>>();
        let outputs = model.forward(&input)?;
        let out = outputs.iter().cloned().sum::<Value>().with_label("out");
        out.backward();
        let graph = Trace::from_value(&out).graph();
        log::info!(
            "computation graph: {} nodes, {} edges",
            graph.nodes.len(),
            graph.edges.len()
        );
        for node in graph.nodes.iter() {
            log::debug!("{} {:?} {}", node.key, node.kind, node.label);
        }
    }

    if args.plot {
        std::fs::create_dir_all(&args.output_dir)?;
        plot_loss(&history, &format!("{}/loss.png", args.output_dir))?;
    }
    Ok(())
}
