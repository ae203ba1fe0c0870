//! Ticket assignee trainer CLI
//!
//! Trains the assignee model from a CSV dataset and writes
//! `ticket_assigner.json` plus `ticket_assigner.hash` to the output directory.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ticket_assigner_core::ForestParams;
use ticket_assigner_trainer::{save_artifact, AssigneeTrainer, Dataset, TrainingParams};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "assigner-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the ticket assignee model", long_about = None)]
struct Args {
    /// Input CSV dataset (title, description, labels, assignee)
    #[arg(short, long, default_value = "data/issues_mock.csv")]
    input: PathBuf,

    /// Output directory for model and hash
    #[arg(short, long, default_value = "model")]
    output: PathBuf,

    /// Number of trees in the forest
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Seed for shuffling, bootstrap sampling and feature subsampling
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Share of rows held out for validation
    #[arg(long, default_value = "0.2")]
    test_fraction: f64,

    /// Maximum tree depth (unbounded when omitted)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples per leaf
    #[arg(long, default_value = "1")]
    min_samples_leaf: usize,

    /// Minimum samples required to split a node
    #[arg(long, default_value = "2")]
    min_samples_split: usize,

    /// Disable L2 normalization of feature vectors
    #[arg(long)]
    no_l2_norm: bool,

    /// Build trees on a single thread
    #[arg(long)]
    sequential: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Ticket Assignee Trainer v{}", env!("CARGO_PKG_VERSION"));

    info!("Loading dataset from: {}", args.input.display());
    let dataset = Dataset::from_csv(&args.input).context("Failed to load dataset")?;
    info!("Loaded {} training samples", dataset.len());

    let counts = dataset.label_counts();
    info!(
        "Target assignees: {}",
        counts.keys().cloned().collect::<Vec<_>>().join(", ")
    );
    for (assignee, count) in &counts {
        info!("  {}: {} rows", assignee, count);
    }

    let params = TrainingParams {
        forest: ForestParams {
            n_trees: args.trees,
            seed: args.seed,
            max_depth: args.max_depth,
            min_samples_split: args.min_samples_split,
            min_samples_leaf: args.min_samples_leaf,
            parallel: !args.sequential,
            ..ForestParams::default()
        },
        l2_normalize: !args.no_l2_norm,
        test_fraction: args.test_fraction,
        shuffle: true,
    };

    info!("Training configuration:");
    info!("  Trees: {}", params.forest.n_trees);
    info!("  Seed: {}", params.forest.seed);
    info!("  Test fraction: {}", params.test_fraction);
    match params.forest.max_depth {
        Some(depth) => info!("  Max depth: {}", depth),
        None => info!("  Max depth: unbounded"),
    }

    let report = AssigneeTrainer::new(params)
        .train(&dataset)
        .context("Training failed")?;

    info!(
        "Training complete: {} train / {} test samples, vocabulary size {}",
        report.training_samples,
        report.test_samples,
        report.pipeline.vocabulary_size()
    );
    match report.accuracy {
        Some(accuracy) => info!("Validation accuracy: {:.2}", accuracy),
        None => info!("Validation accuracy: n/a (no held-out rows)"),
    }

    let trained_at = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
    let artifact = report
        .to_artifact(trained_at)
        .context("Failed to package model")?;
    let saved = save_artifact(&artifact, &args.output).context("Failed to write model")?;

    info!("Model saved to {}", saved.model_path.display());
    info!("  Hash: {} ({})", saved.hash_path.display(), saved.model_hash);

    Ok(())
}
