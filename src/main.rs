//! Self-Training CLI
//!
//! Runs the full pseudo-labeling loop from a JSON configuration file and
//! writes the round history and final classifier state to an output
//! directory. Exits non-zero on any unrecovered error (bad configuration,
//! empty dataset, diverged training).

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use colored::Colorize;
use tracing::info;

use selftrain::classifier::LinearClassifier;
use selftrain::config::RunConfig;
use selftrain::dataset::IndexedCollection;
use selftrain::training::SelfTrainingLoop;
use selftrain::utils::logging::{init_logging, LogConfig};

/// Self-training (pseudo-labeling) for semi-supervised classification
#[derive(Parser, Debug)]
#[command(name = "selftrain")]
#[command(version)]
#[command(about = "Run a self-training loop from a configuration file", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    config: PathBuf,

    /// Directory for run artifacts (round history, classifier state)
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    println!(
        "{}",
        "Self-Training for Semi-Supervised Classification"
            .green()
            .bold()
    );
    println!();

    let config = RunConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;
    config.validate().context("invalid configuration")?;

    info!("Loaded configuration from {:?}", cli.config);
    info!(
        "  split fraction: {}, promotion batch: {}, max rounds: {}",
        config.train_split_fraction, config.promotion_batch_size, config.max_rounds
    );

    let (train_data, test_data) = config
        .dataset
        .generate()
        .context("failed to generate dataset")?;

    println!("{}", "Dataset:".cyan().bold());
    println!("  training universe: {} examples", train_data.len());
    println!("  test collection:   {} examples", test_data.len());
    println!(
        "  classes: {}, feature dim: {}",
        train_data.num_classes(),
        train_data.feature_dim()
    );
    println!();

    let classifier = LinearClassifier::new(
        train_data.feature_dim(),
        train_data.num_classes(),
        config.learning_rate,
        config.seed,
    );

    let run_dir = cli
        .output_dir
        .join(Local::now().format("run_%Y%m%d_%H%M%S").to_string());

    let pipeline = SelfTrainingLoop::new(config, train_data, test_data, classifier)
        .context("failed to initialize self-training loop")?;
    let outcome = pipeline.run().context("self-training loop failed")?;

    println!();
    println!("{}", "Round history:".cyan().bold());
    for record in &outcome.history {
        println!("  {}", record);
    }
    println!();
    println!("{}", "Final pools:".green().bold());
    println!(
        "  train pool: {} examples ({} pseudo-labeled)",
        outcome.train_pool.len(),
        outcome.train_pool.pseudo_labeled_count()
    );
    println!("  unlabeled pool: {} examples", outcome.unlabeled_pool.len());
    if let Some(last) = outcome.history.last() {
        println!("  final test accuracy: {:.2}%", last.test_accuracy * 100.0);
    }

    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create output directory {:?}", run_dir))?;

    let history_path = run_dir.join("round_history.json");
    let history_json = serde_json::to_string_pretty(&outcome.history)?;
    std::fs::write(&history_path, history_json)?;

    let model_path = run_dir.join("classifier.json");
    let model_json = serde_json::to_string_pretty(&outcome.classifier)?;
    std::fs::write(&model_path, model_json)?;

    info!("Round history written to {:?}", history_path);
    info!("Classifier state written to {:?}", model_path);
    println!();
    println!("Artifacts saved under {}", run_dir.display().to_string().yellow());

    Ok(())
}
