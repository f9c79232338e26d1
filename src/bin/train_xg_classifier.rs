use std::path::PathBuf;

use anyhow::{Context, Result};

use overgoals::classifier::{self, ClassifierConfig};
use overgoals::{cli, dataset, paths};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = cli::args();
    let dataset_path = cli::path_value(&args, "dataset")
        .unwrap_or_else(|| PathBuf::from("overgoals_dataset.csv"));
    let output = cli::path_value(&args, "output")
        .or_else(|| paths::default_models_dir().map(|dir| dir.join("overgoals_xg.json")))
        .context("unable to resolve classifier output path")?;
    let train_ratio = cli::parsed::<f64>(&args, "train-ratio")
        .unwrap_or(0.85)
        .clamp(0.60, 0.95);

    let defaults = ClassifierConfig::default();
    let cfg = ClassifierConfig {
        iterations: cli::parsed(&args, "iters").unwrap_or(defaults.iterations),
        learning_rate: cli::parsed(&args, "learning-rate").unwrap_or(defaults.learning_rate),
        l2: cli::parsed(&args, "l2").unwrap_or(defaults.l2),
    };

    println!("Loading dataset...");
    let rows = dataset::read_dataset_csv(&dataset_path)?;
    let rows: Vec<_> = rows
        .into_iter()
        .filter(|r| r.is_over_2_5.is_some())
        .collect();

    let (train_rows, test_rows) = dataset::chronological_split(&rows, train_ratio)?;
    println!(
        "Training on {} samples (test {})",
        train_rows.len(),
        test_rows.len()
    );

    let model = classifier::train(train_rows, cfg)?;
    let metrics = classifier::evaluate(&model, test_rows);
    println!(
        "Test accuracy: {:.3}, log loss: {:.3} ({} samples)",
        metrics.accuracy, metrics.log_loss, metrics.samples
    );

    model.save(&output)?;
    println!("Classifier saved to {}", output.display());
    Ok(())
}
