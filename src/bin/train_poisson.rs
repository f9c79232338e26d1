use std::path::PathBuf;

use anyhow::{Context, Result};

use overgoals::goals_model::{self, TrainConfig};
use overgoals::{cli, dataset, paths, poisson};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = cli::args();
    let dataset_path = cli::path_value(&args, "dataset")
        .unwrap_or_else(|| PathBuf::from("overgoals_dataset.csv"));
    let output = cli::path_value(&args, "output")
        .or_else(|| paths::default_models_dir().map(|dir| dir.join("overgoals_poisson.json")))
        .context("unable to resolve model output path")?;

    let defaults = TrainConfig::default();
    let cfg = TrainConfig {
        iterations: cli::parsed(&args, "iters").unwrap_or(defaults.iterations),
        learning_rate: cli::parsed(&args, "learning-rate").unwrap_or(defaults.learning_rate),
        l2: cli::parsed(&args, "l2").unwrap_or(defaults.l2),
    };

    println!("Loading dataset...");
    let rows = dataset::read_dataset_csv(&dataset_path)?;
    let usable = rows.iter().filter(|r| r.total_goals.is_some()).count();
    println!("Training on {usable} samples");

    let model = goals_model::train(&rows, cfg)?;
    model.save(&output)?;
    println!("Model saved to {}", output.display());

    let lambdas: Vec<f64> = rows
        .iter()
        .filter(|r| r.total_goals.is_some())
        .map(|r| model.predict_lambda(r))
        .collect();
    if !lambdas.is_empty() {
        let mean_lambda = lambdas.iter().sum::<f64>() / lambdas.len() as f64;
        println!(
            "P(Over 2.5) at mean lambda: {:.4}",
            poisson::prob_over_2_5(mean_lambda)
        );
    }
    Ok(())
}
