use std::path::PathBuf;

use anyhow::Result;

use overgoals::goals_model::{self, TrainConfig};
use overgoals::{cli, dataset};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = cli::args();
    let dataset_path = cli::path_value(&args, "dataset")
        .unwrap_or_else(|| PathBuf::from("overgoals_dataset.csv"));
    let train_ratio = cli::parsed::<f64>(&args, "train-ratio").unwrap_or(0.8);

    let defaults = TrainConfig::default();
    let cfg = TrainConfig {
        iterations: cli::parsed(&args, "iters").unwrap_or(defaults.iterations),
        learning_rate: cli::parsed(&args, "learning-rate").unwrap_or(defaults.learning_rate),
        l2: cli::parsed(&args, "l2").unwrap_or(defaults.l2),
    };

    let rows = dataset::read_dataset_csv(&dataset_path)?;
    // Only fully labeled rows take part in a validation run.
    let rows: Vec<_> = rows
        .into_iter()
        .filter(|r| r.total_goals.is_some() && r.is_over_2_5.is_some())
        .collect();

    let (train_rows, test_rows) = dataset::chronological_split(&rows, train_ratio)?;
    println!("Train: {}, Test: {}", train_rows.len(), test_rows.len());

    let model = goals_model::train(train_rows, cfg)?;
    if let Some(output) = cli::path_value(&args, "output") {
        model.save(&output)?;
        println!("Model saved to {}", output.display());
    }

    let metrics = goals_model::evaluate_over25(&model, test_rows);
    println!(
        "Over 2.5 test: Log Loss {:.4}, Accuracy {:.4}, Brier {:.4} ({} samples)",
        metrics.log_loss, metrics.accuracy, metrics.brier, metrics.samples
    );
    Ok(())
}
