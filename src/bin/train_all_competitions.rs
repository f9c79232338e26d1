use std::path::PathBuf;

use anyhow::{Context, Result};

use overgoals::goals_model::{self, TrainConfig};
use overgoals::{cli, dataset, features, fixture_store, model_registry, paths};

const MIN_FINISHED_FIXTURES: usize = 30;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = cli::args();
    let db_path = cli::path_value(&args, "db")
        .or_else(paths::default_db_path)
        .context("unable to resolve sqlite path")?;
    let models_dir = cli::path_value(&args, "models-dir")
        .or_else(paths::default_models_dir)
        .context("unable to resolve models dir")?;
    let min_games = cli::parsed::<usize>(&args, "min-games").unwrap_or(MIN_FINISHED_FIXTURES);
    let comp_filter = cli::parsed::<i64>(&args, "competition");

    let defaults = TrainConfig::default();
    let cfg = TrainConfig {
        iterations: cli::parsed(&args, "iters").unwrap_or(defaults.iterations),
        learning_rate: cli::parsed(&args, "learning-rate").unwrap_or(defaults.learning_rate),
        l2: cli::parsed(&args, "l2").unwrap_or(defaults.l2),
    };

    let conn = fixture_store::open_db(&db_path)?;
    let mut competitions = fixture_store::list_competitions(&conn, min_games)?;
    if let Some(filter) = comp_filter {
        competitions.retain(|item| {
            item.competition.id == filter || item.competition.api_id == filter
        });
    }
    if competitions.is_empty() {
        println!("No competition has at least {min_games} finished fixtures.");
        return Ok(());
    }

    for item in &competitions {
        let comp = &item.competition;
        println!();
        println!("--- {} ({}, api_id={}) ---", comp.name, comp.country, comp.api_id);

        let rows = match features::build_dataset_rows(&conn, comp.id, None) {
            Ok(rows) => rows,
            Err(err) => {
                println!("  Dataset build failed: {err:#}");
                continue;
            }
        };
        if rows.is_empty() {
            println!("  No rows built for {}. Skipped.", comp.name);
            continue;
        }

        let csv_path = PathBuf::from(format!("overgoals_dataset_{}.csv", comp.api_id));
        if let Err(err) = dataset::write_dataset_csv(&csv_path, &rows) {
            println!("  Dataset write failed: {err:#}");
            continue;
        }
        println!("  Dataset: {} rows -> {}", rows.len(), csv_path.display());

        let model = match goals_model::train(&rows, cfg) {
            Ok(model) => model,
            Err(err) => {
                println!("  Training failed: {err:#}");
                continue;
            }
        };
        let model_path = model_registry::poisson_model_path(&models_dir, comp);
        match model.save(&model_path) {
            Ok(()) => println!("  Model saved: {}", model_path.display()),
            Err(err) => println!("  Save failed: {err:#}"),
        }
    }

    println!();
    Ok(())
}
