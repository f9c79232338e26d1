use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use overgoals::{cli, fixture_store, goals_model, model_registry, paths, poisson};

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
    let comp_id = cli::parsed::<i64>(&args, "competition")
        .context("pass --competition <pk or api_id>")?;
    let limit = cli::parsed::<usize>(&args, "limit").unwrap_or(10);

    let conn = fixture_store::open_db(&db_path)?;
    let competition = fixture_store::competition_by_pk_or_api_id(&conn, comp_id)?
        .ok_or_else(|| anyhow!("competition {comp_id} not found"))?;
    let model_path = model_registry::poisson_model_path(&models_dir, &competition);

    let fixtures = fixture_store::upcoming_fixtures(&conn, competition.id, Utc::now(), limit)?;
    if fixtures.is_empty() {
        println!("No upcoming fixtures for {}.", competition.name);
        return Ok(());
    }

    let predictions = goals_model::predict_lambdas(&conn, &model_path, &fixtures)?;
    if predictions.is_empty() {
        println!(
            "No predictions: model missing at {} or no fixture could be featurized.",
            model_path.display()
        );
        return Ok(());
    }

    println!("{} ({})", competition.name, competition.country);
    for (fixture, lambda) in &predictions {
        let d = poisson::distribution(*lambda);
        let kickoff = fixture
            .kickoff
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "tbd".to_string());
        println!(
            "{}  {} vs {}  lambda={:.2}  P0={:.3} P1={:.3} P2={:.3}  Over 2.5: {:.1}%",
            kickoff,
            fixture.home_team,
            fixture.away_team,
            d.lambda,
            d.p0,
            d.p1,
            d.p2,
            d.prob_over_2_5 * 100.0
        );
    }
    Ok(())
}
