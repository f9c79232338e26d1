use anyhow::{Context, Result};

use overgoals::{cli, fixture_store, paths};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = cli::args();
    let db_path = cli::path_value(&args, "db")
        .or_else(paths::default_db_path)
        .context("unable to resolve sqlite path")?;
    let min_games = cli::parsed::<usize>(&args, "min-games").unwrap_or(0);

    let conn = fixture_store::open_db(&db_path)?;
    let competitions = fixture_store::list_competitions(&conn, min_games)?;
    if competitions.is_empty() {
        println!("No competitions found.");
        return Ok(());
    }

    println!("Use: build_dataset --competition <pk or api_id>");
    println!();
    for item in &competitions {
        let comp = &item.competition;
        println!(
            "  pk={:<6} api_id={:<6}  {} ({}) ({} finished fixtures)",
            comp.id, comp.api_id, comp.name, comp.country, item.finished_fixtures
        );
    }
    Ok(())
}
