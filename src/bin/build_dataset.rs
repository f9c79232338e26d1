use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use overgoals::{cli, dataset, features, fixture_store, model_registry, paths};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = cli::args();
    let db_path = cli::path_value(&args, "db")
        .or_else(paths::default_db_path)
        .context("unable to resolve sqlite path")?;
    let conn = fixture_store::open_db(&db_path)?;

    let limit = cli::parsed::<usize>(&args, "limit");
    if let Some(limit) = limit {
        println!("Using last {limit} finished fixtures (--limit).");
    }

    let (competition, default_name) = match cli::parsed::<i64>(&args, "competition") {
        Some(id) => {
            let comp = fixture_store::competition_by_pk_or_api_id(&conn, id)?
                .ok_or_else(|| anyhow!("competition {id} not found"))?;
            let name = format!("overgoals_dataset_{}.csv", comp.api_id);
            (comp, name)
        }
        None => {
            let slug = cli::value(&args, "league").unwrap_or_else(|| "premier".to_string());
            let comp = model_registry::competition_for_slug(&conn, &slug)?.ok_or_else(|| {
                anyhow!("league {slug:?} not found; use --competition <pk or api_id>")
            })?;
            let name = format!("overgoals_dataset_{slug}.csv");
            (comp, name)
        }
    };

    let output = cli::path_value(&args, "output").unwrap_or_else(|| PathBuf::from(default_name));
    let rows = features::build_dataset_rows(&conn, competition.id, limit)?;
    if rows.is_empty() {
        println!("No finished fixtures.");
        return Ok(());
    }

    dataset::write_dataset_csv(&output, &rows)?;
    println!("Wrote {} rows to {}", rows.len(), output.display());
    println!(
        "Competition: {} (pk={}, api_id={})",
        competition.name, competition.id, competition.api_id
    );
    Ok(())
}
