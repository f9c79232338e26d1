//! Maps a competition to its model artifact location. Primary key is the
//! external competition id; a small named-league slug table is the
//! secondary lookup, kept for datasets and artifacts that predate stable
//! identifiers.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::Connection;

use crate::fixture_store::{self, StoredCompetition};

const POISSON_PREFIX: &str = "overgoals_poisson";
const CLASSIFIER_PREFIX: &str = "overgoals_xg";

#[derive(Debug, Clone, Copy)]
pub struct LeagueSlug {
    pub slug: &'static str,
    pub name_keywords: &'static [&'static str],
    pub country: &'static str,
}

pub const LEAGUE_REGISTRY: &[LeagueSlug] = &[
    LeagueSlug {
        slug: "premier",
        name_keywords: &["premier league"],
        country: "england",
    },
    LeagueSlug {
        slug: "laliga",
        name_keywords: &["la liga", "laliga", "primera"],
        country: "spain",
    },
    LeagueSlug {
        slug: "ligue1",
        name_keywords: &["ligue 1"],
        country: "france",
    },
];

pub fn registry_entry(slug: &str) -> Option<&'static LeagueSlug> {
    let wanted = slug.trim().to_lowercase();
    LEAGUE_REGISTRY.iter().find(|entry| entry.slug == wanted)
}

/// Resolves a registry slug to a stored competition by name keyword and
/// country match.
pub fn competition_for_slug(conn: &Connection, slug: &str) -> Result<Option<StoredCompetition>> {
    let Some(entry) = registry_entry(slug) else {
        return Ok(None);
    };
    let competitions = fixture_store::list_competitions(conn, 0)?;
    Ok(competitions
        .into_iter()
        .map(|summary| summary.competition)
        .find(|comp| matches_entry(comp, entry)))
}

/// Reverse lookup: the registry slug for a competition, if it is one of the
/// named leagues.
pub fn slug_for_competition(comp: &StoredCompetition) -> Option<&'static str> {
    LEAGUE_REGISTRY
        .iter()
        .find(|entry| matches_entry(comp, entry))
        .map(|entry| entry.slug)
}

pub fn poisson_model_filename(comp: &StoredCompetition) -> String {
    filename(POISSON_PREFIX, comp)
}

pub fn classifier_filename(comp: &StoredCompetition) -> String {
    filename(CLASSIFIER_PREFIX, comp)
}

pub fn poisson_filename_for_slug(slug: &str) -> String {
    slug_filename(POISSON_PREFIX, slug)
}

pub fn classifier_filename_for_slug(slug: &str) -> String {
    slug_filename(CLASSIFIER_PREFIX, slug)
}

pub fn poisson_model_path(models_dir: &Path, comp: &StoredCompetition) -> PathBuf {
    models_dir.join(poisson_model_filename(comp))
}

pub fn classifier_path(models_dir: &Path, comp: &StoredCompetition) -> PathBuf {
    models_dir.join(classifier_filename(comp))
}

fn filename(prefix: &str, comp: &StoredCompetition) -> String {
    match slug_for_competition(comp) {
        Some(slug) => slug_filename(prefix, slug),
        None => format!("{prefix}_{}.json", comp.api_id),
    }
}

fn slug_filename(prefix: &str, slug: &str) -> String {
    // The first deployment shipped the premier artifact unsuffixed; that
    // name stays readable and writable.
    if slug == "premier" {
        format!("{prefix}.json")
    } else {
        format!("{prefix}_{slug}.json")
    }
}

fn matches_entry(comp: &StoredCompetition, entry: &LeagueSlug) -> bool {
    let name = comp.name.to_lowercase();
    let country = comp.country.to_lowercase();
    country.contains(entry.country) && entry.name_keywords.iter().any(|k| name.contains(k))
}
