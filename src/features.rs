//! Leakage-free historical-form features for one fixture. Every window is
//! cut strictly before the fixture's own kickoff, so nothing from the match
//! being predicted (or later) can reach its feature vector.

use anyhow::{Result, ensure};
use rusqlite::Connection;

use crate::fixture_store::{self, StoredFixture, VenueRole};
use crate::stats_lookup::StatsCache;

pub const WINDOW_SHORT: usize = 5;
pub const WINDOW_LONG: usize = 10;
pub const H2H_WINDOW: usize = 3;

// Keyword sets are lowercase; matching lowercases the stat label.
pub const SHOTS_ON_TARGET_KEYWORDS: &[&str] = &["shots on goal", "shots on target"];
pub const TOTAL_SHOTS_KEYWORDS: &[&str] = &["total shots"];
pub const POSSESSION_KEYWORDS: &[&str] = &["ball possession", "possession"];
pub const BIG_CHANCES_KEYWORDS: &[&str] = &["big chance"];

/// Column order is the artifact/dataset contract; renaming or reordering
/// breaks previously trained models and saved CSVs.
pub const CORE_FEATURE_COLUMNS: [&str; 13] = [
    "home_attack_form_5",
    "away_attack_form_5",
    "home_defensive_fragility_5",
    "away_defensive_fragility_5",
    "home_shots_on_goal_avg_5",
    "away_shots_on_goal_avg_5",
    "home_attack_form_10",
    "away_attack_form_10",
    "home_defensive_fragility_10",
    "away_defensive_fragility_10",
    "home_shots_on_goal_avg_10",
    "away_shots_on_goal_avg_10",
    "h2h_total_goals_avg_3",
];

pub const EXTENDED_FEATURE_COLUMNS: [&str; 10] = [
    "home_total_shots_avg_5",
    "away_total_shots_avg_5",
    "home_possession_avg_5",
    "away_possession_avg_5",
    "home_big_chances_avg_5",
    "away_big_chances_avg_5",
    "home_shots_on_target_allowed_avg_5",
    "away_shots_on_target_allowed_avg_5",
    "home_conversion_rate_5",
    "away_conversion_rate_5",
];

pub const TARGET_COLUMN: &str = "total_goals_actual";
pub const LABEL_COLUMN: &str = "is_over_2_5";

/// All 23 feature columns in canonical order, core first.
pub fn all_feature_columns() -> Vec<&'static str> {
    let mut out = Vec::with_capacity(CORE_FEATURE_COLUMNS.len() + EXTENDED_FEATURE_COLUMNS.len());
    out.extend(CORE_FEATURE_COLUMNS);
    out.extend(EXTENDED_FEATURE_COLUMNS);
    out
}

pub fn dataset_columns() -> Vec<&'static str> {
    let mut out = all_feature_columns();
    out.push(TARGET_COLUMN);
    out.push(LABEL_COLUMN);
    out
}

/// Fixed-schema feature record for one fixture. Feature fields are `None`
/// when the backing window or statistic is absent; targets are `None` until
/// the fixture finishes (inference mode). Values are rounded to 4 decimals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    pub home_attack_form_5: Option<f64>,
    pub away_attack_form_5: Option<f64>,
    pub home_defensive_fragility_5: Option<f64>,
    pub away_defensive_fragility_5: Option<f64>,
    pub home_shots_on_goal_avg_5: Option<f64>,
    pub away_shots_on_goal_avg_5: Option<f64>,
    pub home_attack_form_10: Option<f64>,
    pub away_attack_form_10: Option<f64>,
    pub home_defensive_fragility_10: Option<f64>,
    pub away_defensive_fragility_10: Option<f64>,
    pub home_shots_on_goal_avg_10: Option<f64>,
    pub away_shots_on_goal_avg_10: Option<f64>,
    pub h2h_total_goals_avg_3: Option<f64>,
    pub home_total_shots_avg_5: Option<f64>,
    pub away_total_shots_avg_5: Option<f64>,
    pub home_possession_avg_5: Option<f64>,
    pub away_possession_avg_5: Option<f64>,
    pub home_big_chances_avg_5: Option<f64>,
    pub away_big_chances_avg_5: Option<f64>,
    pub home_shots_on_target_allowed_avg_5: Option<f64>,
    pub away_shots_on_target_allowed_avg_5: Option<f64>,
    pub home_conversion_rate_5: Option<f64>,
    pub away_conversion_rate_5: Option<f64>,
    pub total_goals: Option<f64>,
    pub is_over_2_5: Option<i64>,
}

impl FeatureRow {
    pub fn core_values(&self) -> [Option<f64>; 13] {
        [
            self.home_attack_form_5,
            self.away_attack_form_5,
            self.home_defensive_fragility_5,
            self.away_defensive_fragility_5,
            self.home_shots_on_goal_avg_5,
            self.away_shots_on_goal_avg_5,
            self.home_attack_form_10,
            self.away_attack_form_10,
            self.home_defensive_fragility_10,
            self.away_defensive_fragility_10,
            self.home_shots_on_goal_avg_10,
            self.away_shots_on_goal_avg_10,
            self.h2h_total_goals_avg_3,
        ]
    }

    pub fn extended_values(&self) -> [Option<f64>; 10] {
        [
            self.home_total_shots_avg_5,
            self.away_total_shots_avg_5,
            self.home_possession_avg_5,
            self.away_possession_avg_5,
            self.home_big_chances_avg_5,
            self.away_big_chances_avg_5,
            self.home_shots_on_target_allowed_avg_5,
            self.away_shots_on_target_allowed_avg_5,
            self.home_conversion_rate_5,
            self.away_conversion_rate_5,
        ]
    }

    pub fn feature_values(&self) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(23);
        out.extend(self.core_values());
        out.extend(self.extended_values());
        out
    }

    /// Model-input boundary: missing features become 0.0 here and only
    /// here. Feature computation itself never coerces absence to zero.
    pub fn core_inputs(&self) -> Vec<f64> {
        self.core_values()
            .iter()
            .map(|v| v.unwrap_or(0.0))
            .collect()
    }

    pub fn full_inputs(&self) -> Vec<f64> {
        self.feature_values()
            .iter()
            .map(|v| v.unwrap_or(0.0))
            .collect()
    }

    /// Rebuilds a row from feature values in canonical column order
    /// (core then extended), as produced by the dataset reader.
    pub fn from_feature_values(
        values: &[Option<f64>],
        total_goals: Option<f64>,
        is_over_2_5: Option<i64>,
    ) -> Result<Self> {
        ensure!(
            values.len() == 23,
            "expected 23 feature values, got {}",
            values.len()
        );
        Ok(Self {
            home_attack_form_5: values[0],
            away_attack_form_5: values[1],
            home_defensive_fragility_5: values[2],
            away_defensive_fragility_5: values[3],
            home_shots_on_goal_avg_5: values[4],
            away_shots_on_goal_avg_5: values[5],
            home_attack_form_10: values[6],
            away_attack_form_10: values[7],
            home_defensive_fragility_10: values[8],
            away_defensive_fragility_10: values[9],
            home_shots_on_goal_avg_10: values[10],
            away_shots_on_goal_avg_10: values[11],
            h2h_total_goals_avg_3: values[12],
            home_total_shots_avg_5: values[13],
            away_total_shots_avg_5: values[14],
            home_possession_avg_5: values[15],
            away_possession_avg_5: values[16],
            home_big_chances_avg_5: values[17],
            away_big_chances_avg_5: values[18],
            home_shots_on_target_allowed_avg_5: values[19],
            away_shots_on_target_allowed_avg_5: values[20],
            home_conversion_rate_5: values[21],
            away_conversion_rate_5: values[22],
            total_goals,
            is_over_2_5,
        })
    }
}

/// Average of observed values. An empty collection is `None`, never 0:
/// zero is a legitimate observation and must stay distinguishable from
/// absence.
pub fn safe_avg(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Computes the feature record for one fixture, or `None` when the fixture
/// cannot be featurized (no kickoff, or not finished outside prediction
/// mode). `stats` should be shared across a whole batch pass.
pub fn fixture_features(
    conn: &Connection,
    stats: &mut StatsCache<'_>,
    fixture: &StoredFixture,
    for_prediction: bool,
) -> Result<Option<FeatureRow>> {
    let Some(kickoff) = fixture.kickoff else {
        return Ok(None);
    };
    if !for_prediction && !fixture.is_finished() {
        return Ok(None);
    }

    let competition_id = fixture.competition_id;
    let home_5 = fixture_store::last_fixtures_for_team(
        conn,
        fixture.home_team_id,
        competition_id,
        kickoff,
        VenueRole::Home,
        WINDOW_SHORT,
    )?;
    let home_10 = fixture_store::last_fixtures_for_team(
        conn,
        fixture.home_team_id,
        competition_id,
        kickoff,
        VenueRole::Home,
        WINDOW_LONG,
    )?;
    let away_5 = fixture_store::last_fixtures_for_team(
        conn,
        fixture.away_team_id,
        competition_id,
        kickoff,
        VenueRole::Away,
        WINDOW_SHORT,
    )?;
    let away_10 = fixture_store::last_fixtures_for_team(
        conn,
        fixture.away_team_id,
        competition_id,
        kickoff,
        VenueRole::Away,
        WINDOW_LONG,
    )?;

    let home_attack_5 = safe_avg(&goals_scored(&home_5, VenueRole::Home));
    let away_attack_5 = safe_avg(&goals_scored(&away_5, VenueRole::Away));
    let home_attack_10 = safe_avg(&goals_scored(&home_10, VenueRole::Home));
    let away_attack_10 = safe_avg(&goals_scored(&away_10, VenueRole::Away));
    let home_def_5 = safe_avg(&goals_conceded(&home_5, VenueRole::Home));
    let away_def_5 = safe_avg(&goals_conceded(&away_5, VenueRole::Away));
    let home_def_10 = safe_avg(&goals_conceded(&home_10, VenueRole::Home));
    let away_def_10 = safe_avg(&goals_conceded(&away_10, VenueRole::Away));

    let home_shots_5 =
        window_stat_avg(stats, &home_5, VenueRole::Home, false, SHOTS_ON_TARGET_KEYWORDS)?;
    let away_shots_5 =
        window_stat_avg(stats, &away_5, VenueRole::Away, false, SHOTS_ON_TARGET_KEYWORDS)?;
    let home_shots_10 =
        window_stat_avg(stats, &home_10, VenueRole::Home, false, SHOTS_ON_TARGET_KEYWORDS)?;
    let away_shots_10 =
        window_stat_avg(stats, &away_10, VenueRole::Away, false, SHOTS_ON_TARGET_KEYWORDS)?;

    let h2h = fixture_store::head_to_head(
        conn,
        fixture.home_team_id,
        fixture.away_team_id,
        competition_id,
        kickoff,
        H2H_WINDOW,
    )?;
    let h2h_totals = h2h
        .iter()
        .map(|g| (g.home_goals.unwrap_or(0) + g.away_goals.unwrap_or(0)) as f64)
        .collect::<Vec<_>>();
    let h2h_avg = safe_avg(&h2h_totals);

    let home_total_shots = window_stat_avg(stats, &home_5, VenueRole::Home, false, TOTAL_SHOTS_KEYWORDS)?;
    let away_total_shots = window_stat_avg(stats, &away_5, VenueRole::Away, false, TOTAL_SHOTS_KEYWORDS)?;
    let home_possession = window_stat_avg(stats, &home_5, VenueRole::Home, false, POSSESSION_KEYWORDS)?;
    let away_possession = window_stat_avg(stats, &away_5, VenueRole::Away, false, POSSESSION_KEYWORDS)?;
    let home_big_chances = window_stat_avg(stats, &home_5, VenueRole::Home, false, BIG_CHANCES_KEYWORDS)?;
    let away_big_chances = window_stat_avg(stats, &away_5, VenueRole::Away, false, BIG_CHANCES_KEYWORDS)?;
    // Defensive exposure: the statistics subject is the windowed fixture's
    // opponent, in both venue roles.
    let home_shots_allowed =
        window_stat_avg(stats, &home_5, VenueRole::Home, true, SHOTS_ON_TARGET_KEYWORDS)?;
    let away_shots_allowed =
        window_stat_avg(stats, &away_5, VenueRole::Away, true, SHOTS_ON_TARGET_KEYWORDS)?;

    let home_conversion = conversion_rate(home_attack_5, home_shots_5);
    let away_conversion = conversion_rate(away_attack_5, away_shots_5);

    let total_goals = if fixture.is_finished() {
        Some((fixture.home_goals.unwrap_or(0) + fixture.away_goals.unwrap_or(0)) as f64)
    } else {
        None
    };
    let is_over_2_5 = total_goals.map(|t| i64::from(t > 2.5));

    Ok(Some(FeatureRow {
        home_attack_form_5: home_attack_5.map(round4),
        away_attack_form_5: away_attack_5.map(round4),
        home_defensive_fragility_5: home_def_5.map(round4),
        away_defensive_fragility_5: away_def_5.map(round4),
        home_shots_on_goal_avg_5: home_shots_5.map(round4),
        away_shots_on_goal_avg_5: away_shots_5.map(round4),
        home_attack_form_10: home_attack_10.map(round4),
        away_attack_form_10: away_attack_10.map(round4),
        home_defensive_fragility_10: home_def_10.map(round4),
        away_defensive_fragility_10: away_def_10.map(round4),
        home_shots_on_goal_avg_10: home_shots_10.map(round4),
        away_shots_on_goal_avg_10: away_shots_10.map(round4),
        h2h_total_goals_avg_3: h2h_avg.map(round4),
        home_total_shots_avg_5: home_total_shots.map(round4),
        away_total_shots_avg_5: away_total_shots.map(round4),
        home_possession_avg_5: home_possession.map(round4),
        away_possession_avg_5: away_possession.map(round4),
        home_big_chances_avg_5: home_big_chances.map(round4),
        away_big_chances_avg_5: away_big_chances.map(round4),
        home_shots_on_target_allowed_avg_5: home_shots_allowed.map(round4),
        away_shots_on_target_allowed_avg_5: away_shots_allowed.map(round4),
        home_conversion_rate_5: home_conversion.map(round4),
        away_conversion_rate_5: away_conversion.map(round4),
        total_goals,
        is_over_2_5,
    }))
}

/// One row per finished fixture of the competition, chronological order,
/// one statistics cache for the whole pass. `limit` keeps only the last N
/// fixtures by kickoff (still processed ascending) for big leagues.
pub fn build_dataset_rows(
    conn: &Connection,
    competition_id: i64,
    limit: Option<usize>,
) -> Result<Vec<FeatureRow>> {
    let fixtures = fixture_store::finished_fixtures(conn, competition_id, limit)?;
    let mut stats = StatsCache::new(conn);
    let mut rows = Vec::with_capacity(fixtures.len());
    for fixture in &fixtures {
        if let Some(row) = fixture_features(conn, &mut stats, fixture, false)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn goals_scored(window: &[StoredFixture], role: VenueRole) -> Vec<f64> {
    window
        .iter()
        .map(|g| match role {
            VenueRole::Home => g.home_goals.unwrap_or(0) as f64,
            VenueRole::Away => g.away_goals.unwrap_or(0) as f64,
        })
        .collect()
}

fn goals_conceded(window: &[StoredFixture], role: VenueRole) -> Vec<f64> {
    window
        .iter()
        .map(|g| match role {
            VenueRole::Home => g.away_goals.unwrap_or(0) as f64,
            VenueRole::Away => g.home_goals.unwrap_or(0) as f64,
        })
        .collect()
}

/// Average of a statistic over a venue window, skipping fixtures where the
/// statistic is absent. `opponent` flips the subject to the other side of
/// each windowed fixture.
fn window_stat_avg(
    stats: &mut StatsCache<'_>,
    window: &[StoredFixture],
    role: VenueRole,
    opponent: bool,
    keywords: &[&str],
) -> Result<Option<f64>> {
    let mut values = Vec::new();
    for past in window {
        let subject = match (role, opponent) {
            (VenueRole::Home, false) => past.home_team_id,
            (VenueRole::Home, true) => past.away_team_id,
            (VenueRole::Away, false) => past.away_team_id,
            (VenueRole::Away, true) => past.home_team_id,
        };
        if let Some(value) = stats.value_for(past.id, subject, keywords)? {
            values.push(value);
        }
    }
    Ok(safe_avg(&values))
}

fn conversion_rate(attack_form: Option<f64>, shots_avg: Option<f64>) -> Option<f64> {
    let attack = attack_form?;
    let shots = shots_avg?;
    if shots == 0.0 {
        return None;
    }
    Some(attack / shots)
}
