use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

/// Status codes that mark a fixture as finished: full-time, after extra
/// time, awarded, walkover. Goal counts are non-null exactly for these.
pub const FINISHED_STATUSES: [&str; 4] = ["FT", "AET", "AWD", "WO"];

const FINISHED_SQL: &str = "('FT','AET','AWD','WO')";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueRole {
    Home,
    Away,
}

#[derive(Debug, Clone)]
pub struct StoredCompetition {
    pub id: i64,
    pub api_id: i64,
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone)]
pub struct StoredFixture {
    pub id: i64,
    pub api_id: i64,
    pub competition_id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: Option<DateTime<Utc>>,
    pub status: String,
    pub home_goals: Option<i64>,
    pub away_goals: Option<i64>,
}

impl StoredFixture {
    pub fn is_finished(&self) -> bool {
        FINISHED_STATUSES.iter().any(|s| *s == self.status)
    }

    pub fn total_goals(&self) -> Option<i64> {
        if !self.is_finished() {
            return None;
        }
        Some(self.home_goals? + self.away_goals?)
    }
}

#[derive(Debug, Clone)]
pub struct CompetitionSummary {
    pub competition: StoredCompetition,
    pub finished_fixtures: usize,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS competitions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            api_id INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            country TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            api_id INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS fixtures (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            api_id INTEGER NOT NULL UNIQUE,
            competition_id INTEGER NOT NULL,
            home_team_id INTEGER NOT NULL,
            away_team_id INTEGER NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            kickoff TEXT NULL,
            status TEXT NOT NULL,
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_fixtures_home_window
            ON fixtures(home_team_id, competition_id, kickoff);
        CREATE INDEX IF NOT EXISTS idx_fixtures_away_window
            ON fixtures(away_team_id, competition_id, kickoff);
        CREATE INDEX IF NOT EXISTS idx_fixtures_competition ON fixtures(competition_id);
        CREATE INDEX IF NOT EXISTS idx_fixtures_status ON fixtures(status);

        CREATE TABLE IF NOT EXISTS fixture_statistics (
            fixture_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            statistics TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (fixture_id, team_id)
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn upsert_competition(conn: &Connection, api_id: i64, name: &str, country: &str) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO competitions (api_id, name, country, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(api_id) DO UPDATE SET
            name = excluded.name,
            country = excluded.country,
            updated_at = excluded.updated_at
        "#,
        params![api_id, name, country, Utc::now().to_rfc3339()],
    )
    .context("upsert competition")?;
    conn.query_row(
        "SELECT id FROM competitions WHERE api_id = ?1",
        params![api_id],
        |row| row.get(0),
    )
    .context("query competition id after upsert")
}

pub fn upsert_team(conn: &Connection, api_id: i64, name: &str) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO teams (api_id, name, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(api_id) DO UPDATE SET
            name = excluded.name,
            updated_at = excluded.updated_at
        "#,
        params![api_id, name, Utc::now().to_rfc3339()],
    )
    .context("upsert team")?;
    conn.query_row(
        "SELECT id FROM teams WHERE api_id = ?1",
        params![api_id],
        |row| row.get(0),
    )
    .context("query team id after upsert")
}

#[derive(Debug, Clone)]
pub struct FixtureUpsert<'a> {
    pub api_id: i64,
    pub competition_id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_team: &'a str,
    pub away_team: &'a str,
    pub kickoff: Option<DateTime<Utc>>,
    pub status: &'a str,
    pub home_goals: Option<i64>,
    pub away_goals: Option<i64>,
}

pub fn upsert_fixture(conn: &Connection, f: &FixtureUpsert<'_>) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO fixtures (
            api_id, competition_id, home_team_id, away_team_id,
            home_team, away_team, kickoff, status, home_goals, away_goals, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(api_id) DO UPDATE SET
            competition_id = excluded.competition_id,
            home_team_id = excluded.home_team_id,
            away_team_id = excluded.away_team_id,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            kickoff = excluded.kickoff,
            status = excluded.status,
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            updated_at = excluded.updated_at
        "#,
        params![
            f.api_id,
            f.competition_id,
            f.home_team_id,
            f.away_team_id,
            f.home_team,
            f.away_team,
            f.kickoff.map(|t| t.to_rfc3339()),
            f.status,
            f.home_goals,
            f.away_goals,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert fixture")?;
    conn.query_row(
        "SELECT id FROM fixtures WHERE api_id = ?1",
        params![f.api_id],
        |row| row.get(0),
    )
    .context("query fixture id after upsert")
}

/// Replaces the statistics list for one (fixture, team) pair. The payload is
/// the raw JSON list of {type, value} entries as delivered by the data feed.
pub fn upsert_statistics(
    conn: &Connection,
    fixture_id: i64,
    team_id: i64,
    statistics_json: &str,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO fixture_statistics (fixture_id, team_id, statistics, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(fixture_id, team_id) DO UPDATE SET
            statistics = excluded.statistics,
            updated_at = excluded.updated_at
        "#,
        params![fixture_id, team_id, statistics_json, Utc::now().to_rfc3339()],
    )
    .context("upsert fixture statistics")?;
    Ok(())
}

pub fn statistics_json(
    conn: &Connection,
    fixture_id: i64,
    team_id: i64,
) -> Result<Option<String>> {
    conn.query_row(
        "SELECT statistics FROM fixture_statistics WHERE fixture_id = ?1 AND team_id = ?2",
        params![fixture_id, team_id],
        |row| row.get(0),
    )
    .optional()
    .context("query fixture statistics")
}

/// Last `n` finished fixtures the team played in the given venue role,
/// strictly before `before`, same competition, most recent first. Returns
/// fewer than `n` when less history exists; never pads.
///
/// Kickoffs are stored as RFC3339 UTC text, so string comparison against
/// `before` in the same format is time comparison.
pub fn last_fixtures_for_team(
    conn: &Connection,
    team_id: i64,
    competition_id: i64,
    before: DateTime<Utc>,
    role: VenueRole,
    n: usize,
) -> Result<Vec<StoredFixture>> {
    let team_column = match role {
        VenueRole::Home => "home_team_id",
        VenueRole::Away => "away_team_id",
    };
    let sql = format!(
        r#"
        SELECT
            id, api_id, competition_id, home_team_id, away_team_id,
            home_team, away_team, kickoff, status, home_goals, away_goals
        FROM fixtures
        WHERE {team_column} = ?1
          AND competition_id = ?2
          AND kickoff IS NOT NULL
          AND kickoff < ?3
          AND status IN {FINISHED_SQL}
        ORDER BY kickoff DESC, api_id DESC
        LIMIT ?4
        "#
    );
    let mut stmt = conn.prepare(&sql).context("prepare venue window query")?;
    let rows = stmt
        .query_map(
            params![team_id, competition_id, before.to_rfc3339(), n as i64],
            map_fixture_row,
        )
        .context("query venue window")?;
    collect_fixture_rows(rows)
}

/// Last `n` meetings between the two teams in either venue configuration,
/// same finished/competition/cutoff constraints as the venue windows.
pub fn head_to_head(
    conn: &Connection,
    team_a: i64,
    team_b: i64,
    competition_id: i64,
    before: DateTime<Utc>,
    n: usize,
) -> Result<Vec<StoredFixture>> {
    let sql = format!(
        r#"
        SELECT
            id, api_id, competition_id, home_team_id, away_team_id,
            home_team, away_team, kickoff, status, home_goals, away_goals
        FROM fixtures
        WHERE ((home_team_id = ?1 AND away_team_id = ?2)
            OR (home_team_id = ?2 AND away_team_id = ?1))
          AND competition_id = ?3
          AND kickoff IS NOT NULL
          AND kickoff < ?4
          AND status IN {FINISHED_SQL}
        ORDER BY kickoff DESC, api_id DESC
        LIMIT ?5
        "#
    );
    let mut stmt = conn.prepare(&sql).context("prepare head-to-head query")?;
    let rows = stmt
        .query_map(
            params![
                team_a,
                team_b,
                competition_id,
                before.to_rfc3339(),
                n as i64
            ],
            map_fixture_row,
        )
        .context("query head-to-head")?;
    collect_fixture_rows(rows)
}

/// Finished fixtures for a competition in chronological order. When `limit`
/// is set, only the last `limit` by kickoff are returned (still ascending).
pub fn finished_fixtures(
    conn: &Connection,
    competition_id: i64,
    limit: Option<usize>,
) -> Result<Vec<StoredFixture>> {
    let sql = format!(
        r#"
        SELECT
            id, api_id, competition_id, home_team_id, away_team_id,
            home_team, away_team, kickoff, status, home_goals, away_goals
        FROM fixtures
        WHERE competition_id = ?1
          AND kickoff IS NOT NULL
          AND status IN {FINISHED_SQL}
        ORDER BY kickoff DESC, api_id DESC
        "#
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("prepare finished fixtures query")?;
    let rows = stmt
        .query_map(params![competition_id], map_fixture_row)
        .context("query finished fixtures")?;
    let mut out = collect_fixture_rows(rows)?;
    if let Some(limit) = limit {
        out.truncate(limit);
    }
    out.reverse();
    Ok(out)
}

/// Not-yet-finished fixtures with a known kickoff at or after `from`,
/// soonest first.
pub fn upcoming_fixtures(
    conn: &Connection,
    competition_id: i64,
    from: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<StoredFixture>> {
    let sql = format!(
        r#"
        SELECT
            id, api_id, competition_id, home_team_id, away_team_id,
            home_team, away_team, kickoff, status, home_goals, away_goals
        FROM fixtures
        WHERE competition_id = ?1
          AND kickoff IS NOT NULL
          AND kickoff >= ?2
          AND status NOT IN {FINISHED_SQL}
        ORDER BY kickoff ASC, api_id ASC
        LIMIT ?3
        "#
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("prepare upcoming fixtures query")?;
    let rows = stmt
        .query_map(
            params![competition_id, from.to_rfc3339(), limit as i64],
            map_fixture_row,
        )
        .context("query upcoming fixtures")?;
    collect_fixture_rows(rows)
}

pub fn fixture_by_api_id(conn: &Connection, api_id: i64) -> Result<Option<StoredFixture>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                id, api_id, competition_id, home_team_id, away_team_id,
                home_team, away_team, kickoff, status, home_goals, away_goals
            FROM fixtures
            WHERE api_id = ?1
            "#,
        )
        .context("prepare fixture lookup")?;
    stmt.query_row(params![api_id], map_fixture_row)
        .optional()
        .context("query fixture by api id")
}

/// Looks a competition up by primary key first, then by external api id.
pub fn competition_by_pk_or_api_id(
    conn: &Connection,
    id: i64,
) -> Result<Option<StoredCompetition>> {
    let by_pk = conn
        .query_row(
            "SELECT id, api_id, name, country FROM competitions WHERE id = ?1",
            params![id],
            map_competition_row,
        )
        .optional()
        .context("query competition by pk")?;
    if by_pk.is_some() {
        return Ok(by_pk);
    }
    conn.query_row(
        "SELECT id, api_id, name, country FROM competitions WHERE api_id = ?1",
        params![id],
        map_competition_row,
    )
    .optional()
    .context("query competition by api id")
}

/// Competitions with their finished-fixture counts, country/name ordered.
/// `min_finished` filters out thin competitions (0 keeps everything).
pub fn list_competitions(
    conn: &Connection,
    min_finished: usize,
) -> Result<Vec<CompetitionSummary>> {
    let sql = format!(
        r#"
        SELECT c.id, c.api_id, c.name, c.country, COUNT(f.id) AS finished_count
        FROM competitions c
        LEFT JOIN fixtures f
            ON f.competition_id = c.id AND f.status IN {FINISHED_SQL}
        GROUP BY c.id
        HAVING finished_count >= ?1
        ORDER BY c.country, c.name
        "#
    );
    let mut stmt = conn.prepare(&sql).context("prepare competition listing")?;
    let rows = stmt
        .query_map(params![min_finished as i64], |row| {
            Ok(CompetitionSummary {
                competition: StoredCompetition {
                    id: row.get(0)?,
                    api_id: row.get(1)?,
                    name: row.get(2)?,
                    country: row.get(3)?,
                },
                finished_fixtures: row.get::<_, i64>(4)? as usize,
            })
        })
        .context("query competition listing")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode competition row")?);
    }
    Ok(out)
}

fn map_fixture_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredFixture> {
    let kickoff_raw: Option<String> = row.get(7)?;
    let kickoff = kickoff_raw
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|t| t.with_timezone(&Utc));
    Ok(StoredFixture {
        id: row.get(0)?,
        api_id: row.get(1)?,
        competition_id: row.get(2)?,
        home_team_id: row.get(3)?,
        away_team_id: row.get(4)?,
        home_team: row.get(5)?,
        away_team: row.get(6)?,
        kickoff,
        status: row.get(8)?,
        home_goals: row.get(9)?,
        away_goals: row.get(10)?,
    })
}

fn map_competition_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredCompetition> {
    Ok(StoredCompetition {
        id: row.get(0)?,
        api_id: row.get(1)?,
        name: row.get(2)?,
        country: row.get(3)?,
    })
}

fn collect_fixture_rows<I>(rows: I) -> Result<Vec<StoredFixture>>
where
    I: Iterator<Item = rusqlite::Result<StoredFixture>>,
{
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode fixture row")?);
    }
    Ok(out)
}
