use std::collections::HashMap;
use std::collections::hash_map::Entry;

use anyhow::Result;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;

use crate::fixture_store;

/// One recorded in-match statistic, e.g. {"type": "Shots on Goal", "value": 5}.
/// Values arrive as numbers, strings ("53%"), or null depending on the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct StatEntry {
    #[serde(rename = "type", default)]
    pub stat_type: String,
    #[serde(default)]
    pub value: Value,
}

/// Memoizes raw statistics lookups for one feature-building pass. Owned by
/// the caller and dropped at batch end; a fresh cache per training run keeps
/// long-lived processes from serving stale rows.
pub struct StatsCache<'conn> {
    conn: &'conn Connection,
    entries: HashMap<(i64, i64), Vec<StatEntry>>,
}

impl<'conn> StatsCache<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            entries: HashMap::new(),
        }
    }

    /// Recorded statistics for the team in the fixture, empty when absent.
    pub fn statistics_for(&mut self, fixture_id: i64, team_id: i64) -> Result<&[StatEntry]> {
        let list = match self.entries.entry((fixture_id, team_id)) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(slot) => {
                let raw = fixture_store::statistics_json(self.conn, fixture_id, team_id)?;
                slot.insert(parse_statistics(raw.as_deref()))
            }
        };
        Ok(list)
    }

    /// First statistic matching any keyword, coerced to a number.
    pub fn value_for(
        &mut self,
        fixture_id: i64,
        team_id: i64,
        keywords: &[&str],
    ) -> Result<Option<f64>> {
        let entries = self.statistics_for(fixture_id, team_id)?;
        Ok(value_for_type(entries, keywords))
    }

    pub fn cached_pairs(&self) -> usize {
        self.entries.len()
    }
}

fn parse_statistics(raw: Option<&str>) -> Vec<StatEntry> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<StatEntry>>(raw).unwrap_or_default()
}

/// First entry whose type label contains (case-insensitive) any keyword.
/// No keyword match, or a matching value that will not coerce, is missing.
pub fn value_for_type(entries: &[StatEntry], keywords: &[&str]) -> Option<f64> {
    for entry in entries {
        let label = entry.stat_type.trim().to_lowercase();
        if keywords.iter().any(|k| label.contains(k)) {
            return coerce_numeric(&entry.value);
        }
    }
    None
}

/// Numeric coercion: numbers pass through, strings lose one trailing "%"
/// before parsing. Anything else is missing rather than an error.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(raw) => {
            let trimmed = raw.trim();
            let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    }
}
