//! Dataset file interface: one CSV row per finished fixture, missing values
//! as empty cells, strict column validation on load.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::features::{FeatureRow, dataset_columns};

pub fn write_dataset_csv(path: &Path, rows: &[FeatureRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create dataset csv {}", path.display()))?;
    writer
        .write_record(dataset_columns())
        .context("write dataset header")?;

    for row in rows {
        let mut record = Vec::with_capacity(25);
        for value in row.feature_values() {
            record.push(format_cell(value));
        }
        record.push(format_cell(row.total_goals));
        record.push(
            row.is_over_2_5
                .map(|v| v.to_string())
                .unwrap_or_default(),
        );
        writer.write_record(&record).context("write dataset row")?;
    }
    writer.flush().context("flush dataset csv")?;
    Ok(())
}

/// Loads a dataset CSV. Every expected column must be present (extra
/// columns are ignored); a missing column aborts the load before any row is
/// parsed. Cells that fail to parse read as missing.
pub fn read_dataset_csv(path: &Path) -> Result<Vec<FeatureRow>> {
    if fs::metadata(path).is_err() {
        bail!("dataset not found: {}", path.display());
    }
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open dataset csv {}", path.display()))?;

    let headers = reader.headers().context("read dataset header")?.clone();
    let expected = dataset_columns();
    let mut indices = Vec::with_capacity(expected.len());
    let mut missing = Vec::new();
    for column in &expected {
        match headers.iter().position(|h| h == *column) {
            Some(idx) => indices.push(idx),
            None => missing.push(*column),
        }
    }
    if !missing.is_empty() {
        bail!("missing column(s) in dataset: {}", missing.join(", "));
    }

    let feature_count = expected.len() - 2;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("read dataset row")?;
        let mut values = Vec::with_capacity(feature_count);
        for idx in &indices[..feature_count] {
            values.push(parse_cell(record.get(*idx)));
        }
        let total_goals = parse_cell(record.get(indices[feature_count]));
        let is_over_2_5 = parse_cell(record.get(indices[feature_count + 1])).map(|v| v as i64);
        rows.push(FeatureRow::from_feature_values(
            &values,
            total_goals,
            is_over_2_5,
        )?);
    }
    Ok(rows)
}

/// First `floor(N * train_ratio)` rows train, the rest test. Input order is
/// the dataset order, which the builder emits kickoff-ascending, so the
/// split never leaks future fixtures into training. An empty partition on
/// either side is fatal.
pub fn chronological_split(
    rows: &[FeatureRow],
    train_ratio: f64,
) -> Result<(&[FeatureRow], &[FeatureRow])> {
    let n = rows.len();
    let split = (n as f64 * train_ratio).floor() as usize;
    if split == 0 || split >= n {
        bail!("dataset too small for a {train_ratio} train/test split ({n} rows)");
    }
    Ok((&rows[..split], &rows[split..]))
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

fn parse_cell(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok()
}
