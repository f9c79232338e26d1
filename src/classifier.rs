//! Direct Over/Under 2.5 classifier: balanced logistic regression over the
//! full core + extended feature set. An alternative scoring path to the
//! expected-goals route; deployments pick one or expose both.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::eval::{self, Metrics};
use crate::features::{self, FeatureRow};
use crate::fixture_store::StoredFixture;
use crate::stats_lookup::StatsCache;

const LOGIT_CLAMP: f64 = 35.0;
const STD_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            iterations: 600,
            learning_rate: 0.1,
            l2: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverClassifier {
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub trained_at: String,
}

/// Trains on every row with a label, weighting each class by n/(2·n_class)
/// so the sparse side of a lopsided league still pulls the decision
/// boundary. Both classes must be present.
pub fn train(rows: &[FeatureRow], cfg: ClassifierConfig) -> Result<OverClassifier> {
    let mut inputs = Vec::new();
    let mut labels = Vec::new();
    for row in rows {
        let Some(label) = row.is_over_2_5 else {
            continue;
        };
        inputs.push(row.full_inputs());
        labels.push(if label > 0 { 1.0_f64 } else { 0.0_f64 });
    }
    if labels.is_empty() {
        bail!("no usable training rows: every row is missing the over-2.5 label");
    }
    let positives = labels.iter().filter(|y| **y > 0.5).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        bail!(
            "training data has a single class ({} over, {} under); balanced weighting is undefined",
            positives,
            negatives
        );
    }

    let n = labels.len() as f64;
    let weight_pos = n / (2.0 * positives as f64);
    let weight_neg = n / (2.0 * negatives as f64);

    let feature_names = features::all_feature_columns();
    let dim = feature_names.len();
    let (means, stds) = fit_scaler(&inputs, dim);
    let scaled: Vec<Vec<f64>> = inputs.iter().map(|x| scale(x, &means, &stds)).collect();

    let mut intercept = 0.0_f64;
    let mut weights = vec![0.0_f64; dim];

    for _ in 0..cfg.iterations {
        let mut grad_intercept = 0.0_f64;
        let mut grad_weights = vec![0.0_f64; dim];
        for (x, y) in scaled.iter().zip(&labels) {
            let p = sigmoid_linear(x, &weights, intercept);
            let class_weight = if *y > 0.5 { weight_pos } else { weight_neg };
            let err = class_weight * (p - y);
            grad_intercept += err;
            for (g, xi) in grad_weights.iter_mut().zip(x) {
                *g += err * xi;
            }
        }
        // Balanced weights sum to n, so n still normalizes the gradient.
        intercept -= cfg.learning_rate * grad_intercept / n;
        for (w, g) in weights.iter_mut().zip(&grad_weights) {
            *w -= cfg.learning_rate * (g / n + cfg.l2 * *w);
        }
    }

    Ok(OverClassifier {
        feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
        means,
        stds,
        weights,
        intercept,
        trained_at: Utc::now().to_rfc3339(),
    })
}

impl OverClassifier {
    /// P(over 2.5) for the fixture's feature record.
    pub fn predict_proba(&self, row: &FeatureRow) -> f64 {
        let x = scale(&row.full_inputs(), &self.means, &self.stds);
        sigmoid_linear(&x, &self.weights, self.intercept)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create model dir {}", parent.display()))?;
        }
        let json = serde_json::to_string(self).context("serialize classifier")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write classifier")?;
        fs::rename(&tmp, path).context("swap classifier")?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read classifier {}", path.display()))?;
        let model: Self = serde_json::from_str(&raw).context("parse classifier")?;
        if model.feature_names != features::all_feature_columns() {
            bail!(
                "classifier {} was trained on a different feature schema",
                path.display()
            );
        }
        Ok(model)
    }
}

pub fn evaluate(model: &OverClassifier, test: &[FeatureRow]) -> Metrics {
    let mut probs = Vec::with_capacity(test.len());
    let mut labels = Vec::with_capacity(test.len());
    for row in test {
        let Some(label) = row.is_over_2_5 else {
            continue;
        };
        probs.push(model.predict_proba(row));
        labels.push(label);
    }
    eval::evaluate_binary(&probs, &labels)
}

/// Single-fixture inference; missing artifact or unfeaturizable fixture is
/// `None`.
pub fn predict_probability_for_fixture(
    conn: &Connection,
    model_path: &Path,
    fixture: &StoredFixture,
) -> Result<Option<f64>> {
    if fs::metadata(model_path).is_err() {
        return Ok(None);
    }
    let model = OverClassifier::load(model_path)?;
    let mut stats = StatsCache::new(conn);
    let Some(row) = features::fixture_features(conn, &mut stats, fixture, true)? else {
        return Ok(None);
    };
    Ok(Some(model.predict_proba(&row)))
}

/// Batch inference with a single artifact load and one statistics cache.
pub fn predict_probabilities(
    conn: &Connection,
    model_path: &Path,
    fixtures: &[StoredFixture],
) -> Result<Vec<(StoredFixture, f64)>> {
    if fs::metadata(model_path).is_err() {
        return Ok(Vec::new());
    }
    let model = OverClassifier::load(model_path)?;
    let mut stats = StatsCache::new(conn);
    let mut out = Vec::new();
    for fixture in fixtures {
        let Some(row) = features::fixture_features(conn, &mut stats, fixture, true)? else {
            continue;
        };
        out.push((fixture.clone(), model.predict_proba(&row)));
    }
    Ok(out)
}

fn sigmoid_linear(x: &[f64], weights: &[f64], intercept: f64) -> f64 {
    let mut linear = intercept;
    for (w, xi) in weights.iter().zip(x) {
        linear += w * xi;
    }
    let z = linear.clamp(-LOGIT_CLAMP, LOGIT_CLAMP);
    1.0 / (1.0 + (-z).exp())
}

fn fit_scaler(inputs: &[Vec<f64>], dim: usize) -> (Vec<f64>, Vec<f64>) {
    let n = inputs.len().max(1) as f64;
    let mut means = vec![0.0_f64; dim];
    for x in inputs {
        for (m, xi) in means.iter_mut().zip(x) {
            *m += xi;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    let mut stds = vec![0.0_f64; dim];
    for x in inputs {
        for ((s, xi), m) in stds.iter_mut().zip(x).zip(&means) {
            let d = xi - m;
            *s += d * d;
        }
    }
    for s in &mut stds {
        *s = (*s / n).sqrt().max(STD_FLOOR);
    }
    (means, stds)
}

fn scale(x: &[f64], means: &[f64], stds: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(means)
        .zip(stds)
        .map(|((xi, m), s)| (xi - m) / s)
        .collect()
}
