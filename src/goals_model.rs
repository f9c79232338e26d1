//! Expected-goals model: a Poisson regression (log link) over the 13 core
//! form features, fit by deterministic full-batch gradient descent. The
//! fitted coefficients, together with the input scaler, are the artifact;
//! reloading one reproduces predictions bit for bit.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::eval::{self, Metrics};
use crate::features::{self, CORE_FEATURE_COLUMNS, FeatureRow};
use crate::fixture_store::StoredFixture;
use crate::poisson;
use crate::stats_lookup::StatsCache;

// Linear predictor bound; exp() past this is either astronomical or zero
// and destabilizes the gradient early in training.
const LINEAR_CLAMP: f64 = 20.0;
const STD_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
pub struct TrainConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            iterations: 400,
            learning_rate: 0.05,
            l2: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalsModel {
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub trained_at: String,
}

/// Fits on every row with a usable target; targets are clipped to
/// non-negative counts. Zero usable rows is an error, not a degenerate
/// model.
pub fn train(rows: &[FeatureRow], cfg: TrainConfig) -> Result<GoalsModel> {
    let mut inputs = Vec::new();
    let mut targets = Vec::new();
    for row in rows {
        let Some(target) = row.total_goals else {
            continue;
        };
        if !target.is_finite() {
            continue;
        }
        inputs.push(row.core_inputs());
        targets.push(target.max(0.0).round());
    }
    if targets.is_empty() {
        bail!("no usable training rows: every row is missing the goals target");
    }

    let dim = CORE_FEATURE_COLUMNS.len();
    let (means, stds) = fit_scaler(&inputs, dim);
    let scaled: Vec<Vec<f64>> = inputs.iter().map(|x| scale(x, &means, &stds)).collect();

    let n = targets.len() as f64;
    let mean_goals = targets.iter().sum::<f64>() / n;
    // Start at the league's base rate so early iterations refine rather
    // than recover from exp(0) = 1.
    let mut intercept = mean_goals.max(1e-9).ln();
    let mut weights = vec![0.0_f64; dim];

    for _ in 0..cfg.iterations {
        let mut grad_intercept = 0.0_f64;
        let mut grad_weights = vec![0.0_f64; dim];
        for (x, y) in scaled.iter().zip(&targets) {
            let lambda = rate(x, &weights, intercept);
            let err = lambda - y;
            grad_intercept += err;
            for (g, xi) in grad_weights.iter_mut().zip(x) {
                *g += err * xi;
            }
        }
        intercept -= cfg.learning_rate * grad_intercept / n;
        for (w, g) in weights.iter_mut().zip(&grad_weights) {
            *w -= cfg.learning_rate * (g / n + cfg.l2 * *w);
        }
    }

    Ok(GoalsModel {
        feature_names: CORE_FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
        means,
        stds,
        weights,
        intercept,
        trained_at: Utc::now().to_rfc3339(),
    })
}

impl GoalsModel {
    /// Expected total goals for the fixture's feature record. Always
    /// strictly positive (exp of a bounded linear predictor).
    pub fn predict_lambda(&self, row: &FeatureRow) -> f64 {
        let x = scale(&row.core_inputs(), &self.means, &self.stds);
        rate(&x, &self.weights, self.intercept)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create model dir {}", parent.display()))?;
        }
        let json = serde_json::to_string(self).context("serialize goals model")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write goals model")?;
        fs::rename(&tmp, path).context("swap goals model")?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read goals model {}", path.display()))?;
        let model: Self = serde_json::from_str(&raw).context("parse goals model")?;
        if model.feature_names != CORE_FEATURE_COLUMNS {
            bail!(
                "goals model {} was trained on a different feature schema",
                path.display()
            );
        }
        Ok(model)
    }
}

/// Predicted-lambda evaluation against the over-2.5 label: lambda becomes
/// P(over 2.5) through the Poisson engine, then log loss / accuracy /
/// Brier. Rows without a label are skipped.
pub fn evaluate_over25(model: &GoalsModel, test: &[FeatureRow]) -> Metrics {
    let mut probs = Vec::with_capacity(test.len());
    let mut labels = Vec::with_capacity(test.len());
    for row in test {
        let Some(label) = row.is_over_2_5 else {
            continue;
        };
        let lambda = model.predict_lambda(row);
        probs.push(poisson::prob_over_2_5(lambda));
        labels.push(label);
    }
    eval::evaluate_binary(&probs, &labels)
}

/// Single-fixture inference. A missing artifact or unfeaturizable fixture
/// is `None`, not an error; training commands treat missing files as fatal
/// instead.
pub fn predict_lambda_for_fixture(
    conn: &Connection,
    model_path: &Path,
    fixture: &StoredFixture,
) -> Result<Option<f64>> {
    if fs::metadata(model_path).is_err() {
        return Ok(None);
    }
    let model = GoalsModel::load(model_path)?;
    let mut stats = StatsCache::new(conn);
    let Some(row) = features::fixture_features(conn, &mut stats, fixture, true)? else {
        return Ok(None);
    };
    Ok(Some(model.predict_lambda(&row)))
}

/// Batch inference: the artifact is loaded once and one statistics cache
/// serves the whole pass. Fixtures whose features cannot be computed are
/// skipped.
pub fn predict_lambdas(
    conn: &Connection,
    model_path: &Path,
    fixtures: &[StoredFixture],
) -> Result<Vec<(StoredFixture, f64)>> {
    if fs::metadata(model_path).is_err() {
        return Ok(Vec::new());
    }
    let model = GoalsModel::load(model_path)?;
    let mut stats = StatsCache::new(conn);
    let mut out = Vec::new();
    for fixture in fixtures {
        let Some(row) = features::fixture_features(conn, &mut stats, fixture, true)? else {
            continue;
        };
        out.push((fixture.clone(), model.predict_lambda(&row)));
    }
    Ok(out)
}

fn rate(x: &[f64], weights: &[f64], intercept: f64) -> f64 {
    let mut linear = intercept;
    for (w, xi) in weights.iter().zip(x) {
        linear += w * xi;
    }
    linear.clamp(-LINEAR_CLAMP, LINEAR_CLAMP).exp()
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
