//! Binary evaluation shared by the expected-goals route and the direct
//! classifier: log loss, accuracy at 0.5, Brier score.

/// Probabilities are clipped into [PROB_EPS, 1 - PROB_EPS] before the log
/// loss so a confidently wrong prediction stays finite.
pub const PROB_EPS: f64 = 1e-15;

#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub samples: usize,
    pub log_loss: f64,
    pub accuracy: f64,
    pub brier: f64,
}

impl Metrics {
    pub fn empty() -> Self {
        Self {
            samples: 0,
            log_loss: 0.0,
            accuracy: 0.0,
            brier: 0.0,
        }
    }
}

/// Evaluates P(over) predictions against 0/1 labels. Mismatched or empty
/// inputs produce the zeroed metrics rather than a panic.
pub fn evaluate_binary(probs: &[f64], labels: &[i64]) -> Metrics {
    if probs.is_empty() || probs.len() != labels.len() {
        return Metrics::empty();
    }

    let mut log_loss_sum = 0.0_f64;
    let mut brier_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p_raw, label) in probs.iter().zip(labels) {
        let p = p_raw.clamp(PROB_EPS, 1.0 - PROB_EPS);
        let y = if *label > 0 { 1.0 } else { 0.0 };
        log_loss_sum += -(y * p.ln() + (1.0 - y) * (1.0 - p).ln());
        brier_sum += (p - y) * (p - y);
        if (p >= 0.5) == (*label > 0) {
            correct += 1;
        }
    }

    let n = probs.len() as f64;
    Metrics {
        samples: probs.len(),
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
        brier: brier_sum / n,
    }
}
