//! Poisson goal-count probabilities: P(k; lambda) = lambda^k e^(-lambda) / k!
//! and the Over 2.5 line, P(3+) = 1 - (P(0) + P(1) + P(2)).

/// Full distribution summary for one expected-goals value.
#[derive(Debug, Clone, Copy)]
pub struct GoalsDistribution {
    pub lambda: f64,
    pub p0: f64,
    pub p1: f64,
    pub p2: f64,
    pub prob_over_2_5: f64,
}

/// Probability of exactly `k` goals at expected goals `lambda`.
/// Out-of-domain inputs (negative lambda or k) and k > 100 return 0;
/// the k cap guards factorial overflow.
pub fn poisson_pmf(k: i64, lambda: f64) -> f64 {
    if lambda < 0.0 || k < 0 || k > 100 {
        return 0.0;
    }
    let numer = lambda.powi(k as i32) * (-lambda).exp();
    let denom = (1..=k).fold(1.0_f64, |acc, n| acc * n as f64);
    numer / denom
}

/// Probability of more than 2.5 goals (3 or more).
pub fn prob_over_2_5(lambda: f64) -> f64 {
    let p0 = poisson_pmf(0, lambda);
    let p1 = poisson_pmf(1, lambda);
    let p2 = poisson_pmf(2, lambda);
    1.0 - (p0 + p1 + p2)
}

pub fn distribution(lambda: f64) -> GoalsDistribution {
    GoalsDistribution {
        lambda,
        p0: poisson_pmf(0, lambda),
        p1: poisson_pmf(1, lambda),
        p2: poisson_pmf(2, lambda),
        prob_over_2_5: prob_over_2_5(lambda),
    }
}
