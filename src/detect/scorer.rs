use crate::detect::{Confidence, Decision, DetectError, ScoreResult, SensorMatrix};
use serde::Serialize;

/// Calibrated tier boundaries. `t1` separates NORMAL from SUSPICIOUS, `t2` separates
/// SUSPICIOUS from ATTACK. Both boundaries belong to the upper tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    t1: f64,
    t2: f64,
}

impl Thresholds {
    pub fn new(t1: f64, t2: f64) -> Result<Self, DetectError> {
        if !t1.is_finite() || !t2.is_finite() || t1 >= t2 {
            return Err(DetectError::InvalidThresholds { t1, t2 });
        }
        Ok(Self { t1, t2 })
    }

    pub(crate) fn new_unchecked(t1: f64, t2: f64) -> Self {
        Self { t1, t2 }
    }

    pub fn t1(&self) -> f64 {
        self.t1
    }

    pub fn t2(&self) -> f64 {
        self.t2
    }
}

/// Turns normalized features into a [`ScoreResult`]. Pure; no I/O.
#[derive(Debug, Clone)]
pub struct Scorer {
    thresholds: Thresholds,
}

impl Scorer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Score an already-normalized matrix.
    pub fn score(&self, features: &SensorMatrix) -> ScoreResult {
        self.result_for(mean_abs(features))
    }

    /// Validate raw rows and score them.
    pub fn score_rows(&self, rows: Vec<Vec<f64>>) -> Result<ScoreResult, DetectError> {
        let features = SensorMatrix::new(rows)?;
        Ok(self.score(&features))
    }

    /// Build the result for a precomputed scalar score.
    pub fn result_for(&self, score: f64) -> ScoreResult {
        let (final_decision, confidence) = classify(score, self.thresholds);
        ScoreResult {
            final_decision,
            risk_score: risk_score(score),
            mahal_score: round4(score),
            confidence,
        }
    }
}

/// Mean absolute value over every cell.
pub fn mean_abs(features: &SensorMatrix) -> f64 {
    let n = features.value_count() as f64;
    let sum: f64 = features.values().map(f64::abs).sum();
    if sum.is_finite() {
        return sum / n;
    }
    // The plain sum overflowed; scale each term first
    features
        .values()
        .map(|v| v.abs() / n)
        .sum::<f64>()
        .min(f64::MAX)
}

/// Largest absolute value over every cell.
pub fn max_abs(features: &SensorMatrix) -> f64 {
    features.values().map(f64::abs).fold(0.0, f64::max)
}

/// `min(round(score * 20), 100)`, clamped to `[0, 100]`.
pub fn risk_score(score: f64) -> u8 {
    (score * 20.0).round().clamp(0.0, 100.0) as u8
}

pub fn round4(x: f64) -> f64 {
    // Past 1e15 an f64 carries no fractional digits, and scaling could overflow
    if x.abs() >= 1e15 {
        return x;
    }
    (x * 10_000.0).round() / 10_000.0
}

pub fn classify(score: f64, thresholds: Thresholds) -> (Decision, Confidence) {
    if score < thresholds.t1 {
        (Decision::Normal, Confidence::Low)
    } else if score < thresholds.t2 {
        (Decision::Suspicious, Confidence::Medium)
    } else {
        (Decision::Attack, Confidence::High)
    }
}
