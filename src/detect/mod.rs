//! Anomaly scoring: sensor matrices in, three-tier decisions out.

pub mod matrix;
pub mod scorer;

pub use self::matrix::SensorMatrix;
pub use self::scorer::{Scorer, Thresholds};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("sensor matrix is empty")]
    EmptyMatrix,
    #[error("sensor data must be an array of rows")]
    NotAMatrix,
    #[error("row {row} has no features")]
    EmptyRow { row: usize },
    #[error("ragged sensor matrix: row {row} has {found} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("non-numeric value at row {row}, column {column}")]
    NonNumeric { row: usize, column: usize },
    #[error("non-finite value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },
    #[error("feature count mismatch: model expects {expected}, got {found}")]
    FeatureMismatch { expected: usize, found: usize },
    #[error("invalid thresholds: T1 ({t1}) must be finite and below T2 ({t2})")]
    InvalidThresholds { t1: f64, t2: f64 },
}

/// Decision tier derived from thresholding the anomaly score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Normal,
    Suspicious,
    Attack,
}

impl Decision {
    /// Whether this tier should be handed to the fault logger.
    pub fn is_fault(self) -> bool {
        !matches!(self, Decision::Normal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Normal => "NORMAL",
            Decision::Suspicious => "SUSPICIOUS",
            Decision::Attack => "ATTACK",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative confidence attached to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat, dashboard-friendly result of one scoring pass.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoreResult {
    pub final_decision: Decision,
    pub risk_score: u8,
    pub mahal_score: f64,
    pub confidence: Confidence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_serializes_upper_case() {
        let result = ScoreResult {
            final_decision: Decision::Suspicious,
            risk_score: 42,
            mahal_score: 2.1,
            confidence: Confidence::Medium,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["final_decision"], "SUSPICIOUS");
        assert_eq!(json["confidence"], "MEDIUM");
        assert_eq!(json["risk_score"], 42);
    }

    #[test]
    fn test_decision_ordering_follows_tiers() {
        assert!(Decision::Normal < Decision::Suspicious);
        assert!(Decision::Suspicious < Decision::Attack);
        assert!(!Decision::Normal.is_fault());
        assert!(Decision::Attack.is_fault());
    }
}
