//! End-to-end analysis: raw readings -> normalized features -> score -> fault resolution.

use crate::detect::scorer::{max_abs, mean_abs};
use crate::detect::{Decision, DetectError, ScoreResult, Scorer, SensorMatrix};
use crate::faults::{FaultError, FaultLogger, FaultSignature, Outcome};
use crate::model::AnomalyModel;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error(transparent)]
    Fault(#[from] FaultError),
}

/// Result of one scoring pass, plus the error magnitudes a fault signature is built from.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    #[serde(flatten)]
    pub result: ScoreResult,
    pub mean_error: f64,
    pub max_error: f64,
}

impl Analysis {
    /// The fault signature for this pass, or `None` when the decision is NORMAL.
    pub fn signature(&self, sensor: &str) -> Option<FaultSignature> {
        let (fault_type, severity) = match self.result.final_decision {
            Decision::Normal => return None,
            Decision::Suspicious => ("Anomalous Behaviour", "Medium"),
            Decision::Attack => ("Suspected Attack", "High"),
        };
        Some(FaultSignature {
            fault_type: fault_type.to_string(),
            mean_error: self.mean_error,
            max_error: self.max_error,
            affected_sensor: sensor.to_string(),
            severity: severity.to_string(),
        })
    }
}

pub struct Analyzer {
    model: Arc<dyn AnomalyModel>,
    scorer: Scorer,
}

impl Analyzer {
    pub fn new(model: Arc<dyn AnomalyModel>) -> Self {
        let scorer = Scorer::new(model.thresholds());
        Self { model, scorer }
    }

    pub fn feature_count(&self) -> usize {
        self.model.feature_count()
    }

    pub fn analyze(&self, raw: &SensorMatrix) -> Result<Analysis, DetectError> {
        let features = self.model.transform(raw)?;
        let mean_error = mean_abs(&features);
        let result = self.scorer.result_for(mean_error);
        debug!(
            rows = features.len(),
            score = mean_error,
            decision = %result.final_decision,
            "scored sensor window"
        );
        Ok(Analysis {
            result,
            mean_error,
            max_error: max_abs(&features),
        })
    }

    /// Score, then hand fault-tier results to the logger. NORMAL never touches the store.
    pub fn analyze_and_resolve(
        &self,
        raw: &SensorMatrix,
        sensor: &str,
        logger: &FaultLogger,
    ) -> Result<(Analysis, Option<Outcome>), PipelineError> {
        let analysis = self.analyze(raw)?;
        let outcome = match analysis.signature(sensor) {
            Some(signature) => {
                warn!(
                    sensor,
                    decision = %analysis.result.final_decision,
                    risk = analysis.result.risk_score,
                    "fault-tier reading"
                );
                Some(logger.resolve_fault(&signature)?)
            }
            None => None,
        };
        Ok((analysis, outcome))
    }
}
