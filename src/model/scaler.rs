use crate::detect::{DetectError, SensorMatrix};
use serde::{Deserialize, Serialize};

/// Per-feature standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// A pass-through scaler for inputs that are already normalized.
    pub fn identity(features: usize) -> Self {
        Self {
            mean: vec![0.0; features],
            scale: vec![1.0; features],
        }
    }

    pub fn feature_count(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, raw: &SensorMatrix) -> Result<SensorMatrix, DetectError> {
        if raw.width() != self.feature_count() {
            return Err(DetectError::FeatureMismatch {
                expected: self.feature_count(),
                found: raw.width(),
            });
        }
        raw.map_columns(|j, v| (v - self.mean[j]) / self.scale[j])
    }
}
