//! Pretrained deployment bundle: scaler, tier thresholds and Mahalanobis parameters.
//!
//! The bundle is produced offline and treated as immutable configuration. It is loaded
//! once at startup and shared behind [`AnomalyModel`] so the scorer never depends on a
//! concrete model.

pub mod scaler;

pub use self::scaler::StandardScaler;

use crate::detect::{DetectError, SensorMatrix, Thresholds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

// Uncalibrated fallback for a fresh install without a trained artifact
const DEFAULT_BUNDLE_JSON: &str = include_str!("default_bundle.json");

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to read model bundle {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model bundle: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model bundle: {0}")]
    Invalid(String),
    #[error(transparent)]
    Thresholds(#[from] DetectError),
}

/// The seam between the scorer and whatever statistical model produced its inputs.
pub trait AnomalyModel: Send + Sync {
    /// Normalize raw readings into the space the thresholds were calibrated in.
    fn transform(&self, raw: &SensorMatrix) -> Result<SensorMatrix, DetectError>;

    fn thresholds(&self) -> Thresholds;

    fn feature_count(&self) -> usize;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub scaler: StandardScaler,
    pub t1: f64,
    pub t2: f64,
    #[serde(default)]
    pub mahal_mu: Vec<f64>,
    #[serde(default)]
    pub mahal_cov_inv: Vec<Vec<f64>>,
}

impl ModelBundle {
    pub fn new(scaler: StandardScaler, thresholds: Thresholds) -> Self {
        Self {
            scaler,
            t1: thresholds.t1(),
            t2: thresholds.t2(),
            mahal_mu: Vec::new(),
            mahal_cov_inv: Vec::new(),
        }
    }

    /// Load and validate a bundle from a JSON file.
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let content = std::fs::read_to_string(path).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            features = bundle.scaler.feature_count(),
            t1 = bundle.t1,
            t2 = bundle.t2,
            "loaded model bundle"
        );
        Ok(bundle)
    }

    /// Load from `path`, falling back to the embedded default if missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using embedded default model bundle");
                Self::embedded()
            }
        }
    }

    pub fn embedded() -> Self {
        // Covered by test_embedded_bundle_is_valid
        Self::from_json_str(DEFAULT_BUNDLE_JSON).expect("embedded default bundle is invalid")
    }

    pub fn from_json_str(content: &str) -> Result<Self, BundleError> {
        let bundle: Self = serde_json::from_str(content)?;
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn validate(&self) -> Result<(), BundleError> {
        Thresholds::new(self.t1, self.t2)?;

        let n = self.scaler.mean.len();
        if n == 0 {
            return Err(BundleError::Invalid("scaler has no features".into()));
        }
        if self.scaler.scale.len() != n {
            return Err(BundleError::Invalid(format!(
                "scaler mean has {} entries but scale has {}",
                n,
                self.scaler.scale.len()
            )));
        }
        if let Some(i) = self
            .scaler
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(BundleError::Invalid(format!(
                "scaler scale[{}] must be finite and non-zero",
                i
            )));
        }
        if self.scaler.mean.iter().any(|m| !m.is_finite()) {
            return Err(BundleError::Invalid("scaler mean must be finite".into()));
        }
        if !self.mahal_mu.is_empty() && self.mahal_mu.len() != n {
            return Err(BundleError::Invalid(format!(
                "mahal_mu has {} entries, expected {}",
                self.mahal_mu.len(),
                n
            )));
        }
        if !self.mahal_cov_inv.is_empty()
            && (self.mahal_cov_inv.len() != n || self.mahal_cov_inv.iter().any(|r| r.len() != n))
        {
            return Err(BundleError::Invalid(format!(
                "mahal_cov_inv must be {}x{}",
                n, n
            )));
        }
        Ok(())
    }
}

impl AnomalyModel for ModelBundle {
    fn transform(&self, raw: &SensorMatrix) -> Result<SensorMatrix, DetectError> {
        self.scaler.transform(raw)
    }

    fn thresholds(&self) -> Thresholds {
        // validate() has already checked the ordering
        Thresholds::new_unchecked(self.t1, self.t2)
    }

    fn feature_count(&self) -> usize {
        self.scaler.feature_count()
    }
}
