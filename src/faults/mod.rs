//! Fault deduplication: match a new fault signature against stored faults, or log it.

pub mod matcher;
pub mod store;

pub use self::matcher::{find_similar, resolve_in, FaultDefaults, FaultLogger};
pub use self::store::FaultStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Two faults on the same sensor are the same fault when their mean errors differ by
/// strictly less than this...
pub const MEAN_ERROR_TOLERANCE: f64 = 0.01;
/// ...and their max errors by strictly less than this.
pub const MAX_ERROR_TOLERANCE: f64 = 0.02;

pub const DEFAULT_SOLUTION: &str = "Pending analysis";
pub const DEFAULT_REMARKS: &str = "Auto-logged by system";

/// Timestamp layout for `detected_at`.
pub const DETECTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Differences are compared at this decimal precision so that values one tolerance
// apart in decimal are not matched through binary representation error.
const DIFF_PRECISION: f64 = 1e9;

#[derive(Debug, Error)]
pub enum FaultError {
    #[error("invalid fault signature: {0}")]
    Validation(String),
    #[error("fault store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<rusqlite::Error> for FaultError {
    fn from(e: rusqlite::Error) -> Self {
        FaultError::StoreUnavailable(e.to_string())
    }
}

impl From<r2d2::Error> for FaultError {
    fn from(e: r2d2::Error) -> Self {
        FaultError::StoreUnavailable(e.to_string())
    }
}

/// The approximate identity of a fault, as observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultSignature {
    pub fault_type: String,
    pub mean_error: f64,
    pub max_error: f64,
    pub affected_sensor: String,
    pub severity: String,
}

impl FaultSignature {
    pub fn validate(&self) -> Result<(), FaultError> {
        if self.affected_sensor.trim().is_empty() {
            return Err(FaultError::Validation("affected_sensor is empty".into()));
        }
        if !self.mean_error.is_finite() {
            return Err(FaultError::Validation(format!(
                "mean_error must be finite, got {}",
                self.mean_error
            )));
        }
        if !self.max_error.is_finite() {
            return Err(FaultError::Validation(format!(
                "max_error must be finite, got {}",
                self.max_error
            )));
        }
        Ok(())
    }
}

/// A persisted fault. `fault_id` is assigned by the store and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub fault_id: i64,
    pub fault_type: String,
    pub mean_error: f64,
    pub max_error: f64,
    pub affected_sensor: String,
    pub severity: String,
    pub detected_at: String,
    pub solution: String,
    pub remarks: String,
}

/// A fault record before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFault {
    pub fault_type: String,
    pub mean_error: f64,
    pub max_error: f64,
    pub affected_sensor: String,
    pub severity: String,
    pub detected_at: String,
    pub solution: String,
    pub remarks: String,
}

impl NewFault {
    pub fn from_signature(
        signature: &FaultSignature,
        solution: &str,
        remarks: &str,
        detected_at: &str,
    ) -> Self {
        Self {
            fault_type: signature.fault_type.clone(),
            mean_error: signature.mean_error,
            max_error: signature.max_error,
            affected_sensor: signature.affected_sensor.clone(),
            severity: signature.severity.clone(),
            detected_at: detected_at.to_string(),
            solution: solution.to_string(),
            remarks: remarks.to_string(),
        }
    }
}

/// Remediation details of a previously recorded fault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnownFault {
    pub fault_id: i64,
    pub fault_type: String,
    pub severity: String,
    pub solution: String,
}

impl From<FaultRecord> for KnownFault {
    fn from(r: FaultRecord) -> Self {
        Self {
            fault_id: r.fault_id,
            fault_type: r.fault_type,
            severity: r.severity,
            solution: r.solution,
        }
    }
}

/// What `resolve_fault` did with a signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum Outcome {
    /// A near-duplicate exists; here is its stored remediation. Nothing was written.
    Known {
        fault_type: String,
        severity: String,
        solution: String,
    },
    /// No near-duplicate; a new record was inserted.
    Logged { fault_id: i64 },
}

impl From<KnownFault> for Outcome {
    fn from(k: KnownFault) -> Self {
        Outcome::Known {
            fault_type: k.fault_type,
            severity: k.severity,
            solution: k.solution,
        }
    }
}

fn within(a: f64, b: f64, tolerance: f64) -> bool {
    let diff = ((a - b).abs() * DIFF_PRECISION).round() / DIFF_PRECISION;
    diff < tolerance
}

/// The sole equality relation over faults.
pub fn is_duplicate(record: &FaultRecord, signature: &FaultSignature) -> bool {
    record.affected_sensor == signature.affected_sensor
        && within(record.mean_error, signature.mean_error, MEAN_ERROR_TOLERANCE)
        && within(record.max_error, signature.max_error, MAX_ERROR_TOLERANCE)
}

/// Current UTC time in [`DETECTED_AT_FORMAT`].
pub fn now_timestamp() -> String {
    chrono::Utc::now().format(DETECTED_AT_FORMAT).to_string()
}
