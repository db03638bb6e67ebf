//! TOML configuration for HydroVigil.
//!
//! Sections default independently, so a config file only needs the keys it changes.
//! The file is located via `--config`, then `HYDROVIGIL_CONFIG`, then
//! `/etc/hydrovigil/hydrovigil.toml`, then compiled-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::faults::{FaultDefaults, DEFAULT_REMARKS, DEFAULT_SOLUTION};

pub const CONFIG_ENV: &str = "HYDROVIGIL_CONFIG";
const SYSTEM_CONFIG_PATH: &str = "/etc/hydrovigil/hydrovigil.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub faults: FaultsConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// An explicit path must load; the fallbacks are best-effort.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        Ok(Self::load_or_default())
    }

    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "HYDROVIGIL_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file holding the fault table.
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "data/faults.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// JSON deployment bundle (scaler, thresholds, Mahalanobis parameters).
    pub bundle_path: PathBuf,
    /// Refuse to start without a valid bundle instead of using the embedded default.
    pub require_bundle: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            bundle_path: PathBuf::from("model/deployment_bundle.json"),
            require_bundle: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultsConfig {
    pub default_solution: String,
    pub default_remarks: String,
    /// Page size for fault listings.
    pub list_limit: usize,
}

impl Default for FaultsConfig {
    fn default() -> Self {
        Self {
            default_solution: DEFAULT_SOLUTION.to_string(),
            default_remarks: DEFAULT_REMARKS.to_string(),
            list_limit: 50,
        }
    }
}

impl FaultsConfig {
    pub fn defaults(&self) -> FaultDefaults {
        FaultDefaults {
            solution: self.default_solution.clone(),
            remarks: self.default_remarks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.storage.db_path, "data/faults.db");
        assert_eq!(cfg.faults.default_solution, "Pending analysis");
        assert_eq!(cfg.faults.default_remarks, "Auto-logged by system");
        assert!(!cfg.model.require_bundle);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\ndb_path = \"/tmp/hv.db\"\n\n[faults]\nlist_limit = 5").unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.storage.db_path, "/tmp/hv.db");
        assert_eq!(cfg.faults.list_limit, 5);
        assert_eq!(cfg.faults.default_solution, "Pending analysis");
        assert_eq!(cfg.server.bind, "0.0.0.0:8000");
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        assert!(Config::resolve(Some(Path::new("/nonexistent/hydrovigil.toml"))).is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage\ndb_path = ").unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}
