//! Engine configuration loaded from TOML.
//!
//! ```toml
//! [calibration]
//! k_multiplier = 2.0
//! max_daily_movement = 0.02
//! smoothing_factor = 0.3
//!
//! [simulation]
//! days = 30
//! trials = 500
//! seed = 42
//!
//! [narrative]
//! case_sensitive_markers = true
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::narrative::MarkerMatch;
use crate::simulation::Calibration;
use crate::Result;

impl Default for Calibration {
    fn default() -> Self {
        Self::new(2.0, 0.02, 0.3)
    }
}

/// Horizon and batch settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    /// Days to simulate; also the annualisation horizon
    pub days: usize,
    /// Number of independent trials for batch runs
    pub trials: usize,
    /// Fixed seed for reproducible runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            days: 30,
            trials: 1,
            seed: None,
        }
    }
}

/// Narrative extraction settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NarrativeSettings {
    pub case_sensitive_markers: bool,
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            case_sensitive_markers: true,
        }
    }
}

impl NarrativeSettings {
    pub fn marker_match(&self) -> MarkerMatch {
        if self.case_sensitive_markers {
            MarkerMatch::CaseSensitive
        } else {
            MarkerMatch::CaseInsensitive
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub calibration: Calibration,
    pub simulation: SimulationSettings,
    pub narrative: NarrativeSettings,
}

impl EngineConfig {
    /// Get the default config file path.
    ///
    /// Default path: `~/.folio/config.toml`
    /// Can be overridden with `FOLIO_CONFIG_FILE` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("FOLIO_CONFIG_FILE") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".folio/config.toml"))
            .unwrap_or_else(|| PathBuf::from("folio.toml"))
    }

    /// Load from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Load from a specific path; a missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.calibration.validate()?;
        Ok(config)
    }
}
