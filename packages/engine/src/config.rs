//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document (or no file at
//! all) yields [`EngineConfig::default`].
//!
//! ```toml
//! quiet_period_ms = 1500
//! min_refresh_interval_secs = 10
//! data_dir = "data"
//!
//! [admission]
//! foreground_min_step_degrees = 0.0001
//! background_min_step_degrees = 0.0003
//!
//! [coverage]
//! visibility_radius_meters = 60.0
//! sample_step_degrees = 0.00075
//! max_grid_samples = 250000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use fog_map_coverage::CoverageConfig;
use fog_map_ledger_models::AdmissionThresholds;
use serde::{Deserialize, Serialize};

/// Errors loading an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The config is not valid TOML for [`EngineConfig`].
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    /// A value parsed but is out of range.
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Tunables for [`ExplorationEngine`](crate::ExplorationEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Spacing thresholds for the admission policy.
    pub admission: AdmissionThresholds,
    /// Coverage grid settings.
    pub coverage: CoverageConfig,
    /// Quiet period before a foreground flush, in milliseconds.
    pub quiet_period_ms: u64,
    /// Minimum time between unforced group refreshes, in seconds.
    pub min_refresh_interval_secs: u64,
    /// Directory for the file-backed store. `None` keeps everything in
    /// memory.
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admission: AdmissionThresholds::default(),
            coverage: CoverageConfig::default(),
            quiet_period_ms: 1500,
            min_refresh_interval_secs: 10,
            data_dir: None,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// * If `s` is not valid TOML for this struct
    /// * If a threshold or radius is negative or not finite
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    /// * If its contents are invalid (see [`from_toml_str`](Self::from_toml_str))
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Rejects values that would make admission or coverage meaningless.
    ///
    /// # Errors
    ///
    /// * If any distance is negative or not finite
    /// * If the background spacing is smaller than the foreground spacing
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = |value: f64| value.is_finite() && value >= 0.0;

        if !non_negative(self.admission.foreground_min_step_degrees) {
            return Err(ConfigError::Invalid {
                field: "admission.foreground_min_step_degrees",
                reason: "must be a finite, non-negative number",
            });
        }
        if !non_negative(self.admission.background_min_step_degrees) {
            return Err(ConfigError::Invalid {
                field: "admission.background_min_step_degrees",
                reason: "must be a finite, non-negative number",
            });
        }
        if self.admission.background_min_step_degrees < self.admission.foreground_min_step_degrees {
            return Err(ConfigError::Invalid {
                field: "admission.background_min_step_degrees",
                reason: "must not be smaller than admission.foreground_min_step_degrees",
            });
        }
        if !non_negative(self.coverage.visibility_radius_meters) {
            return Err(ConfigError::Invalid {
                field: "coverage.visibility_radius_meters",
                reason: "must be a finite, non-negative number",
            });
        }
        if !(self.coverage.sample_step_degrees.is_finite() && self.coverage.sample_step_degrees > 0.0)
        {
            return Err(ConfigError::Invalid {
                field: "coverage.sample_step_degrees",
                reason: "must be a finite, positive number",
            });
        }
        Ok(())
    }

    /// [`quiet_period_ms`](Self::quiet_period_ms) as a [`Duration`].
    #[must_use]
    pub const fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// [`min_refresh_interval_secs`](Self::min_refresh_interval_secs) as a
    /// [`Duration`].
    #[must_use]
    pub const fn min_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.min_refresh_interval_secs)
    }
}
