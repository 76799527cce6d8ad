//! Session configuration.
//!
//! [`MissionConfig`] gathers every tunable of a mission session. All fields
//! have defaults, so a JSON file only needs the keys it overrides:
//!
//! ```
//! use mission_engine::config::MissionConfig;
//!
//! let config = MissionConfig::from_json_str(r#"{ "operation_latency_ms": 4000 }"#).unwrap();
//! assert_eq!(config.operation_latency_ms, 4_000);
//! assert_eq!(config.tick_period_ms, 100);
//! ```

use std::path::Path;

use mission_core::state::Telemetry;
use mission_core::MissionError;
use serde::{Deserialize, Serialize};

/// Errors loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for [`MissionConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error(transparent)]
    Invalid(#[from] MissionError),
}

/// Tunables of a mission session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Mission milliseconds per tick. Must be positive.
    pub tick_period_ms: u64,
    /// Delay between sending an operation and its result.
    pub operation_latency_ms: u64,
    /// Delay between a successful puzzle validation and the modal closing.
    pub puzzle_close_delay_ms: u64,
    /// Mission time removed when a puzzle is solved on the first attempt.
    pub combo_bonus_ms: u64,
    /// Delay before a perturbed telemetry value is restored.
    pub telemetry_restore_delay_ms: u64,
    /// Signal quality at mission start, in `[0.0, 1.0]`.
    pub initial_signal_quality: f64,
    /// Link latency at mission start.
    pub initial_latency_ms: u64,
    /// Seed for puzzle generation.
    pub seed: u64,
    /// Console lines retained.
    pub console_capacity: usize,
    /// Run on a manual clock advanced one tick period per step instead of
    /// pacing ticks against the wall clock. `mission-sim --headless` forces
    /// it on.
    pub headless: bool,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 100,
            operation_latency_ms: 8_000,
            puzzle_close_delay_ms: 1_200,
            combo_bonus_ms: 5_000,
            telemetry_restore_delay_ms: 30_000,
            initial_signal_quality: 0.62,
            initial_latency_ms: 2_400,
            seed: 0x5EED,
            console_capacity: 500,
            headless: false,
        }
    }
}

impl MissionConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MissionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), MissionError> {
        if self.tick_period_ms == 0 {
            return Err(MissionError::InvalidConfig(
                "tick_period_ms must be positive".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&self.initial_signal_quality) {
            return Err(MissionError::InvalidConfig(format!(
                "initial_signal_quality must be within [0, 1], got {}",
                self.initial_signal_quality
            )));
        }
        Ok(())
    }

    /// Telemetry at mission start.
    pub fn initial_telemetry(&self) -> Telemetry {
        Telemetry {
            signal_quality: self.initial_signal_quality,
            latency_ms: self.initial_latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MissionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_period_ms, 100);
    }

    #[test]
    fn empty_json_yields_defaults() {
        let config = MissionConfig::from_json_str("{}").unwrap();
        assert_eq!(config, MissionConfig::default());
    }

    #[test]
    fn zero_tick_period_is_rejected() {
        let err = MissionConfig::from_json_str(r#"{ "tick_period_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(MissionError::InvalidConfig(_))));
    }

    #[test]
    fn out_of_range_signal_is_rejected() {
        let err = MissionConfig::from_json_str(r#"{ "initial_signal_quality": 1.5 }"#).unwrap_err();
        assert!(err.to_string().contains("initial_signal_quality"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = MissionConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = MissionConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
