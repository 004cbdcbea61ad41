//! Suite configuration
//!
//! A [`SuiteConfig`] can be written in TOML, overridden from
//! `SYNAPSED_CONFORMANCE_*` environment variables, or built in code. Every
//! field has a default, so an empty document is a valid configuration.
//!
//! ```toml
//! acceleration = "portable"
//! repetitions = 3
//! tamper_checks = true
//! filter = "GCM"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConformanceError, Result};

/// Prefix of the environment variables read by [`SuiteConfig::from_env`]
pub const ENV_PREFIX: &str = "SYNAPSED_CONFORMANCE";

/// Which code paths a suite exercises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccelerationPolicy {
    /// Portable always; accelerated as well when the probe reports it usable
    #[default]
    Auto,
    /// Portable only
    Portable,
}

impl FromStr for AccelerationPolicy {
    type Err = ConformanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "portable" => Ok(Self::Portable),
            other => Err(ConformanceError::config(format!(
                "unknown acceleration policy `{other}`"
            ))),
        }
    }
}

/// Knobs for building and running a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Code paths to exercise
    pub acceleration: AccelerationPolicy,
    /// Times each forward operation runs, each on a fresh instance
    pub repetitions: u8,
    /// Run the tag and ciphertext tamper checks on AEAD cases
    pub tamper_checks: bool,
    /// Cross-check CTR output against an independently built keystream
    pub keystream_checks: bool,
    /// Stop the run at the first failing or erroring case
    pub stop_on_failure: bool,
    /// Only keep vectors whose description contains this text
    pub filter: Option<String>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            acceleration: AccelerationPolicy::Auto,
            repetitions: 2,
            tamper_checks: true,
            keystream_checks: true,
            stop_on_failure: false,
            filter: None,
        }
    }
}

impl SuiteConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(ConformanceError::config)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConformanceError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Defaults overridden by `SYNAPSED_CONFORMANCE_*` variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    /// Apply `SYNAPSED_CONFORMANCE_*` variables on top of this configuration
    pub fn with_env(self) -> Result<Self> {
        let overrides = std::env::vars().filter_map(|(key, value)| {
            key.strip_prefix(ENV_PREFIX)
                .map(|rest| (rest.trim_start_matches('_').to_lowercase(), value))
        });
        self.apply_overrides(overrides)
    }

    /// Apply `key = value` overrides; keys use the field names
    pub fn apply_overrides<I, K, V>(mut self, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in overrides {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                "acceleration" => self.acceleration = value.parse()?,
                "repetitions" => self.repetitions = parse_value(key, value)?,
                "tamper_checks" => self.tamper_checks = parse_value(key, value)?,
                "keystream_checks" => self.keystream_checks = parse_value(key, value)?,
                "stop_on_failure" => self.stop_on_failure = parse_value(key, value)?,
                "filter" => {
                    self.filter = if value.is_empty() {
                        None
                    } else {
                        Some(value.to_string())
                    }
                }
                other => {
                    return Err(ConformanceError::config(format!(
                        "unknown setting `{other}`"
                    )))
                }
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.repetitions == 0 {
            return Err(ConformanceError::config("repetitions must be at least 1"));
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ConformanceError::config(format!("invalid `{key}` value `{value}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SuiteConfig::default();
        assert_eq!(config.acceleration, AccelerationPolicy::Auto);
        assert_eq!(config.repetitions, 2);
        assert!(config.tamper_checks);
        assert!(config.keystream_checks);
        assert!(!config.stop_on_failure);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(SuiteConfig::from_toml_str("").unwrap(), SuiteConfig::default());
    }

    #[test]
    fn test_toml_fields() {
        let config = SuiteConfig::from_toml_str(
            "acceleration = \"portable\"\nrepetitions = 3\nfilter = \"GCM\"\n",
        )
        .unwrap();
        assert_eq!(config.acceleration, AccelerationPolicy::Portable);
        assert_eq!(config.repetitions, 3);
        assert_eq!(config.filter.as_deref(), Some("GCM"));
    }

    #[test]
    fn test_toml_rejects_unknown_and_zero() {
        assert!(matches!(
            SuiteConfig::from_toml_str("repeat = 2"),
            Err(ConformanceError::Config(_))
        ));
        assert!(SuiteConfig::from_toml_str("repetitions = 0").is_err());
    }

    #[test]
    fn test_overrides() {
        let config = SuiteConfig::default()
            .apply_overrides([("tamper_checks", "false"), ("acceleration", "PORTABLE"), ("filter", "")])
            .unwrap();
        assert!(!config.tamper_checks);
        assert_eq!(config.acceleration, AccelerationPolicy::Portable);
        assert!(config.filter.is_none());

        assert!(SuiteConfig::default()
            .apply_overrides([("repetitions", "many")])
            .is_err());
        assert!(SuiteConfig::default()
            .apply_overrides([("colour", "blue")])
            .is_err());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("SYNAPSED_CONFORMANCE_STOP_ON_FAILURE", "true");
        std::env::set_var("SYNAPSED_CONFORMANCE_REPETITIONS", "4");

        let config = SuiteConfig::from_env().unwrap();
        assert!(config.stop_on_failure);
        assert_eq!(config.repetitions, 4);

        // Cleanup
        std::env::remove_var("SYNAPSED_CONFORMANCE_STOP_ON_FAILURE");
        std::env::remove_var("SYNAPSED_CONFORMANCE_REPETITIONS");
    }
}
