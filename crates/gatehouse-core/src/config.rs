//! Runtime configuration for the validation status reader.

use std::path::Path;

use chrono::TimeDelta;
use serde::Deserialize;

use crate::Result;

const DEFAULT_EXPECTED_VALIDATION_SECS: u64 = 60 * 60;

fn default_expected_validation_duration_secs() -> u64 {
  DEFAULT_EXPECTED_VALIDATION_SECS
}

/// Settings deserialised from a config file and `GATEHOUSE_*` environment
/// variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationConfig {
  /// How long validation is expected to take before a package is reported
  /// as validating too long.
  #[serde(default = "default_expected_validation_duration_secs")]
  pub expected_validation_duration_secs: u64,
}

impl Default for ValidationConfig {
  fn default() -> Self {
    Self {
      expected_validation_duration_secs: DEFAULT_EXPECTED_VALIDATION_SECS,
    }
  }
}

impl ValidationConfig {
  /// Load settings from `path` (if given and present) overlaid with
  /// environment variables prefixed `GATEHOUSE_`.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let mut builder = ::config::Config::builder();
    if let Some(path) = path {
      builder = builder.add_source(::config::File::from(path).required(false));
    }
    let settings = builder
      .add_source(::config::Environment::with_prefix("GATEHOUSE"))
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  pub fn expected_validation_duration(&self) -> TimeDelta {
    i64::try_from(self.expected_validation_duration_secs)
      .ok()
      .and_then(TimeDelta::try_seconds)
      .unwrap_or(TimeDelta::MAX)
  }
}
