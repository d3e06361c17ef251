//! Reader configuration.

use serde::Deserialize;
use strata_common::{Result, error::Error, verify_arg};

/// Tunables of the values reader.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Minimum number of documents in a contiguous segment run for its stored
    /// fields to be loaded in sequential mode.
    pub sequential_stored_fields_threshold: usize,
    /// At or above this many fields the operator description only carries the
    /// field count.
    pub describe_field_limit: usize,
    /// When `false` every field is read one document at a time.
    pub column_at_a_time: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            sequential_stored_fields_threshold: 10,
            describe_field_limit: 10,
            column_at_a_time: true,
        }
    }
}

impl ReaderConfig {
    /// Parses a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<ReaderConfig> {
        let config: ReaderConfig = serde_json::from_str(json)
            .map_err(|e| Error::invalid_arg("reader_config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(
            sequential_stored_fields_threshold,
            self.sequential_stored_fields_threshold > 0
        );
        verify_arg!(describe_field_limit, self.describe_field_limit > 0);
        Ok(())
    }
}
