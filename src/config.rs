//! Classifier configuration
//!
//! Thresholds deciding when a site's rare-case counter means the slow path
//! is "likely" (property accesses give up on their cache) or merely
//! "possible" (call sites give up on their last seen callee).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for status classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Fraction of entries that must hit the slow case for it to be likely
    pub likely_to_take_slow_case_threshold: f64,
    /// Minimum slow-case count for it to be likely
    pub likely_to_take_slow_case_minimum_count: u32,
    /// Fraction of entries that must hit the slow case for it to be possible
    pub could_take_slow_case_threshold: f64,
    /// Minimum slow-case count for it to be possible
    pub could_take_slow_case_minimum_count: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            likely_to_take_slow_case_threshold: 0.15,
            likely_to_take_slow_case_minimum_count: 100,
            could_take_slow_case_threshold: 0.05,
            could_take_slow_case_minimum_count: 10,
        }
    }
}

impl ClassifierConfig {
    /// Load a configuration from a JSON file; missing fields keep defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: ClassifierConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds outside `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("likely_to_take_slow_case_threshold", self.likely_to_take_slow_case_threshold),
            ("could_take_slow_case_threshold", self.could_take_slow_case_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Whether `count` slow cases out of `entries` executions pass the "likely" bar
    pub fn is_likely_slow(&self, count: u32, entries: u32) -> bool {
        count >= self.likely_to_take_slow_case_minimum_count
            && ratio(count, entries) >= self.likely_to_take_slow_case_threshold
    }

    /// Whether `count` slow cases out of `entries` executions pass the "possible" bar
    pub fn is_possibly_slow(&self, count: u32, entries: u32) -> bool {
        count >= self.could_take_slow_case_minimum_count
            && ratio(count, entries) >= self.could_take_slow_case_threshold
    }
}

fn ratio(count: u32, entries: u32) -> f64 {
    count as f64 / entries.max(1) as f64
}
