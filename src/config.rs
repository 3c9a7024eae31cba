//! Configuration System
//!
//! Layered configuration for the engine: sweep settings, the source mappings behind
//! [`ConfiguredConverter`](crate::dependency::ConfiguredConverter), and logging.
//! Environment variables override workspace files, which override the user file.

use crate::dependency::{ConfiguredConverter, SourceMapping};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Default segment standing in for "any document" in omni paths
pub const DEFAULT_OMNI_ID: &str = "*";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RippleConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    /// Change-event source kinds and how they map onto path space
    #[serde(default)]
    pub sources: BTreeMap<String, SourceMapping>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings applied to every sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_omni_id")]
    pub omni_id: String,
}

fn default_omni_id() -> String {
    DEFAULT_OMNI_ID.to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            omni_id: default_omni_id(),
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.omni_id.is_empty() {
            return Err("omni_id cannot be empty".to_string());
        }
        if self.omni_id.contains(|c| c == '.' || c == '{' || c == '}') {
            return Err(format!(
                "omni_id '{}' must be a single path segment",
                self.omni_id
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Engine(String),
    Source(String, String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Engine(msg) => write!(f, "Engine: {}", msg),
            ValidationError::Source(name, msg) => write!(f, "Source '{}': {}", name, msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RippleConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.engine.validate() {
            errors.push(ValidationError::Engine(e));
        }

        for (name, mapping) in &self.sources {
            if let Err(e) = mapping.validate() {
                errors.push(ValidationError::Source(name.clone(), e));
            }
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Converter over the configured source mappings
    pub fn converter(&self) -> ConfiguredConverter {
        ConfiguredConverter::new(self.sources.clone())
    }
}
