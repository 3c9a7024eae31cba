//! Error types for the Ripple dependency-graph engine.

use thiserror::Error;

/// Engine errors
///
/// Target, entity-type and merge-policy errors are fatal and abort the operation that
/// raised them. Evaluation errors are recoverable: the propagator records them in the
/// node status and keeps sweeping.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not a valid target: {0}")]
    NotValidTarget(String),

    #[error("Unsupported entity type: {0}")]
    UnsupportedEntityType(String),

    #[error("Unsupported merge policy: {0}")]
    UnsupportedMergePolicy(String),

    #[error("Expression evaluation failed for {target}: {message}")]
    ExpressionEvaluation { target: String, message: String },

    #[error("Condition evaluation failed for {target}: {message}")]
    ConditionEvaluation { target: String, message: String },

    #[error("No entity snapshot provided for {0}")]
    MissingEntity(String),

    #[error("Change conversion failed for source {source_kind}: {message}")]
    Conversion {
        source_kind: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}

/// Error reported by an injected expression evaluator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct EvaluationError {
    pub message: String,
}

impl EvaluationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
