//! Ripple: Reactive Dependency-Graph Evaluation Engine
//!
//! Computed values on business entities are described by dependency-graph nodes. When
//! an entity changes, ripple works out which nodes became dirty, re-evaluates them
//! through an injected [`evaluator::ExpressionEvaluator`], fans templated sub-nodes out
//! over array data, and returns merge-policy-aware update maps for the caller to write.

pub mod cli;
pub mod config;
pub mod dependency;
pub mod document;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod logging;
pub mod merge;
pub mod node;
pub mod propagation;
pub mod target;

pub use engine::{Engine, SweepReport};
pub use error::{EngineError, EvaluationError};
