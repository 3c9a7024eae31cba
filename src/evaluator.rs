//! Expression evaluator contract.
//!
//! Evaluation is two-phase and explicit: the evaluator returns the value together with
//! every dependency pattern it read, so the engine never needs to know anything about
//! the expression language.

use crate::dependency::DependencyDetail;
use crate::error::EvaluationError;
use crate::node::Expression;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Dependency reported by an evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedDependency {
    pub path: String,
    #[serde(default)]
    pub details: Option<DependencyDetail>,
}

/// Successful evaluation: the value plus the dependencies discovered while computing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub value: Value,
    #[serde(default)]
    pub emits: Vec<EmittedDependency>,
}

impl Evaluation {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            emits: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, path: impl Into<String>) -> Self {
        self.emits.push(EmittedDependency {
            path: path.into(),
            details: None,
        });
        self
    }

    pub fn with_detailed_dependency(
        mut self,
        path: impl Into<String>,
        details: DependencyDetail,
    ) -> Self {
        self.emits.push(EmittedDependency {
            path: path.into(),
            details: Some(details),
        });
        self
    }

    pub fn dependency_patterns(&self) -> BTreeSet<String> {
        self.emits.iter().map(|emit| emit.path.clone()).collect()
    }

    pub fn dependency_details(&self) -> BTreeMap<String, DependencyDetail> {
        self.emits
            .iter()
            .filter_map(|emit| {
                emit.details
                    .as_ref()
                    .map(|details| (emit.path.clone(), details.clone()))
            })
            .collect()
    }
}

/// Which descriptor of a node is being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationKind {
    Expression,
    Condition,
}

/// Context handed to the evaluator
///
/// Scopes are only built by the propagator. Condition scopes bypass permission checks,
/// so a scope must never be constructible from untrusted callers.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationScope {
    tenant_id: String,
    target: String,
    entity: String,
    indices: Vec<usize>,
    kind: EvaluationKind,
    bypass_permissions: bool,
}

impl EvaluationScope {
    pub(crate) fn new(
        tenant_id: &str,
        target: &str,
        entity: &str,
        indices: Vec<usize>,
        kind: EvaluationKind,
    ) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            target: target.to_string(),
            entity: entity.to_string(),
            indices,
            kind,
            bypass_permissions: kind == EvaluationKind::Condition,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Entity qualifier of the node
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Array indices resolved in the target, outermost first
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn kind(&self) -> EvaluationKind {
        self.kind
    }

    pub fn bypass_permissions(&self) -> bool {
        self.bypass_permissions
    }
}

/// Injected expression evaluator
///
/// Implementations enforce their own timeouts and surface them as errors; the engine
/// awaits every call to completion.
#[async_trait]
pub trait ExpressionEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        expression: &Expression,
        scope: &EvaluationScope,
    ) -> Result<Evaluation, EvaluationError>;
}
