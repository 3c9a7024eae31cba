//! Dependency-graph node domain types.

use crate::dependency::DependencyDetail;
use crate::merge::MergePolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;

/// Opaque expression descriptor, interpreted only by the injected evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression(Value);

impl Expression {
    pub fn new(descriptor: Value) -> Self {
        Self(descriptor)
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl Deref for Expression {
    type Target = Value;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Node status within one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    #[default]
    Dirty,
    Ok,
    ErrorExpression,
    ErrorCondition,
}

impl NodeStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, NodeStatus::ErrorExpression | NodeStatus::ErrorCondition)
    }
}

/// Unit of computation in the dependency graph
///
/// Dependency sets are the ones discovered by the *last* evaluation; `sub_nodes` is
/// rebuilt from `sub_nodes_definitions` and the current data shape on every sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraphNode {
    pub target: String,

    /// Entity qualifier, e.g. `CASE.123`
    pub entity: String,

    #[serde(default)]
    pub expression: Option<Expression>,

    #[serde(default)]
    pub condition: Option<Expression>,

    #[serde(default)]
    pub expression_deps: BTreeSet<String>,

    #[serde(default)]
    pub condition_deps: BTreeSet<String>,

    #[serde(default)]
    pub expression_deps_details: BTreeMap<String, DependencyDetail>,

    #[serde(default)]
    pub condition_deps_detail: BTreeMap<String, DependencyDetail>,

    /// Patterns contributed by descendants
    #[serde(default)]
    pub child_deps: BTreeSet<String>,

    /// Statically supplied patterns
    #[serde(default)]
    pub definition_deps: BTreeSet<String>,

    #[serde(default)]
    pub status: NodeStatus,

    #[serde(default)]
    pub last_condition_value: Option<bool>,

    #[serde(default)]
    pub policy: MergePolicy,

    #[serde(default)]
    pub sub_nodes_definitions: Vec<DependencyGraphNode>,

    #[serde(default)]
    pub sub_nodes: Vec<DependencyGraphNode>,

    pub tenant_id: String,

    #[serde(default)]
    pub version: u64,

    /// Changed paths that triggered the current recompute; attached per sweep
    #[serde(skip)]
    pub dirty_reason: BTreeSet<String>,
}

impl DependencyGraphNode {
    pub fn new(
        target: impl Into<String>,
        entity: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            entity: entity.into(),
            expression: None,
            condition: None,
            expression_deps: BTreeSet::new(),
            condition_deps: BTreeSet::new(),
            expression_deps_details: BTreeMap::new(),
            condition_deps_detail: BTreeMap::new(),
            child_deps: BTreeSet::new(),
            definition_deps: BTreeSet::new(),
            status: NodeStatus::Dirty,
            last_condition_value: None,
            policy: MergePolicy::default(),
            sub_nodes_definitions: Vec::new(),
            sub_nodes: Vec::new(),
            tenant_id: tenant_id.into(),
            version: 0,
            dirty_reason: BTreeSet::new(),
        }
    }

    pub fn with_expression(mut self, expression: impl Into<Expression>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<Expression>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sub_node_definition(mut self, definition: DependencyGraphNode) -> Self {
        self.sub_nodes_definitions.push(definition);
        self
    }

    pub fn with_definition_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition_deps.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Expression and definition patterns: the dependencies the node owns itself
    pub fn own_dependency_patterns(&self) -> impl Iterator<Item = &String> {
        self.expression_deps.iter().chain(self.definition_deps.iter())
    }

    /// Every pattern of this node and its live sub-nodes
    pub fn all_dependency_patterns(&self) -> BTreeSet<String> {
        let mut patterns: BTreeSet<String> = self.own_dependency_patterns().cloned().collect();
        patterns.extend(self.condition_deps.iter().cloned());
        patterns.extend(self.child_deps.iter().cloned());
        patterns
    }
}
