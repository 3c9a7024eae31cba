//! Node Evaluation and Propagation
//!
//! Recomputes one node per call: evaluates its condition and expression, decides whether
//! the fresh value may overwrite the entity, expands array-shaped sub-nodes from their
//! definitions, recurses into them depth-first and folds their updates into the
//! parent's under each child's vertical merge policy.
//!
//! Evaluation failures never abort the sweep: they are recorded in the node status and
//! returned alongside the outcome. Malformed targets and unsupported entity types are
//! fatal.

use crate::dependency::pattern::{matches_any, path_matches_pattern};
use crate::document::value_at;
use crate::error::EngineError;
use crate::evaluator::{EvaluationKind, EvaluationScope, ExpressionEvaluator};
use crate::merge::{merge_vertical, update_target_value, NodeUpdate, UpdatesMap};
use crate::node::{DependencyGraphNode, NodeStatus};
use crate::target::{is_index, logical_parent, resolve_target, split_segments, INDEX_PLACEHOLDER};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Result of processing one node
#[derive(Debug)]
pub struct NodeOutcome {
    /// Refreshed node metadata, sub-nodes rebuilt, for the caller to persist
    pub node: DependencyGraphNode,
    /// Updates for the node and its sub-nodes
    pub update: NodeUpdate,
    /// Evaluation errors captured in this subtree
    pub errors: Vec<EngineError>,
}

impl NodeOutcome {
    pub fn has_updates(&self) -> bool {
        !self.update.is_empty()
    }
}

/// Recompute driver over an injected evaluator
pub struct Propagator<'e, E: ExpressionEvaluator + ?Sized> {
    evaluator: &'e E,
}

impl<'e, E: ExpressionEvaluator + ?Sized> Propagator<'e, E> {
    pub fn new(evaluator: &'e E) -> Self {
        Self { evaluator }
    }

    /// Process `node` against the `entity` document it addresses
    ///
    /// The node's `dirty_reason` must already be attached. Sub-nodes resolve against
    /// the same entity document.
    pub fn process_node<'a>(
        &'a self,
        node: DependencyGraphNode,
        entity: &'a Value,
        tenant_id: &'a str,
    ) -> BoxFuture<'a, Result<NodeOutcome, EngineError>> {
        Box::pin(async move {
            let mut node = node;
            resolve_target(&node.target)?.entity_type()?;
            let mut errors = Vec::new();

            let condition_ok = self.evaluate_condition(&mut node, tenant_id, &mut errors).await;
            let value = if condition_ok {
                self.evaluate_expression(&mut node, tenant_id, &mut errors).await
            } else {
                None
            };
            if errors.is_empty() {
                node.status = NodeStatus::Ok;
            }

            let needs_updating = value.is_some() && gate_open(&node) && dirty_reason_requires_update(&node);
            let mut updates_map = match &value {
                Some(value) => update_target_value(&node.target, value, entity, &node.policy, needs_updating)?,
                None => UpdatesMap::new(),
            };
            if !updates_map.is_empty() {
                node.version += 1;
            }

            debug!(
                target_path = %node.target,
                status = ?node.status,
                needs_updating,
                updates = updates_map.len(),
                "Processed node"
            );

            let instances = expand_sub_nodes(&node, entity, tenant_id)?;
            let mut sub_nodes = Vec::with_capacity(instances.len());
            let mut child_deps = BTreeSet::new();
            let mut children = Vec::new();
            for mut instance in instances {
                instance.dirty_reason = node.dirty_reason.clone();
                let outcome = self.process_node(instance, entity, tenant_id).await?;
                merge_vertical(
                    &mut updates_map,
                    outcome.update.updates_map.clone(),
                    outcome.node.policy.vertical,
                );
                child_deps.extend(outcome.node.all_dependency_patterns());
                if outcome.has_updates() {
                    children.push(outcome.update);
                }
                errors.extend(outcome.errors);
                sub_nodes.push(outcome.node);
            }
            node.sub_nodes = sub_nodes;
            node.child_deps = child_deps;

            let update = NodeUpdate {
                target: node.target.clone(),
                updates_map,
                merge_policy: node.policy,
                children,
            };
            Ok(NodeOutcome {
                node,
                update,
                errors,
            })
        })
    }

    /// Returns false when the condition failed to evaluate
    async fn evaluate_condition(
        &self,
        node: &mut DependencyGraphNode,
        tenant_id: &str,
        errors: &mut Vec<EngineError>,
    ) -> bool {
        let condition = match &node.condition {
            Some(condition) => condition,
            None => return true,
        };
        let scope = scope_for(node, tenant_id, EvaluationKind::Condition);
        let message = match self.evaluator.evaluate(condition, &scope).await {
            Ok(evaluation) => match evaluation.value.as_bool() {
                Some(flag) => {
                    node.last_condition_value = Some(flag);
                    node.condition_deps = evaluation.dependency_patterns();
                    node.condition_deps_detail = evaluation.dependency_details();
                    return true;
                }
                None => format!("condition returned non-boolean value {}", evaluation.value),
            },
            Err(err) => err.message,
        };

        warn!(target_path = %node.target, error = %message, "Condition evaluation failed");
        node.status = NodeStatus::ErrorCondition;
        errors.push(EngineError::ConditionEvaluation {
            target: node.target.clone(),
            message,
        });
        false
    }

    async fn evaluate_expression(
        &self,
        node: &mut DependencyGraphNode,
        tenant_id: &str,
        errors: &mut Vec<EngineError>,
    ) -> Option<Value> {
        let expression = node.expression.as_ref()?;
        let scope = scope_for(node, tenant_id, EvaluationKind::Expression);
        match self.evaluator.evaluate(expression, &scope).await {
            Ok(evaluation) => {
                node.expression_deps = evaluation.dependency_patterns();
                node.expression_deps_details = evaluation.dependency_details();
                Some(evaluation.value)
            }
            Err(err) => {
                warn!(target_path = %node.target, error = %err, "Expression evaluation failed");
                node.status = NodeStatus::ErrorExpression;
                errors.push(EngineError::ExpressionEvaluation {
                    target: node.target.clone(),
                    message: err.message,
                });
                None
            }
        }
    }
}

fn scope_for(node: &DependencyGraphNode, tenant_id: &str, kind: EvaluationKind) -> EvaluationScope {
    EvaluationScope::new(tenant_id, &node.target, &node.entity, target_indices(&node.target), kind)
}

/// Numeric segments of a target, outermost first
pub fn target_indices(target: &str) -> Vec<usize> {
    split_segments(target)
        .map(|segments| {
            segments
                .iter()
                .skip(2)
                .filter(|segment| is_index(segment))
                .filter_map(|segment| segment.parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

fn gate_open(node: &DependencyGraphNode) -> bool {
    node.condition.is_none() || node.last_condition_value == Some(true)
}

/// Whether the node's dirty reason entitles it to write its value
///
/// Suppressed when every reason hits only sub-node dependencies (the sub-nodes
/// recompute themselves) or when the only reason is the node's own target (its own
/// write coming back). Otherwise a reason must hit one of the node's own dependencies,
/// or fall under the node's logical parent path.
pub fn dirty_reason_requires_update(node: &DependencyGraphNode) -> bool {
    let reasons = &node.dirty_reason;
    if reasons.is_empty() {
        return false;
    }

    let own_hit = |path: &String| {
        matches_any(path, node.own_dependency_patterns()) || matches_any(path, &node.condition_deps)
    };
    let only_sub_node_deps = reasons
        .iter()
        .all(|path| !own_hit(path) && matches_any(path, &node.child_deps));
    let only_own_target = reasons.len() == 1 && reasons.contains(&node.target);
    if only_sub_node_deps || only_own_target {
        return false;
    }

    let parent_changed = logical_parent(&node.target)
        .map_or(false, |parent| reasons.iter().any(|path| path_matches_pattern(path, &parent)));
    reasons.iter().any(own_hit) || parent_changed
}

/// Instantiate the live sub-nodes of `parent` from its definitions and the entity shape
///
/// Each instance is a structural copy: learned metadata comes from the live sub-node
/// with the same target when there is one, everything else from the definition.
pub fn expand_sub_nodes(
    parent: &DependencyGraphNode,
    entity: &Value,
    tenant_id: &str,
) -> Result<Vec<DependencyGraphNode>, EngineError> {
    let parent_segments = split_segments(&parent.target)
        .ok_or_else(|| EngineError::NotValidTarget(parent.target.clone()))?;
    let mut instances = Vec::new();

    for definition in &parent.sub_nodes_definitions {
        resolve_target(&definition.target)?.entity_type()?;
        let aligned = align_with_parent(&definition.target, &parent_segments)?;
        for target in expand_placeholders(&aligned, entity)? {
            let mut instance = match parent.sub_nodes.iter().find(|live| live.target == target) {
                Some(live) => refresh_from_definition(live.clone(), definition),
                None => definition.clone(),
            };
            instance.target = target;
            instance.entity = parent.entity.clone();
            instance.tenant_id = tenant_id.to_string();
            instances.push(instance);
        }
    }

    Ok(instances)
}

fn refresh_from_definition(
    mut live: DependencyGraphNode,
    definition: &DependencyGraphNode,
) -> DependencyGraphNode {
    live.expression = definition.expression.clone();
    live.condition = definition.condition.clone();
    live.policy = definition.policy;
    live.definition_deps = definition.definition_deps.clone();
    live.sub_nodes_definitions = definition.sub_nodes_definitions.clone();
    live
}

// Placeholders aligned with a numeric parent segment take the parent's index.
fn align_with_parent(template: &str, parent_segments: &[&str]) -> Result<String, EngineError> {
    let segments =
        split_segments(template).ok_or_else(|| EngineError::NotValidTarget(template.to_string()))?;
    let mut resolved = Vec::with_capacity(segments.len());
    let mut aligned = true;
    for (i, segment) in segments.iter().enumerate() {
        if aligned {
            match parent_segments.get(i) {
                Some(parent) if *segment == INDEX_PLACEHOLDER && is_index(parent) => {
                    resolved.push(*parent);
                    continue;
                }
                Some(parent) if parent == segment => {}
                _ => aligned = false,
            }
        }
        resolved.push(*segment);
    }
    Ok(resolved.join("."))
}

/// Expand every `[]` against the array found at the prefix before it
///
/// A prefix that does not hold an array yields no instance; a template without
/// placeholders yields itself.
pub fn expand_placeholders(template: &str, entity: &Value) -> Result<Vec<String>, EngineError> {
    let segments =
        split_segments(template).ok_or_else(|| EngineError::NotValidTarget(template.to_string()))?;
    let position = match segments.iter().position(|segment| *segment == INDEX_PLACEHOLDER) {
        Some(position) => position,
        None => return Ok(vec![template.to_string()]),
    };

    let container = segments[..position].join(".");
    let container_path = resolve_target(&container)?.document_path()?;
    let len = value_at(entity, &container_path)
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    let mut targets = Vec::new();
    for index in 0..len {
        let index = index.to_string();
        let instance: Vec<&str> = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| if i == position { index.as_str() } else { *segment })
            .collect();
        targets.extend(expand_placeholders(&instance.join("."), entity)?);
    }
    Ok(targets)
}
