//! Sweep orchestration
//!
//! One sweep consumes one change event: changed paths are extracted, the tenant's
//! nodes are checked for dirtiness, and every affected node is processed to completion
//! in input order before the next one starts. Nothing is persisted here; the report
//! carries the refreshed nodes and update payloads back to the caller.

use crate::config::EngineSettings;
use crate::dependency::{
    affected_nodes_in, changed_paths_for, ChangeConverter, ChangeSnapshots, LocalEventValue,
};
use crate::error::EngineError;
use crate::evaluator::ExpressionEvaluator;
use crate::merge::UpdatePayload;
use crate::node::DependencyGraphNode;
use crate::propagation::{NodeOutcome, Propagator};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Summary of one sweep
#[derive(Debug)]
pub struct SweepReport {
    pub tenant_id: String,
    pub changed_paths: BTreeSet<String>,
    /// One outcome per affected node, in input order
    pub outcomes: Vec<NodeOutcome>,
    pub duration_ms: u64,
}

impl SweepReport {
    /// Writer payloads for every outcome that produced updates
    pub fn payloads(&self) -> Result<Vec<UpdatePayload>, EngineError> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.has_updates())
            .map(|outcome| outcome.update.to_payload())
            .collect()
    }

    /// Number of captured evaluation errors across all outcomes
    pub fn error_count(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.errors.len()).sum()
    }

    /// Refreshed nodes for the caller to persist
    pub fn refreshed_nodes(&self) -> impl Iterator<Item = &DependencyGraphNode> {
        self.outcomes.iter().map(|outcome| &outcome.node)
    }
}

/// Dependency-graph engine over an injected evaluator
pub struct Engine<E: ExpressionEvaluator> {
    evaluator: E,
    settings: EngineSettings,
}

impl<E: ExpressionEvaluator> Engine<E> {
    pub fn new(evaluator: E) -> Self {
        Self::with_settings(evaluator, EngineSettings::default())
    }

    pub fn with_settings(evaluator: E, settings: EngineSettings) -> Self {
        Self {
            evaluator,
            settings,
        }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Process a single node whose dirty reason is already attached
    pub async fn process_node(
        &self,
        node: DependencyGraphNode,
        entity: &Value,
        tenant_id: &str,
    ) -> Result<NodeOutcome, EngineError> {
        Propagator::new(&self.evaluator)
            .process_node(node, entity, tenant_id)
            .await
    }

    /// Run one sweep for `event` over the tenant's `nodes`
    ///
    /// `entities` maps entity qualifiers (`CASE.123`) to the current documents the
    /// affected nodes address. Nodes of other tenants are ignored.
    pub async fn sweep<C>(
        &self,
        tenant_id: &str,
        event: &LocalEventValue,
        converter: &C,
        nodes: &[DependencyGraphNode],
        entities: &BTreeMap<String, Value>,
    ) -> Result<SweepReport, EngineError>
    where
        C: ChangeConverter + ?Sized,
    {
        let start_time = std::time::Instant::now();
        let descriptors = converter.convert(event)?;
        let changed_paths = changed_paths_for(event, &descriptors, &self.settings.omni_id);

        let tenant_nodes: Vec<DependencyGraphNode> = nodes
            .iter()
            .filter(|node| node.tenant_id == tenant_id)
            .cloned()
            .collect();
        if tenant_nodes.len() != nodes.len() {
            debug!(
                tenant_id,
                skipped = nodes.len() - tenant_nodes.len(),
                "Skipped nodes of other tenants"
            );
        }

        let snapshots = ChangeSnapshots::for_event(event, &descriptors, &self.settings.omni_id);
        let affected = affected_nodes_in(&tenant_nodes, &changed_paths, &snapshots);

        let propagator = Propagator::new(&self.evaluator);
        let mut outcomes = Vec::with_capacity(affected.len());
        for node in affected {
            let entity = entities
                .get(&node.entity)
                .ok_or_else(|| EngineError::MissingEntity(node.entity.clone()))?;
            outcomes.push(propagator.process_node(node, entity, tenant_id).await?);
        }

        let report = SweepReport {
            tenant_id: tenant_id.to_string(),
            changed_paths,
            outcomes,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };
        info!(
            tenant_id,
            source = %event.source,
            changed_paths = report.changed_paths.len(),
            affected = report.outcomes.len(),
            errors = report.error_count(),
            duration_ms = report.duration_ms,
            "Sweep completed"
        );
        Ok(report)
    }
}
