//! Dependency Extractor
//!
//! Turns a change event into the flat set of changed paths. Each event is described by
//! one or more descriptors (from a per-source [`ChangeConverter`]); every descriptor
//! contributes its base path plus the leaf paths of the before/after snapshots, rooted
//! once at the omni prefix (`<base>.{*}`, any entity of the kind) and once at the
//! specific document prefix (only the entity that changed).

use crate::document::collect_leaf_paths;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Snapshot pair emitted by the persistence layer on every write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalEventValue {
    /// Kind of document that changed
    pub source: String,
    #[serde(default)]
    pub previous_values: Option<Value>,
    #[serde(default)]
    pub current_values: Option<Value>,
}

impl LocalEventValue {
    pub fn new(
        source: impl Into<String>,
        previous_values: Option<Value>,
        current_values: Option<Value>,
    ) -> Self {
        Self {
            source: source.into(),
            previous_values,
            current_values,
        }
    }

    /// Non-null snapshots, previous first
    pub fn snapshots(&self) -> impl Iterator<Item = &Value> {
        self.previous_values
            .iter()
            .chain(self.current_values.iter())
            .filter(|value| !value.is_null())
    }
}

/// How one change event maps onto path space
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyDescriptor {
    pub base: String,
    /// Prefix addressing only the changed entity, e.g. `CASE.{123}`
    #[serde(default)]
    pub specific_document: Option<String>,
    /// Emit only the base path
    #[serde(default)]
    pub skip_specifics: bool,
    /// Snapshots are dictionaries of rows keyed by row id
    #[serde(default)]
    pub keyed_rows: bool,
}

impl DependencyDescriptor {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    pub fn with_specific_document(mut self, prefix: impl Into<String>) -> Self {
        self.specific_document = Some(prefix.into());
        self
    }

    pub fn omni_prefix(&self, omni_id: &str) -> String {
        format!("{}.{{{}}}", self.base, omni_id)
    }
}

/// Per-source conversion from a change event to dependency descriptors
pub trait ChangeConverter {
    fn convert(&self, event: &LocalEventValue) -> Result<Vec<DependencyDescriptor>, EngineError>;
}

impl<F> ChangeConverter for F
where
    F: Fn(&LocalEventValue) -> Result<Vec<DependencyDescriptor>, EngineError>,
{
    fn convert(&self, event: &LocalEventValue) -> Result<Vec<DependencyDescriptor>, EngineError> {
        self(event)
    }
}

/// Flat set of paths changed by `event`
pub fn extract_changed_paths<C>(
    event: &LocalEventValue,
    converter: &C,
    omni_id: &str,
) -> Result<BTreeSet<String>, EngineError>
where
    C: ChangeConverter + ?Sized,
{
    let descriptors = converter.convert(event)?;
    Ok(changed_paths_for(event, &descriptors, omni_id))
}

/// Flat set of paths changed by `event`, for already converted descriptors
pub fn changed_paths_for(
    event: &LocalEventValue,
    descriptors: &[DependencyDescriptor],
    omni_id: &str,
) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();

    for descriptor in descriptors {
        paths.insert(descriptor.base.clone());
        if descriptor.skip_specifics {
            continue;
        }

        let omni = descriptor.omni_prefix(omni_id);
        for snapshot in event.snapshots() {
            if descriptor.keyed_rows {
                collect_row_leaf_paths(snapshot, &omni, &mut paths);
            } else {
                collect_leaf_paths(snapshot, &omni, &mut paths);
            }
            if let Some(specific) = &descriptor.specific_document {
                collect_leaf_paths(snapshot, specific, &mut paths);
            }
        }
    }

    debug!(
        source = %event.source,
        descriptors = descriptors.len(),
        changed_paths = paths.len(),
        "Extracted changed paths"
    );
    paths
}

// Row ids are dropped so "any row of this table changed" is one pattern.
fn collect_row_leaf_paths(snapshot: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    match snapshot {
        Value::Object(rows) => {
            for row in rows.values() {
                collect_leaf_paths(row, prefix, out);
            }
        }
        other => collect_leaf_paths(other, prefix, out),
    }
}
