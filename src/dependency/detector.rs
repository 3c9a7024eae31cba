//! Dirty-Node Detector
//!
//! Decides which nodes a set of changed paths affects. A node is affected when a
//! changed path hits one of its own expression patterns (static definition patterns
//! included), one of its child patterns, or one of its condition patterns. Expression
//! and condition patterns may carry a detail predicate that must also hold.

use crate::dependency::detail::DependencyDetail;
use crate::dependency::extractor::{DependencyDescriptor, LocalEventValue};
use crate::dependency::pattern::{matched_prefix, matches_any};
use crate::document::value_at;
use crate::node::{DependencyGraphNode, NodeStatus};
use crate::target::document_path_of;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Before/after snapshots of the changed document
#[derive(Debug, Clone, Default)]
pub struct ChangeSnapshots<'a> {
    pub previous: Option<&'a Value>,
    pub current: Option<&'a Value>,
    /// Omni prefixes whose paths had the row level dropped
    row_keyed: Vec<String>,
}

impl<'a> ChangeSnapshots<'a> {
    pub fn new(previous: Option<&'a Value>, current: Option<&'a Value>) -> Self {
        Self {
            previous,
            current,
            row_keyed: Vec::new(),
        }
    }

    /// Snapshots of `event`, aware of which descriptors collapsed rows
    pub fn for_event(
        event: &'a LocalEventValue,
        descriptors: &[DependencyDescriptor],
        omni_id: &str,
    ) -> Self {
        let mut snapshots =
            Self::new(event.previous_values.as_ref(), event.current_values.as_ref());
        for descriptor in descriptors {
            if descriptor.keyed_rows && !descriptor.skip_specifics {
                snapshots = snapshots.with_row_keyed_prefix(descriptor.omni_prefix(omni_id));
            }
        }
        snapshots
    }

    pub fn with_row_keyed_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.row_keyed.push(prefix.into());
        self
    }

    /// Whether `detail` holds for the location `matched` (a prefix of a changed path)
    fn detail_holds(&self, detail: &DependencyDetail, matched: &str) -> bool {
        if let Some(path) = self.row_relative_path(matched) {
            return self.any_row_holds(detail, &path);
        }
        let path = document_path_of(matched);
        let lookup = |snapshot: Option<&'a Value>| {
            snapshot.and_then(|value| path.as_deref().and_then(|p| value_at(value, p)))
        };
        detail.holds(lookup(self.previous), lookup(self.current))
    }

    // Path inside a row when `matched` sits under a row-collapsed omni prefix.
    fn row_relative_path(&self, matched: &str) -> Option<String> {
        self.row_keyed.iter().find_map(|prefix| {
            if matched == prefix {
                return Some(String::new());
            }
            matched
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .map(str::to_string)
        })
    }

    fn any_row_holds(&self, detail: &DependencyDetail, path: &str) -> bool {
        let rows = |snapshot: Option<&'a Value>| -> Option<&'a Map<String, Value>> {
            snapshot.and_then(Value::as_object)
        };
        let row_ids: BTreeSet<&'a String> = rows(self.previous)
            .into_iter()
            .chain(rows(self.current))
            .flat_map(|rows| rows.keys())
            .collect();
        let at = |snapshot: Option<&'a Value>, id: &str| {
            rows(snapshot)
                .and_then(|rows| rows.get(id))
                .and_then(|row| value_at(row, path))
        };

        row_ids.into_iter().any(|id| {
            let id = id.as_str();
            detail.holds(at(self.previous, id), at(self.current, id))
        })
    }
}

/// Clones of the affected nodes, each reset to `DIRTY` and carrying the changed paths
/// that hit it as its dirty reason
pub fn get_affected_nodes(
    nodes: &[DependencyGraphNode],
    changed_paths: &BTreeSet<String>,
    previous: Option<&Value>,
    current: Option<&Value>,
) -> Vec<DependencyGraphNode> {
    affected_nodes_in(nodes, changed_paths, &ChangeSnapshots::new(previous, current))
}

/// [`get_affected_nodes`] over prepared snapshots
pub fn affected_nodes_in(
    nodes: &[DependencyGraphNode],
    changed_paths: &BTreeSet<String>,
    snapshots: &ChangeSnapshots<'_>,
) -> Vec<DependencyGraphNode> {
    let mut affected = Vec::new();

    for node in nodes {
        let reasons: BTreeSet<String> = changed_paths
            .iter()
            .filter(|path| is_affected_by(node, path, snapshots))
            .cloned()
            .collect();
        if reasons.is_empty() {
            continue;
        }

        debug!(
            target_path = %node.target,
            reasons = reasons.len(),
            previous_status = ?node.status,
            "Node marked dirty"
        );
        let mut dirty = node.clone();
        dirty.status = NodeStatus::Dirty;
        dirty.dirty_reason = reasons;
        affected.push(dirty);
    }

    affected
}

/// Whether a single changed path affects `node`
pub fn is_affected_by(
    node: &DependencyGraphNode,
    changed_path: &str,
    snapshots: &ChangeSnapshots<'_>,
) -> bool {
    hits_with_detail(
        node.own_dependency_patterns(),
        &node.expression_deps_details,
        changed_path,
        snapshots,
    ) || matches_any(changed_path, &node.child_deps)
        || hits_with_detail(
            node.condition_deps.iter(),
            &node.condition_deps_detail,
            changed_path,
            snapshots,
        )
}

fn hits_with_detail<'n, I>(
    patterns: I,
    details: &BTreeMap<String, DependencyDetail>,
    changed_path: &str,
    snapshots: &ChangeSnapshots<'_>,
) -> bool
where
    I: IntoIterator<Item = &'n String>,
{
    patterns.into_iter().any(|pattern| {
        match matched_prefix(changed_path, pattern) {
            Some(matched) => details
                .get(pattern)
                .map_or(true, |detail| snapshots.detail_holds(detail, &matched)),
            None => false,
        }
    })
}
