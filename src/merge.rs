//! Target Value Merger
//!
//! Applies a computed value to an entity document under a merge policy and flattens
//! the result into the dotted-path update map a writer merges into the stored record.
//! Horizontal policies resolve a write against the value already stored; vertical
//! policies resolve a child node's update against its parent's.

use crate::document::{flatten, set_at, value_at};
use crate::error::EngineError;
use crate::target::qualifier::get_entity_qualificator;
use crate::target::resolve_target;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Flat dotted-path → value map
pub type UpdatesMap = BTreeMap<String, Value>;

/// Conflict rule when writing a value over one that may already exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HorizontalMergePolicy {
    /// Always write the new value
    #[default]
    Overwrite,
    /// Write only when nothing is stored yet
    Shy,
}

impl HorizontalMergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            HorizontalMergePolicy::Overwrite => "OVERWRITE",
            HorizontalMergePolicy::Shy => "SHY",
        }
    }
}

impl FromStr for HorizontalMergePolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OVERWRITE" => Ok(HorizontalMergePolicy::Overwrite),
            "SHY" => Ok(HorizontalMergePolicy::Shy),
            other => Err(EngineError::UnsupportedMergePolicy(other.to_string())),
        }
    }
}

/// Conflict rule when a child update and its parent's update share a key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VerticalMergePolicy {
    /// The child's value wins
    #[default]
    Child,
    /// The parent's value is kept
    Parent,
}

impl VerticalMergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerticalMergePolicy::Child => "CHILD",
            VerticalMergePolicy::Parent => "PARENT",
        }
    }
}

impl FromStr for VerticalMergePolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHILD" => Ok(VerticalMergePolicy::Child),
            "PARENT" => Ok(VerticalMergePolicy::Parent),
            other => Err(EngineError::UnsupportedMergePolicy(other.to_string())),
        }
    }
}

macro_rules! string_policy_conversions {
    ($policy:ty) => {
        impl TryFrom<String> for $policy {
            type Error = EngineError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$policy> for String {
            fn from(policy: $policy) -> Self {
                policy.as_str().to_string()
            }
        }

        impl fmt::Display for $policy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_policy_conversions!(HorizontalMergePolicy);
string_policy_conversions!(VerticalMergePolicy);

/// Merge policy pair carried by every node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergePolicy {
    #[serde(default)]
    pub horizontal: HorizontalMergePolicy,
    #[serde(default)]
    pub vertical: VerticalMergePolicy,
}

impl MergePolicy {
    pub fn new(horizontal: HorizontalMergePolicy, vertical: VerticalMergePolicy) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

/// Compute the update map for writing `value` at `target`
///
/// The target is resolved first, so malformed targets and unsupported entity types fail
/// even when no update is needed. When `needs_updating` is false the result is empty.
pub fn update_target_value(
    target: &str,
    value: &Value,
    entity: &Value,
    merge_policy: &MergePolicy,
    needs_updating: bool,
) -> Result<UpdatesMap, EngineError> {
    let path = resolve_target(target)?.document_path()?;
    if !needs_updating {
        return Ok(UpdatesMap::new());
    }

    let mut nested = Value::Object(Map::new());
    let write = match merge_policy.horizontal {
        HorizontalMergePolicy::Overwrite => true,
        HorizontalMergePolicy::Shy => value_at(entity, &path).map_or(true, Value::is_null),
    };
    if write {
        set_at(&mut nested, &path, value.clone());
    }

    Ok(flatten(&nested))
}

/// Merge a child's update map into its parent's
pub fn merge_vertical(parent: &mut UpdatesMap, child: UpdatesMap, policy: VerticalMergePolicy) {
    for (key, value) in child {
        match policy {
            VerticalMergePolicy::Child => {
                parent.insert(key, value);
            }
            VerticalMergePolicy::Parent => {
                parent.entry(key).or_insert(value);
            }
        }
    }
}

/// Update produced for one node, with the updates of its sub-nodes
///
/// `updates_map` already contains the children's entries merged under their vertical
/// policies; `children` keeps the per-node breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    pub target: String,
    pub updates_map: UpdatesMap,
    pub merge_policy: MergePolicy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeUpdate>,
}

impl NodeUpdate {
    pub fn is_empty(&self) -> bool {
        self.updates_map.is_empty()
    }

    /// Flat payload handed to the external writer
    pub fn to_payload(&self) -> Result<UpdatePayload, EngineError> {
        let target = resolve_target(&self.target)?;
        Ok(UpdatePayload {
            id: target.id,
            updates_map: self.updates_map.clone(),
            target_entity: get_entity_qualificator(&self.target)?,
            merge_policy: self.merge_policy,
        })
    }
}

/// Writer-facing update for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    pub id: String,
    pub updates_map: UpdatesMap,
    pub target_entity: String,
    pub merge_policy: MergePolicy,
}
