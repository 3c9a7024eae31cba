//! Target Paths
//!
//! A target names any computable location on an entity:
//! `<EntityType>.{<EntityId>}.<base>.<rest>`. The base segment is fixed per entity
//! type (data fields and UI representation metadata live under different roots), so
//! it is stripped on parse and re-added on compose.

pub mod qualifier;

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder for an unresolved array position in sub-node definition targets
pub const INDEX_PLACEHOLDER: &str = "[]";

/// Wildcard segment in dependency patterns
pub const WILDCARD: &str = "*";

/// Targetable entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Case,
    Proxy,
    FieldDefinition,
    CaseRepresentation,
    ProxyRepresentation,
    FieldRepresentation,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Case,
        EntityType::Proxy,
        EntityType::FieldDefinition,
        EntityType::CaseRepresentation,
        EntityType::ProxyRepresentation,
        EntityType::FieldRepresentation,
    ];

    /// Wire name used as the first target segment
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Case => "CASE",
            EntityType::Proxy => "PROXY",
            EntityType::FieldDefinition => "FIELD_DEFINITION",
            EntityType::CaseRepresentation => "CASE_REPRESENTATION",
            EntityType::ProxyRepresentation => "PROXY_REPRESENTATION",
            EntityType::FieldRepresentation => "FIELD_REPRESENTATION",
        }
    }

    /// Root key inside the entity document under which targets of this type live
    pub fn base_segment(&self) -> &'static str {
        match self {
            EntityType::Case | EntityType::Proxy => "data",
            EntityType::FieldDefinition => "properties",
            EntityType::CaseRepresentation
            | EntityType::ProxyRepresentation
            | EntityType::FieldRepresentation => "representation",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EngineError::UnsupportedEntityType(s.to_string()))
    }
}

/// A well-formed target split into its parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTarget {
    pub entity: String,
    pub id: String,
    /// Path below the base segment; empty when the target addresses the base itself
    pub rest: String,
}

impl EntityTarget {
    pub fn entity_type(&self) -> Result<EntityType, EngineError> {
        self.entity.parse()
    }

    /// `<entity>.{<id>}`
    pub fn prefix(&self) -> String {
        format!("{}.{{{}}}", self.entity, self.id)
    }

    /// Path inside the entity document, base segment included
    pub fn document_path(&self) -> Result<String, EngineError> {
        let base = self.entity_type()?.base_segment();
        Ok(join_path(base, &self.rest))
    }
}

/// Result of parsing a target string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParsedTarget {
    Entity(EntityTarget),
    NotValid,
}

impl ParsedTarget {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedTarget::Entity(_))
    }

    /// Fail fast on `NotValid`, naming the raw input
    pub fn into_entity(self, raw: &str) -> Result<EntityTarget, EngineError> {
        match self {
            ParsedTarget::Entity(target) => Ok(target),
            ParsedTarget::NotValid => Err(EngineError::NotValidTarget(raw.to_string())),
        }
    }
}

/// Parse a target string
///
/// Unknown but well-formed entity names still parse (their `rest` keeps every segment
/// after the id); they are rejected by the operations that need a concrete type.
pub fn parse_target(path: &str) -> ParsedTarget {
    let segments = match split_segments(path) {
        Some(segments) => segments,
        None => return ParsedTarget::NotValid,
    };
    if segments.len() < 2 || !is_entity_name(segments[0]) {
        return ParsedTarget::NotValid;
    }
    let id = match braced_id(segments[1]) {
        Some(id) => id,
        None => return ParsedTarget::NotValid,
    };
    if segments[2..]
        .iter()
        .any(|s| s.is_empty() || s.contains(|c| c == '{' || c == '}'))
    {
        return ParsedTarget::NotValid;
    }

    let rest = match EntityType::from_str(segments[0]) {
        Ok(entity_type) => {
            if segments.get(2) != Some(&entity_type.base_segment()) {
                return ParsedTarget::NotValid;
            }
            segments[3..].join(".")
        }
        Err(_) => segments[2..].join("."),
    };

    ParsedTarget::Entity(EntityTarget {
        entity: segments[0].to_string(),
        id: id.to_string(),
        rest,
    })
}

/// Parse a target, failing with `NotValidTarget` on malformed input
pub fn resolve_target(path: &str) -> Result<EntityTarget, EngineError> {
    parse_target(path).into_entity(path)
}

/// Compose a target from its parts (inverse of [`parse_target`])
pub fn get_target(entity_type: EntityType, entity_id: &str, path: &str) -> String {
    let base = join_path(entity_type.base_segment(), path);
    format!("{}.{{{}}}.{}", entity_type.as_str(), entity_id, base)
}

/// Split a dotted path into segments, keeping `{...}` identifiers whole
///
/// Returns `None` for unbalanced or nested braces.
pub fn split_segments(path: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_braces = false;
    for (i, c) in path.char_indices() {
        match c {
            '{' if in_braces => return None,
            '{' => in_braces = true,
            '}' if !in_braces => return None,
            '}' => in_braces = false,
            '.' if !in_braces => {
                segments.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_braces {
        return None;
    }
    segments.push(&path[start..]);
    Some(segments)
}

/// Strip the `<entity>.{<id>}` prefix of a path, leaving the document path
pub fn document_path_of(path: &str) -> Option<String> {
    let segments = split_segments(path)?;
    if segments.len() < 3 || braced_id(segments[1]).is_none() {
        return None;
    }
    Some(segments[2..].join("."))
}

/// Target with its last segment removed
pub fn logical_parent(target: &str) -> Option<String> {
    let segments = split_segments(target)?;
    if segments.len() <= 3 {
        return None;
    }
    Some(segments[..segments.len() - 1].join("."))
}

pub fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn join_path(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{}.{}", head, tail),
    }
}

fn is_entity_name(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn braced_id(segment: &str) -> Option<&str> {
    let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}
