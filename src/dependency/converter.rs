//! Configuration-driven change converter.

use crate::dependency::extractor::{ChangeConverter, DependencyDescriptor, LocalEventValue};
use crate::document::value_at;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How events of one source kind map onto path space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapping {
    /// Base path, usually the entity kind (`CASE`)
    pub base: String,

    /// Field of the snapshot holding the entity id; no specific prefix when unset
    #[serde(default)]
    pub id_field: Option<String>,

    #[serde(default)]
    pub keyed_rows: bool,

    #[serde(default)]
    pub skip_specifics: bool,
}

impl SourceMapping {
    pub fn validate(&self) -> Result<(), String> {
        if self.base.is_empty() {
            return Err("Base path cannot be empty".to_string());
        }
        if self.base.contains(|c| c == '{' || c == '}') {
            return Err(format!("Base path '{}' cannot contain braces", self.base));
        }
        if matches!(&self.id_field, Some(field) if field.is_empty()) {
            return Err("id_field cannot be empty".to_string());
        }
        Ok(())
    }
}

/// [`ChangeConverter`] backed by a source-kind → mapping table
#[derive(Debug, Clone, Default)]
pub struct ConfiguredConverter {
    sources: BTreeMap<String, SourceMapping>,
}

impl ConfiguredConverter {
    pub fn new(sources: BTreeMap<String, SourceMapping>) -> Self {
        Self { sources }
    }
}

impl ChangeConverter for ConfiguredConverter {
    fn convert(&self, event: &LocalEventValue) -> Result<Vec<DependencyDescriptor>, EngineError> {
        let mapping = self
            .sources
            .get(&event.source)
            .ok_or_else(|| EngineError::Conversion {
                source_kind: event.source.clone(),
                message: "no source mapping configured".to_string(),
            })?;

        // current snapshot first: creations have no previous one
        let specific_document = mapping.id_field.as_deref().and_then(|field| {
            [event.current_values.as_ref(), event.previous_values.as_ref()]
                .into_iter()
                .flatten()
                .find_map(|snapshot| value_at(snapshot, field).and_then(id_string))
                .map(|id| format!("{}.{{{}}}", mapping.base, id))
        });

        Ok(vec![DependencyDescriptor {
            base: mapping.base.clone(),
            specific_document,
            skip_specifics: mapping.skip_specifics,
            keyed_rows: mapping.keyed_rows,
        }])
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
