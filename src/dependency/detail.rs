//! Fine-grained dependency predicates.
//!
//! A coarse pattern such as `CASE.{*}.data.items.*` fires for any change inside any
//! item; a detail narrows it to the changes the expression actually cares about.

use crate::document::value_at;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Predicate evaluated against the before/after values of the matched location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyDetail {
    /// Holds when any listed sub-field differs between before and after
    FieldsChanged { fields: Vec<String> },
    /// Holds when the sub-field equals `value` before or after the change
    ValueEquals { field: String, value: Value },
}

impl DependencyDetail {
    pub fn holds(&self, before: Option<&Value>, after: Option<&Value>) -> bool {
        match self {
            DependencyDetail::FieldsChanged { fields } => fields
                .iter()
                .any(|field| field_value(before, field) != field_value(after, field)),
            DependencyDetail::ValueEquals { field, value } => {
                field_value(before, field) == Some(value)
                    || field_value(after, field) == Some(value)
            }
        }
    }
}

// null and missing are the same absence
fn field_value<'a>(location: Option<&'a Value>, field: &str) -> Option<&'a Value> {
    location
        .and_then(|value| value_at(value, field))
        .filter(|value| !value.is_null())
}
