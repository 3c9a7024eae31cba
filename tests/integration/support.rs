//! Shared fixtures: a scripted evaluator and common node/config builders.

use async_trait::async_trait;
use ripple::config::RippleConfig;
use ripple::dependency::SourceMapping;
use ripple::error::EvaluationError;
use ripple::evaluator::{Evaluation, EvaluationScope, ExpressionEvaluator};
use ripple::node::Expression;
use serde_json::Value;
use std::sync::Mutex;

/// Evaluator driven by the expression descriptor itself
///
/// Descriptors look like `{ "value": .., "deps": [..] }`, `{ "error": ".." }` or
/// `{ "byIndex": [..], "deps": [..] }`; `[]` in deps is replaced by the scope's
/// indices in order. Every call is recorded as `<kind>:<target>`.
#[derive(Default)]
pub struct ScriptedEvaluator {
    calls: Mutex<Vec<String>>,
}

impl ScriptedEvaluator {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ExpressionEvaluator for ScriptedEvaluator {
    async fn evaluate(
        &self,
        expression: &Expression,
        scope: &EvaluationScope,
    ) -> Result<Evaluation, EvaluationError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{:?}:{}", scope.kind(), scope.target()));

        if let Some(message) = expression.get("error").and_then(Value::as_str) {
            return Err(EvaluationError::new(message));
        }
        let value = match (expression.get("byIndex"), scope.indices().last()) {
            (Some(Value::Array(values)), Some(i)) => values.get(*i).cloned().unwrap_or(Value::Null),
            _ => expression.get("value").cloned().unwrap_or(Value::Null),
        };

        let mut evaluation = Evaluation::new(value);
        for dep in expression
            .get("deps")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            let mut path = dep.to_string();
            for index in scope.indices() {
                path = path.replacen("[]", &index.to_string(), 1);
            }
            evaluation = evaluation.with_dependency(path);
        }
        Ok(evaluation)
    }
}

/// Configuration mapping the `case` source onto `CASE`, ids read from `id`
pub fn case_config() -> RippleConfig {
    let mut config = RippleConfig::default();
    config.sources.insert(
        "case".to_string(),
        SourceMapping {
            base: "CASE".to_string(),
            id_field: Some("id".to_string()),
            keyed_rows: false,
            skip_specifics: false,
        },
    );
    config
}
