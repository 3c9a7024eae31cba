//! End-to-end sweeps: change event in, refreshed nodes and writer payloads out.

use super::support::{case_config, ScriptedEvaluator};
use ripple::dependency::{DependencyDescriptor, DependencyDetail, LocalEventValue, SourceMapping};
use ripple::error::EngineError;
use ripple::merge::{HorizontalMergePolicy, MergePolicy, VerticalMergePolicy};
use ripple::node::{DependencyGraphNode, NodeStatus};
use ripple::Engine;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn qty_event() -> LocalEventValue {
    LocalEventValue::new(
        "case",
        Some(json!({ "id": 1, "data": { "qty": 1, "weight": 70 } })),
        Some(json!({ "id": 1, "data": { "qty": 2, "weight": 70 } })),
    )
}

fn entities() -> BTreeMap<String, Value> {
    let mut entities = BTreeMap::new();
    entities.insert("CASE.1".to_string(), json!({ "data": { "qty": 2, "weight": 70 } }));
    entities.insert("CASE.2".to_string(), json!({ "data": { "qty": 5 } }));
    entities
}

fn node(target: &str, entity: &str, tenant: &str, expression: Value, deps: &[&str]) -> DependencyGraphNode {
    let mut node = DependencyGraphNode::new(target, entity, tenant).with_expression(expression);
    node.expression_deps = deps.iter().map(|d| d.to_string()).collect();
    node
}

#[tokio::test]
async fn test_sweep_updates_affected_nodes_of_tenant() {
    let engine = Engine::new(ScriptedEvaluator::default());
    let nodes = vec![
        node(
            "CASE.{1}.data.total",
            "CASE.1",
            "t1",
            json!({ "value": 20, "deps": ["CASE.{1}.data.qty"] }),
            &["CASE.{1}.data.qty"],
        ),
        node(
            "CASE.{2}.data.total",
            "CASE.2",
            "t1",
            json!({ "value": 50, "deps": ["CASE.{2}.data.qty"] }),
            &["CASE.{2}.data.qty"],
        ),
        node(
            "CASE.{1}.data.total",
            "CASE.1",
            "t2",
            json!({ "value": 99, "deps": ["CASE.{1}.data.qty"] }),
            &["CASE.{1}.data.qty"],
        ),
        node(
            "CASE.{2}.data.rank",
            "CASE.2",
            "t1",
            json!({ "value": 3, "deps": ["CASE.*.data.qty"] }),
            &["CASE.*.data.qty"],
        ),
    ];

    let report = engine
        .sweep("t1", &qty_event(), &case_config().converter(), &nodes, &entities())
        .await
        .unwrap();

    assert!(report.changed_paths.contains("CASE.{1}.data.qty"));
    assert!(report.changed_paths.contains("CASE.{*}.data.qty"));
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.error_count(), 0);
    assert_eq!(
        engine.evaluator().calls(),
        vec![
            "Expression:CASE.{1}.data.total".to_string(),
            "Expression:CASE.{2}.data.rank".to_string()
        ]
    );

    let payloads = report.payloads().unwrap();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0].id, "1");
    assert_eq!(payloads[0].target_entity, "CASE.1");
    assert_eq!(payloads[0].updates_map["data.total"], json!(20));
    assert_eq!(payloads[1].target_entity, "CASE.2");
    assert_eq!(payloads[1].updates_map["data.rank"], json!(3));

    for node in report.refreshed_nodes() {
        assert_eq!(node.status, NodeStatus::Ok);
        assert_eq!(node.version, 1);
        assert_eq!(node.tenant_id, "t1");
    }
}

#[tokio::test]
async fn test_empty_change_set_leaves_nodes_untouched() {
    let engine = Engine::new(ScriptedEvaluator::default());
    let nodes = vec![node(
        "CASE.{1}.data.total",
        "CASE.1",
        "t1",
        json!({ "value": 20 }),
        &["CASE.{1}.data.qty"],
    )];
    let nothing = |_: &LocalEventValue| -> Result<Vec<DependencyDescriptor>, EngineError> {
        Ok(Vec::new())
    };

    let report = engine
        .sweep("t1", &qty_event(), &nothing, &nodes, &entities())
        .await
        .unwrap();

    assert!(report.changed_paths.is_empty());
    assert!(report.outcomes.is_empty());
    assert!(report.payloads().unwrap().is_empty());
    assert!(engine.evaluator().calls().is_empty());
    assert_eq!(nodes[0].status, NodeStatus::Dirty);
}

#[tokio::test]
async fn test_evaluation_error_is_captured_and_sweep_continues() {
    let engine = Engine::new(ScriptedEvaluator::default());
    let nodes = vec![
        node(
            "CASE.{1}.data.broken",
            "CASE.1",
            "t1",
            json!({ "error": "division by zero" }),
            &["CASE.{1}.data.qty"],
        ),
        node(
            "CASE.{1}.data.total",
            "CASE.1",
            "t1",
            json!({ "value": 20, "deps": ["CASE.{1}.data.qty"] }),
            &["CASE.{1}.data.qty"],
        ),
    ];

    let report = engine
        .sweep("t1", &qty_event(), &case_config().converter(), &nodes, &entities())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.outcomes[0].node.status, NodeStatus::ErrorExpression);
    assert!(matches!(
        &report.outcomes[0].errors[0],
        EngineError::ExpressionEvaluation { message, .. } if message == "division by zero"
    ));
    assert!(!report.outcomes[0].has_updates());
    assert_eq!(report.payloads().unwrap().len(), 1);
}

#[tokio::test]
async fn test_condition_is_evaluated_before_expression() {
    let engine = Engine::new(ScriptedEvaluator::default());
    let gated = node(
        "CASE.{1}.data.total",
        "CASE.1",
        "t1",
        json!({ "value": 20, "deps": ["CASE.{1}.data.qty"] }),
        &["CASE.{1}.data.qty"],
    )
    .with_condition(json!({ "value": true, "deps": ["CASE.{1}.data.weight"] }));

    let report = engine
        .sweep("t1", &qty_event(), &case_config().converter(), &[gated], &entities())
        .await
        .unwrap();

    assert_eq!(
        engine.evaluator().calls(),
        vec![
            "Condition:CASE.{1}.data.total".to_string(),
            "Expression:CASE.{1}.data.total".to_string()
        ]
    );
    let refreshed = &report.outcomes[0].node;
    assert_eq!(refreshed.last_condition_value, Some(true));
    assert!(refreshed.condition_deps.contains("CASE.{1}.data.weight"));
    assert!(report.outcomes[0].has_updates());
}

#[tokio::test]
async fn test_shy_policy_keeps_existing_value() {
    let engine = Engine::new(ScriptedEvaluator::default());
    let weight = |horizontal| {
        node(
            "CASE.{1}.data.weight",
            "CASE.1",
            "t1",
            json!({ "value": 75, "deps": ["CASE.{1}.data.qty"] }),
            &["CASE.{1}.data.qty"],
        )
        .with_policy(MergePolicy::new(horizontal, VerticalMergePolicy::Child))
    };

    let nodes = [weight(HorizontalMergePolicy::Shy), weight(HorizontalMergePolicy::Overwrite)];
    let report = engine
        .sweep("t1", &qty_event(), &case_config().converter(), &nodes, &entities())
        .await
        .unwrap();

    assert!(!report.outcomes[0].has_updates());
    assert_eq!(report.outcomes[1].update.updates_map["data.weight"], json!(75));
}

#[tokio::test]
async fn test_missing_entity_snapshot_is_fatal() {
    let engine = Engine::new(ScriptedEvaluator::default());
    let nodes = vec![node(
        "CASE.{1}.data.total",
        "CASE.1",
        "t1",
        json!({ "value": 20 }),
        &["CASE.{1}.data.qty"],
    )];

    let result = engine
        .sweep("t1", &qty_event(), &case_config().converter(), &nodes, &BTreeMap::new())
        .await;
    assert!(matches!(result, Err(EngineError::MissingEntity(entity)) if entity == "CASE.1"));
}

#[tokio::test]
async fn test_unknown_source_fails_conversion() {
    let engine = Engine::new(ScriptedEvaluator::default());
    let event = LocalEventValue::new("invoice", None, Some(json!({ "id": 3 })));
    let result = engine
        .sweep("t1", &event, &case_config().converter(), &[], &entities())
        .await;
    assert!(matches!(result, Err(EngineError::Conversion { .. })));
}

#[tokio::test]
async fn test_keyed_rows_detail_fires_for_changed_row() {
    let mut config = case_config();
    config.sources.insert(
        "rates".to_string(),
        SourceMapping {
            base: "RATES".to_string(),
            id_field: None,
            keyed_rows: true,
            skip_specifics: false,
        },
    );
    let mut fee = node(
        "CASE.{1}.data.fee",
        "CASE.1",
        "t1",
        json!({ "value": 7, "deps": ["RATES.{*}"] }),
        &["RATES.{*}"],
    );
    fee.expression_deps_details.insert(
        "RATES.{*}".to_string(),
        DependencyDetail::FieldsChanged {
            fields: vec!["rate".to_string()],
        },
    );
    let engine = Engine::new(ScriptedEvaluator::default());

    let rate_change = LocalEventValue::new(
        "rates",
        Some(json!({ "r1": { "rate": 1 } })),
        Some(json!({ "r1": { "rate": 2 } })),
    );
    let report = engine
        .sweep("t1", &rate_change, &config.converter(), &[fee.clone()], &entities())
        .await
        .unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].update.updates_map["data.fee"], json!(7));

    let label_change = LocalEventValue::new(
        "rates",
        Some(json!({ "r1": { "rate": 1, "label": "a" } })),
        Some(json!({ "r1": { "rate": 1, "label": "b" } })),
    );
    let report = engine
        .sweep("t1", &label_change, &config.converter(), &[fee], &entities())
        .await
        .unwrap();
    assert!(report.outcomes.is_empty());
}
