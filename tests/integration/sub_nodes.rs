//! Sub-node expansion over array data and vertical merging of child updates.

use super::support::{case_config, ScriptedEvaluator};
use ripple::dependency::LocalEventValue;
use ripple::merge::{HorizontalMergePolicy, MergePolicy, VerticalMergePolicy};
use ripple::node::DependencyGraphNode;
use ripple::Engine;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn items_entity() -> Value {
    json!({
        "data": {
            "items": [
                { "qty": 1 },
                { "qty": 2 },
                { "qty": 3 }
            ]
        }
    })
}

fn items_parent() -> DependencyGraphNode {
    let price = DependencyGraphNode::new("CASE.{1}.data.items.[].price", "CASE.1", "t1")
        .with_expression(json!({
            "byIndex": [10, 20, 30],
            "deps": ["CASE.{1}.data.items.[].qty"]
        }));
    DependencyGraphNode::new("CASE.{1}.data.items", "CASE.1", "t1").with_sub_node_definition(price)
}

#[tokio::test]
async fn test_definition_expands_once_per_element() {
    let engine = Engine::new(ScriptedEvaluator::default());
    let mut parent = items_parent();
    parent.dirty_reason.insert("CASE.{1}.data.items.1.qty".to_string());

    let outcome = engine
        .process_node(parent, &items_entity(), "t1")
        .await
        .unwrap();

    let targets: Vec<&str> = outcome.node.sub_nodes.iter().map(|n| n.target.as_str()).collect();
    assert_eq!(
        targets,
        vec![
            "CASE.{1}.data.items.0.price",
            "CASE.{1}.data.items.1.price",
            "CASE.{1}.data.items.2.price"
        ]
    );

    // only the element whose quantity changed may write
    assert_eq!(outcome.update.updates_map.len(), 1);
    assert_eq!(outcome.update.updates_map["data.items.1.price"], json!(20));
    assert_eq!(outcome.update.children.len(), 1);
    assert_eq!(outcome.update.children[0].target, "CASE.{1}.data.items.1.price");

    assert!(outcome.node.child_deps.contains("CASE.{1}.data.items.0.qty"));
    assert!(outcome.node.child_deps.contains("CASE.{1}.data.items.2.qty"));
}

#[tokio::test]
async fn test_child_dependencies_make_parent_dirty_on_next_sweep() {
    let engine = Engine::new(ScriptedEvaluator::default());
    let mut parent = items_parent();
    parent.dirty_reason.insert("CASE.{1}.data.items.1.qty".to_string());
    let first = engine
        .process_node(parent, &items_entity(), "t1")
        .await
        .unwrap();

    let event = LocalEventValue::new(
        "case",
        Some(json!({ "id": 1, "data": { "items": [{ "qty": 1 }, { "qty": 2 }, { "qty": 3 }] } })),
        Some(json!({ "id": 1, "data": { "items": [{ "qty": 1 }, { "qty": 2 }, { "qty": 4 }] } })),
    );
    let mut entities = BTreeMap::new();
    entities.insert("CASE.1".to_string(), items_entity());

    let report = engine
        .sweep("t1", &event, &case_config().converter(), &[first.node], &entities)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    let refreshed = &report.outcomes[0].node;
    assert_eq!(refreshed.sub_nodes.len(), 3);
    // live metadata carries over: the element written last sweep is on its second write
    assert_eq!(refreshed.sub_nodes[1].version, 2);
    assert_eq!(refreshed.sub_nodes[2].version, 1);
    assert_eq!(
        report.outcomes[0].update.updates_map["data.items.2.price"],
        json!(30)
    );
}

#[tokio::test]
async fn test_missing_array_yields_no_instances() {
    let engine = Engine::new(ScriptedEvaluator::default());
    let mut parent = items_parent();
    parent.dirty_reason.insert("CASE.{1}.data.items.0.qty".to_string());

    let outcome = engine
        .process_node(parent, &json!({ "data": {} }), "t1")
        .await
        .unwrap();
    assert!(outcome.node.sub_nodes.is_empty());
    assert!(!outcome.has_updates());
}

#[tokio::test]
async fn test_vertical_policy_decides_shared_keys() {
    async fn summary_value(vertical: VerticalMergePolicy) -> Value {
        let child = DependencyGraphNode::new("CASE.{1}.data.summary.a", "CASE.1", "t1")
            .with_expression(json!({ "value": 2, "deps": ["CASE.{1}.data.x"] }))
            .with_policy(MergePolicy::new(HorizontalMergePolicy::Overwrite, vertical));
        let mut parent = DependencyGraphNode::new("CASE.{1}.data.summary", "CASE.1", "t1")
            .with_expression(json!({ "value": { "a": 1 }, "deps": ["CASE.{1}.data.x"] }))
            .with_sub_node_definition(child);
        parent.dirty_reason.insert("CASE.{1}.data.x".to_string());

        let engine = Engine::new(ScriptedEvaluator::default());
        let outcome = engine
            .process_node(parent, &json!({ "data": { "x": 1 } }), "t1")
            .await
            .unwrap();
        outcome.update.updates_map["data.summary.a"].clone()
    }

    assert_eq!(summary_value(VerticalMergePolicy::Child).await, json!(2));
    assert_eq!(summary_value(VerticalMergePolicy::Parent).await, json!(1));
}
