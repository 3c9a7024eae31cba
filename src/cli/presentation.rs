//! CLI presentation: text and json formatters per command family.

use crate::config::RippleConfig;
use crate::node::DependencyGraphNode;
use crate::target::ParsedTarget;
use anyhow::Context;
use comfy_table::Table;
use std::collections::BTreeSet;

pub fn format_parsed_target(parsed: &ParsedTarget, format: &str) -> anyhow::Result<String> {
    if format == "json" {
        return serde_json::to_string_pretty(parsed).context("Failed to serialize target");
    }
    Ok(match parsed {
        ParsedTarget::Entity(target) => format!(
            "Entity: {}\nId: {}\nRest: {}",
            target.entity,
            target.id,
            if target.rest.is_empty() { "-" } else { target.rest.as_str() }
        ),
        ParsedTarget::NotValid => "NOT_VALID".to_string(),
    })
}

pub fn format_changed_paths(paths: &BTreeSet<String>, format: &str) -> anyhow::Result<String> {
    if format == "json" {
        return serde_json::to_string_pretty(paths).context("Failed to serialize paths");
    }
    if paths.is_empty() {
        return Ok("No changed paths.".to_string());
    }
    Ok(paths.iter().cloned().collect::<Vec<_>>().join("\n"))
}

pub fn format_affected_nodes(
    nodes: &[DependencyGraphNode],
    format: &str,
) -> anyhow::Result<String> {
    if format == "json" {
        let rows: Vec<serde_json::Value> = nodes
            .iter()
            .map(|node| {
                serde_json::json!({
                    "target": node.target,
                    "entity": node.entity,
                    "status": node.status,
                    "dirtyReason": node.dirty_reason,
                })
            })
            .collect();
        return serde_json::to_string_pretty(&rows).context("Failed to serialize nodes");
    }
    if nodes.is_empty() {
        return Ok("No affected nodes.".to_string());
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Target", "Entity", "Status", "Dirty reason"]);
    for node in nodes {
        let reason = node
            .dirty_reason
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            node.target.clone(),
            node.entity.clone(),
            format!("{:?}", node.status),
            reason,
        ]);
    }
    Ok(table.to_string())
}

pub fn format_config(config: &RippleConfig) -> anyhow::Result<String> {
    toml::to_string_pretty(config).context("Failed to render configuration as TOML")
}
