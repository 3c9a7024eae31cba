//! Workspace configuration driving change conversion.

use ripple::config::ConfigLoader;
use ripple::dependency::{extract_changed_paths, LocalEventValue};
use serde_json::json;
use std::sync::Mutex;
use tempfile::TempDir;

// Serializes HOME / RIPPLE_* access across parallel tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn with_isolated_env<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let keys = ["HOME", "RIPPLE_ENV", "RIPPLE__ENGINE__OMNI_ID"];
    let saved: Vec<Option<String>> = keys.iter().map(|k| std::env::var(k).ok()).collect();
    for key in keys {
        std::env::remove_var(key);
    }

    let result = f();

    for (key, value) in keys.iter().zip(saved) {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
    result
}

fn workspace(contents: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), contents).unwrap();
    temp
}

#[test]
fn test_workspace_sources_drive_changed_paths() {
    let temp = workspace(
        r#"
[engine]
omni_id = "ANY"

[sources.case]
base = "CASE"
id_field = "meta.id"
"#,
    );
    let config = with_isolated_env(|| ConfigLoader::load(temp.path())).unwrap();
    assert!(config.validate().is_ok());

    let event = LocalEventValue::new(
        "case",
        None,
        Some(json!({ "meta": { "id": "c-9" }, "data": { "qty": 2 } })),
    );
    let paths = extract_changed_paths(&event, &config.converter(), &config.engine.omni_id).unwrap();

    assert!(paths.contains("CASE"));
    assert!(paths.contains("CASE.{ANY}.data.qty"));
    assert!(paths.contains("CASE.{c-9}.data.qty"));
}

#[test]
fn test_keyed_rows_drop_row_ids() {
    let temp = workspace(
        r#"
[sources.lines]
base = "LINES"
keyed_rows = true
"#,
    );
    let config = with_isolated_env(|| ConfigLoader::load(temp.path())).unwrap();

    let event = LocalEventValue::new(
        "lines",
        Some(json!({ "r1": { "price": 1 } })),
        Some(json!({ "r1": { "price": 2 }, "r2": { "price": 3 } })),
    );
    let paths = extract_changed_paths(&event, &config.converter(), &config.engine.omni_id).unwrap();

    let expected: Vec<&str> = vec!["LINES", "LINES.{*}.price"];
    assert_eq!(paths.iter().map(String::as_str).collect::<Vec<_>>(), expected);
}

#[test]
fn test_skip_specifics_emits_base_only() {
    let temp = workspace(
        r#"
[sources.audit]
base = "AUDIT"
id_field = "id"
skip_specifics = true
"#,
    );
    let config = with_isolated_env(|| ConfigLoader::load(temp.path())).unwrap();

    let event = LocalEventValue::new("audit", None, Some(json!({ "id": 4, "x": 1 })));
    let paths = extract_changed_paths(&event, &config.converter(), &config.engine.omni_id).unwrap();
    assert_eq!(paths.len(), 1);
    assert!(paths.contains("AUDIT"));
}

#[test]
fn test_invalid_source_mapping_is_reported() {
    let temp = workspace(
        r#"
[sources.bad]
base = ""
"#,
    );
    let config = with_isolated_env(|| ConfigLoader::load(temp.path())).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("bad"));
}
