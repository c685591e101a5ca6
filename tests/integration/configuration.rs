use jsonapi_transformer::config::EngineConfig;
use jsonapi_transformer::core::{ConfigurationError, user_friendly_error};
use jsonapi_transformer::model::Value;
use jsonapi_transformer::test_utils::{Page, fixture_engine};
use jsonapi_transformer::transform::TransformOptions;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use tempfile::TempDir;

async fn load(content: &str) -> anyhow::Result<EngineConfig> {
    let temp = TempDir::new()?;
    let path = temp.path().join("config.toml");
    tokio::fs::write(&path, content).await?;
    EngineConfig::load(Some(&path)).await
}

#[tokio::test]
async fn test_allowed_properties_override_restricts_output() {
    let config = load(
        r#"
[types.page]
allowed_properties = ["title"]
"#,
    )
    .await
    .unwrap();
    let engine = fixture_engine().unwrap().config(config).build().unwrap();

    let mapping = engine
        .transform(&Value::shared(&Page::new(42, "Home")), &TransformOptions::default())
        .unwrap();
    assert_eq!(JsonValue::Object(mapping), json!({"id": 42, "title": "Home"}));
}

#[tokio::test]
async fn test_denied_properties_override() {
    let config = load(
        r#"
[types.page]
denied_properties = ["slug"]
"#,
    )
    .await
    .unwrap();
    let engine = fixture_engine().unwrap().config(config).build().unwrap();

    let home = Page::new(1, "Home");
    home.add_child(Page::new(2, "Sub"));
    let mapping = engine
        .transform(&Value::shared(&home), &TransformOptions::default().with_all_includes())
        .unwrap();
    assert_eq!(
        JsonValue::Object(mapping),
        json!({"id": 1, "title": "Home", "children": [{"id": 2, "title": "Sub", "children": []}]})
    );
}

#[tokio::test]
async fn test_override_naming_unknown_property_fails_at_build() {
    let config = load(
        r#"
[types.page]
allowed_properties = ["headline"]
"#,
    )
    .await
    .unwrap();

    let error = fixture_engine().unwrap().config(config).build().err().unwrap();
    assert_eq!(
        error,
        ConfigurationError::UnknownProperty {
            type_name: "page".to_string(),
            property: "headline".to_string(),
        }
    );
}

#[tokio::test]
async fn test_conflicting_override_rejected_on_load() {
    let error = load(
        r#"
[types.page]
allowed_properties = ["title"]
denied_properties = ["slug"]
"#,
    )
    .await
    .unwrap_err();

    let context = user_friendly_error(error);
    assert!(context.message.contains("types.page"));
}

#[tokio::test]
async fn test_cache_settings_flow_into_engine() {
    let config = load(
        r#"
max_depth = 20

[cache]
default_ttl_secs = 300
pending_timeout_secs = 2
"#,
    )
    .await
    .unwrap();
    assert_eq!(config.cache.default_ttl(), Some(Duration::from_secs(300)));

    let engine = fixture_engine().unwrap().config(config).build().unwrap();
    assert_eq!(engine.transformer().max_depth(), 20);
    let debug = format!("{:?}", engine.cache());
    assert!(debug.contains("300s"));
    assert!(debug.contains("2s"));
}

#[tokio::test]
async fn test_invalid_toml_reports_friendly_error() {
    let error = load("max_depth = \"deep\"").await.unwrap_err();
    let context = user_friendly_error(error);
    assert!(context.message.contains("config") || context.message.contains("configuration"));
}
