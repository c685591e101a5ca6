use jsonapi_transformer::config::EngineConfig;
use jsonapi_transformer::constants::MAX_DEPTH_LIMIT;
use jsonapi_transformer::core::{ConfigurationError, TransformError};
use jsonapi_transformer::model::Value;
use jsonapi_transformer::test_utils::{chain, fixture_engine};
use jsonapi_transformer::transform::TransformOptions;

fn eager() -> TransformOptions {
    TransformOptions::default().with_all_includes()
}

#[test]
fn test_chain_at_max_depth_succeeds() {
    let engine = fixture_engine().unwrap().build().unwrap();
    let mapping = engine.transform(&Value::shared(&chain(50)), &eager()).unwrap();

    let mut current = &serde_json::Value::Object(mapping);
    let mut seen = 0;
    while let Some(id) = current.get("id") {
        seen += 1;
        assert_eq!(id, seen);
        current = &current["next"];
    }
    assert_eq!(seen, 50);
}

#[test]
fn test_chain_beyond_max_depth_fails() {
    let engine = fixture_engine().unwrap().build().unwrap();
    let error = engine.transform(&Value::shared(&chain(51)), &eager()).unwrap_err();

    match error {
        TransformError::DepthExceeded {
            max_depth,
            path,
        } => {
            assert_eq!(max_depth, 50);
            // The rejected frame is reported as the last path entry.
            assert_eq!(path.len(), 51);
        }
        other => panic!("expected depth error, got {other:?}"),
    }
}

#[test]
fn test_configured_max_depth_applies() {
    let config = EngineConfig {
        max_depth: 5,
        ..EngineConfig::default()
    };
    let engine = fixture_engine().unwrap().config(config).build().unwrap();

    assert!(engine.transform(&Value::shared(&chain(5)), &eager()).is_ok());
    assert!(matches!(
        engine.transform(&Value::shared(&chain(6)), &eager()),
        Err(TransformError::DepthExceeded { max_depth: 5, .. })
    ));
}

#[test]
fn test_depth_limit_ceiling_fits_default_stack() {
    let config = EngineConfig {
        max_depth: MAX_DEPTH_LIMIT,
        ..EngineConfig::default()
    };
    let engine = fixture_engine().unwrap().config(config).build().unwrap();

    // Test threads run on the default 2 MiB stack.
    assert!(engine.transform(&Value::shared(&chain(MAX_DEPTH_LIMIT)), &eager()).is_ok());
    assert!(matches!(
        engine.transform(&Value::shared(&chain(MAX_DEPTH_LIMIT + 1)), &eager()),
        Err(TransformError::DepthExceeded { .. })
    ));
}

#[test]
fn test_depth_beyond_ceiling_is_rejected_at_build() {
    let config = EngineConfig {
        max_depth: 2000,
        ..EngineConfig::default()
    };
    let error = fixture_engine().unwrap().config(config).build().unwrap_err();
    assert!(matches!(error, ConfigurationError::InvalidValue { ref key, .. } if key == "max_depth"));
}

#[test]
fn test_lazy_relations_do_not_count_towards_depth() {
    let engine = fixture_engine().unwrap().build().unwrap();
    let mapping = engine.transform(&Value::shared(&chain(500)), &TransformOptions::default()).unwrap();
    assert_eq!(mapping["id"], 1);
    assert!(mapping.get("next").is_none());
}
