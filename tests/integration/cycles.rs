use jsonapi_transformer::core::TransformError;
use jsonapi_transformer::model::Value;
use jsonapi_transformer::test_utils::{Envelope, cyclic_pages, fixture_engine};
use jsonapi_transformer::transform::TransformOptions;
use serde_json::{Value as JsonValue, json};

#[test]
fn test_mutual_reference_is_circular() {
    let engine = fixture_engine().unwrap().build().unwrap();
    let (a, _b) = cyclic_pages();

    let error = engine
        .transform(&Value::shared(&a), &TransformOptions::default().with_all_includes())
        .unwrap_err();

    let TransformError::CircularReference {
        path,
    } = &error
    else {
        panic!("expected circular reference, got {error:?}");
    };
    let labels: Vec<String> = path.iter().map(ToString::to_string).collect();
    assert_eq!(labels.first().map(String::as_str), Some("page"));
    assert_eq!(labels.last().map(String::as_str), Some("page"));
    assert!(error.is_graph_error());
    assert!(error.to_string().contains("page"));
}

#[test]
fn test_cycle_outside_requested_includes_is_harmless() {
    let engine = fixture_engine().unwrap().build().unwrap();
    let (a, _b) = cyclic_pages();

    let mapping = engine.transform(&Value::shared(&a), &TransformOptions::default()).unwrap();
    assert_eq!(JsonValue::Object(mapping), json!({"id": 1, "title": "A", "slug": "/a"}));

    let one_level = engine
        .transform(&Value::shared(&a), &TransformOptions::default().with_include("children"))
        .unwrap();
    assert_eq!(one_level["children"], json!([{"id": 2, "title": "B", "slug": "/b"}]));
}

#[test]
fn test_custom_transformer_on_own_object_falls_back_to_generic() {
    let engine = fixture_engine().unwrap().build().unwrap();
    let envelope = Value::object(Envelope {
        id: 9,
        label: "Nine".to_string(),
    });

    let mapping = engine.transform(&envelope, &TransformOptions::default()).unwrap();
    assert_eq!(
        JsonValue::Object(mapping),
        json!({"id": 9, "type": "envelope", "attributes": {"label": "Nine"}})
    );
}

#[test]
fn test_same_object_twice_in_sibling_positions_is_not_a_cycle() {
    let engine = fixture_engine().unwrap().build().unwrap();
    let (a, b) = cyclic_pages();
    let list = Value::List(vec![Value::shared(&a), Value::shared(&b), Value::shared(&a)]);

    let mapping = engine.transform(&list, &TransformOptions::default()).unwrap();
    let JsonValue::Array(items) = &mapping["value"] else {
        panic!("list should be wrapped under 'value'");
    };
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], items[2]);
}
