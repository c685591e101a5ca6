use chrono::{NaiveDate, TimeZone, Utc};
use jsonapi_transformer::engine::Engine;
use jsonapi_transformer::model::{Record, Value};
use jsonapi_transformer::test_utils::{Page, fixture_engine, init_test_logging, page_spec};
use jsonapi_transformer::transform::{StaticLinkResolver, TransformOptions};
use jsonapi_transformer::types::{PropertyFilter, TypeSpec};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

fn site() -> Arc<Page> {
    let home = Page::new(42, "Home");
    let sub = Page::new(43, "Sub");
    sub.add_child(Page::new(44, "Deep Page"));
    home.add_child(sub);
    home
}

#[test]
fn test_page_tree_with_and_without_includes() {
    init_test_logging(None);
    let engine = fixture_engine().unwrap().build().unwrap();
    let home = Value::shared(&site());

    let lazy = engine.transform(&home, &TransformOptions::default()).unwrap();
    assert_eq!(JsonValue::Object(lazy), json!({"id": 42, "title": "Home", "slug": "/home"}));

    let eager = engine.transform(&home, &TransformOptions::default().with_all_includes()).unwrap();
    assert_eq!(
        JsonValue::Object(eager),
        json!({
            "id": 42, "title": "Home", "slug": "/home",
            "children": [{
                "id": 43, "title": "Sub", "slug": "/sub",
                "children": [{"id": 44, "title": "Deep Page", "slug": "/deep-page", "children": []}]
            }]
        })
    );

    let dotted = engine
        .transform(&home, &TransformOptions::default().with_include_list("children.children"))
        .unwrap();
    assert_eq!(dotted["children"][0]["children"][0]["id"], 44);
    assert!(dotted["children"][0]["children"][0].get("children").is_none());
}

#[test]
fn test_transform_is_idempotent() {
    let engine = fixture_engine().unwrap().build().unwrap();
    let home = Value::shared(&site());
    let options = TransformOptions::default().with_all_includes();

    let first = serde_json::to_string(&engine.transform(&home, &options).unwrap()).unwrap();
    let second = serde_json::to_string(&engine.transform(&home, &options).unwrap()).unwrap();
    assert_eq!(first, second);

    let scalar = Value::from(vec![Value::from(1), Value::from("two")]);
    let a = engine.transform(&scalar, &options).unwrap();
    let b = engine.transform(&scalar, &options).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_top_level_shapes() {
    let engine = fixture_engine().unwrap().build().unwrap();
    let options = TransformOptions::default();

    assert_eq!(JsonValue::Object(engine.transform(&Value::Null, &options).unwrap()), json!({"id": null}));

    let scalar = engine.transform(&Value::from(42), &options).unwrap();
    assert_eq!(scalar["value"], 42);
    assert_eq!(scalar["id"].as_str().map(str::len), Some(16));

    let mut fields = std::collections::BTreeMap::new();
    fields.insert("name".to_string(), Value::from("x"));
    let map = engine.transform(&Value::Map(fields), &options).unwrap();
    assert_eq!(map["name"], "x");
    assert!(map["id"].is_string());
}

#[test]
fn test_special_types_and_links() {
    let published = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
    let engine = Engine::builder()
        .register(
            TypeSpec::<Record>::new("news")
                .id(|record| record.get("id"))
                .attribute("teaser", |record| record.get("teaser"))
                .attribute("published", |record| record.get("published"))
                .attribute("day", |record| record.get("day")),
        )
        .unwrap()
        .link_resolver(Arc::new(StaticLinkResolver::new([(
            "t3://page?uid=5".to_string(),
            "/news/5".to_string(),
        )])))
        .build()
        .unwrap();

    let news = Value::object(
        Record::new("news")
            .field("id", 5)
            .field("teaser", "Read t3://page?uid=5 or t3://page?uid=404")
            .field("published", Value::object(published))
            .field("day", Value::object(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())),
    );

    let mapping = engine.transform(&news, &TransformOptions::default()).unwrap();
    assert_eq!(mapping["teaser"], "Read /news/5 or t3://page?uid=404");
    assert_eq!(mapping["published"], "2024-05-01T12:30:00Z");
    assert_eq!(mapping["day"], "2024-05-01");
}

#[test]
fn test_declared_filter_and_post_processor() {
    let engine = Engine::builder()
        .register(
            page_spec()
                .filter(PropertyFilter::deny(["slug"]))
                .post_process(|mapping| {
                    mapping.insert("type".to_string(), "pages".into());
                }),
        )
        .unwrap()
        .build()
        .unwrap();

    let mapping = engine
        .transform(&Value::shared(&Page::new(1, "Home")), &TransformOptions::default())
        .unwrap();
    assert_eq!(JsonValue::Object(mapping), json!({"id": 1, "title": "Home", "type": "pages"}));
}
