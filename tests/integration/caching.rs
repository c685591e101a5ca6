use jsonapi_transformer::cache::{Fingerprint, ResourceCache};
use jsonapi_transformer::core::TransformError;
use jsonapi_transformer::engine::Engine;
use jsonapi_transformer::model::{Mapping, Value};
use jsonapi_transformer::test_utils::{FailingBackend, Page, fixture_engine};
use jsonapi_transformer::transform::TransformOptions;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn page_mapping(id: i64) -> Mapping {
    let mut mapping = Mapping::new();
    mapping.insert("id".to_string(), id.into());
    mapping
}

#[tokio::test]
async fn test_remember_produces_once_per_fingerprint() {
    let cache = ResourceCache::in_memory();
    let cancel = CancellationToken::new();
    let calls = AtomicUsize::new(0);
    let calls = &calls;

    for (id, lang) in [(42, "en"), (42, "en"), (42, "de"), (42, "en")] {
        let fingerprint = Fingerprint::new().part("page").part(id).part(lang);
        let mapping = cache
            .remember(&fingerprint, [Engine::resource_tag("page", id)], None, &cancel, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(page_mapping(id))
            })
            .await
            .unwrap();
        assert_eq!(mapping, page_mapping(id));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

async fn remember_page(
    cache: &ResourceCache,
    calls: &AtomicUsize,
    id: i64,
) -> Result<Mapping, TransformError> {
    let fingerprint = Fingerprint::new().part("page").part(id);
    let tags = [Engine::resource_tag("page", id), "pages".to_string()];
    cache
        .remember(&fingerprint, tags, None, &CancellationToken::new(), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(page_mapping(id))
        })
        .await
}

#[tokio::test]
async fn test_invalidation_only_affects_tagged_entries() {
    let cache = ResourceCache::in_memory();
    let calls = AtomicUsize::new(0);

    remember_page(&cache, &calls, 1).await.unwrap();
    remember_page(&cache, &calls, 2).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert_eq!(cache.invalidate_by_tag("page_1"), 1);
    remember_page(&cache, &calls, 1).await.unwrap();
    remember_page(&cache, &calls, 2).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    assert_eq!(cache.invalidate_by_tag("pages"), 2);
    remember_page(&cache, &calls, 1).await.unwrap();
    remember_page(&cache, &calls, 2).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_transform_cached_reflects_invalidated_changes() {
    let engine = fixture_engine().unwrap().build().unwrap();
    let cancel = CancellationToken::new();
    let options = TransformOptions::default().with_include("children");
    let fingerprint = Engine::resource_fingerprint("page", 1, &options);
    let tags = [Engine::resource_tag("page", 1)];

    let home = Page::new(1, "Home");
    let value = Value::shared(&home);
    let first = engine.transform_cached(&value, &fingerprint, tags.clone(), None, &options, &cancel).await.unwrap();
    assert_eq!(first["children"], serde_json::json!([]));

    home.add_child(Page::new(2, "About"));
    let stale = engine.transform_cached(&value, &fingerprint, tags.clone(), None, &options, &cancel).await.unwrap();
    assert_eq!(stale, first);

    engine.cache().invalidate_by_tag(&tags[0]);
    let fresh = engine.transform_cached(&value, &fingerprint, tags.clone(), None, &options, &cancel).await.unwrap();
    assert_eq!(fresh["children"][0]["title"], "About");
}

#[tokio::test]
async fn test_failing_backend_degrades_to_recompute() {
    let engine = fixture_engine()
        .unwrap()
        .cache_backend(Arc::new(FailingBackend))
        .build()
        .unwrap();
    let cancel = CancellationToken::new();
    let options = TransformOptions::default();
    let home = Value::shared(&Page::new(1, "Home"));
    let fingerprint = Engine::resource_fingerprint("page", 1, &options);

    for _ in 0..3 {
        let mapping = engine
            .transform_cached(&home, &fingerprint, ["page_1"], None, &options, &cancel)
            .await
            .unwrap();
        assert_eq!(mapping["title"], "Home");
    }

    let stats = engine.cache().stats();
    assert_eq!(stats.productions, 3);
    assert_eq!(stats.hits, 0);
    assert!(stats.backend_errors > 0);
}

#[tokio::test]
async fn test_waiter_cancellation() {
    let cache = Arc::new(ResourceCache::in_memory());
    let fingerprint = Fingerprint::new().part("slow");
    let release = Arc::new(tokio::sync::Notify::new());
    let started = Arc::new(tokio::sync::Notify::new());

    let producer = {
        let cache = cache.clone();
        let fingerprint = fingerprint.clone();
        let release = release.clone();
        let started = started.clone();
        tokio::spawn(async move {
            cache
                .remember(&fingerprint, ["slow"], None, &CancellationToken::new(), || async move {
                    started.notify_one();
                    release.notified().await;
                    Ok(page_mapping(1))
                })
                .await
        })
    };
    started.notified().await;
    assert_eq!(cache.in_flight(), 1);

    let cancel = CancellationToken::new();
    let waiter = {
        let cache = cache.clone();
        let fingerprint = fingerprint.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cache
                .remember(&fingerprint, ["slow"], None, &cancel, || async { Ok(page_mapping(2)) })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    assert!(matches!(waiter.await.unwrap(), Err(TransformError::Cancelled)));

    release.notify_one();
    assert_eq!(producer.await.unwrap().unwrap(), page_mapping(1));
    assert_eq!(cache.in_flight(), 0);
}

#[tokio::test]
async fn test_cancelled_producer_is_not_cached() {
    let cache = ResourceCache::in_memory();
    let fingerprint = Fingerprint::new().part("cancelled");
    let cancel = CancellationToken::new();
    let cancel_ref = &cancel;

    let result = cache
        .remember(&fingerprint, ["t"], None, &cancel, || async move {
            cancel_ref.cancel();
            tokio::task::yield_now().await;
            std::future::pending::<Result<Mapping, TransformError>>().await
        })
        .await;
    assert!(matches!(result, Err(TransformError::Cancelled)));
    assert_eq!(cache.in_flight(), 0);

    let fresh = CancellationToken::new();
    let mapping = cache
        .remember(&fingerprint, ["t"], None, &fresh, || async { Ok(page_mapping(5)) })
        .await
        .unwrap();
    assert_eq!(mapping, page_mapping(5));
}
