use jsonapi_transformer::cache::{Fingerprint, ResourceCache};
use jsonapi_transformer::engine::Engine;
use jsonapi_transformer::model::{Mapping, Value};
use jsonapi_transformer::test_utils::{Page, fixture_engine, init_test_logging};
use jsonapi_transformer::transform::TransformOptions;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const TASKS: usize = 200;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_stampede_on_one_key_produces_once() {
    init_test_logging(None);
    let cache = Arc::new(ResourceCache::in_memory());
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(tokio::sync::Barrier::new(TASKS));
    let start = Instant::now();

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                let fingerprint = Fingerprint::new().part("page").part(1);
                cache
                    .remember(&fingerprint, ["page_1"], None, &CancellationToken::new(), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        let mut mapping = Mapping::new();
                        mapping.insert("id".to_string(), 1.into());
                        Ok(mapping)
                    })
                    .await
            })
        })
        .collect();

    for handle in futures::future::join_all(handles).await {
        let mapping = handle.unwrap().unwrap();
        assert_eq!(mapping["id"], 1);
    }

    println!("{TASKS} concurrent callers served in {:?}", start.elapsed());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let stats = cache.stats();
    assert_eq!(stats.productions, 1);
    assert_eq!(stats.hits, (TASKS - 1) as u64);
    assert_eq!(cache.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_failing_producer_hands_over_to_a_waiter() {
    let cache = Arc::new(ResourceCache::in_memory());
    let attempts = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(tokio::sync::Barrier::new(32));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let cache = cache.clone();
            let attempts = attempts.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                cache
                    .remember(&Fingerprint::new().part("flaky"), ["flaky"], None, &CancellationToken::new(), || async move {
                        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        if attempt == 0 {
                            return Err(jsonapi_transformer::core::TransformError::Transformer {
                                type_name: "flaky".to_string(),
                                message: "first attempt fails".to_string(),
                            });
                        }
                        let mut mapping = Mapping::new();
                        mapping.insert("id".to_string(), "ok".into());
                        Ok(mapping)
                    })
                    .await
            })
        })
        .collect();

    let results: Vec<_> =
        futures::future::join_all(handles).await.into_iter().map(|handle| handle.unwrap()).collect();

    assert_eq!(results.iter().filter(|result| result.is_err()).count(), 1);
    assert!(results.iter().filter_map(|result| result.as_ref().ok()).all(|mapping| mapping["id"] == "ok"));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_cached_transforms_across_keys() {
    let engine = Arc::new(fixture_engine().unwrap().build().unwrap());
    let pages: Vec<Arc<Page>> = (0..10).map(|id| Page::new(id, &format!("Page {id}"))).collect();
    let start = Instant::now();

    let handles: Vec<_> = (0..TASKS)
        .map(|task| {
            let engine = engine.clone();
            let page = pages[task % pages.len()].clone();
            tokio::spawn(async move {
                let options = TransformOptions::default();
                let fingerprint = Engine::resource_fingerprint("page", page.id, &options);
                let tag = Engine::resource_tag("page", page.id);
                engine
                    .transform_cached(&Value::shared(&page), &fingerprint, [tag], None, &options, &CancellationToken::new())
                    .await
            })
        })
        .collect();

    for handle in futures::future::join_all(handles).await {
        assert!(handle.unwrap().is_ok());
    }

    println!("{TASKS} cached transforms over 10 keys in {:?}", start.elapsed());
    assert_eq!(engine.cache().stats().productions, 10);
}
