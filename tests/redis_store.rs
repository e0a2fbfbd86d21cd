//! Redis store tests. Require `REDIS_URL`; run with `--ignored`.
//!
//! Each test works under its own key prefix and removes it afterwards.

use std::time::Duration;

use codeshort::infrastructure::cache::{FastStore, RedisStore};

async fn connect() -> RedisStore {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".into());
    RedisStore::connect(&url, Duration::from_secs(1)).await.unwrap()
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_set_get_delete() {
    let store = connect().await;
    let key = "codeshort-test:sgd:url:abc";

    store.set(key, b"{\"v\":1}", Duration::from_secs(30)).await.unwrap();
    assert_eq!(store.get(key).await.unwrap().as_deref(), Some(&b"{\"v\":1}"[..]));

    assert!(store.delete(key).await.unwrap());
    assert!(store.get(key).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_increment_and_take() {
    let store = connect().await;
    let key = "codeshort-test:take:pending:url:abc";
    store.delete(key).await.unwrap();

    for _ in 0..3 {
        store.increment(key, 1).await.unwrap();
    }
    assert_eq!(store.take(key).await.unwrap(), 3);
    assert_eq!(store.take(key).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_claim_takes_exact_batches() {
    let store = connect().await;
    let key = "codeshort-test:claim:pending:url:abc";
    store.delete(key).await.unwrap();

    store.increment(key, 20).await.unwrap();
    assert!(store.claim(key, 10).await.unwrap());
    assert!(store.claim(key, 10).await.unwrap());
    assert!(!store.claim(key, 10).await.unwrap());
    assert!(store.get(key).await.unwrap().is_none());

    store.increment(key, 4).await.unwrap();
    assert!(!store.claim(key, 10).await.unwrap());
    assert_eq!(store.take(key).await.unwrap(), 4);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_increment_with_expiry_sets_ttl_once() {
    let store = connect().await;
    let key = "codeshort-test:ttl:ratelimit:create:ip:0";
    store.delete(key).await.unwrap();

    assert_eq!(
        store
            .increment_with_expiry(key, Duration::from_millis(300))
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        store
            .increment_with_expiry(key, Duration::from_secs(60))
            .await
            .unwrap(),
        2
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(store.get(key).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_prefix_scan_and_delete() {
    let store = connect().await;
    let prefix = "codeshort-test:prefix*[x]:";

    for i in 0..5 {
        store
            .set(&format!("{prefix}{i}"), b"1", Duration::from_secs(30))
            .await
            .unwrap();
    }
    store
        .set("codeshort-test:prefix-other", b"1", Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(store.keys_with_prefix(prefix).await.unwrap().len(), 5);
    assert_eq!(store.delete_prefix(prefix).await.unwrap(), 5);
    assert!(store.get("codeshort-test:prefix-other").await.unwrap().is_some());

    store.delete("codeshort-test:prefix-other").await.unwrap();
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_stats_and_health() {
    let store = connect().await;

    assert!(store.health_check().await);
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.backend, "redis");
}
