//! Integration tests for RedisCacheRepository.
//!
//! These tests run against a real Redis server using testcontainers.
//! Requires Docker; run with `cargo test -- --ignored`.

mod common;

use common::TestRedis;
use futures::future::join_all;
use pcache_config::TopologyKind;
use pcache_core::{CacheEntry, CacheError, Payload};
use pcache_repository::{CacheRepository, RedisCacheRepository};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn create_entry(id: &str, value: serde_json::Value, expiry: u64) -> CacheEntry {
    CacheEntry::new(id, "prebid_", Payload::new("json", id, value), expiry)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_save_and_find_by_id() {
    let redis = TestRedis::new().await;
    let repo = redis.repository();
    assert_eq!(repo.topology_kind(), TopologyKind::Standalone);

    let entry = create_entry("a1b2", json!({"adm": "<div/>", "price": 1.25}), 60);
    let saved = repo.save(entry.clone()).await.expect("Failed to save entry");
    assert_eq!(saved, entry);

    let found = repo
        .find_by_id("prebid_a1b2")
        .await
        .expect("Failed to find entry")
        .expect("Entry not found");
    assert_eq!(found, entry);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_find_by_id_not_found() {
    let redis = TestRedis::new().await;
    let repo = redis.repository();

    let result = repo.find_by_id("prebid_missing").await.expect("Query failed");
    assert!(result.is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_overwrite_replaces_payload() {
    let redis = TestRedis::new().await;
    let repo = redis.repository();

    repo.save(create_entry("dup", json!("first"), 60)).await.unwrap();
    repo.save(create_entry("dup", json!("second"), 60)).await.unwrap();

    let found = repo.find_by_id("prebid_dup").await.unwrap().unwrap();
    assert_eq!(found.payload.value, json!("second"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_entry_expires() {
    let redis = TestRedis::new().await;
    let repo = redis.repository();

    repo.save(create_entry("short", json!(1), 1)).await.unwrap();
    assert!(repo.find_by_id("prebid_short").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(repo.find_by_id("prebid_short").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_invalid_entry_is_rejected() {
    let redis = TestRedis::new().await;
    let repo = redis.repository();

    let mut entry = create_entry("noexp", json!(1), 60);
    entry.expiry = None;

    let err = repo.save(entry).await.unwrap_err();
    assert!(matches!(err, CacheError::InvalidEntry(_)));
    assert!(repo.find_by_id("prebid_noexp").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_concurrent_saves() {
    let redis = TestRedis::new().await;
    let repo: Arc<RedisCacheRepository> = redis.repository();

    let saves = (0..20).map(|i| {
        let repo = Arc::clone(&repo);
        async move { repo.save(create_entry(&format!("c{i}"), json!(i), 60)).await }
    });
    for result in join_all(saves).await {
        result.expect("Failed to save entry");
    }

    for i in 0..20 {
        let found = repo.find_by_id(&format!("prebid_c{i}")).await.unwrap().unwrap();
        assert_eq!(found.payload.value, json!(i));
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_health_check() {
    let redis = TestRedis::new().await;
    let repo = RedisCacheRepository::new(&redis.config());
    repo.health_check().await.expect("Health check failed");
    assert!(repo.provider().is_connected().await);
}
