use cachet::{
    tag_set, CacheConfig, Clock, CacheRegistry, CacheResult, HeapSize, JsonSize, MockClock,
    RegistryError, SizeFn,
};
use std::sync::Arc;
use std::time::Duration;

fn registry() -> (CacheRegistry<MockClock>, MockClock) {
    let clock = MockClock::new();
    let registry = CacheRegistry::with_clock(CacheConfig::default(), clock.clone());
    (registry, clock)
}

#[test]
fn test_namespaces_are_isolated() {
    let (registry, _) = registry();
    let users = registry.manager::<String, JsonSize>("users", None).unwrap();
    let orders = registry.manager::<String, JsonSize>("orders", None).unwrap();

    users.insert("1", "alice".to_string()).unwrap();
    orders.insert("1", "order-1".to_string()).unwrap();

    assert_eq!(users.get("1"), Some("alice".to_string()));
    assert_eq!(orders.get("1"), Some("order-1".to_string()));

    users.clear();
    assert_eq!(orders.get("1"), Some("order-1".to_string()));
}

#[test]
fn test_default_config_used_when_none_given() {
    let clock = MockClock::new();
    let default = CacheConfig::builder().max_entries(3).build();
    let registry = CacheRegistry::with_clock(default.clone(), clock);

    let cache = registry.manager::<u8, JsonSize>("a", None).unwrap();
    assert_eq!(cache.config(), default);
    assert_eq!(registry.default_config(), &default);
}

#[test]
fn test_different_payload_types_per_namespace() {
    let (registry, _) = registry();
    let text = registry.manager::<String, HeapSize>("text", None).unwrap();
    let numbers = registry.manager::<Vec<u64>, JsonSize>("numbers", None).unwrap();
    let fixed = registry
        .manager_with_sizer::<u32, _>(
            "fixed",
            None,
            SizeFn(|_: &u32| -> CacheResult<u64> { Ok(64) }),
        )
        .unwrap();

    text.insert("t", "hello".to_string()).unwrap();
    numbers.insert("n", vec![1, 2, 3]).unwrap();
    fixed.insert("f", 7).unwrap();

    let stats = registry.stats_all();
    assert_eq!(stats.len(), 3);
    assert_eq!(stats["numbers"].size_bytes, 7);
    assert_eq!(stats["fixed"].size_bytes, 64);
    assert!(stats["text"].size_bytes > 0);
}

#[test]
fn test_type_mismatch_is_reported() {
    let (registry, _) = registry();
    registry.manager::<String, JsonSize>("a", None).unwrap();

    let by_value = registry.manager::<u64, JsonSize>("a", None);
    assert!(matches!(
        by_value,
        Err(RegistryError::NamespaceTypeMismatch { .. })
    ));

    let by_sizer = registry.manager::<String, HeapSize>("a", None);
    assert!(matches!(
        by_sizer,
        Err(RegistryError::NamespaceTypeMismatch { .. })
    ));
}

#[test]
fn test_clear_all_keeps_counters() {
    let (registry, _) = registry();
    let a = registry.manager::<u32, JsonSize>("a", None).unwrap();
    let b = registry.manager::<u32, JsonSize>("b", None).unwrap();
    a.insert("x", 1).unwrap();
    b.insert("y", 2).unwrap();
    a.get("x");
    b.get("missing");

    registry.clear_all();

    let stats = registry.stats_all();
    assert_eq!(stats["a"].entries, 0);
    assert_eq!(stats["b"].size_bytes, 0);
    assert_eq!(stats["a"].hits, 1);
    assert_eq!(stats["b"].misses, 1);
}

#[test]
fn test_delete_by_tag_all() {
    let (registry, _) = registry();
    let responses = registry.manager::<String, JsonSize>("responses", None).unwrap();
    let embeddings = registry.manager::<Vec<u32>, JsonSize>("embeddings", None).unwrap();

    responses
        .set("a", "x".to_string(), None, tag_set(["user:7"]))
        .unwrap();
    responses
        .set("b", "y".to_string(), None, tag_set(["user:8"]))
        .unwrap();
    embeddings
        .set("a", vec![1], None, tag_set(["user:7", "model:small"]))
        .unwrap();

    assert_eq!(registry.delete_by_tag_all("user:7"), 2);
    assert_eq!(responses.keys(), vec!["b".to_string()]);
    assert!(embeddings.is_empty());
}

#[test]
fn test_cleanup_all_with_mock_clock() {
    let (registry, clock) = registry();
    let a = registry.manager::<u32, JsonSize>("a", None).unwrap();
    a.set("short", 1, Some(Duration::from_secs(5)), Default::default())
        .unwrap();
    a.set("long", 2, Some(Duration::from_secs(50)), Default::default())
        .unwrap();

    clock.advance(Duration::from_secs(4));
    assert_eq!(registry.cleanup_all(), 0);
    clock.advance(Duration::from_secs(1));
    assert_eq!(registry.cleanup_all(), 1);

    let all = registry.stats_all();
    let stats = &all["a"];
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.last_purge_at, Some(clock.now()));
}

#[test]
fn test_namespace_listing() {
    let (registry, _) = registry();
    for name in ["zeta", "alpha", "mid"] {
        registry.manager::<u8, JsonSize>(name, None).unwrap();
    }

    assert_eq!(registry.namespaces(), vec!["alpha", "mid", "zeta"]);
    assert!(registry.contains_namespace("mid"));
    assert!(!registry.contains_namespace("other"));
}

#[tokio::test]
async fn test_remove_namespace() {
    let (registry, _) = registry();
    let cache = registry.manager::<u8, JsonSize>("a", None).unwrap();
    cache.insert("k", 1).unwrap();

    assert!(registry.remove_namespace("a").await);
    assert!(!registry.remove_namespace("a").await);
    assert!(!registry.contains_namespace("a"));
    assert!(cache.is_empty());

    let fresh = registry.manager::<u8, JsonSize>("a", None).unwrap();
    assert!(!Arc::ptr_eq(&cache, &fresh));
}

#[tokio::test]
async fn test_recreate_applies_new_config() {
    let (registry, _) = registry();
    let old = registry.manager::<u8, JsonSize>("a", None).unwrap();
    old.insert("k", 1).unwrap();

    let config = CacheConfig::builder().max_entries(1).build();
    let new = registry
        .recreate::<u8, JsonSize>("a", config.clone())
        .await
        .unwrap();

    assert_eq!(new.config(), config);
    assert!(new.is_empty());
    assert!(old.is_empty());
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_final() {
    let (registry, _) = registry();
    let cache = registry.manager::<u8, JsonSize>("a", None).unwrap();
    cache.insert("k", 1).unwrap();

    registry.shutdown().await;
    registry.shutdown().await;

    assert!(registry.is_shut_down());
    assert!(cache.is_empty());
    assert_eq!(
        registry.manager::<u8, JsonSize>("b", None).unwrap_err(),
        RegistryError::ShutDown
    );
    assert_eq!(registry.start_reaper(), Err(RegistryError::ShutDown));
}

#[tokio::test]
async fn test_shared_registry_across_tasks() {
    let registry = Arc::new(CacheRegistry::new(CacheConfig::default()));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let cache = registry.manager::<u32, JsonSize>("shared", None).unwrap();
                for i in 0..25u32 {
                    cache.insert(format!("{t}-{i}"), i).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.namespaces(), vec!["shared"]);
    assert_eq!(registry.stats_all()["shared"].entries, 100);
    registry.shutdown().await;
}
