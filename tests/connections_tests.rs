use std::collections::HashMap;
use std::sync::Arc;

use lagview::connections::{ConnectionRegistry, SavedTarget};
use lagview::scheduler::Scheduler;

mod helpers;
use helpers::{fake_factory, scheduler_config, FakeAdmin};

fn registry_with_targets() -> (Arc<ConnectionRegistry>, Arc<FakeAdmin>, Arc<FakeAdmin>) {
    let primary = Arc::new(FakeAdmin::default());
    let staging = Arc::new(FakeAdmin::default());
    let mut admins = HashMap::new();
    admins.insert("primary:9092".to_string(), primary.clone());
    admins.insert("staging:9092".to_string(), staging.clone());
    let factory = fake_factory(admins);

    let scheduler = Arc::new(Scheduler::new(
        factory.clone(),
        "primary:9092",
        scheduler_config(),
    ));
    let registry = Arc::new(ConnectionRegistry::new(
        scheduler,
        factory,
        "primary:9092",
    ));
    (registry, primary, staging)
}

fn saved(name: &str, brokers: &str) -> SavedTarget {
    SavedTarget {
        name: name.to_string(),
        brokers: brokers.to_string(),
        label: None,
    }
}

#[tokio::test]
async fn test_registry_seeds_the_default_target() {
    let (registry, _, _) = registry_with_targets();
    let targets = registry.list_targets();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].name, "default");
    assert_eq!(targets[0].brokers, "primary:9092");

    let (brokers, is_default) = registry.current();
    assert_eq!(brokers, "primary:9092");
    assert!(is_default);
}

#[tokio::test]
async fn test_targets_are_validated_and_listed_sorted() {
    let (registry, _, _) = registry_with_targets();

    assert!(registry.add_or_update_target(saved("", "x:9092")).is_err());
    assert!(registry.add_or_update_target(saved("bad", "  ")).is_err());

    registry
        .add_or_update_target(saved("Staging", "staging:9092"))
        .unwrap();
    registry
        .add_or_update_target(saved("backup", "backup:9092"))
        .unwrap();

    let targets = registry.list_targets();
    let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["backup", "default", "Staging"]);
}

#[tokio::test]
async fn test_last_remaining_target_cannot_be_removed() {
    let (registry, _, _) = registry_with_targets();
    assert!(registry.remove_target("nope").is_err());
    assert!(registry.remove_target("default").is_err());

    registry
        .add_or_update_target(saved("staging", "staging:9092"))
        .unwrap();
    registry.remove_target("default").unwrap();
    assert_eq!(registry.list_targets().len(), 1);
}

#[tokio::test]
async fn test_test_target_never_mutates_the_active_connection() {
    let (registry, _, staging) = registry_with_targets();

    registry.test_target("staging:9092").await.unwrap();
    assert_eq!(staging.describe_calls(), 1);

    let (brokers, is_default) = registry.current();
    assert_eq!(brokers, "primary:9092");
    assert!(is_default);

    assert!(registry.test_target("unreachable:9092").await.is_err());
    assert!(registry.test_target("   ").await.is_err());
}

#[tokio::test]
async fn test_activate_swaps_the_scheduler_target() {
    let (registry, _, _) = registry_with_targets();
    registry
        .add_or_update_target(saved("staging", "staging:9092"))
        .unwrap();

    let brokers = registry.activate("staging").await.unwrap();
    assert_eq!(brokers, "staging:9092");

    let (current, is_default) = registry.current();
    assert_eq!(current, "staging:9092");
    assert!(!is_default);

    assert!(registry.activate("missing").await.is_err());
}
