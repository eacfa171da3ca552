use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;

use lagview::scheduler::{Scheduler, StatusEvent, MAX_REFRESH_SECS};

mod helpers;
use helpers::{
    committed, fake_factory, group, scheduler_config, scheduler_with, topic, watermarks, FakeAdmin,
};

fn sample_admin() -> FakeAdmin {
    FakeAdmin::with_topics(
        vec![topic("orders", vec![watermarks(0, 0, 100)])],
        vec![group("billing", vec![("orders", vec![committed(0, 80)])])],
    )
}

// ========================================
// CYCLE GUARD
// ========================================

#[tokio::test]
async fn test_overlapping_tick_is_dropped_not_queued() {
    let admin = Arc::new(FakeAdmin {
        cycle_delay: Some(Duration::from_millis(100)),
        ..sample_admin()
    });
    let scheduler = scheduler_with(admin.clone());

    let first = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.tick().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Lands mid-cycle: dropped without touching the admin client.
    assert!(!scheduler.tick().await);
    assert!(first.await.unwrap());
    assert_eq!(admin.describe_calls(), 1);
}

#[tokio::test]
async fn test_first_subscriber_triggers_one_cycle_only() {
    let admin = Arc::new(sample_admin());
    let scheduler = scheduler_with(admin.clone());
    assert_eq!(admin.describe_calls(), 0);

    let snapshot = scheduler.ensure_snapshot().await;
    assert_eq!(snapshot.topics.len(), 1);
    assert_eq!(admin.describe_calls(), 1);

    // A later subscriber reads the cache.
    scheduler.ensure_snapshot().await;
    assert_eq!(admin.describe_calls(), 1);
}

// ========================================
// PUBLISH + DEGRADATION
// ========================================

#[tokio::test]
async fn test_successful_cycle_is_broadcast() {
    let scheduler = scheduler_with(Arc::new(sample_admin()));
    let mut events = scheduler.subscribe();

    assert!(scheduler.tick().await);
    match events.try_recv() {
        Ok(StatusEvent::Status(snapshot)) => {
            assert_eq!(snapshot.topics.len(), 1);
            assert_eq!(snapshot.topics[0].name, "orders");
            assert!(snapshot.error.is_none());
        }
        other => panic!("expected a status event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_guard_is_released_after_every_tick_outcome() {
    // The overlap guard is held through the publish so a cycle admitted
    // earlier can never overwrite a newer snapshot; it must still be
    // released on the success, failure, and stale-discard paths.
    let slow = Arc::new(FakeAdmin {
        cycle_delay: Some(Duration::from_millis(100)),
        ..sample_admin()
    });
    let fast = Arc::new(sample_admin());
    let scheduler = two_target_scheduler(slow, fast);

    let stale = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.tick().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    scheduler.change_target("cluster-b:9092").await.unwrap();
    assert!(!stale.await.unwrap());

    // Guard released after the discard: the next tick is admitted.
    assert!(scheduler.tick().await);
    let first = scheduler.current_snapshot();

    // Guard released after a successful publish too.
    assert!(scheduler.tick().await);
    let second = scheduler.current_snapshot();
    assert!(second.generated_at >= first.generated_at);
}

#[tokio::test]
async fn test_failed_cycle_keeps_previous_data_and_surfaces_error() {
    let admin = Arc::new(sample_admin());
    let scheduler = scheduler_with(admin.clone());

    assert!(scheduler.tick().await);
    let healthy = scheduler.current_snapshot();
    assert_eq!(healthy.topics.len(), 1);
    assert!(healthy.error.is_none());

    admin.set_unreachable(true);
    assert!(scheduler.tick().await);

    let degraded = scheduler.current_snapshot();
    assert_eq!(degraded.topics.len(), 1, "previous topics are retained");
    assert!(degraded.error.is_some());
    assert!(degraded.generated_at >= healthy.generated_at);

    // A failed cycle still releases the overlap guard.
    admin.set_unreachable(false);
    assert!(scheduler.tick().await);
    assert!(scheduler.current_snapshot().error.is_none());
}

// ========================================
// REFRESH INTERVAL
// ========================================

#[tokio::test]
async fn test_interval_change_is_validated_and_broadcast() {
    let scheduler = scheduler_with(Arc::new(sample_admin()));
    let mut events = scheduler.subscribe();

    assert!(scheduler.set_interval_secs(0).is_err());

    scheduler.set_interval_secs(5).unwrap();
    assert_eq!(scheduler.interval_secs(), 5);
    match events.try_recv() {
        Ok(StatusEvent::RefreshRateChanged(secs)) => assert_eq!(secs, 5),
        other => panic!("expected a rate-change event, got {:?}", other),
    }

    // Setting the same value again is a no-op.
    scheduler.set_interval_secs(5).unwrap();
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_huge_interval_is_rejected_without_side_effects() {
    let scheduler = scheduler_with(Arc::new(sample_admin()));
    scheduler.set_interval_secs(5).unwrap();
    let mut events = scheduler.subscribe();

    // Any authenticated realtime client can send this value; it must be
    // range-checked, never multiplied into a wrapped-around interval.
    assert!(scheduler.set_interval_secs(u64::MAX / 2).is_err());
    assert!(scheduler.set_interval_secs(MAX_REFRESH_SECS + 1).is_err());
    assert_eq!(scheduler.interval_secs(), 5);

    assert!(scheduler.set_interval_secs(MAX_REFRESH_SECS).is_ok());

    assert_eq!(scheduler.interval_secs(), MAX_REFRESH_SECS);
    match events.try_recv() {
        Ok(StatusEvent::RefreshRateChanged(secs)) => assert_eq!(secs, MAX_REFRESH_SECS),
        other => panic!("expected a rate-change event, got {:?}", other),
    }
    // The rejected values never reached the subscribers.
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

// ========================================
// TARGET SWAP
// ========================================

fn two_target_scheduler(
    slow: Arc<FakeAdmin>,
    fast: Arc<FakeAdmin>,
) -> Arc<Scheduler> {
    let mut admins = HashMap::new();
    admins.insert("cluster-a:9092".to_string(), slow);
    admins.insert("cluster-b:9092".to_string(), fast);
    Arc::new(Scheduler::new(
        fake_factory(admins),
        "cluster-a:9092",
        scheduler_config(),
    ))
}

#[tokio::test]
async fn test_cycle_finishing_after_target_swap_is_discarded() {
    let slow = Arc::new(FakeAdmin {
        cycle_delay: Some(Duration::from_millis(100)),
        ..sample_admin()
    });
    let fast = Arc::new(sample_admin());
    let scheduler = two_target_scheduler(slow, fast.clone());
    let mut events = scheduler.subscribe();

    let stale = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.tick().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    scheduler.change_target("cluster-b:9092").await.unwrap();
    assert_eq!(scheduler.current_brokers(), "cluster-b:9092");

    // The in-flight cycle against the old target finishes unpublished.
    assert!(!stale.await.unwrap());
    assert!(scheduler.current_snapshot().cluster.is_none());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    // The next cycle speaks to the new target.
    assert!(scheduler.tick().await);
    let snapshot = scheduler.current_snapshot();
    assert_eq!(
        snapshot.cluster.as_ref().unwrap().connection_string,
        "cluster-b:9092"
    );
}

#[tokio::test]
async fn test_failed_target_swap_keeps_old_target() {
    let admin = Arc::new(sample_admin());
    let scheduler = scheduler_with(admin.clone());
    assert!(scheduler.tick().await);

    let err = scheduler.change_target("unknown:9092").await;
    assert!(err.is_err());
    assert_eq!(scheduler.current_brokers(), "broker-1:9092");
    // The cached snapshot survives the refused swap.
    assert_eq!(scheduler.current_snapshot().topics.len(), 1);
}

#[tokio::test]
async fn test_blank_target_is_rejected_before_any_connection() {
    let scheduler = scheduler_with(Arc::new(sample_admin()));
    assert!(scheduler.change_target("   ").await.is_err());
    assert_eq!(scheduler.current_brokers(), "broker-1:9092");
}
