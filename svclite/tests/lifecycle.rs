//! Integration tests for the remote-service lifecycle state machine.

use std::sync::Arc;
use std::time::Duration;

use svclite::broker::{
    Caller, RemoveStatus, RequestStatus, ServiceBroker, ServiceOptions, Subscriber,
};
use svclite::{ComponentName, ConnectionEvent};
use svclite_test_utils::{FakeHandle, ScriptedLauncher, StaticResolver};
use tokio::sync::mpsc::UnboundedReceiver;

const CALLER: Caller = Caller {
    uid: 1010123,
    pid: 4321,
};

/// Helper to create a broker wired to scripted collaborators.
fn create_test_broker() -> (ServiceBroker, Arc<ScriptedLauncher>) {
    let resolver = Arc::new(StaticResolver::new().with(
        "com.example.app",
        10,
        1010123,
        "/data/app/com.example.app/base.apk",
    ));
    let launcher = Arc::new(ScriptedLauncher::new());
    let broker = ServiceBroker::new(resolver, launcher.clone());
    (broker, launcher)
}

fn options() -> ServiceOptions {
    ServiceOptions::new(ComponentName::new("com.example.app", "ExampleService"))
}

fn drain(rx: &mut UnboundedReceiver<ConnectionEvent>) -> Vec<ConnectionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Poll until the record table reaches the expected size.
async fn wait_for_count(broker: &ServiceBroker, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if broker.service_count().unwrap() == expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {} records (saw {})",
            expected,
            broker.service_count().unwrap()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_concurrent_requests_share_one_spawn() {
    let (broker, launcher) = create_test_broker();
    let (sub_a, mut rx_a) = Subscriber::channel();
    let (sub_b, mut rx_b) = Subscriber::channel();

    let status = broker
        .request_service(CALLER, &options(), sub_a)
        .await
        .unwrap();
    assert_eq!(status, RequestStatus::SpawnScheduled);

    // Second request for the same key/version joins the in-flight record
    let status = broker
        .request_service(CALLER, &options(), sub_b)
        .await
        .unwrap();
    assert_eq!(status, RequestStatus::Reused);

    launcher.wait_for_launches(1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(launcher.launch_count(), 1);

    // The spawned process attaches with the record's token
    let token = launcher.launches()[0].token.clone();
    let handle = FakeHandle::new("svc");
    broker.attach(handle, token.as_str()).await.unwrap();

    // Both subscribers hear exactly one connected
    let events_a = drain(&mut rx_a);
    let events_b = drain(&mut rx_b);
    assert_eq!(events_a.len(), 1);
    assert_eq!(events_b.len(), 1);
    assert!(events_a[0].is_connected());
    assert!(events_b[0].is_connected());
}

#[tokio::test]
async fn test_request_on_attached_record_connects_joiner_only() {
    let (broker, launcher) = create_test_broker();
    let (sub_a, mut rx_a) = Subscriber::channel();

    broker
        .request_service(CALLER, &options(), sub_a)
        .await
        .unwrap();
    launcher.wait_for_launches(1).await;

    let token = launcher.launches()[0].token.clone();
    broker
        .attach(FakeHandle::new("svc"), token.as_str())
        .await
        .unwrap();
    assert_eq!(drain(&mut rx_a).len(), 1);

    // A later subscriber gets an immediate connected; the first hears
    // nothing new
    let (sub_c, mut rx_c) = Subscriber::channel();
    let status = broker
        .request_service(CALLER, &options(), sub_c)
        .await
        .unwrap();
    assert_eq!(status, RequestStatus::Reused);

    assert_eq!(drain(&mut rx_c).len(), 1);
    assert!(drain(&mut rx_a).is_empty());
    assert_eq!(launcher.launch_count(), 1);
}

#[tokio::test]
async fn test_attach_unknown_token_rejected() {
    let (broker, _launcher) = create_test_broker();

    let result = broker
        .attach(FakeHandle::new("stray"), "no-such-token")
        .await;
    assert!(matches!(
        result,
        Err(svclite::SvcliteError::UnknownToken(_))
    ));
    assert_eq!(broker.service_count().unwrap(), 0);
}

#[tokio::test]
async fn test_second_attach_with_same_token_rejected() {
    let (broker, launcher) = create_test_broker();
    let (subscriber, mut rx) = Subscriber::channel();

    broker
        .request_service(CALLER, &options(), subscriber)
        .await
        .unwrap();
    launcher.wait_for_launches(1).await;
    let token = launcher.launches()[0].token.clone();

    broker
        .attach(FakeHandle::new("first"), token.as_str())
        .await
        .unwrap();

    let result = broker
        .attach(FakeHandle::new("second"), token.as_str())
        .await;
    assert!(matches!(
        result,
        Err(svclite::SvcliteError::AlreadyAttached(_))
    ));

    // No re-broadcast: still exactly one connected event
    assert_eq!(drain(&mut rx).len(), 1);
    let info = broker.get_service(&options().service_key()).unwrap().unwrap();
    assert!(info.attached);
}

#[tokio::test]
async fn test_remove_service_notifies_and_resets_slot() {
    let (broker, launcher) = create_test_broker();
    let (subscriber, mut rx) = Subscriber::channel();

    broker
        .request_service(CALLER, &options(), subscriber.clone())
        .await
        .unwrap();
    launcher.wait_for_launches(1).await;
    let first_token = launcher.launches()[0].token.clone();

    let handle = FakeHandle::new("svc");
    broker
        .attach(handle.clone(), first_token.as_str())
        .await
        .unwrap();

    let status = broker.remove_service(CALLER, &options()).await.unwrap();
    assert_eq!(status, RemoveStatus::Removed);
    assert_eq!(broker.service_count().unwrap(), 0);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(events[0].is_connected());
    assert!(!events[1].is_connected());

    // The torn-down service is asked to exit
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !handle.shutdown_requested() {
        assert!(tokio::time::Instant::now() < deadline, "no shutdown request");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // A fresh request never reuses the torn-down record's token
    let status = broker
        .request_service(CALLER, &options(), subscriber)
        .await
        .unwrap();
    assert_eq!(status, RequestStatus::SpawnScheduled);
    launcher.wait_for_launches(2).await;
    assert_ne!(launcher.launches()[1].token, first_token);
}

#[tokio::test]
async fn test_remove_missing_record_is_not_found() {
    let (broker, launcher) = create_test_broker();

    let status = broker.remove_service(CALLER, &options()).await.unwrap();
    assert_eq!(status, RemoveStatus::NotFound);
    assert_eq!(launcher.launch_count(), 0);
}

#[tokio::test]
async fn test_death_detection_tears_down_record() {
    let (broker, launcher) = create_test_broker();
    let (subscriber, mut rx) = Subscriber::channel();

    broker
        .request_service(CALLER, &options(), subscriber.clone())
        .await
        .unwrap();
    launcher.wait_for_launches(1).await;
    let token = launcher.launches()[0].token.clone();

    let handle = FakeHandle::new("svc");
    broker
        .attach(handle.clone(), token.as_str())
        .await
        .unwrap();

    handle.kill();
    wait_for_count(&broker, 0).await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(!events[1].is_connected());

    // The key is free again; the next request starts from scratch
    let status = broker
        .request_service(CALLER, &options(), subscriber)
        .await
        .unwrap();
    assert_eq!(status, RequestStatus::SpawnScheduled);
    launcher.wait_for_launches(2).await;
    assert_ne!(launcher.launches()[1].token, token);
}

#[tokio::test]
async fn test_dead_handle_detected_on_request() {
    let (broker, launcher) = create_test_broker();
    let (subscriber, mut rx) = Subscriber::channel();

    broker
        .request_service(CALLER, &options(), subscriber.clone())
        .await
        .unwrap();
    launcher.wait_for_launches(1).await;
    let token = launcher.launches()[0].token.clone();

    let handle = FakeHandle::new("svc");
    broker
        .attach(handle.clone(), token.as_str())
        .await
        .unwrap();

    // Probe sees the process dead before any death watch fires
    handle.set_alive(false);

    let status = broker
        .request_service(CALLER, &options(), subscriber)
        .await
        .unwrap();
    assert_eq!(status, RequestStatus::SpawnScheduled);

    // connected (attach), disconnected (stale teardown)
    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(!events[1].is_connected());

    launcher.wait_for_launches(2).await;
    assert_ne!(launcher.launches()[1].token, token);
}

#[tokio::test]
async fn test_version_mismatch_recreates_record() {
    let (broker, launcher) = create_test_broker();
    let (sub_a, mut rx_a) = Subscriber::channel();
    let (sub_b, mut rx_b) = Subscriber::channel();
    let (sub_c, mut rx_c) = Subscriber::channel();

    // A and B share version 1
    broker
        .request_service(CALLER, &options(), sub_a)
        .await
        .unwrap();
    broker
        .request_service(CALLER, &options(), sub_b)
        .await
        .unwrap();

    launcher.wait_for_launches(1).await;
    let token_v1 = launcher.launches()[0].token.clone();
    let handle = FakeHandle::new("v1");
    broker
        .attach(handle.clone(), token_v1.as_str())
        .await
        .unwrap();
    assert!(drain(&mut rx_a)[0].is_connected());
    assert!(drain(&mut rx_b)[0].is_connected());

    // C asks for version 2: the stale record is torn down first
    let mut v2 = options();
    v2.version_code = 2;
    let status = broker.request_service(CALLER, &v2, sub_c).await.unwrap();
    assert_eq!(status, RequestStatus::SpawnScheduled);

    assert!(!drain(&mut rx_a)[0].is_connected());
    assert!(!drain(&mut rx_b)[0].is_connected());
    assert!(drain(&mut rx_c).is_empty());

    launcher.wait_for_launches(2).await;
    let token_v2 = launcher.launches()[1].token.clone();
    assert_ne!(token_v2, token_v1);

    // The consumed v1 token is gone with its record
    let result = broker
        .attach(FakeHandle::new("late"), token_v1.as_str())
        .await;
    assert!(matches!(
        result,
        Err(svclite::SvcliteError::UnknownToken(_))
    ));

    broker
        .attach(FakeHandle::new("v2"), token_v2.as_str())
        .await
        .unwrap();
    assert!(drain(&mut rx_c)[0].is_connected());
}

#[tokio::test]
async fn test_spawn_failure_allows_demand_driven_retry() {
    let (broker, launcher) = create_test_broker();
    let (subscriber, _rx) = Subscriber::channel();

    launcher.push_outcome(Ok(1));
    let status = broker
        .request_service(CALLER, &options(), subscriber.clone())
        .await
        .unwrap();
    assert_eq!(status, RequestStatus::SpawnScheduled);
    launcher.wait_for_launches(1).await;

    // Once the failure is reconciled, the next request re-triggers a spawn
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let status = broker
            .request_service(CALLER, &options(), subscriber.clone())
            .await
            .unwrap();
        if status == RequestStatus::SpawnScheduled {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "spawn never re-armed after failure"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    launcher.wait_for_launches(2).await;
    // Same record, same un-consumed token
    assert_eq!(launcher.launches()[1].token, launcher.launches()[0].token);
}

#[tokio::test]
async fn test_repeated_registration_yields_single_events() {
    let (broker, launcher) = create_test_broker();
    let (subscriber, mut rx) = Subscriber::channel();

    // Same subscriber asks twice before attach
    broker
        .request_service(CALLER, &options(), subscriber.clone())
        .await
        .unwrap();
    broker
        .request_service(CALLER, &options(), subscriber.clone())
        .await
        .unwrap();

    launcher.wait_for_launches(1).await;
    let token = launcher.launches()[0].token.clone();
    broker
        .attach(FakeHandle::new("svc"), token.as_str())
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1, "exactly one connected per subscriber");

    broker.remove_service(CALLER, &options()).await.unwrap();
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1, "exactly one disconnected per subscriber");
}

#[tokio::test]
async fn test_gone_subscriber_does_not_block_broadcast() {
    let (broker, launcher) = create_test_broker();
    let (sub_live, mut rx_live) = Subscriber::channel();
    let (sub_dead, rx_dead) = Subscriber::channel();

    broker
        .request_service(CALLER, &options(), sub_live)
        .await
        .unwrap();
    broker
        .request_service(CALLER, &options(), sub_dead)
        .await
        .unwrap();
    drop(rx_dead);

    launcher.wait_for_launches(1).await;
    let token = launcher.launches()[0].token.clone();
    broker
        .attach(FakeHandle::new("svc"), token.as_str())
        .await
        .unwrap();

    assert_eq!(drain(&mut rx_live).len(), 1);
}
