//! End-to-end registration scenarios against the in-memory driver.
//!
//! Each test plays the part of a handling boundary: it receives a
//! `RegistrationFault`, branches on its code and decides what to do.

use std::sync::Arc;
use std::time::Duration;

use regfault_client::{ClientConfig, MemoryDriver, RegistrationClient, RetrySettings};
use regfault_core::{CapturePolicy, ErrorCode, RegistrationFault, RegistrationResult};

// ─── Helpers ──────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Abort,
    AlreadyReleased,
    Retry,
}

/// The decision table an application might use.
fn decide(fault: &RegistrationFault) -> Action {
    match fault.code() {
        ErrorCode::UnknownRegistrationId
        | ErrorCode::UnknownPublication
        | ErrorCode::UnknownSubscription => Action::AlreadyReleased,
        ErrorCode::GenericError | ErrorCode::ResourceTemporarilyUnavailable => Action::Retry,
        _ => Action::Abort,
    }
}

fn fast_config() -> ClientConfig {
    ClientConfig {
        driver_timeout_ms: 1_000,
        retry: RetrySettings {
            max_retries: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            multiplier: 2.0,
            jitter_fraction: 0.0,
        },
        ..Default::default()
    }
}

fn start(config: ClientConfig) -> (RegistrationClient, Arc<MemoryDriver>) {
    let (driver, responses) = MemoryDriver::new("test-driver");
    let driver = Arc::new(driver);
    let client = RegistrationClient::start(driver.clone(), responses, config);
    (client, driver)
}

// ─── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_release_round_trip() {
    let (client, driver) = start(fast_config());

    let publication = client
        .add_publication("aeron:udp?endpoint=localhost:40123", 10)
        .await
        .unwrap();
    assert_eq!(publication.stream_id, 10);
    assert_eq!(publication.channel, "aeron:udp?endpoint=localhost:40123");

    let subscription = client.add_subscription("aeron:ipc", 10).await.unwrap();
    assert_ne!(subscription.registration_id, publication.registration_id);
    assert_eq!(driver.publication_count(), 1);
    assert_eq!(driver.subscription_count(), 1);

    client
        .release_publication(publication.registration_id)
        .await
        .unwrap();
    client
        .release_subscription(subscription.registration_id)
        .await
        .unwrap();
    assert_eq!(driver.publication_count(), 0);
    assert_eq!(driver.subscription_count(), 0);

    client.close().await;
}

// ─── Scenario A: malformed channel ───────────────────────────────────────────

#[tokio::test]
async fn malformed_channel_is_classified_and_not_retried() {
    let (client, driver) = start(fast_config());
    let channel = "aeron:udp?endpoint=localhost";

    let fault = client.add_publication(channel, 1).await.unwrap_err();

    assert_eq!(fault.code(), ErrorCode::InvalidChannel);
    assert!(fault.message().contains(channel), "{}", fault.message());
    assert_eq!(decide(&fault), Action::Abort);
    assert_eq!(driver.publication_count(), 0);

    // the retry helper gives up straight away when the predicate says no
    let again = client
        .add_publication_with_retry(channel, 1, |f| decide(f) == Action::Retry)
        .await
        .unwrap_err();
    assert_eq!(again, fault);
}

// ─── Scenario B: release of an unknown registration ──────────────────────────

async fn release_quietly(client: &RegistrationClient, id: i64) -> RegistrationResult<()> {
    match client.release_publication(id).await {
        Err(fault) if decide(&fault) == Action::AlreadyReleased => Ok(()),
        other => other,
    }
}

#[tokio::test]
async fn unknown_registration_is_treated_as_released() {
    let (client, _driver) = start(fast_config());

    let fault = client.release_publication(9_999).await.unwrap_err();
    assert_eq!(fault.code(), ErrorCode::UnknownRegistrationId);
    assert!(fault.message().contains("9999"));

    assert!(release_quietly(&client, 9_999).await.is_ok());
}

#[tokio::test]
async fn releasing_with_the_wrong_kind_is_specific() {
    let (client, _driver) = start(fast_config());
    let sub = client.add_subscription("aeron:ipc", 3).await.unwrap();

    let fault = client
        .release_publication(sub.registration_id)
        .await
        .unwrap_err();
    assert_eq!(fault.code(), ErrorCode::UnknownPublication);
}

// ─── Scenario C: transient driver error ──────────────────────────────────────

#[tokio::test]
async fn transient_error_is_retried_until_success() {
    let (client, driver) = start(fast_config());
    driver.fail_next(2, ErrorCode::GenericError, "driver conductor busy");

    let publication = client
        .add_publication_with_retry("aeron:ipc", 5, |f| f.is(ErrorCode::GenericError))
        .await
        .unwrap();
    assert_eq!(publication.stream_id, 5);
    assert_eq!(driver.publication_count(), 1);
}

/// A caller that wraps the retrying call and propagates with `?`.
async fn open_feed(client: &RegistrationClient) -> RegistrationResult<i64> {
    let publication = client
        .add_publication_with_retry("aeron:ipc", 5, |f| f.is(ErrorCode::GenericError))
        .await?;
    Ok(publication.registration_id)
}

#[tokio::test]
async fn exhausted_retries_propagate_the_same_fault() {
    let (client, driver) = start(fast_config());
    driver.fail_next(10, ErrorCode::GenericError, "driver conductor busy");

    let fault = open_feed(&client).await.unwrap_err();
    assert_eq!(fault.code(), ErrorCode::GenericError);
    assert_eq!(fault.message(), "driver conductor busy");
    assert_eq!(driver.publication_count(), 0);

    // one first try + three retries consumed four of the injected failures
    let mut remaining = 0;
    while client.add_subscription("aeron:ipc", 1).await.is_err() {
        remaining += 1;
    }
    assert_eq!(remaining, 6);
}

// ─── Cross-context hand-off ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fault_crosses_tasks_and_threads_intact() {
    let (client, driver) = start(fast_config());
    let client = Arc::new(client);
    let message = "log buffer pool exhausted for stream 7: ünïcödé preserved";
    driver.fail_next(1, ErrorCode::ResourceTemporarilyUnavailable, message);

    let task_client = client.clone();
    let fault = tokio::spawn(async move { task_client.add_publication("aeron:ipc", 7).await })
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(fault.code(), ErrorCode::ResourceTemporarilyUnavailable);
    assert_eq!(fault.message(), message);

    let (tx, rx) = std::sync::mpsc::channel();
    let sent = fault.clone();
    std::thread::spawn(move || tx.send(sent).unwrap())
        .join()
        .unwrap();
    let received = rx.recv().unwrap();
    assert_eq!(received.code(), fault.code());
    assert_eq!(received.message(), fault.message());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_get_their_own_faults() {
    let (client, driver) = start(fast_config());
    let client = Arc::new(client);

    let mut handles = Vec::new();
    for i in 0..16i64 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            (i, client.release_subscription(1_000 + i).await)
        }));
    }
    for handle in handles {
        let (i, result) = handle.await.unwrap();
        let fault = result.unwrap_err();
        assert_eq!(fault.code(), ErrorCode::UnknownRegistrationId);
        assert_eq!(fault.message(), format!("unknown registration id: {}", 1_000 + i));
    }
    assert_eq!(driver.subscription_count(), 0);
}

// ─── Conductor-side failures ─────────────────────────────────────────────────

#[tokio::test]
async fn unknown_wire_code_falls_back_to_generic() {
    let (client, driver) = start(fast_config());
    driver.fail_next_raw(1, 4_242, "mystery failure");

    let fault = client.add_subscription("aeron:ipc", 1).await.unwrap_err();
    assert_eq!(fault.code(), ErrorCode::GenericError);
    assert_eq!(fault.message(), "mystery failure (driver error code 4242)");
    assert!(fault.cause().is_some());
}

#[tokio::test]
async fn silent_driver_times_out_then_recovers() {
    let config = ClientConfig {
        driver_timeout_ms: 50,
        ..fast_config()
    };
    let (client, driver) = start(config);
    driver.mute(true);

    let fault = client.add_publication("aeron:ipc", 1).await.unwrap_err();
    assert_eq!(fault.code(), ErrorCode::GenericError);
    assert!(fault.message().contains("within 50 ms"), "{}", fault.message());

    driver.mute(false);
    assert!(client.add_publication("aeron:ipc", 1).await.is_ok());
}

#[tokio::test]
async fn closed_response_stream_fails_fast() {
    let (driver, _unused) = MemoryDriver::new("orphan");
    let (tx, responses) = tokio::sync::mpsc::unbounded_channel();
    drop(tx);
    let client = RegistrationClient::start(Arc::new(driver), responses, fast_config());

    tokio::time::sleep(Duration::from_millis(20)).await;
    let fault = client.add_publication("aeron:ipc", 1).await.unwrap_err();
    assert_eq!(fault.code(), ErrorCode::GenericError);
}

// ─── Diagnostic capture ──────────────────────────────────────────────────────

#[tokio::test]
async fn capture_follows_configuration() {
    let (client, driver) = start(fast_config());
    driver.fail_next(1, ErrorCode::ChannelEndpointError, "bind failed");
    let fault = client.add_publication("aeron:ipc", 1).await.unwrap_err();
    assert!(fault.backtrace().is_none());

    let (client, driver) = start(ClientConfig {
        capture: CapturePolicy::Always,
        ..fast_config()
    });
    driver.fail_next(1, ErrorCode::ChannelEndpointError, "bind failed");
    let captured = client.add_publication("aeron:ipc", 1).await.unwrap_err();
    assert!(captured.backtrace().is_some());
    assert_eq!(captured, fault);
}
