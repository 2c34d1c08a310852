use huddle_client::{CallError, CallNotification, CallState};
use huddle_core::RoomId;

use std::time::Duration;

use crate::integration::{init_tracing, join_call, join_call_with};
use crate::utils::{
    EventLog, LoopbackRelay, MockMediaProvider, MockTransport, NOTIFY_TIMEOUT_MS, pid,
    wait_for_notification,
};

#[tokio::test]
async fn test_end_closes_links_and_stops_polling() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let alice = join_call(&relay, "planning", "alice").await;
    let bob = join_call(&relay, "planning", "bob").await;
    let carol = join_call(&relay, "planning", "carol").await;

    alice.wait_connected(&["bob", "carol"]).await.unwrap();

    let report = alice.handle.end().await.unwrap();

    assert_eq!(report.closed_links, vec![pid("bob"), pid("carol")]);
    assert!(report.polling_stopped);
    assert_eq!(alice.handle.state(), CallState::Ended);
    assert!(alice.transport.latest(&pid("bob")).await.unwrap().closed);
    assert!(alice.transport.latest(&pid("carol")).await.unwrap().closed);

    let users = relay.rooms().users(&RoomId::from("planning")).unwrap();
    assert!(users.iter().all(|u| u.id != "alice"));

    bob.wait_connected(&["carol"]).await.unwrap();
    carol.wait_participants(&["bob"]).await.unwrap();
}

#[tokio::test]
async fn test_end_releases_every_local_track() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let alice = join_call(&relay, "planning", "alice").await;

    alice.handle.end().await.unwrap();

    let mut acquired = alice.media.acquired().await;
    let mut released = alice.media.released().await;
    acquired.sort();
    released.sort();
    assert_eq!(acquired, vec!["camera-2".to_owned(), "mic-1".to_owned()]);
    assert_eq!(released, acquired);
}

#[tokio::test]
async fn test_handle_is_unusable_after_end() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let mut alice = join_call(&relay, "planning", "alice").await;

    alice.handle.end().await.unwrap();

    wait_for_notification(&mut alice.notifications, NOTIFY_TIMEOUT_MS, |n| {
        matches!(n, CallNotification::StateChanged(CallState::Ended))
    })
    .await
    .unwrap();

    assert!(matches!(
        alice.handle.snapshot().await,
        Err(CallError::SessionClosed)
    ));
    assert!(matches!(
        alice.handle.end().await,
        Err(CallError::SessionClosed)
    ));
    assert!(matches!(
        alice.handle.toggle_mic().await,
        Err(CallError::SessionClosed)
    ));
}

#[tokio::test]
async fn test_dropping_every_handle_ends_the_call() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let alice = join_call(&relay, "planning", "alice").await;
    let mut watcher = alice.handle.subscribe();
    let media = alice.media.clone();

    drop(alice);

    tokio::time::timeout(std::time::Duration::from_millis(NOTIFY_TIMEOUT_MS), async {
        while *watcher.borrow_and_update() != CallState::Ended {
            if watcher.changed().await.is_err() {
                break;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(media.released().await.len(), 2);
    assert_eq!(relay.rooms().room_count(), 0);
}

#[tokio::test]
async fn test_relay_sees_no_polls_after_end() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let alice = join_call(&relay, "planning", "alice").await;

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(relay.poll_count() > 0);

    let report = alice.handle.end().await.unwrap();
    assert!(report.polling_stopped);

    let after_end = relay.poll_count();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(relay.poll_count(), after_end);
}

#[tokio::test]
async fn test_end_stops_polling_then_closes_links_then_releases_media_then_leaves() {
    init_tracing();

    let log = EventLog::new();
    let relay = LoopbackRelay::with_log(log.clone());
    let alice = join_call_with(
        &relay,
        "planning",
        "alice",
        MockMediaProvider::with_log(log.clone()),
        MockTransport::with_log(log.clone()),
    )
    .await;
    let _bob = join_call(&relay, "planning", "bob").await;
    alice.wait_connected(&["bob"]).await.unwrap();

    alice.handle.end().await.unwrap();

    let last_poll = log.last("poll:alice").unwrap();
    let first_close = log.first("close:").unwrap();
    let last_close = log.last("close:").unwrap();
    let first_release = log.first("release:").unwrap();
    let last_release = log.last("release:").unwrap();
    let leave = log.first("leave:alice").unwrap();

    assert!(last_poll < first_close, "{:?}", log.entries());
    assert!(last_close < first_release, "{:?}", log.entries());
    assert!(last_release < leave, "{:?}", log.entries());
    assert_eq!(log.count("release:"), 2);
    assert_eq!(log.count("leave:alice"), 1);
}
