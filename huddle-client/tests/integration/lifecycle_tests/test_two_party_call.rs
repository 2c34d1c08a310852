use huddle_client::{CallNotification, CallState, LinkState};

use crate::integration::{init_tracing, join_call};
use crate::utils::{LoopbackRelay, NOTIFY_TIMEOUT_MS, pid, wait_for_notification};

#[tokio::test]
async fn test_two_participants_connect() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let alice = join_call(&relay, "standup", "alice").await;
    let bob = join_call(&relay, "standup", "bob").await;

    alice.wait_connected(&["bob"]).await.unwrap();
    bob.wait_connected(&["alice"]).await.unwrap();

    assert_eq!(alice.handle.state(), CallState::Active);
    assert_eq!(bob.handle.state(), CallState::Active);

    let snapshot = alice.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.participants.len(), 1);
    assert_eq!(snapshot.participants[0].display_name, "Bob");
    assert!(snapshot.links[0].initiator);
    assert!(snapshot.polling);

    let snapshot = bob.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.participants[0].display_name, "Alice");
    assert!(!snapshot.links[0].initiator);
}

#[tokio::test]
async fn test_remote_leave_tears_down_link() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let mut alice = join_call(&relay, "standup", "alice").await;
    let bob = join_call(&relay, "standup", "bob").await;

    alice.wait_connected(&["bob"]).await.unwrap();
    bob.handle.end().await.unwrap();

    wait_for_notification(&mut alice.notifications, NOTIFY_TIMEOUT_MS, |n| {
        matches!(n, CallNotification::ParticipantLeft(id) if *id == pid("bob"))
    })
    .await
    .unwrap();

    alice
        .wait_for_snapshot(|s| s.links.is_empty() && s.participants.is_empty())
        .await
        .unwrap();
    assert_eq!(alice.link_state("bob").await, None);
    assert!(alice.transport.latest(&pid("bob")).await.unwrap().closed);
    assert_eq!(alice.handle.state(), CallState::Active);
}

#[tokio::test]
async fn test_connection_is_announced() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let mut alice = join_call(&relay, "standup", "alice").await;
    let _bob = join_call(&relay, "standup", "bob").await;

    wait_for_notification(&mut alice.notifications, NOTIFY_TIMEOUT_MS, |n| {
        matches!(
            n,
            CallNotification::LinkStateChanged { peer, state: LinkState::Connected }
                if *peer == pid("bob")
        )
    })
    .await
    .unwrap();
}
