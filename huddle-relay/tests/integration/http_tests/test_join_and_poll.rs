use huddle_client::RelayChannel;
use huddle_core::{ParticipantId, RoomId, SignalKind};

use crate::integration::{client_for, init_tracing, participant, start_relay, test_config};

#[tokio::test]
async fn test_join_returns_existing_members() {
    init_tracing();

    let relay = start_relay(test_config()).await;
    let client = client_for(&relay);
    let room = RoomId::from("R1");

    let alice = client
        .join(&room, &participant("alice", "Alice"))
        .await
        .expect("Alice join failed");
    assert_eq!(alice.local_id, ParticipantId::from("alice"));
    assert!(alice.participants.is_empty());

    let bob = client
        .join(&room, &participant("bob", "Bob"))
        .await
        .expect("Bob join failed");
    assert_eq!(bob.participants.len(), 1);
    assert_eq!(bob.participants[0].id, ParticipantId::from("alice"));
    assert_eq!(bob.participants[0].display_name, "Alice");

    relay.shutdown();
}

#[tokio::test]
async fn test_poll_delivers_join_notice_once() {
    init_tracing();

    let relay = start_relay(test_config()).await;
    let client = client_for(&relay);
    let room = RoomId::from("R1");
    let alice_id = ParticipantId::from("alice");

    client.join(&room, &participant("alice", "Alice")).await.unwrap();
    client.join(&room, &participant("bob", "Bob")).await.unwrap();

    let first = client.poll(&room, &alice_id, None).await.unwrap();
    assert_eq!(first.signals.len(), 1);
    assert_eq!(first.signals[0].kind, SignalKind::Joined);
    assert_eq!(first.signals[0].from, ParticipantId::from("bob"));
    assert!(first.signals[0].sequence.is_some());

    let members = first.participants.expect("Relay should report members");
    assert_eq!(members.len(), 2);

    let second = client.poll(&room, &alice_id, None).await.unwrap();
    assert!(second.signals.is_empty(), "Signals must not be returned twice");

    relay.shutdown();
}

#[tokio::test]
async fn test_relay_assigns_id_when_none_requested() {
    init_tracing();

    let relay = start_relay(test_config()).await;
    let room = RoomId::from("R1");

    let response = relay.rooms.join(
        &room,
        huddle_core::JoinRequest {
            username: "Anon".to_owned(),
            user_id: None,
        },
    );

    let assigned = response.user_id.expect("Relay should assign an id");
    assert!(!assigned.is_empty());
    assert_eq!(response.user_count, 1);

    relay.shutdown();
}
