use huddle_client::RelayChannel;
use huddle_core::{ParticipantId, RoomId, SessionDescription, Signal, SignalKind};

use crate::integration::{client_for, init_tracing, participant, start_relay, test_config};

#[tokio::test]
async fn test_directed_signal_reaches_only_addressee() {
    init_tracing();

    let relay = start_relay(test_config()).await;
    let client = client_for(&relay);
    let room = RoomId::from("R1");
    let (alice, bob, carol) = (
        ParticipantId::from("alice"),
        ParticipantId::from("bob"),
        ParticipantId::from("carol"),
    );

    for (id, name) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
        client.join(&room, &participant(id, name)).await.unwrap();
    }
    for id in [&alice, &bob, &carol] {
        client.poll(&room, id, None).await.unwrap();
    }

    let offer = Signal::directed(
        alice.clone(),
        bob.clone(),
        SignalKind::Offer,
        &SessionDescription::offer("v=0 alice"),
    )
    .unwrap();
    client.send(&room, &offer).await.expect("Send failed");

    let to_bob = client.poll(&room, &bob, None).await.unwrap();
    assert_eq!(to_bob.signals.len(), 1);
    let received: SessionDescription = to_bob.signals[0].payload_as().unwrap();
    assert_eq!(received.sdp, "v=0 alice");

    let to_carol = client.poll(&room, &carol, None).await.unwrap();
    assert!(to_carol.signals.is_empty());

    relay.shutdown();
}

#[tokio::test]
async fn test_since_cursor_replays_history() {
    init_tracing();

    let relay = start_relay(test_config()).await;
    let client = client_for(&relay);
    let room = RoomId::from("R1");
    let alice = ParticipantId::from("alice");

    client.join(&room, &participant("alice", "Alice")).await.unwrap();
    client.join(&room, &participant("bob", "Bob")).await.unwrap();

    let first = client.poll(&room, &alice, None).await.unwrap();
    let seq = first.signals[0].sequence.unwrap();

    let replay = client.poll(&room, &alice, Some(seq - 1)).await.unwrap();
    assert_eq!(replay.signals.len(), 1);
    assert_eq!(replay.signals[0].sequence, Some(seq));

    let caught_up = client.poll(&room, &alice, Some(seq)).await.unwrap();
    assert!(caught_up.signals.is_empty());

    relay.shutdown();
}

#[tokio::test]
async fn test_unknown_sender_is_rejected() {
    init_tracing();

    let relay = start_relay(test_config()).await;
    let client = client_for(&relay);
    let room = RoomId::from("R1");

    client.join(&room, &participant("alice", "Alice")).await.unwrap();

    let stray = Signal::new(
        ParticipantId::from("mallory"),
        None,
        SignalKind::TrackToggle,
        serde_json::json!({"track": "audio", "enabled": false}),
    );
    let result = client.send(&room, &stray).await;
    assert!(result.is_err(), "Non-members must not post signals");

    relay.shutdown();
}
