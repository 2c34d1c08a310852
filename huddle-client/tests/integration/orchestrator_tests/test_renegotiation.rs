use huddle_client::{LinkKey, LinkState, TransportEvent, TransportState};

use crate::integration::{create_orchestrator, init_tracing};
use crate::utils::{offer_from, pid};

#[tokio::test]
async fn test_new_offer_on_connected_link_is_answered_again() {
    init_tracing();

    let mut bob = create_orchestrator("bob");
    bob.orchestrator
        .handle_signal(&offer_from("alice", "bob", "v=0 alice #1"))
        .await;
    bob.pump_transport().await;
    assert_eq!(bob.state_of("alice"), Some(LinkState::Connected));

    // Alice flipped her camera and renegotiates.
    bob.orchestrator
        .handle_signal(&offer_from("alice", "bob", "v=0 alice #2"))
        .await;
    bob.pump_transport().await;

    assert_eq!(bob.state_of("alice"), Some(LinkState::Connected));
    assert_eq!(bob.output.answers_to(&pid("alice")).await.len(), 2);
    assert_eq!(bob.transport.created().await, 1);
    let record = bob.transport.latest(&pid("alice")).await.unwrap();
    assert_eq!(record.remote.len(), 2);
    assert_eq!(record.remote[1].sdp, "v=0 alice #2");
}

#[tokio::test]
async fn test_initiator_ignores_competing_offer() {
    init_tracing();

    let mut alice = create_orchestrator("alice");
    alice.orchestrator.on_participant_joined(&pid("bob")).await;

    alice
        .orchestrator
        .handle_signal(&offer_from("bob", "alice", "v=0 bob #1"))
        .await;

    assert_eq!(alice.state_of("bob"), Some(LinkState::HaveLocalOffer));
    assert!(alice.output.answers_to(&pid("bob")).await.is_empty());
    assert_eq!(alice.transport.created().await, 1);
}

#[tokio::test]
async fn test_offer_after_failure_rebuilds_the_link() {
    init_tracing();

    let mut bob = create_orchestrator("bob");
    bob.orchestrator
        .handle_signal(&offer_from("alice", "bob", "v=0 alice #1"))
        .await;
    bob.pump_transport().await;
    bob.raise(TransportEvent::StateChanged(
        LinkKey::new(pid("alice"), 1),
        TransportState::Failed,
    ))
    .await;
    assert_eq!(bob.state_of("alice"), Some(LinkState::Closed));

    bob.orchestrator
        .handle_signal(&offer_from("alice", "bob", "v=0 alice restart"))
        .await;
    bob.pump_transport().await;

    assert_eq!(bob.state_of("alice"), Some(LinkState::Connected));
    let links = bob.orchestrator.links();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].generation, 2);

    let history = bob.transport.links_for(&pid("alice")).await;
    assert_eq!(history.len(), 2);
    assert!(history[0].closed);
    assert!(!history[1].closed);
}
