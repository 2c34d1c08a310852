use huddle_client::{CallController, CallHandle, CallState, LinkState, TracingNotifier};
use huddle_relay::RelayConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::integration::init_tracing;
use crate::utils::{CONNECT_TIMEOUT_MS, MockMediaProvider, MockTransport, test_call_config};

async fn start_over_http(base_url: &str, id: &str) -> CallHandle {
    let mut config = test_call_config("lobby", id, id).with_ice_servers(Vec::new());
    config.relay_url = base_url.to_owned();

    CallController::with_http_relay(
        config,
        Arc::new(MockMediaProvider::new()),
        Arc::new(MockTransport::new()),
        Arc::new(TracingNotifier),
    )
    .expect("HTTP client should build")
    .start()
    .await
    .expect("Call should start")
}

async fn wait_connected_to(handle: &CallHandle, peer: &str) -> bool {
    let deadline = Instant::now() + Duration::from_millis(CONNECT_TIMEOUT_MS);
    while Instant::now() < deadline {
        if let Ok(snapshot) = handle.snapshot().await {
            let connected = snapshot
                .links
                .iter()
                .any(|l| l.peer.as_str() == peer && l.state == LinkState::Connected);
            if connected {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_call_over_http_relay() {
    init_tracing();

    let relay = huddle_relay::spawn(RelayConfig {
        addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    let base_url = relay.base_url();

    let alice = start_over_http(&base_url, "alice").await;
    let bob = start_over_http(&base_url, "bob").await;

    assert!(wait_connected_to(&alice, "bob").await);
    assert!(wait_connected_to(&bob, "alice").await);

    let report = alice.end().await.unwrap();
    assert_eq!(report.closed_links.len(), 1);
    alice.wait_for_state(CallState::Ended).await.unwrap();

    bob.end().await.unwrap();
    bob.wait_for_state(CallState::Ended).await.unwrap();
    assert_eq!(relay.rooms.room_count(), 0);

    relay.shutdown();
}
