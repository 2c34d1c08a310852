use huddle_client::{CallController, CallError, CallNotification, CallState, ChannelNotifier};
use huddle_core::RoomId;
use huddle_relay::RelayConfig;
use std::sync::Arc;

use crate::integration::{init_tracing, join_call};
use crate::utils::{LoopbackRelay, MockMediaProvider, MockTransport, test_call_config};

fn controller_for(
    relay: &LoopbackRelay,
    room: &str,
    id: &str,
    media: &MockMediaProvider,
) -> (
    CallController,
    tokio::sync::mpsc::UnboundedReceiver<CallNotification>,
) {
    let (notifier, notifications) = ChannelNotifier::new();
    let controller = CallController::new(
        test_call_config(room, id, id),
        Arc::new(relay.clone()),
        Arc::new(media.clone()),
        Arc::new(MockTransport::new()),
        Arc::new(notifier),
    );
    (controller, notifications)
}

#[tokio::test]
async fn test_denied_media_aborts_before_joining() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let media = MockMediaProvider::new();
    media.deny_camera().await;
    let (controller, mut notifications) = controller_for(&relay, "retro", "alice", &media);

    let result = controller.start().await;

    assert!(matches!(result, Err(CallError::MediaUnavailable(_))));
    assert_eq!(relay.rooms().room_count(), 0);

    let mut seen = Vec::new();
    while let Ok(n) = notifications.try_recv() {
        seen.push(n);
    }
    assert!(seen.iter().any(|n| matches!(n, CallNotification::Error(_))));
    assert!(matches!(
        seen.last(),
        Some(CallNotification::StateChanged(CallState::Ended))
    ));
}

#[tokio::test]
async fn test_full_room_releases_media() {
    init_tracing();

    let relay = LoopbackRelay::with_config(RelayConfig {
        max_participants: 1,
        ..RelayConfig::default()
    });
    let _alice = join_call(&relay, "retro", "alice").await;

    let media = MockMediaProvider::new();
    let (controller, _notifications) = controller_for(&relay, "retro", "bob", &media);
    let state = controller.subscribe();

    let result = controller.start().await;

    assert!(matches!(result, Err(CallError::RoomFull)));
    assert_eq!(*state.borrow(), CallState::Ended);
    assert_eq!(media.acquired().await.len(), 2);
    assert_eq!(media.released().await.len(), 2);
}

#[tokio::test]
async fn test_closed_room_is_refused() {
    init_tracing();

    let relay = LoopbackRelay::new();
    relay.rooms().close(&RoomId::from("retro"));

    let media = MockMediaProvider::new();
    let (controller, _notifications) = controller_for(&relay, "retro", "alice", &media);

    assert!(matches!(
        controller.start().await,
        Err(CallError::RoomClosed)
    ));
}
