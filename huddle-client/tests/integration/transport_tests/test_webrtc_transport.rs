use huddle_client::{LinkKey, LocalTrack, PeerTransport, TransportConfig, WebrtcTransport};
use huddle_core::{SdpType, VideoSource};
use std::sync::Arc;
use tokio::sync::mpsc;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::integration::init_tracing;
use crate::utils::pid;

fn audio_track(id: &str) -> LocalTrack {
    LocalTrack::audio(Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            ..Default::default()
        },
        id.to_owned(),
        "huddle-test".to_owned(),
    )))
}

fn screen_track(id: &str) -> LocalTrack {
    LocalTrack::video(
        VideoSource::Screen,
        Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            id.to_owned(),
            "huddle-test".to_owned(),
        )),
    )
}

#[tokio::test]
async fn test_webrtc_links_complete_offer_answer() {
    init_tracing();

    let transport = WebrtcTransport::new().unwrap();
    let config = TransportConfig {
        ice_servers: Vec::new(),
    };
    let (alice_tx, _alice_rx) = mpsc::channel(256);
    let (bob_tx, _bob_rx) = mpsc::channel(256);

    let alice = transport
        .create(LinkKey::new(pid("bob"), 1), config.clone(), alice_tx)
        .await
        .unwrap();
    let bob = transport
        .create(LinkKey::new(pid("alice"), 1), config, bob_tx)
        .await
        .unwrap();

    alice.add_track(&audio_track("mic-alice")).await.unwrap();
    bob.add_track(&audio_track("mic-bob")).await.unwrap();

    let offer = alice.create_offer().await.unwrap();
    assert_eq!(offer.sdp_type, SdpType::Offer);
    assert!(offer.sdp.contains("m=audio"));
    alice.set_local_description(offer.clone()).await.unwrap();

    bob.set_remote_description(offer).await.unwrap();
    let answer = bob.create_answer().await.unwrap();
    assert_eq!(answer.sdp_type, SdpType::Answer);
    bob.set_local_description(answer.clone()).await.unwrap();
    alice.set_remote_description(answer).await.unwrap();

    alice
        .replace_outgoing_track(&audio_track("mic-alice-2"))
        .await
        .unwrap();

    alice.close().await.unwrap();
    bob.close().await.unwrap();
}

#[tokio::test]
async fn test_malformed_remote_description_is_an_error() {
    init_tracing();

    let transport = WebrtcTransport::new().unwrap();
    let (tx, _rx) = mpsc::channel(16);
    let link = transport
        .create(LinkKey::new(pid("bob"), 1), TransportConfig::default(), tx)
        .await
        .unwrap();

    let result = link
        .set_remote_description(huddle_core::SessionDescription::offer("not sdp"))
        .await;

    assert!(result.is_err());
    link.close().await.unwrap();
}

#[tokio::test]
async fn test_replacing_a_kind_without_a_sender_is_an_error() {
    init_tracing();

    let transport = WebrtcTransport::new().unwrap();
    let (tx, _rx) = mpsc::channel(16);
    let link = transport
        .create(LinkKey::new(pid("bob"), 1), TransportConfig::default(), tx)
        .await
        .unwrap();
    link.add_track(&audio_track("mic-alice")).await.unwrap();

    let result = link.replace_outgoing_track(&screen_track("screen-alice")).await;

    let error = result.unwrap_err();
    assert!(format!("{error:#}").contains("renegotiation"));
    link.close().await.unwrap();
}
