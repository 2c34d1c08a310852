use anyhow::Result;
use async_trait::async_trait;
use huddle_core::{FacingMode, MediaConstraints, TrackKind, VideoSource};
use std::fmt;
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;

pub type TrackHandle = Arc<dyn TrackLocal + Send + Sync>;

/// A locally captured track that can be attached to peer links.
#[derive(Clone)]
pub struct LocalTrack {
    pub kind: TrackKind,
    pub source: Option<VideoSource>,
    pub handle: TrackHandle,
}

impl LocalTrack {
    pub fn audio(handle: TrackHandle) -> Self {
        Self {
            kind: TrackKind::Audio,
            source: None,
            handle,
        }
    }

    pub fn video(source: VideoSource, handle: TrackHandle) -> Self {
        Self {
            kind: TrackKind::Video,
            source: Some(source),
            handle,
        }
    }

    pub fn id(&self) -> &str {
        self.handle.id()
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id())
            .field("kind", &self.kind)
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalStream {
    pub audio: Option<LocalTrack>,
    pub video: Option<LocalTrack>,
}

impl LocalStream {
    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.audio.iter().chain(self.video.iter()).cloned().collect()
    }
}

/// Camera, microphone and screen capture.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Acquire camera and microphone for the start of a call.
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalStream>;

    async fn acquire_camera(&self, facing: FacingMode) -> Result<LocalTrack>;

    async fn acquire_screen(&self) -> Result<LocalTrack>;

    async fn set_enabled(&self, track: &LocalTrack, enabled: bool);

    async fn release_track(&self, track: LocalTrack);

    async fn release(&self, stream: LocalStream) {
        for track in stream.tracks() {
            self.release_track(track).await;
        }
    }
}
