use crate::error::{Result, SignalingError};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// A captured local stream (the shared screen).
///
/// The session only attaches its tracks to a peer link and watches the
/// `ended` flag; the capture source owns the actual frames.
#[derive(Clone)]
pub struct LocalStream {
    id: String,
    tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
    ended: Arc<watch::Sender<bool>>,
}

impl LocalStream {
    pub fn new(id: impl Into<String>, tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>) -> Self {
        let (ended, _) = watch::channel(false);
        Self {
            id: id.into(),
            tracks,
            ended: Arc::new(ended),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Arc<dyn TrackLocal + Send + Sync>] {
        &self.tracks
    }

    /// Marks the stream as ended, e.g. the user stopped sharing from the OS picker.
    pub fn end(&self) {
        self.ended.send_replace(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.ended.borrow()
    }

    pub fn ended(&self) -> watch::Receiver<bool> {
        self.ended.subscribe()
    }
}

impl std::fmt::Debug for LocalStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks.len())
            .field("ended", &self.is_ended())
            .finish()
    }
}

/// Source of the screen to broadcast. `capture` may suspend on a user permission prompt.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    /// Fails with [`SignalingError::CaptureDenied`] or [`SignalingError::CaptureFailed`].
    async fn capture(&self) -> Result<LocalStream>;
}

/// Capture backed by one static-sample video track that an external encoder feeds.
pub struct StaticTrackCapture {
    track: Arc<TrackLocalStaticSample>,
    stream_id: String,
    current: watch::Sender<Option<LocalStream>>,
}

impl StaticTrackCapture {
    pub fn new(mime_type: &str, stream_id: impl Into<String>) -> Self {
        let stream_id = stream_id.into();
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            "screen".to_owned(),
            stream_id.clone(),
        ));
        let (current, _) = watch::channel(None);

        Self {
            track,
            stream_id,
            current,
        }
    }

    pub fn vp8(stream_id: impl Into<String>) -> Self {
        Self::new(MIME_TYPE_VP8, stream_id)
    }

    pub fn track(&self) -> Arc<TrackLocalStaticSample> {
        self.track.clone()
    }

    pub async fn write_sample(&self, data: Bytes, duration: Duration) -> Result<()> {
        self.track
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await
            .map_err(|e| SignalingError::CaptureFailed(e.to_string()))
    }

    /// Ends the stream handed out by the last `capture`, as an OS-level stop would.
    pub fn end(&self) {
        if let Some(stream) = self.current.borrow().as_ref() {
            stream.end();
        }
    }
}

#[async_trait]
impl MediaCapture for StaticTrackCapture {
    async fn capture(&self) -> Result<LocalStream> {
        let track: Arc<dyn TrackLocal + Send + Sync> = self.track.clone();
        let stream = LocalStream::new(self.stream_id.clone(), vec![track]);
        self.current.send_replace(Some(stream.clone()));
        Ok(stream)
    }
}
