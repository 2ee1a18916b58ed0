use std::sync::Arc;
use webrtc::track::track_remote::TrackRemote;

/// Tracks received by an observer. The UI renders them; the session only holds the reference.
#[derive(Clone, Default)]
pub struct RemoteStream {
    tracks: Vec<Arc<TrackRemote>>,
}

impl RemoteStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_track(&mut self, track: Arc<TrackRemote>) {
        self.tracks.push(track);
    }

    pub fn tracks(&self) -> &[Arc<TrackRemote>] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl std::fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStream")
            .field("tracks", &self.tracks.len())
            .finish()
    }
}
