//! Platform seams of a realtime call
//!
//! The call session drives a peer connection, the microphone and the device
//! audio route, but never implements them. A mobile shell provides WebRTC and
//! audio-session bindings through these traits; tests provide fakes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐    ┌─────────────────────┐    ┌─────────────────────┐
//! │ RealtimeCallSession │───▶│ PeerConnection      │───▶│ WebRTC stack        │
//! │                     │    │ DataChannel         │    │                     │
//! │ connect()           │───▶│ MediaDevices        │───▶│ microphone          │
//! │ toggle_*() close()  │───▶│ AudioRouting        │───▶│ speaker / earpiece  │
//! └─────────────────────┘    └─────────────────────┘    └─────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CallResult;

/// Kind of a session description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
}

/// A local or remote session description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self { sdp_type: SdpType::Offer, sdp: sdp.into() }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self { sdp_type: SdpType::Answer, sdp: sdp.into() }
    }
}

/// Events delivered by a data channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataChannelEvent {
    /// The channel is open for control events
    Open,
    /// A text message (JSON control event)
    Message(String),
    /// The remote closed the channel
    Closed,
}

/// Bidirectional control-event channel
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> &str;

    /// Close the channel; closing twice is harmless
    async fn close(&self);
}

/// A captured local audio track
#[async_trait]
pub trait LocalAudioTrack: Send + Sync {
    fn id(&self) -> &str;

    /// Enable or mute the track in place, without renegotiation
    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Stop capture and release the device
    async fn stop(&self);
}

/// Peer-to-peer connection to the realtime endpoint
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Open a data channel; its events arrive on the returned receiver
    async fn create_data_channel(
        &self,
        label: &str,
    ) -> CallResult<(Arc<dyn DataChannel>, mpsc::Receiver<DataChannelEvent>)>;

    /// Attach a local track; only valid before the offer is created
    async fn add_track(&self, track: Arc<dyn LocalAudioTrack>) -> CallResult<()>;

    async fn create_offer(&self) -> CallResult<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> CallResult<()>;

    async fn set_remote_description(&self, description: SessionDescription) -> CallResult<()>;

    /// Close the connection; closing twice is harmless
    async fn close(&self);
}

/// Creates peer connections
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(&self) -> CallResult<Arc<dyn PeerConnection>>;
}

/// Access to capture devices
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire the microphone as one or more audio tracks
    async fn acquire_microphone(&self) -> CallResult<Vec<Arc<dyn LocalAudioTrack>>>;
}

/// Device audio session and output route
#[async_trait]
pub trait AudioRouting: Send + Sync {
    /// Begin an in-call audio session with the given initial route
    async fn start(&self, speaker_on: bool) -> CallResult<()>;

    /// Route output to the loudspeaker (`true`) or the earpiece (`false`)
    async fn set_speakerphone(&self, speaker_on: bool) -> CallResult<()>;

    /// End the audio session
    async fn stop(&self);
}
