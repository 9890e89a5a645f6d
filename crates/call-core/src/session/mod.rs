//! Realtime voice calls
//!
//! [`RealtimeCallSession`] negotiates a WebRTC call with the realtime voice
//! endpoint and owns its resources. [`CallSessionGuard`] ties one session to
//! a call screen and keeps calls exclusive through a [`SessionSlot`].

pub mod guard;
pub mod media;
pub mod realtime;
pub mod state;

pub use guard::{CallSessionGuard, SessionSlot, SlotPermit};
pub use media::{
    AudioRouting, DataChannel, DataChannelEvent, LocalAudioTrack, MediaDevices, PeerConnection,
    PeerConnectionFactory, SdpType, SessionDescription,
};
pub use realtime::{CallTarget, RealtimeCallSession, SessionServices};
pub use state::{ConnectionStatus, ControlEvent, SessionEvent, SessionSnapshot};
