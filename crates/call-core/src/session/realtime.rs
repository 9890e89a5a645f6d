//! Realtime call session
//!
//! One session per call screen. It runs a single, strictly sequential
//! negotiation and owns every resource it acquires until [`RealtimeCallSession::close`]
//! or a fatal setup error releases them.
//!
//! # Call Flow
//!
//! 1. Start the device audio session (speaker on)
//! 2. Request ephemeral credentials from the session proxy
//! 3. Create the peer connection and the control-event data channel
//! 4. Acquire the microphone (best effort) and attach its tracks
//! 5. Create and apply the local offer
//! 6. Exchange the offer for the remote answer over HTTP
//! 7. Apply the answer: `Connecting -> Connected`
//!
//! A `session.created` control event later marks the session active.
//!
//! # Teardown
//!
//! `close()` may race any step above. Whatever was acquired before it is
//! released by `close()`; anything a step acquires afterwards is released by
//! the negotiation itself, which then stops with [`CallError::SessionClosed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::media::{
    AudioRouting, DataChannel, DataChannelEvent, LocalAudioTrack, MediaDevices, PeerConnection,
    PeerConnectionFactory, SessionDescription,
};
use super::state::{ConnectionStatus, ControlEvent, SessionEvent, SessionSnapshot};
use crate::agent::Agent;
use crate::bootstrap::{RealtimeEndpoint, SessionBootstrap, SessionRequest};
use crate::config::ClientConfig;
use crate::error::{CallError, CallResult};

const EVENT_CAPACITY: usize = 64;

/// Who the call is with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    pub agent_name: String,
    pub prompt: String,
}

impl CallTarget {
    pub fn new(agent_name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            prompt: prompt.into(),
        }
    }
}

impl From<&Agent> for CallTarget {
    fn from(agent: &Agent) -> Self {
        Self::new(agent.params.name.clone(), agent.params.prompt.clone())
    }
}

/// Collaborators a session negotiates with
#[derive(Clone)]
pub struct SessionServices {
    pub bootstrap: Arc<dyn SessionBootstrap>,
    pub realtime: Arc<dyn RealtimeEndpoint>,
    pub peers: Arc<dyn PeerConnectionFactory>,
    pub media: Arc<dyn MediaDevices>,
    pub routing: Arc<dyn AudioRouting>,
}

type CloseCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Resources {
    peer: Option<Arc<dyn PeerConnection>>,
    channel: Option<Arc<dyn DataChannel>>,
    tracks: Vec<Arc<dyn LocalAudioTrack>>,
    routing_active: bool,
    pump: Option<JoinHandle<()>>,
    /// Set once torn down; later acquisitions are refused
    released: bool,
}

struct SessionInner {
    target: CallTarget,
    services: SessionServices,
    data_channel_label: String,
    state: RwLock<SessionSnapshot>,
    resources: tokio::sync::Mutex<Resources>,
    negotiation_started: AtomicBool,
    closed: AtomicBool,
    on_close: Mutex<Option<CloseCallback>>,
    events: broadcast::Sender<SessionEvent>,
}

/// A realtime voice call with one agent
#[derive(Clone)]
pub struct RealtimeCallSession {
    inner: Arc<SessionInner>,
}

impl RealtimeCallSession {
    /// Create an idle session. `on_close` runs exactly once, at the end of `close()`.
    pub fn new<F>(target: CallTarget, services: SessionServices, config: &ClientConfig, on_close: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                target,
                services,
                data_channel_label: config.data_channel_label.clone(),
                state: RwLock::new(SessionSnapshot::default()),
                resources: tokio::sync::Mutex::new(Resources::default()),
                negotiation_started: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                on_close: Mutex::new(Some(Box::new(on_close))),
                events,
            }),
        }
    }

    /// Create a session and start negotiating in the background, as the call
    /// screen does when it mounts.
    pub fn open<F>(target: CallTarget, services: SessionServices, config: &ClientConfig, on_close: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let session = Self::new(target, services, config, on_close);
        let runner = session.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.connect().await {
                tracing::debug!(error = %e, "background negotiation ended");
            }
        });
        session
    }

    pub fn target(&self) -> &CallTarget {
        &self.inner.target
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.read().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.read().status
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.read().is_active()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Run the connect sequence. Only the first call per session negotiates.
    ///
    /// # Errors
    ///
    /// * `CallError::AlreadyNegotiating` - A previous call already started negotiation
    /// * `CallError::SessionClosed` - The session was closed before or during negotiation
    /// * `CallError::BootstrapFailure` - The proxy could not mint credentials
    /// * `CallError::NegotiationFailure` - Peer connection or SDP exchange failed
    ///
    /// A missing microphone is not an error: the call connects without local audio.
    pub async fn connect(&self) -> CallResult<()> {
        if self.inner.negotiation_started.swap(true, Ordering::SeqCst) {
            return Err(CallError::AlreadyNegotiating);
        }
        if self.is_closed() {
            return Err(CallError::SessionClosed);
        }
        self.inner.transition(&[ConnectionStatus::Idle], ConnectionStatus::Connecting);

        match self.negotiate().await {
            Ok(()) => Ok(()),
            Err(CallError::SessionClosed) => {
                tracing::debug!(agent = %self.inner.target.agent_name, "negotiation abandoned after close");
                Err(CallError::SessionClosed)
            }
            Err(e) => {
                self.inner.release_resources().await;
                if self.is_closed() {
                    tracing::debug!(agent = %self.inner.target.agent_name, error = %e, "negotiation failed after close");
                    return Err(CallError::SessionClosed);
                }
                tracing::error!(agent = %self.inner.target.agent_name, error = %e, "failed to start call");
                {
                    let mut state = self.inner.state.write();
                    state.session_active = false;
                    state.microphone_enabled = false;
                }
                let failed = self.inner.transition(
                    &[ConnectionStatus::Idle, ConnectionStatus::Connecting, ConnectionStatus::Connected],
                    ConnectionStatus::Error,
                );
                if failed {
                    self.inner.emit(SessionEvent::Failed(e.clone()));
                }
                Err(e)
            }
        }
    }

    async fn negotiate(&self) -> CallResult<()> {
        let inner = &self.inner;
        let services = &inner.services;

        inner.start_routing().await?;

        let request = SessionRequest::new(inner.target.prompt.clone(), inner.target.agent_name.clone());
        let session = services.bootstrap.create_session(&request).await?;
        inner.ensure_open()?;
        tracing::info!(session_id = %session.id, "session created");

        let peer = services
            .peers
            .create()
            .await
            .map_err(|e| CallError::negotiation_failure(format!("peer connection: {}", e)))?;
        inner.install_peer(peer.clone()).await?;

        let (channel, channel_events) = peer
            .create_data_channel(&inner.data_channel_label)
            .await
            .map_err(|e| CallError::negotiation_failure(format!("data channel: {}", e)))?;
        inner.install_channel(channel, channel_events, Arc::downgrade(&self.inner)).await?;

        self.attach_microphone(&peer).await?;

        let offer = peer
            .create_offer()
            .await
            .map_err(|e| CallError::negotiation_failure(format!("create offer: {}", e)))?;
        peer.set_local_description(offer.clone())
            .await
            .map_err(|e| CallError::negotiation_failure(format!("set local description: {}", e)))?;
        inner.ensure_open()?;

        tracing::debug!(offer_size = offer.sdp.len(), "sending SDP offer");
        let answer = services
            .realtime
            .exchange_sdp(&offer.sdp, &session.client_secret.value)
            .await?;
        inner.ensure_open()?;

        peer.set_remote_description(SessionDescription::answer(answer))
            .await
            .map_err(|e| CallError::negotiation_failure(format!("set remote description: {}", e)))?;
        inner.ensure_open()?;

        inner.transition(&[ConnectionStatus::Connecting], ConnectionStatus::Connected);
        tracing::info!(agent = %inner.target.agent_name, "realtime connection established");
        Ok(())
    }

    /// Acquire the microphone and attach its tracks before the offer exists.
    /// Failure degrades the call instead of ending it.
    async fn attach_microphone(&self, peer: &Arc<dyn PeerConnection>) -> CallResult<()> {
        let inner = &self.inner;
        let tracks = match inner.services.media.acquire_microphone().await {
            Ok(tracks) if !tracks.is_empty() => tracks,
            Ok(_) => {
                inner.warn(CallError::microphone_unavailable("no audio track"));
                return Ok(());
            }
            Err(e) => {
                inner.warn(CallError::microphone_unavailable(e.to_string()));
                return Ok(());
            }
        };
        inner.install_tracks(tracks.clone()).await?;

        for track in &tracks {
            if let Err(e) = peer.add_track(track.clone()).await {
                inner.drop_tracks().await;
                inner.warn(CallError::microphone_unavailable(format!("attach track: {}", e)));
                return Ok(());
            }
        }

        inner.state.write().microphone_enabled = true;
        Ok(())
    }

    /// Mute or unmute the local audio track in place
    pub async fn toggle_microphone(&self) -> CallResult<bool> {
        self.require_connected()?;
        let resources = self.inner.resources.lock().await;
        let track = resources
            .tracks
            .first()
            .ok_or_else(|| CallError::microphone_unavailable("no local audio track"))?;

        let enabled = !track.is_enabled();
        track.set_enabled(enabled);
        drop(resources);

        self.inner.state.write().microphone_enabled = enabled;
        self.inner.emit(SessionEvent::MicrophoneToggled { enabled });
        tracing::debug!(enabled, "microphone toggled");
        Ok(enabled)
    }

    /// Switch output between loudspeaker and earpiece
    pub async fn toggle_speaker(&self) -> CallResult<bool> {
        self.require_connected()?;
        let speaker_on = !self.inner.state.read().speaker_on;

        if let Err(e) = self.inner.services.routing.set_speakerphone(speaker_on).await {
            tracing::warn!(error = %e, "error switching audio output");
            return Err(e);
        }

        self.inner.state.write().speaker_on = speaker_on;
        self.inner.emit(SessionEvent::SpeakerToggled { speaker_on });
        let route = if speaker_on { "speaker" } else { "earpiece" };
        tracing::info!(route, "audio output switched");
        Ok(speaker_on)
    }

    /// Tear the call down. Safe from any state and any number of times.
    ///
    /// Release order: data channel, peer connection, local tracks, audio
    /// session. Flags then reset and the close callback runs once.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.release_resources().await;

        let previous = {
            let mut state = self.inner.state.write();
            let previous = state.status;
            *state = SessionSnapshot {
                status: ConnectionStatus::Closed,
                ..SessionSnapshot::default()
            };
            previous
        };
        if previous != ConnectionStatus::Closed {
            self.inner.emit(SessionEvent::StatusChanged {
                previous,
                current: ConnectionStatus::Closed,
            });
        }
        self.inner.emit(SessionEvent::Closed);
        tracing::info!(agent = %self.inner.target.agent_name, "call closed");

        let callback = self.inner.on_close.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn require_connected(&self) -> CallResult<()> {
        let status = self.status();
        if status.is_connected() {
            Ok(())
        } else {
            Err(CallError::InvalidSessionState {
                expected: "Connected".to_string(),
                actual: format!("{:?}", status),
            })
        }
    }
}

impl SessionInner {
    fn emit(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn warn(&self, error: CallError) {
        tracing::warn!(error = %error, "call continues degraded");
        self.emit(SessionEvent::Warning(error));
    }

    fn ensure_open(&self) -> CallResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(CallError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Move to `to` if the current status is one of `from`
    fn transition(&self, from: &[ConnectionStatus], to: ConnectionStatus) -> bool {
        let previous = {
            let mut state = self.state.write();
            if !from.contains(&state.status) {
                return false;
            }
            let previous = state.status;
            state.status = to;
            previous
        };
        tracing::debug!(?previous, current = ?to, "session status changed");
        self.emit(SessionEvent::StatusChanged { previous, current: to });
        true
    }

    async fn start_routing(&self) -> CallResult<()> {
        let mut resources = self.resources.lock().await;
        if resources.released {
            return Err(CallError::SessionClosed);
        }
        let speaker_on = self.state.read().speaker_on;
        match self.services.routing.start(speaker_on).await {
            Ok(()) => resources.routing_active = true,
            Err(e) => tracing::warn!(error = %e, "audio session unavailable, using default route"),
        }
        Ok(())
    }

    async fn install_peer(&self, peer: Arc<dyn PeerConnection>) -> CallResult<()> {
        let mut resources = self.resources.lock().await;
        if resources.released {
            drop(resources);
            peer.close().await;
            return Err(CallError::SessionClosed);
        }
        resources.peer = Some(peer);
        Ok(())
    }

    async fn install_channel(
        &self,
        channel: Arc<dyn DataChannel>,
        events: mpsc::Receiver<DataChannelEvent>,
        owner: Weak<SessionInner>,
    ) -> CallResult<()> {
        let mut resources = self.resources.lock().await;
        if resources.released {
            drop(resources);
            channel.close().await;
            return Err(CallError::SessionClosed);
        }
        resources.pump = Some(tokio::spawn(pump_channel_events(owner, events)));
        resources.channel = Some(channel);
        Ok(())
    }

    async fn install_tracks(&self, tracks: Vec<Arc<dyn LocalAudioTrack>>) -> CallResult<()> {
        let mut resources = self.resources.lock().await;
        if resources.released {
            drop(resources);
            for track in &tracks {
                track.stop().await;
            }
            return Err(CallError::SessionClosed);
        }
        resources.tracks = tracks;
        Ok(())
    }

    async fn drop_tracks(&self) {
        let tracks = std::mem::take(&mut self.resources.lock().await.tracks);
        for track in &tracks {
            track.stop().await;
        }
    }

    /// Release everything acquired so far, in teardown order
    async fn release_resources(&self) {
        let mut resources = self.resources.lock().await;
        if resources.released {
            return;
        }
        resources.released = true;

        if let Some(pump) = resources.pump.take() {
            pump.abort();
        }
        if let Some(channel) = resources.channel.take() {
            channel.close().await;
        }
        if let Some(peer) = resources.peer.take() {
            peer.close().await;
        }
        for track in resources.tracks.drain(..) {
            track.stop().await;
        }
        if std::mem::take(&mut resources.routing_active) {
            self.services.routing.stop().await;
        }
        tracing::debug!("call resources released");
    }

    fn on_channel_event(&self, event: DataChannelEvent) {
        match event {
            DataChannelEvent::Open => {
                tracing::info!("data channel opened");
                self.transition(&[ConnectionStatus::Connecting], ConnectionStatus::Connected);
            }
            DataChannelEvent::Message(text) => match ControlEvent::parse(&text) {
                Ok(event) if event.is_session_created() => {
                    let activated = {
                        let mut state = self.state.write();
                        if state.status.is_terminal() || state.session_active {
                            false
                        } else {
                            state.session_active = true;
                            true
                        }
                    };
                    if activated {
                        self.emit(SessionEvent::SessionActive);
                    }
                }
                Ok(event) => tracing::trace!(event_type = %event.event_type, "control event"),
                Err(e) => tracing::warn!(error = %e, "error parsing control event"),
            },
            DataChannelEvent::Closed => tracing::info!("data channel closed by remote"),
        }
    }
}

async fn pump_channel_events(owner: Weak<SessionInner>, mut events: mpsc::Receiver<DataChannelEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = owner.upgrade() else {
            break;
        };
        let closed = event == DataChannelEvent::Closed;
        inner.on_channel_event(event);
        if closed {
            break;
        }
    }
}
