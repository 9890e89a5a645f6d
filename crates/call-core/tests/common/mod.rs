//! Fakes for the platform seams used by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, Notify};

use meetai_call_core::agent::NotificationId;
use meetai_call_core::bootstrap::{ClientSecret, RealtimeSessionInfo};
use meetai_call_core::scheduler::{
    CallActionHandler, Clock, ExecutionContext, IncomingCallGateway, Navigator, NotificationEvent,
    NotificationRequest, PermissionStatus, Route,
};
use meetai_call_core::session::{
    AudioRouting, DataChannel, DataChannelEvent, LocalAudioTrack, MediaDevices, PeerConnection,
    PeerConnectionFactory, SessionDescription, SessionEvent, SessionServices,
};
use meetai_call_core::store::{KeyValueStore, MemoryStore};
use meetai_call_core::{CallError, CallResult, RealtimeEndpoint, SessionBootstrap, SessionRequest};

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// In-memory store whose deletes always fail
#[derive(Default)]
pub struct FailingRemoveStore {
    inner: MemoryStore,
}

#[async_trait]
impl KeyValueStore for FailingRemoveStore {
    async fn get(&self, key: &str) -> CallResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> CallResult<()> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> CallResult<()> {
        Err(CallError::storage_failure(key, "disk is read-only"))
    }
}

// ---------------------------------------------------------------------------
// Clock and notification gateway
// ---------------------------------------------------------------------------

pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(now) })
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Notification service that fires alerts when its clock is advanced
pub struct FakeGateway {
    clock: Arc<TestClock>,
    permission: Mutex<PermissionStatus>,
    pub permission_requests: AtomicUsize,
    next_id: AtomicUsize,
    pending: Mutex<Vec<(NotificationId, NotificationRequest)>>,
    displayed: Mutex<Vec<(NotificationId, NotificationRequest)>>,
    cancelled: Mutex<Vec<NotificationId>>,
    handler: Mutex<Option<Arc<dyn CallActionHandler>>>,
}

impl FakeGateway {
    pub fn new(clock: Arc<TestClock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            permission: Mutex::new(PermissionStatus::Granted),
            permission_requests: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
            pending: Mutex::new(Vec::new()),
            displayed: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            handler: Mutex::new(None),
        })
    }

    pub fn deny_permission(&self) {
        *self.permission.lock() = PermissionStatus::Denied;
    }

    pub fn pending(&self) -> Vec<NotificationRequest> {
        self.pending.lock().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn displayed_ids(&self) -> Vec<NotificationId> {
        self.displayed.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn cancelled(&self) -> Vec<NotificationId> {
        self.cancelled.lock().clone()
    }

    /// Move time forward and deliver every alert whose trigger has passed
    pub fn advance_to(&self, now: DateTime<Utc>) -> Vec<NotificationRequest> {
        self.clock.set(now);
        let mut pending = self.pending.lock();
        let (due, waiting): (Vec<_>, Vec<_>) = pending.drain(..).partition(|(_, r)| r.trigger_at <= now);
        *pending = waiting;
        let delivered = due.iter().map(|(_, r)| r.clone()).collect();
        self.displayed.lock().extend(due);
        delivered
    }

    /// Deliver `event` to the registered handler
    pub async fn emit(&self, event: NotificationEvent, context: ExecutionContext) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler.on_event(event, context).await;
        }
    }
}

#[async_trait]
impl IncomingCallGateway for FakeGateway {
    async fn request_permission(&self) -> CallResult<PermissionStatus> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(*self.permission.lock())
    }

    async fn schedule(&self, request: NotificationRequest) -> CallResult<NotificationId> {
        let id = NotificationId::new(format!("notif-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.pending.lock().push((id.clone(), request));
        Ok(id)
    }

    async fn cancel(&self, notification_id: &NotificationId) -> CallResult<()> {
        self.pending.lock().retain(|(id, _)| id != notification_id);
        self.displayed.lock().retain(|(id, _)| id != notification_id);
        self.cancelled.lock().push(notification_id.clone());
        Ok(())
    }

    fn set_action_handler(&self, handler: Arc<dyn CallActionHandler>) {
        *self.handler.lock() = Some(handler);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().push(route);
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

pub struct FakeTrack {
    id: String,
    enabled: AtomicBool,
    pub stopped: AtomicBool,
}

impl FakeTrack {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalAudioTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub struct FakeDataChannel {
    label: String,
    pub closed: AtomicBool,
}

#[async_trait]
impl DataChannel for FakeDataChannel {
    fn label(&self) -> &str {
        &self.label
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakePeer {
    pub closed: AtomicBool,
    pub track_ids: Mutex<Vec<String>>,
    pub offer_created: AtomicBool,
    pub track_added_after_offer: AtomicBool,
    pub local: Mutex<Option<SessionDescription>>,
    pub remote: Mutex<Option<SessionDescription>>,
    channel: Mutex<Option<Arc<FakeDataChannel>>>,
    channel_tx: Mutex<Option<mpsc::Sender<DataChannelEvent>>>,
}

impl FakePeer {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn data_channel(&self) -> Option<Arc<FakeDataChannel>> {
        self.channel.lock().clone()
    }

    /// Push an event onto the data channel as the remote would
    pub async fn channel_event(&self, event: DataChannelEvent) {
        let tx = self.channel_tx.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl PeerConnection for FakePeer {
    async fn create_data_channel(
        &self,
        label: &str,
    ) -> CallResult<(Arc<dyn DataChannel>, mpsc::Receiver<DataChannelEvent>)> {
        let channel = Arc::new(FakeDataChannel {
            label: label.to_string(),
            closed: AtomicBool::new(false),
        });
        let (tx, rx) = mpsc::channel(16);
        *self.channel.lock() = Some(channel.clone());
        *self.channel_tx.lock() = Some(tx);
        Ok((channel, rx))
    }

    async fn add_track(&self, track: Arc<dyn LocalAudioTrack>) -> CallResult<()> {
        if self.offer_created.load(Ordering::SeqCst) {
            self.track_added_after_offer.store(true, Ordering::SeqCst);
        }
        self.track_ids.lock().push(track.id().to_string());
        Ok(())
    }

    async fn create_offer(&self) -> CallResult<SessionDescription> {
        self.offer_created.store(true, Ordering::SeqCst);
        Ok(SessionDescription::offer("v=0\r\no=- offer\r\n"))
    }

    async fn set_local_description(&self, description: SessionDescription) -> CallResult<()> {
        *self.local.lock() = Some(description);
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> CallResult<()> {
        *self.remote.lock() = Some(description);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakePeerFactory {
    created: Mutex<Vec<Arc<FakePeer>>>,
}

impl FakePeerFactory {
    pub fn count(&self) -> usize {
        self.created.lock().len()
    }

    pub fn last(&self) -> Option<Arc<FakePeer>> {
        self.created.lock().last().cloned()
    }
}

#[async_trait]
impl PeerConnectionFactory for FakePeerFactory {
    async fn create(&self) -> CallResult<Arc<dyn PeerConnection>> {
        let peer = Arc::new(FakePeer::default());
        self.created.lock().push(peer.clone());
        Ok(peer)
    }
}

pub struct FakeMedia {
    fail: bool,
    acquired: Mutex<Vec<Arc<FakeTrack>>>,
}

impl FakeMedia {
    pub fn working() -> Arc<Self> {
        Arc::new(Self { fail: false, acquired: Mutex::new(Vec::new()) })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self { fail: true, acquired: Mutex::new(Vec::new()) })
    }

    pub fn tracks(&self) -> Vec<Arc<FakeTrack>> {
        self.acquired.lock().clone()
    }
}

#[async_trait]
impl MediaDevices for FakeMedia {
    async fn acquire_microphone(&self) -> CallResult<Vec<Arc<dyn LocalAudioTrack>>> {
        if self.fail {
            return Err(CallError::microphone_unavailable("permission denied"));
        }
        let track = FakeTrack::new("mic-0");
        self.acquired.lock().push(track.clone());
        Ok(vec![track as Arc<dyn LocalAudioTrack>])
    }
}

#[derive(Default)]
pub struct FakeRouting {
    pub started: AtomicBool,
    pub stops: AtomicUsize,
    pub speaker: Mutex<Option<bool>>,
}

impl FakeRouting {
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioRouting for FakeRouting {
    async fn start(&self, speaker_on: bool) -> CallResult<()> {
        self.started.store(true, Ordering::SeqCst);
        *self.speaker.lock() = Some(speaker_on);
        Ok(())
    }

    async fn set_speakerphone(&self, speaker_on: bool) -> CallResult<()> {
        *self.speaker.lock() = Some(speaker_on);
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// HTTP collaborators
// ---------------------------------------------------------------------------

pub fn session_info(secret: &str) -> RealtimeSessionInfo {
    RealtimeSessionInfo {
        id: "sess_test".to_string(),
        client_secret: ClientSecret {
            value: secret.to_string(),
            expires_at: None,
        },
        extra: serde_json::Map::new(),
    }
}

/// Bootstrap that can be held open until released
pub struct FakeBootstrap {
    result: CallResult<RealtimeSessionInfo>,
    gate: Option<Arc<Notify>>,
    pub entered: Arc<Notify>,
    pub requests: Mutex<Vec<SessionRequest>>,
}

impl FakeBootstrap {
    pub fn ok() -> Arc<Self> {
        Self::build(Ok(session_info("ek_test")), None)
    }

    pub fn failing(error: CallError) -> Arc<Self> {
        Self::build(Err(error), None)
    }

    /// Blocks inside `create_session` until `gate` is notified
    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Self::build(Ok(session_info("ek_test")), Some(gate))
    }

    /// Blocks until `gate` is notified, then fails with `error`
    pub fn gated_failing(gate: Arc<Notify>, error: CallError) -> Arc<Self> {
        Self::build(Err(error), Some(gate))
    }

    fn build(result: CallResult<RealtimeSessionInfo>, gate: Option<Arc<Notify>>) -> Arc<Self> {
        Arc::new(Self {
            result,
            gate,
            entered: Arc::new(Notify::new()),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SessionBootstrap for FakeBootstrap {
    async fn create_session(&self, request: &SessionRequest) -> CallResult<RealtimeSessionInfo> {
        self.requests.lock().push(request.clone());
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.clone()
    }
}

pub struct FakeRealtime {
    result: CallResult<String>,
    pub exchanges: Mutex<Vec<(String, String)>>,
}

impl FakeRealtime {
    pub fn answering() -> Arc<Self> {
        Arc::new(Self {
            result: Ok("v=0\r\no=- answer\r\n".to_string()),
            exchanges: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            result: Err(CallError::negotiation_failure("401 Unauthorized")),
            exchanges: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl RealtimeEndpoint for FakeRealtime {
    async fn exchange_sdp(&self, offer_sdp: &str, client_secret: &str) -> CallResult<String> {
        self.exchanges
            .lock()
            .push((offer_sdp.to_string(), client_secret.to_string()));
        self.result.clone()
    }
}

/// All session fakes, kept so tests can inspect them
pub struct Rig {
    pub bootstrap: Arc<dyn SessionBootstrap>,
    pub realtime: Arc<FakeRealtime>,
    pub peers: Arc<FakePeerFactory>,
    pub media: Arc<FakeMedia>,
    pub routing: Arc<FakeRouting>,
}

impl Rig {
    pub fn new(bootstrap: Arc<dyn SessionBootstrap>, media: Arc<FakeMedia>) -> Self {
        Self {
            bootstrap,
            realtime: FakeRealtime::answering(),
            peers: Arc::new(FakePeerFactory::default()),
            media,
            routing: Arc::new(FakeRouting::default()),
        }
    }

    pub fn with_realtime(mut self, realtime: Arc<FakeRealtime>) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn services(&self) -> SessionServices {
        SessionServices {
            bootstrap: self.bootstrap.clone(),
            realtime: self.realtime.clone(),
            peers: self.peers.clone(),
            media: self.media.clone(),
            routing: self.routing.clone(),
        }
    }
}

/// Wait for the first event matching `pred`
pub async fn wait_for_event<F>(events: &mut broadcast::Receiver<SessionEvent>, pred: F) -> Option<SessionEvent>
where
    F: Fn(&SessionEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}
