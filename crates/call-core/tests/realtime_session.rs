mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use meetai_call_core::session::{DataChannel, DataChannelEvent, LocalAudioTrack, SdpType};
use meetai_call_core::{
    CallError, CallSessionGuard, CallTarget, ClientConfig, ConnectionStatus, HttpBootstrapClient,
    RealtimeCallSession, SessionEvent, SessionSlot,
};

fn target() -> CallTarget {
    CallTarget::new("Taro", "Talk about trains")
}

fn close_counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let hook = count.clone();
    (count, move || {
        hook.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test]
async fn test_connects_and_negotiates_in_order() {
    let bootstrap = FakeBootstrap::ok();
    let rig = Rig::new(bootstrap.clone(), FakeMedia::working());
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), || {});

    session.connect().await.unwrap();

    assert_eq!(session.status(), ConnectionStatus::Connected);
    let snapshot = session.snapshot();
    assert!(snapshot.microphone_enabled);
    assert!(snapshot.speaker_on);
    assert!(!snapshot.session_active);

    let requests = bootstrap.requests.lock().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].agent_name.as_deref(), Some("Taro"));
    assert_eq!(requests[0].instructions.as_deref(), Some("Talk about trains"));

    let peer = rig.peers.last().unwrap();
    assert_eq!(peer.track_ids.lock().clone(), vec!["mic-0".to_string()]);
    assert!(!peer.track_added_after_offer.load(Ordering::SeqCst));
    assert_eq!(peer.local.lock().as_ref().map(|d| d.sdp_type), Some(SdpType::Offer));
    assert_eq!(peer.remote.lock().as_ref().map(|d| d.sdp_type), Some(SdpType::Answer));
    assert_eq!(peer.data_channel().unwrap().label(), "oai-events");

    let exchanges = rig.realtime.exchanges.lock().clone();
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].1, "ek_test");
    assert!(rig.routing.started.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_bootstrap_http_500_ends_in_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({ "error": "boom" })))
        .mount(&server)
        .await;

    let config = ClientConfig::new();
    let bootstrap = Arc::new(HttpBootstrapClient::new(server.uri(), &config).unwrap());
    let rig = Rig::new(bootstrap, FakeMedia::working());
    let session = RealtimeCallSession::new(target(), rig.services(), &config, || {});
    let mut events = session.subscribe();

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, CallError::BootstrapFailure { .. }));
    assert!(err.to_string().contains("500"));

    assert_eq!(session.status(), ConnectionStatus::Error);
    assert_eq!(rig.peers.count(), 0);
    assert!(rig.media.tracks().iter().all(|t| t.is_stopped()));
    assert_eq!(rig.routing.stop_count(), 1);

    let failed = wait_for_event(&mut events, |e| matches!(e, SessionEvent::Failed(_))).await;
    assert!(failed.and_then(|e| e.user_alert()).is_some());
}

#[tokio::test]
async fn test_rejected_offer_releases_everything() {
    let rig = Rig::new(FakeBootstrap::ok(), FakeMedia::working()).with_realtime(FakeRealtime::rejecting());
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), || {});

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, CallError::NegotiationFailure { .. }));
    assert_eq!(session.status(), ConnectionStatus::Error);

    let peer = rig.peers.last().unwrap();
    assert!(peer.is_closed());
    assert!(peer.data_channel().unwrap().closed.load(Ordering::SeqCst));
    assert!(rig.media.tracks().iter().all(|t| t.is_stopped()));
    assert_eq!(rig.routing.stop_count(), 1);

    let snapshot = session.snapshot();
    assert!(!snapshot.microphone_enabled);
    assert!(!snapshot.session_active);

    // closing after a failed attempt is still clean
    session.close().await;
    assert_eq!(session.status(), ConnectionStatus::Closed);
    assert_eq!(rig.routing.stop_count(), 1);
}

#[tokio::test]
async fn test_microphone_failure_degrades_call() {
    let rig = Rig::new(FakeBootstrap::ok(), FakeMedia::denied());
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), || {});
    let mut events = session.subscribe();

    session.connect().await.unwrap();

    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert!(!session.snapshot().microphone_enabled);
    assert!(rig.peers.last().unwrap().track_ids.lock().is_empty());

    let warning = wait_for_event(&mut events, |e| matches!(e, SessionEvent::Warning(_))).await;
    assert!(matches!(
        warning,
        Some(SessionEvent::Warning(CallError::MicrophoneUnavailable { .. }))
    ));

    assert_eq!(session.toggle_speaker().await.unwrap(), false);
    assert_eq!(*rig.routing.speaker.lock(), Some(false));
    assert_eq!(session.toggle_speaker().await.unwrap(), true);

    assert!(matches!(
        session.toggle_microphone().await,
        Err(CallError::MicrophoneUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_toggle_microphone_keeps_status() {
    let rig = Rig::new(FakeBootstrap::ok(), FakeMedia::working());
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), || {});
    session.connect().await.unwrap();

    let before = session.snapshot();
    assert_eq!(session.toggle_microphone().await.unwrap(), false);

    let after = session.snapshot();
    assert_eq!(after.status, before.status);
    assert_eq!(after.speaker_on, before.speaker_on);
    assert!(!after.microphone_enabled);
    assert!(!rig.media.tracks()[0].is_enabled());

    assert_eq!(session.toggle_microphone().await.unwrap(), true);
    assert_eq!(rig.peers.count(), 1);
}

#[tokio::test]
async fn test_toggles_require_connection() {
    let rig = Rig::new(FakeBootstrap::ok(), FakeMedia::working());
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), || {});

    assert!(matches!(
        session.toggle_microphone().await,
        Err(CallError::InvalidSessionState { .. })
    ));
    assert!(matches!(
        session.toggle_speaker().await,
        Err(CallError::InvalidSessionState { .. })
    ));
}

#[tokio::test]
async fn test_close_twice_is_idempotent() {
    let rig = Rig::new(FakeBootstrap::ok(), FakeMedia::working());
    let (closes, on_close) = close_counter();
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), on_close);
    session.connect().await.unwrap();
    session.toggle_speaker().await.unwrap();

    session.close().await;
    let once = session.snapshot();
    session.close().await;

    assert_eq!(session.snapshot(), once);
    assert_eq!(once.status, ConnectionStatus::Closed);
    assert!(!once.microphone_enabled);
    assert!(!once.session_active);
    assert!(once.speaker_on);

    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(rig.routing.stop_count(), 1);
    assert!(rig.peers.last().unwrap().is_closed());
    assert!(rig.media.tracks()[0].is_stopped());
}

#[tokio::test]
async fn test_close_while_connecting() {
    let gate = Arc::new(Notify::new());
    let bootstrap = FakeBootstrap::gated(gate.clone());
    let entered = bootstrap.entered.clone();
    let rig = Rig::new(bootstrap, FakeMedia::working());
    let (closes, on_close) = close_counter();
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), on_close);

    let runner = session.clone();
    let negotiation = tokio::spawn(async move { runner.connect().await });

    entered.notified().await;
    assert_eq!(session.status(), ConnectionStatus::Connecting);
    session.close().await;
    gate.notify_one();

    let result = negotiation.await.unwrap();
    assert_eq!(result, Err(CallError::SessionClosed));
    assert_eq!(session.status(), ConnectionStatus::Closed);
    assert_eq!(rig.peers.count(), 0);
    assert!(rig.media.tracks().is_empty());
    assert_eq!(rig.routing.stop_count(), 1);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bootstrap_failure_after_close_is_not_reported() {
    let gate = Arc::new(Notify::new());
    let bootstrap = FakeBootstrap::gated_failing(gate.clone(), CallError::bootstrap_failure("HTTP error! status: 500"));
    let entered = bootstrap.entered.clone();
    let rig = Rig::new(bootstrap, FakeMedia::working());
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), || {});
    let mut events = session.subscribe();

    let runner = session.clone();
    let negotiation = tokio::spawn(async move { runner.connect().await });

    entered.notified().await;
    session.close().await;
    gate.notify_one();

    assert_eq!(negotiation.await.unwrap(), Err(CallError::SessionClosed));
    assert_eq!(session.status(), ConnectionStatus::Closed);
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, SessionEvent::Failed(_)), "unexpected {:?}", event);
    }
}

#[tokio::test]
async fn test_connect_runs_once() {
    let rig = Rig::new(FakeBootstrap::ok(), FakeMedia::working());
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), || {});

    let (first, second) = tokio::join!(session.connect(), session.connect());
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.contains(&Err(CallError::AlreadyNegotiating)));

    assert_eq!(session.connect().await, Err(CallError::AlreadyNegotiating));
    assert_eq!(rig.peers.count(), 1);
}

#[tokio::test]
async fn test_connect_after_close_is_refused() {
    let rig = Rig::new(FakeBootstrap::ok(), FakeMedia::working());
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), || {});
    session.close().await;

    assert_eq!(session.connect().await, Err(CallError::SessionClosed));
    assert_eq!(rig.peers.count(), 0);
}

#[tokio::test]
async fn test_session_created_marks_active() {
    let rig = Rig::new(FakeBootstrap::ok(), FakeMedia::working());
    let session = RealtimeCallSession::new(target(), rig.services(), &ClientConfig::new(), || {});
    let mut events = session.subscribe();
    session.connect().await.unwrap();

    let peer = rig.peers.last().unwrap();
    peer.channel_event(DataChannelEvent::Open).await;
    peer.channel_event(DataChannelEvent::Message("not json".to_string())).await;
    peer.channel_event(DataChannelEvent::Message(r#"{"type":"response.done"}"#.to_string()))
        .await;
    peer.channel_event(DataChannelEvent::Message(
        r#"{"type":"session.created","event_id":"evt_1"}"#.to_string(),
    ))
    .await;

    let active = wait_for_event(&mut events, |e| *e == SessionEvent::SessionActive).await;
    assert_eq!(active, Some(SessionEvent::SessionActive));
    assert!(session.is_active());
    assert_eq!(session.snapshot().status_text(), "AIと通話中");
}

#[tokio::test]
async fn test_guard_holds_slot_until_closed() {
    let slot = SessionSlot::new();
    let rig = Rig::new(FakeBootstrap::ok(), FakeMedia::working());
    let config = ClientConfig::new();

    let guard = CallSessionGuard::open(&slot, target(), rig.services(), &config, || {}).unwrap();
    let second = CallSessionGuard::open(&slot, target(), rig.services(), &config, || {});
    assert!(matches!(second, Err(CallError::InvalidSessionState { .. })));

    let mut events = guard.subscribe();
    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::StatusChanged { current: ConnectionStatus::Connected, .. })
    })
    .await;

    guard.close().await;
    assert!(!slot.is_occupied());
    assert!(rig.peers.last().unwrap().is_closed());
}

#[tokio::test]
async fn test_dropped_guard_closes_session() {
    let slot = SessionSlot::new();
    let rig = Rig::new(FakeBootstrap::ok(), FakeMedia::working());
    let (closes, on_close) = close_counter();

    let guard = CallSessionGuard::open(&slot, target(), rig.services(), &ClientConfig::new(), on_close).unwrap();
    let session = guard.session().clone();
    drop(guard);

    tokio::time::timeout(Duration::from_secs(2), async {
        while slot.is_occupied() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert!(session.is_closed());
    assert_eq!(session.status(), ConnectionStatus::Closed);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    let started = rig.routing.started.load(Ordering::SeqCst);
    assert_eq!(rig.routing.stop_count(), usize::from(started));
    assert!(rig.peers.last().map_or(true, |peer| peer.is_closed()));
}
