use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use super::realtime::{CallTarget, RealtimeCallSession, SessionServices};
use crate::config::ClientConfig;
use crate::error::{CallError, CallResult};

/// Admits at most one live call at a time
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    occupied: Arc<AtomicBool>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot shared by the whole process
    pub fn process() -> &'static SessionSlot {
        static SLOT: OnceLock<SessionSlot> = OnceLock::new();
        SLOT.get_or_init(SessionSlot::new)
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied.load(Ordering::SeqCst)
    }

    /// Claim the slot until the returned permit is dropped
    pub fn acquire(&self) -> CallResult<SlotPermit> {
        if self
            .occupied
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CallError::InvalidSessionState {
                expected: "no active call".to_string(),
                actual: "call in progress".to_string(),
            });
        }
        Ok(SlotPermit {
            occupied: self.occupied.clone(),
        })
    }
}

/// Proof of holding a [`SessionSlot`]
#[derive(Debug)]
pub struct SlotPermit {
    occupied: Arc<AtomicBool>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.occupied.store(false, Ordering::SeqCst);
    }
}

/// Owns a call for the lifetime of a call screen.
///
/// Dropping the guard without calling [`CallSessionGuard::close`] still tears
/// the call down on the current tokio runtime. The slot is released only once
/// teardown finished.
pub struct CallSessionGuard {
    session: RealtimeCallSession,
    permit: Option<SlotPermit>,
}

impl CallSessionGuard {
    /// Claim `slot` and start negotiating a call with `target`
    pub fn open<F>(
        slot: &SessionSlot,
        target: CallTarget,
        services: SessionServices,
        config: &ClientConfig,
        on_close: F,
    ) -> CallResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let permit = slot.acquire()?;
        let session = RealtimeCallSession::open(target, services, config, on_close);
        Ok(Self {
            session,
            permit: Some(permit),
        })
    }

    pub fn session(&self) -> &RealtimeCallSession {
        &self.session
    }

    /// Close the call and free the slot
    pub async fn close(mut self) {
        self.session.close().await;
        self.permit.take();
    }
}

impl Deref for CallSessionGuard {
    type Target = RealtimeCallSession;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl Drop for CallSessionGuard {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };
        if self.session.is_closed() {
            return;
        }

        let session = self.session.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("call guard dropped while open, closing in background");
                handle.spawn(async move {
                    session.close().await;
                    drop(permit);
                });
            }
            Err(_) => {
                tracing::warn!("call guard dropped outside a runtime, resources not released");
            }
        }
    }
}
