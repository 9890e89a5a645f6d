//! Simulated incoming calls
//!
//! ```text
//! IncomingCallScheduler ──schedule/cancel──▶ IncomingCallGateway ──▶ platform alert
//!                                                    │
//!                         NotificationEvent ◀────────┘
//!                                │
//!                     CallActionDispatcher
//!                      │                │
//!               foreground          background
//!               Navigator         CallSignalStore ──resume()──▶ Navigator
//! ```

pub mod dispatch;
pub mod gateway;
pub mod incoming;

pub use dispatch::{CallActionDispatcher, Navigator, Route};
pub use gateway::{
    CallAction, CallActionHandler, CallActionKind, Clock, ExecutionContext, FullScreenIntent,
    IncomingCallGateway, NotificationAction, NotificationEvent, NotificationRequest, PermissionStatus,
    SystemClock,
};
pub use incoming::IncomingCallScheduler;
