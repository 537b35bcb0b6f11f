//! # Minihost Core
//!
//! Core host logic shared by every interactive surface of a sandboxed
//! application host.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               minihost-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Input           │  Delivery                │
//! │  - TouchTracker  │  - ListenerRegistry      │
//! │  - Hit testing   │  - EventDispatcher       │
//! │  - Event clock   │  - EventTarget           │
//! ├─────────────────────────────────────────────┤
//! │  Host accessors (injected, not global)      │
//! │  - SystemInfoAccessor                       │
//! │  - PermissionAccessor                       │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dispatch;
pub mod element;
pub mod error;
pub mod event;
pub mod host;
pub mod touch;

pub use dispatch::{
    listener, DispatchOutcome, EventDispatcher, EventTarget, Listener, ListenerId, ListenerOptions,
    ListenerRegistry,
};
pub use element::{ElementId, HitRegions, HitTest, Rect};
pub use error::{CoreError, CoreResult};
pub use event::{BaseEvent, Event, EventClock, EventType, Touch, TouchEvent, TouchId};
pub use host::{
    AuthSetting, InMemoryPermissions, PermissionAccessor, Scope, StaticSystemInfo, SystemInfo,
    SystemInfoAccessor,
};
pub use touch::{ContactPhase, RawContact, TouchTracker, Viewport};

/// Core crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
