//! Event model delivered to listeners on interactive surfaces.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::ElementId;

/// Identifier of one continuous touch contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TouchId(String);

impl TouchId {
    /// Create a touch identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TouchId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u32> for TouchId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TouchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// A contact started (`touchstart`).
    TouchStart,
    /// An active contact moved (`touchmove`).
    TouchMove,
    /// A contact ended (`touchend`).
    TouchEnd,
    /// A contact was cancelled by the host (`touchcancel`).
    TouchCancel,
    /// Any other event type.
    Custom(String),
}

impl EventType {
    /// The wire name of this event type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::TouchStart => "touchstart",
            Self::TouchMove => "touchmove",
            Self::TouchEnd => "touchend",
            Self::TouchCancel => "touchcancel",
            Self::Custom(name) => name,
        }
    }

    /// Whether listeners may suppress the host's default action for this type.
    #[must_use]
    pub fn is_cancelable(&self) -> bool {
        !matches!(self, Self::TouchCancel)
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        match name {
            "touchstart" => Self::TouchStart,
            "touchmove" => Self::TouchMove,
            "touchend" => Self::TouchEnd,
            "touchcancel" => Self::TouchCancel,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic clock used to stamp events.
#[derive(Debug, Clone, Copy)]
pub struct EventClock {
    origin: Instant,
}

impl EventClock {
    /// Start a clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the clock started.
    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for EventClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Attributes shared by every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    /// Event type tag.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Creation time in milliseconds on the host's monotonic clock.
    pub time_stamp: f64,
    /// Element the event was originally aimed at.
    pub target: Option<ElementId>,
    /// Element whose listener is currently running.
    pub current_target: Option<ElementId>,
    /// Whether `prevent_default` has any effect.
    pub cancelable: bool,
    #[serde(default)]
    default_prevented: bool,
    #[serde(skip)]
    passive: bool,
}

impl BaseEvent {
    /// Create an event of the given type.
    #[must_use]
    pub fn new(event_type: EventType, time_stamp: f64) -> Self {
        let cancelable = event_type.is_cancelable();
        Self {
            event_type,
            time_stamp,
            target: None,
            current_target: None,
            cancelable,
            default_prevented: false,
            passive: false,
        }
    }

    /// Set the target element.
    #[must_use]
    pub fn with_target(mut self, target: Option<ElementId>) -> Self {
        self.target = target;
        self
    }

    /// Suppress the host's default handling of this event.
    ///
    /// Has no effect on non-cancelable events or from passive listeners.
    /// Never stops delivery to other listeners.
    pub fn prevent_default(&mut self) {
        if !self.cancelable {
            tracing::trace!("prevent_default ignored: {} is not cancelable", self.event_type);
        } else if self.passive {
            tracing::trace!("prevent_default ignored inside passive listener");
        } else {
            self.default_prevented = true;
        }
    }

    /// Check if default handling was suppressed.
    #[must_use]
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub(crate) fn set_passive(&mut self, passive: bool) {
        self.passive = passive;
    }
}

/// A single active contact at the time an event was dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Touch {
    /// Stable identifier for the lifetime of the contact.
    pub identifier: TouchId,
    /// X relative to the screen.
    pub screen_x: f32,
    /// Y relative to the screen.
    pub screen_y: f32,
    /// X relative to the viewport.
    pub client_x: f32,
    /// Y relative to the viewport.
    pub client_y: f32,
    /// X relative to the document, including scroll.
    pub page_x: f32,
    /// Y relative to the document, including scroll.
    pub page_y: f32,
    /// Contact ellipse radius along X.
    pub radius_x: f32,
    /// Contact ellipse radius along Y.
    pub radius_y: f32,
    /// Contact ellipse rotation in degrees.
    pub rotation_angle: f32,
    /// Normalized pressure (0.0 to 1.0).
    pub force: f32,
    /// Element under the contact when it started.
    pub target: Option<ElementId>,
}

/// A touch event carrying the full set of active contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchEvent {
    /// Shared event attributes.
    #[serde(flatten)]
    pub base: BaseEvent,
    /// All contacts active after this transition, in start order.
    pub touches: Vec<Touch>,
    /// Contacts that changed in this transition.
    pub changed_touches: Vec<Touch>,
}

impl TouchEvent {
    /// Get the primary (first) active touch.
    #[must_use]
    pub fn primary_touch(&self) -> Option<&Touch> {
        self.touches.first()
    }

    /// Check if more than one contact is active.
    #[must_use]
    pub fn is_multi_touch(&self) -> bool {
        self.touches.len() > 1
    }

    /// Check if a contact is among the active touches.
    #[must_use]
    pub fn contains(&self, id: &TouchId) -> bool {
        self.touches.iter().any(|t| &t.identifier == id)
    }
}

/// Any event that can be dispatched to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum Event {
    /// A plain event with no payload.
    Base(BaseEvent),
    /// A touch event.
    Touch(TouchEvent),
}

impl Event {
    /// Shared event attributes.
    #[must_use]
    pub fn base(&self) -> &BaseEvent {
        match self {
            Self::Base(base) => base,
            Self::Touch(touch) => &touch.base,
        }
    }

    /// Mutable shared event attributes.
    pub fn base_mut(&mut self) -> &mut BaseEvent {
        match self {
            Self::Base(base) => base,
            Self::Touch(touch) => &mut touch.base,
        }
    }

    /// The event type tag.
    #[must_use]
    pub fn event_type(&self) -> &EventType {
        &self.base().event_type
    }

    /// Suppress the host's default handling.
    pub fn prevent_default(&mut self) {
        self.base_mut().prevent_default();
    }

    /// Check if default handling was suppressed.
    #[must_use]
    pub fn is_default_prevented(&self) -> bool {
        self.base().is_default_prevented()
    }

    /// The touch payload, if this is a touch event.
    #[must_use]
    pub fn as_touch(&self) -> Option<&TouchEvent> {
        match self {
            Self::Touch(touch) => Some(touch),
            Self::Base(_) => None,
        }
    }
}

impl From<BaseEvent> for Event {
    fn from(base: BaseEvent) -> Self {
        Self::Base(base)
    }
}

impl From<TouchEvent> for Event {
    fn from(touch: TouchEvent) -> Self {
        Self::Touch(touch)
    }
}
