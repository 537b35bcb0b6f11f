//! Per-contact touch tracking.
//!
//! Each contact moves through `Started -> Moving* -> Ended`. Every transition
//! produces a [`TouchEvent`] whose `touches` list is the full set of contacts
//! still active afterwards, so listeners never need to reconstruct it.
//! Input for an unknown contact is logged and dropped.

use serde::{Deserialize, Serialize};

use crate::{
    BaseEvent, CoreError, CoreResult, EventClock, EventType, HitTest, Touch, TouchEvent, TouchId,
};

fn default_force() -> f32 {
    1.0
}

/// One raw input sample for a contact, in screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContact {
    /// Platform contact identifier.
    pub id: TouchId,
    /// X relative to the screen.
    pub screen_x: f32,
    /// Y relative to the screen.
    pub screen_y: f32,
    /// Contact ellipse radius along X.
    #[serde(default)]
    pub radius_x: f32,
    /// Contact ellipse radius along Y.
    #[serde(default)]
    pub radius_y: f32,
    /// Contact ellipse rotation in degrees.
    #[serde(default)]
    pub rotation_angle: f32,
    /// Pressure, clamped into 0.0 to 1.0 when tracked.
    #[serde(default = "default_force")]
    pub force: f32,
}

impl RawContact {
    /// A contact sample at a screen position with default geometry.
    #[must_use]
    pub fn at(id: impl Into<TouchId>, screen_x: f32, screen_y: f32) -> Self {
        Self {
            id: id.into(),
            screen_x,
            screen_y,
            radius_x: 0.0,
            radius_y: 0.0,
            rotation_angle: 0.0,
            force: default_force(),
        }
    }

    /// Set the pressure.
    #[must_use]
    pub fn with_force(mut self, force: f32) -> Self {
        self.force = force;
        self
    }

    /// Set the contact ellipse.
    #[must_use]
    pub fn with_ellipse(mut self, radius_x: f32, radius_y: f32, rotation_angle: f32) -> Self {
        self.radius_x = radius_x;
        self.radius_y = radius_y;
        self.rotation_angle = rotation_angle;
        self
    }
}

/// Lifecycle phase of a tracked contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPhase {
    /// Contact has started and not yet moved.
    Started,
    /// Contact has moved at least once.
    Moving,
    /// Contact has ended (terminal, never stored).
    Ended,
}

/// Maps screen coordinates to client and page coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// Screen X of the viewport's left edge.
    pub offset_x: f32,
    /// Screen Y of the viewport's top edge.
    pub offset_y: f32,
    /// Horizontal document scroll.
    pub scroll_x: f32,
    /// Vertical document scroll.
    pub scroll_y: f32,
}

#[derive(Debug, Clone)]
struct ActiveContact {
    touch: Touch,
    phase: ContactPhase,
}

/// Tracks active contacts and assembles touch events.
#[derive(Debug, Default)]
pub struct TouchTracker {
    active: Vec<ActiveContact>,
    viewport: Viewport,
    clock: EventClock,
}

impl TouchTracker {
    /// Create a tracker with an identity viewport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker with the given viewport mapping.
    #[must_use]
    pub fn with_viewport(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    /// Update the viewport mapping (e.g. after scrolling).
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// The current viewport mapping.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Number of active contacts.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Phase of an active contact.
    #[must_use]
    pub fn phase_of(&self, id: &TouchId) -> Option<ContactPhase> {
        self.find(id).map(|idx| self.active[idx].phase)
    }

    /// Handle a new contact. The element under it becomes its fixed target.
    pub fn on_contact_start(&mut self, raw: &RawContact, hits: &dyn HitTest) -> Option<TouchEvent> {
        Self::deliver(self.start(raw, hits))
    }

    /// Handle movement of an active contact.
    pub fn on_contact_move(&mut self, raw: &RawContact) -> Option<TouchEvent> {
        Self::deliver(self.update(raw))
    }

    /// Handle the end of an active contact.
    pub fn on_contact_end(&mut self, raw: &RawContact) -> Option<TouchEvent> {
        Self::deliver(self.retire(raw, EventType::TouchEnd))
    }

    /// Handle host cancellation of an active contact.
    pub fn on_contact_cancel(&mut self, raw: &RawContact) -> Option<TouchEvent> {
        Self::deliver(self.retire(raw, EventType::TouchCancel))
    }

    fn deliver(result: CoreResult<TouchEvent>) -> Option<TouchEvent> {
        match result {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Dropping touch input: {e}");
                None
            }
        }
    }

    fn start(&mut self, raw: &RawContact, hits: &dyn HitTest) -> CoreResult<TouchEvent> {
        if self.find(&raw.id).is_some() {
            return Err(CoreError::DuplicateContact(raw.id.clone()));
        }

        let mut touch = self.touch_from(raw, None);
        touch.target = hits.element_at(touch.client_x, touch.client_y);
        tracing::debug!(
            "Contact {} started at ({}, {}) target={:?}",
            raw.id,
            raw.screen_x,
            raw.screen_y,
            touch.target
        );

        self.active.push(ActiveContact {
            touch: touch.clone(),
            phase: ContactPhase::Started,
        });
        Ok(self.event(EventType::TouchStart, touch))
    }

    fn update(&mut self, raw: &RawContact) -> CoreResult<TouchEvent> {
        let idx = self
            .find(&raw.id)
            .ok_or_else(|| CoreError::UnknownContact(raw.id.clone()))?;

        let target = self.active[idx].touch.target;
        let touch = self.touch_from(raw, target);
        let contact = &mut self.active[idx];
        contact.touch = touch.clone();
        contact.phase = ContactPhase::Moving;

        Ok(self.event(EventType::TouchMove, touch))
    }

    fn retire(&mut self, raw: &RawContact, event_type: EventType) -> CoreResult<TouchEvent> {
        let idx = self
            .find(&raw.id)
            .ok_or_else(|| CoreError::UnknownContact(raw.id.clone()))?;

        let target = self.active[idx].touch.target;
        let touch = self.touch_from(raw, target);
        self.active.remove(idx);
        tracing::debug!("Contact {} retired via {event_type}", raw.id);

        Ok(self.event(event_type, touch))
    }

    fn find(&self, id: &TouchId) -> Option<usize> {
        self.active.iter().position(|c| &c.touch.identifier == id)
    }

    fn touch_from(&self, raw: &RawContact, target: Option<crate::ElementId>) -> Touch {
        let client_x = raw.screen_x - self.viewport.offset_x;
        let client_y = raw.screen_y - self.viewport.offset_y;
        Touch {
            identifier: raw.id.clone(),
            screen_x: raw.screen_x,
            screen_y: raw.screen_y,
            client_x,
            client_y,
            page_x: client_x + self.viewport.scroll_x,
            page_y: client_y + self.viewport.scroll_y,
            radius_x: raw.radius_x.max(0.0),
            radius_y: raw.radius_y.max(0.0),
            rotation_angle: raw.rotation_angle,
            force: raw.force.clamp(0.0, 1.0),
            target,
        }
    }

    fn event(&self, event_type: EventType, changed: Touch) -> TouchEvent {
        TouchEvent {
            base: BaseEvent::new(event_type, self.clock.now_ms()).with_target(changed.target),
            touches: self.active.iter().map(|c| c.touch.clone()).collect(),
            changed_touches: vec![changed],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementId, HitRegions, Rect};

    #[test]
    fn test_start_move_end() {
        let mut tracker = TouchTracker::new();
        let hits = HitRegions::new();

        let start = tracker
            .on_contact_start(&RawContact::at("a", 1.0, 2.0), &hits)
            .expect("start");
        assert_eq!(start.base.event_type, EventType::TouchStart);
        assert_eq!(start.touches.len(), 1);
        assert_eq!(tracker.phase_of(&"a".into()), Some(ContactPhase::Started));

        let moved = tracker
            .on_contact_move(&RawContact::at("a", 5.0, 6.0))
            .expect("move");
        assert_eq!(moved.touches[0].screen_x, 5.0);
        assert_eq!(tracker.phase_of(&"a".into()), Some(ContactPhase::Moving));

        let end = tracker
            .on_contact_end(&RawContact::at("a", 5.0, 6.0))
            .expect("end");
        assert!(end.touches.is_empty());
        assert_eq!(end.changed_touches[0].identifier, TouchId::from("a"));
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn test_unknown_contact_dropped() {
        let mut tracker = TouchTracker::new();
        assert!(tracker.on_contact_move(&RawContact::at("ghost", 0.0, 0.0)).is_none());
        assert!(tracker.on_contact_end(&RawContact::at("ghost", 0.0, 0.0)).is_none());
        assert!(tracker.on_contact_cancel(&RawContact::at("ghost", 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_duplicate_start_dropped() {
        let mut tracker = TouchTracker::new();
        let hits = HitRegions::new();
        assert!(tracker.on_contact_start(&RawContact::at("a", 0.0, 0.0), &hits).is_some());
        assert!(tracker.on_contact_start(&RawContact::at("a", 9.0, 9.0), &hits).is_none());
        assert_eq!(tracker.active_count(), 1);
    }

    #[test]
    fn test_target_fixed_at_start() {
        let mut regions = HitRegions::new();
        let button = ElementId::new();
        regions.attach(button, Rect::new(0.0, 0.0, 20.0, 20.0), 0);

        let mut tracker = TouchTracker::new();
        let start = tracker
            .on_contact_start(&RawContact::at("a", 10.0, 10.0), &regions)
            .expect("start");
        assert_eq!(start.base.target, Some(button));

        // Element removed from the tree; the contact keeps its target.
        regions.detach(button);
        let moved = tracker
            .on_contact_move(&RawContact::at("a", 100.0, 100.0))
            .expect("move");
        assert_eq!(moved.touches[0].target, Some(button));
        assert_eq!(moved.base.target, Some(button));
    }

    #[test]
    fn test_viewport_mapping() {
        let mut tracker = TouchTracker::with_viewport(Viewport {
            offset_x: 10.0,
            offset_y: 20.0,
            scroll_x: 0.0,
            scroll_y: 300.0,
        });
        let event = tracker
            .on_contact_start(&RawContact::at("a", 15.0, 25.0), &HitRegions::new())
            .expect("start");
        let touch = &event.touches[0];
        assert_eq!((touch.client_x, touch.client_y), (5.0, 5.0));
        assert_eq!((touch.page_x, touch.page_y), (5.0, 305.0));
    }

    #[test]
    fn test_force_clamped() {
        let mut tracker = TouchTracker::new();
        let event = tracker
            .on_contact_start(
                &RawContact::at("a", 0.0, 0.0).with_force(3.0),
                &HitRegions::new(),
            )
            .expect("start");
        assert_eq!(event.touches[0].force, 1.0);
    }

    #[test]
    fn test_cancel_retires_contact() {
        let mut tracker = TouchTracker::new();
        tracker.on_contact_start(&RawContact::at("a", 0.0, 0.0), &HitRegions::new());
        let cancel = tracker
            .on_contact_cancel(&RawContact::at("a", 0.0, 0.0))
            .expect("cancel");
        assert_eq!(cancel.base.event_type, EventType::TouchCancel);
        assert!(!cancel.base.cancelable);
        assert_eq!(tracker.active_count(), 0);
    }
}
