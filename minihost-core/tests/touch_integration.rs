//! Touch delivery integration tests.
//!
//! Drives raw contacts through the tracker and fans the resulting events
//! out through the dispatcher, checking the active-set guarantees seen by
//! listeners.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use minihost_core::{
    listener, ElementId, Event, EventDispatcher, EventType, HitRegions, ListenerOptions,
    RawContact, Rect, TouchId, TouchTracker,
};

/// A surface covering the top-left 100x100 pixels.
fn single_surface() -> (HitRegions, ElementId) {
    let mut regions = HitRegions::new();
    let surface = ElementId::new();
    regions.attach(surface, Rect::new(0.0, 0.0, 100.0, 100.0), 0);
    (regions, surface)
}

/// Register a listener that records every touch event type it sees.
fn record_all(
    dispatcher: &mut EventDispatcher,
    target: ElementId,
) -> Arc<Mutex<Vec<(EventType, Vec<TouchId>)>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for event_type in ["touchstart", "touchmove", "touchend", "touchcancel"] {
        let log = Arc::clone(&log);
        dispatcher.add_listener(
            target,
            event_type.into(),
            listener(move |event: &mut Event| {
                let touch = event.as_touch().expect("touch payload");
                let ids = touch.touches.iter().map(|t| t.identifier.clone()).collect();
                log.lock()
                    .expect("lock")
                    .push((event.event_type().clone(), ids));
            }),
            ListenerOptions::default(),
        );
    }
    log
}

// ============================================================================
// Start / end scenario
// ============================================================================

#[test]
fn test_touch_start_then_end_removes_contact() {
    let (regions, surface) = single_surface();
    let mut tracker = TouchTracker::new();
    let mut dispatcher = EventDispatcher::new();
    let log = record_all(&mut dispatcher, surface);

    let start = tracker
        .on_contact_start(&RawContact::at("t1", 10.0, 10.0), &regions)
        .expect("start event");
    assert_eq!(start.base.target, Some(surface));
    dispatcher.dispatch(surface, &mut Event::Touch(start));

    let end = tracker
        .on_contact_end(&RawContact::at("t1", 10.0, 10.0))
        .expect("end event");
    assert!(!end.contains(&TouchId::from("t1")));
    dispatcher.dispatch(surface, &mut Event::Touch(end));

    // Duplicate end is dropped without error.
    assert!(tracker
        .on_contact_end(&RawContact::at("t1", 10.0, 10.0))
        .is_none());

    let log = log.lock().expect("lock");
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], (EventType::TouchStart, vec![TouchId::from("t1")]));
    assert_eq!(log[1], (EventType::TouchEnd, vec![]));
}

// ============================================================================
// Active set invariant
// ============================================================================

#[test]
fn test_interleaved_contacts_report_exact_active_set() {
    let (regions, _) = single_surface();
    let mut tracker = TouchTracker::new();
    let mut expected: BTreeSet<TouchId> = BTreeSet::new();

    let script: &[(&str, &str)] = &[
        ("start", "a"),
        ("start", "b"),
        ("move", "a"),
        ("start", "c"),
        ("end", "b"),
        ("move", "c"),
        ("move", "b"), // already ended, dropped
        ("cancel", "a"),
        ("start", "b"), // identifier reusable once retired
        ("end", "c"),
        ("end", "b"),
    ];

    for (step, (action, id)) in script.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let raw = RawContact::at(*id, step as f32, step as f32);
        let event = match *action {
            "start" => tracker.on_contact_start(&raw, &regions),
            "move" => tracker.on_contact_move(&raw),
            "end" => tracker.on_contact_end(&raw),
            "cancel" => tracker.on_contact_cancel(&raw),
            other => panic!("unknown action {other}"),
        };

        match *action {
            "start" => {
                expected.insert(TouchId::from(*id));
            }
            "end" | "cancel" => {
                expected.remove(&TouchId::from(*id));
            }
            _ => {}
        }

        if let Some(event) = event {
            let seen: BTreeSet<TouchId> =
                event.touches.iter().map(|t| t.identifier.clone()).collect();
            assert_eq!(seen, expected, "step {step}: {action} {id}");
            assert_eq!(seen.len(), event.touches.len(), "identifiers must be unique");
        } else {
            assert_eq!(*id, "b", "only the stale move should be dropped");
        }
    }

    assert_eq!(tracker.active_count(), 0);
}

#[test]
fn test_touches_keep_start_order() {
    let (regions, _) = single_surface();
    let mut tracker = TouchTracker::new();
    tracker.on_contact_start(&RawContact::at("first", 1.0, 1.0), &regions);
    tracker.on_contact_start(&RawContact::at("second", 2.0, 2.0), &regions);

    let moved = tracker
        .on_contact_move(&RawContact::at("second", 3.0, 3.0))
        .expect("move");
    let order: Vec<&str> = moved.touches.iter().map(|t| t.identifier.as_str()).collect();
    assert_eq!(order, vec!["first", "second"]);
    assert!(moved.is_multi_touch());
    assert_eq!(moved.changed_touches.len(), 1);
    assert_eq!(moved.changed_touches[0].identifier.as_str(), "second");
}

// ============================================================================
// Default action suppression
// ============================================================================

#[test]
fn test_prevent_default_reported_to_host() {
    let (regions, surface) = single_surface();
    let mut tracker = TouchTracker::new();
    let mut dispatcher = EventDispatcher::new();
    dispatcher.add_listener(
        surface,
        EventType::TouchStart,
        listener(Event::prevent_default),
        ListenerOptions::default(),
    );

    let start = tracker
        .on_contact_start(&RawContact::at("t1", 5.0, 5.0), &regions)
        .expect("start");
    let outcome = dispatcher.dispatch(surface, &mut Event::Touch(start));

    assert_eq!(outcome.delivered, 1);
    assert!(outcome.default_prevented);
}
