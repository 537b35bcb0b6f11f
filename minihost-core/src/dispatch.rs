//! Direct listener fan-out for interactive surfaces.
//!
//! Listeners for a (target, type) pair run in registration order. There is
//! no bubbling: propagation across a component hierarchy belongs to the
//! host tree, not this layer.
//!
//! Registering the same listener (same `Arc`) twice for the same type on the
//! same target is deduplicated and returns the existing [`ListenerId`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ElementId, Event, EventType};

/// A registered event callback.
pub type Listener = Arc<dyn Fn(&mut Event) + Send + Sync>;

/// Wrap a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&mut Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handle returned by listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Registration options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerOptions {
    /// Remove the listener after its first delivery.
    #[serde(default)]
    pub once: bool,
    /// Ignore `prevent_default` calls made by this listener.
    #[serde(default)]
    pub passive: bool,
}

/// Result of dispatching one event to one target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Number of listeners invoked.
    pub delivered: usize,
    /// Whether any listener suppressed the default action.
    pub default_prevented: bool,
}

struct Registration {
    id: ListenerId,
    event_type: EventType,
    listener: Listener,
    options: ListenerOptions,
}

/// Listeners attached to a single target.
#[derive(Default)]
pub struct ListenerRegistry {
    registrations: Vec<Registration>,
    next_id: u64,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.registrations.len())
            .finish_non_exhaustive()
    }
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for an event type.
    pub fn add(
        &mut self,
        event_type: EventType,
        listener: Listener,
        options: ListenerOptions,
    ) -> ListenerId {
        if let Some(existing) = self
            .registrations
            .iter()
            .find(|r| r.event_type == event_type && Arc::ptr_eq(&r.listener, &listener))
        {
            tracing::debug!("Listener already registered for {event_type}, keeping one");
            return existing.id;
        }

        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration {
            id,
            event_type,
            listener,
            options,
        });
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    /// Number of listeners registered for an event type.
    #[must_use]
    pub fn listener_count(&self, event_type: &EventType) -> usize {
        self.registrations
            .iter()
            .filter(|r| &r.event_type == event_type)
            .count()
    }

    /// Check if no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Deliver an event to every listener for its type, in registration order.
    pub fn dispatch(&mut self, current_target: ElementId, event: &mut Event) -> DispatchOutcome {
        let matching: Vec<(ListenerId, Listener, ListenerOptions)> = self
            .registrations
            .iter()
            .filter(|r| &r.event_type == event.event_type())
            .map(|r| (r.id, Arc::clone(&r.listener), r.options))
            .collect();

        let base = event.base_mut();
        base.current_target = Some(current_target);
        if base.target.is_none() {
            base.target = Some(current_target);
        }

        for (id, callback, options) in &matching {
            if options.once {
                self.remove(*id);
            }
            event.base_mut().set_passive(options.passive);
            callback(event);
        }
        event.base_mut().set_passive(false);

        DispatchOutcome {
            delivered: matching.len(),
            default_prevented: event.is_default_prevented(),
        }
    }
}

/// Capability of surfaces that receive events through their own registry.
pub trait EventTarget {
    /// Identity used as `currentTarget` during dispatch.
    fn target_id(&self) -> ElementId;

    /// The target's listener registry.
    fn listener_registry(&mut self) -> &mut ListenerRegistry;

    /// Register a listener on this target.
    fn add_event_listener(
        &mut self,
        event_type: EventType,
        listener: Listener,
        options: ListenerOptions,
    ) -> ListenerId {
        self.listener_registry().add(event_type, listener, options)
    }

    /// Remove a listener from this target.
    fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listener_registry().remove(id)
    }

    /// Deliver an event to this target's listeners.
    fn dispatch_event(&mut self, event: &mut Event) -> DispatchOutcome {
        let id = self.target_id();
        self.listener_registry().dispatch(id, event)
    }
}

/// Listener registries for targets that do not own one themselves.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    targets: HashMap<ElementId, ListenerRegistry>,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for (target, type).
    pub fn add_listener(
        &mut self,
        target: ElementId,
        event_type: EventType,
        listener: Listener,
        options: ListenerOptions,
    ) -> ListenerId {
        self.targets
            .entry(target)
            .or_default()
            .add(event_type, listener, options)
    }

    /// Remove a listener from a target.
    pub fn remove_listener(&mut self, target: ElementId, id: ListenerId) -> bool {
        self.targets
            .get_mut(&target)
            .is_some_and(|registry| registry.remove(id))
    }

    /// Drop every listener attached to a target.
    pub fn remove_target(&mut self, target: ElementId) {
        self.targets.remove(&target);
    }

    /// Deliver an event to the listeners registered on a target.
    pub fn dispatch(&mut self, target: ElementId, event: &mut Event) -> DispatchOutcome {
        match self.targets.get_mut(&target) {
            Some(registry) => registry.dispatch(target, event),
            None => {
                tracing::trace!("No listeners on {target} for {}", event.event_type());
                DispatchOutcome {
                    delivered: 0,
                    default_prevented: event.is_default_prevented(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::BaseEvent;

    fn custom(name: &str) -> Event {
        Event::Base(BaseEvent::new(EventType::from(name), 0.0))
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Listener {
        let log = Arc::clone(log);
        listener(move |_| log.lock().expect("lock").push(tag))
    }

    #[test]
    fn test_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        let target = ElementId::new();
        registry.add("tap".into(), recorder(&log, "a"), ListenerOptions::default());
        registry.add("tap".into(), recorder(&log, "b"), ListenerOptions::default());
        registry.add("other".into(), recorder(&log, "x"), ListenerOptions::default());

        let outcome = registry.dispatch(target, &mut custom("tap"));

        assert_eq!(outcome.delivered, 2);
        assert_eq!(*log.lock().expect("lock"), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_registration_is_deduplicated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        let cb = recorder(&log, "a");

        let first = registry.add("tap".into(), Arc::clone(&cb), ListenerOptions::default());
        let second = registry.add("tap".into(), Arc::clone(&cb), ListenerOptions::default());
        assert_eq!(first, second);

        registry.dispatch(ElementId::new(), &mut custom("tap"));
        assert_eq!(log.lock().expect("lock").len(), 1);

        // Same closure under another type is a separate registration.
        let third = registry.add("press".into(), cb, ListenerOptions::default());
        assert_ne!(first, third);
    }

    #[test]
    fn test_prevent_default_does_not_stop_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.add(
            "tap".into(),
            listener(Event::prevent_default),
            ListenerOptions::default(),
        );
        registry.add("tap".into(), recorder(&log, "after"), ListenerOptions::default());

        let outcome = registry.dispatch(ElementId::new(), &mut custom("tap"));

        assert!(outcome.default_prevented);
        assert_eq!(outcome.delivered, 2);
        assert_eq!(*log.lock().expect("lock"), vec!["after"]);
    }

    #[test]
    fn test_passive_listener_cannot_prevent_default() {
        let mut registry = ListenerRegistry::new();
        registry.add(
            "tap".into(),
            listener(Event::prevent_default),
            ListenerOptions {
                passive: true,
                ..Default::default()
            },
        );

        let outcome = registry.dispatch(ElementId::new(), &mut custom("tap"));
        assert!(!outcome.default_prevented);
    }

    #[test]
    fn test_once_listener_fires_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.add(
            "tap".into(),
            recorder(&log, "once"),
            ListenerOptions {
                once: true,
                ..Default::default()
            },
        );

        let target = ElementId::new();
        registry.dispatch(target, &mut custom("tap"));
        registry.dispatch(target, &mut custom("tap"));

        assert_eq!(log.lock().expect("lock").len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_current_target_and_default_target() {
        let mut registry = ListenerRegistry::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_in = Arc::clone(&seen);
        registry.add(
            "tap".into(),
            listener(move |e| {
                *seen_in.lock().expect("lock") = Some((e.base().target, e.base().current_target));
            }),
            ListenerOptions::default(),
        );

        let target = ElementId::new();
        registry.dispatch(target, &mut custom("tap"));

        assert_eq!(
            *seen.lock().expect("lock"),
            Some((Some(target), Some(target)))
        );
    }

    #[test]
    fn test_dispatcher_routes_by_target() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        let a = ElementId::new();
        let b = ElementId::new();
        dispatcher.add_listener(a, "tap".into(), recorder(&log, "a"), ListenerOptions::default());
        let id_b =
            dispatcher.add_listener(b, "tap".into(), recorder(&log, "b"), ListenerOptions::default());

        dispatcher.dispatch(b, &mut custom("tap"));
        assert_eq!(*log.lock().expect("lock"), vec!["b"]);

        assert!(dispatcher.remove_listener(b, id_b));
        let outcome = dispatcher.dispatch(b, &mut custom("tap"));
        assert_eq!(outcome.delivered, 0);

        let unknown = dispatcher.dispatch(ElementId::new(), &mut custom("tap"));
        assert_eq!(unknown, DispatchOutcome::default());
    }
}
