//! Event bus
//!
//! Typed publish/subscribe registry keyed by [`EventKind`]. Listeners may
//! subscribe or unsubscribe (themselves or others) while an event is being
//! dispatched: every dispatch pass works on a snapshot of the listener list
//! taken before the first listener runs.

use crate::events::{EventKind, MeasurementEvent};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Listener callback
pub type Listener = Arc<dyn Fn(&MeasurementEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type ListenerMap = HashMap<EventKind, Vec<(ListenerId, Listener)>>;

/// Shared listener registry
///
/// Cloning yields another handle to the same registry, which is how a
/// listener can unsubscribe from inside its own callback.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<ListenerMap>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ListenerMap> {
        // A listener that panicked mid-mutation can't leave the map half-written
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `listener` for events of `kind`
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&MeasurementEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove one listener, or every listener of `kind` when `id` is `None`
    ///
    /// Returns the number of listeners removed.
    pub fn unsubscribe(&self, kind: EventKind, id: Option<ListenerId>) -> usize {
        let mut listeners = self.lock();
        let Some(entries) = listeners.get_mut(&kind) else {
            return 0;
        };

        let before = entries.len();
        match id {
            Some(id) => entries.retain(|(existing, _)| *existing != id),
            None => entries.clear(),
        }
        before - entries.len()
    }

    /// Remove every listener of every kind
    pub fn unsubscribe_all(&self) {
        self.lock().clear();
    }

    /// Number of listeners registered for `kind`
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to the listeners of its kind
    ///
    /// Returns how many listeners were called.
    pub(crate) fn dispatch(&self, event: &MeasurementEvent) -> usize {
        let snapshot: Vec<Listener> = self
            .lock()
            .get(&event.kind())
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.lock();
        let mut counts: Vec<(EventKind, usize)> =
            listeners.iter().map(|(k, v)| (*k, v.len())).collect();
        counts.sort();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Mode;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&MeasurementEvent) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_: &MeasurementEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dispatch_reaches_only_matching_kind() {
        let bus = EventBus::new();
        let (data_count, data_listener) = counter();
        let (stop_count, stop_listener) = counter();
        bus.subscribe(EventKind::DataAvailable, data_listener);
        bus.subscribe(EventKind::Stop, stop_listener);

        bus.dispatch(&MeasurementEvent::data(Mode::Momentary, -20.0));
        bus.dispatch(&MeasurementEvent::data(Mode::Momentary, -21.0));

        assert_eq!(data_count.load(Ordering::SeqCst), 2);
        assert_eq!(stop_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listeners_called_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3 {
            let order = Arc::clone(&order);
            bus.subscribe(EventKind::Start, move |_| order.lock().unwrap().push(tag));
        }

        bus.dispatch(&MeasurementEvent::start());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribe_single_listener() {
        let bus = EventBus::new();
        let (kept, kept_listener) = counter();
        let (removed, removed_listener) = counter();
        bus.subscribe(EventKind::Pause, kept_listener);
        let id = bus.subscribe(EventKind::Pause, removed_listener);

        assert_eq!(bus.unsubscribe(EventKind::Pause, Some(id)), 1);
        bus.dispatch(&MeasurementEvent::pause());

        assert_eq!(kept.load(Ordering::SeqCst), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_whole_kind() {
        let bus = EventBus::new();
        let (count, listener) = counter();
        bus.subscribe(EventKind::Resume, listener);
        bus.subscribe(EventKind::Resume, |_| {});

        assert_eq!(bus.unsubscribe(EventKind::Resume, None), 2);
        assert_eq!(bus.dispatch(&MeasurementEvent::resume()), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_unknown_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.unsubscribe(EventKind::Stop, None), 0);
        let id = bus.subscribe(EventKind::Start, |_| {});
        assert_eq!(bus.unsubscribe(EventKind::Stop, Some(id)), 0);
        assert_eq!(bus.listener_count(EventKind::Start), 1);
    }

    #[test]
    fn unsubscribe_all_clears_every_kind() {
        let bus = EventBus::new();
        for kind in EventKind::ALL {
            bus.subscribe(kind, |_| {});
        }
        bus.unsubscribe_all();
        for kind in EventKind::ALL {
            assert_eq!(bus.listener_count(kind), 0);
        }
    }

    #[test]
    fn unsubscribe_during_dispatch_uses_snapshot() {
        let bus = EventBus::new();
        let (second_count, second_listener) = counter();

        // First listener removes every listener of its kind, including the second
        let handle = bus.clone();
        bus.subscribe(EventKind::DataAvailable, move |_| {
            handle.unsubscribe(EventKind::DataAvailable, None);
        });
        bus.subscribe(EventKind::DataAvailable, second_listener);

        let called = bus.dispatch(&MeasurementEvent::data(Mode::Integrated, -23.0));
        assert_eq!(called, 2);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);

        // Next pass sees the removal
        assert_eq!(bus.dispatch(&MeasurementEvent::data(Mode::Integrated, -23.0)), 0);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribe_during_dispatch_takes_effect_next_pass() {
        let bus = EventBus::new();
        let handle = bus.clone();
        bus.subscribe(EventKind::Start, move |_| {
            handle.subscribe(EventKind::Start, |_| {});
        });

        assert_eq!(bus.dispatch(&MeasurementEvent::start()), 1);
        assert_eq!(bus.listener_count(EventKind::Start), 2);
    }
}
