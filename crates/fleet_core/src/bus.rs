//! Notification bus: observers registered for fleet snapshots.
//!
//! Delivery is synchronous and in registration order. The observer list is
//! copied out of the registry before any observer runs, so observers can
//! subscribe or unsubscribe from inside a callback. A panicking observer is
//! isolated: the panic is caught, logged, and delivery moves on to the next
//! observer.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use crate::telemetry::FleetSnapshot;

type Observer<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    observers: Vec<(u64, Observer<T>)>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            observers: Vec::new(),
        }
    }
}

/// Outcome of one [`NotificationBus::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct NotificationBus<T = FleetSnapshot> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for NotificationBus<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Default for NotificationBus<T> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }
}

impl<T: Send + Sync + 'static> NotificationBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer`. It receives every snapshot published after this returns.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            let id = registry.next_id;
            registry.next_id += 1;
            registry.observers.push((id, Arc::new(observer)));
            id
        };

        let registry: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                let mut registry = registry.lock().unwrap_or_else(|e| e.into_inner());
                registry.observers.retain(|(observer_id, _)| *observer_id != id);
            }
        })
    }

    /// Delivers `snapshot` to every registered observer, in registration order.
    pub fn publish(&self, snapshot: &Arc<T>) -> PublishReport {
        let observers: Vec<Observer<T>> = {
            let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry
                .observers
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect()
        };

        let mut report = PublishReport::default();
        for observer in observers {
            match panic::catch_unwind(AssertUnwindSafe(|| observer(snapshot))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    report.failed += 1;
                    log::warn!("snapshot observer panicked: {}", panic_message(&*payload));
                }
            }
        }
        report
    }

    pub fn observer_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .observers
            .len()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Handle returned by [`NotificationBus::subscribe`].
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
#[must_use = "dropping the handle leaves the observer registered with no way to remove it"]
pub struct Subscription {
    detach: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Mutex::new(Some(Box::new(detach))),
        }
    }

    /// Deregisters the observer. Only the first call has an effect.
    pub fn unsubscribe(&self) {
        let detach = self.detach.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(detach) = detach {
            detach();
        }
    }

    pub fn is_active(&self) -> bool {
        self.detach
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
