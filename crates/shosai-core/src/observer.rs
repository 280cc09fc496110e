//! Minimal subject/observer used to push controller changes to views.
//!
//! Listeners receive events by reference and must not assume they run on
//! any particular task. A listener may subscribe or unsubscribe from inside
//! its own callback; the change applies from the next `notify`.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

fn lock<E>(registry: &Mutex<Registry<E>>) -> MutexGuard<'_, Registry<E>> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}

/// Holds listeners for events of type `E`.
pub struct Subject<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E: 'static> Subject<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.registry);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    lock(&registry).listeners.retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    /// Deliver `event` to every listener registered at call time.
    pub fn notify(&self, event: &E) {
        let listeners: Vec<Listener<E>> = lock(&self.registry)
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Drop every listener. Outstanding subscriptions become no-ops.
    pub fn clear(&self) {
        lock(&self.registry).listeners.clear();
    }

}

impl<E: 'static> Default for Subject<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`Subject::subscribe`]; unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
