//! Minimal observable value used by every domain object.
//!
//! An [`ObservableValue`] holds the current value of type `T` plus a set of
//! listeners.  Writing a new value notifies every listener synchronously, in
//! subscription order, on the writer's thread.  A panicking listener is caught
//! and logged; the remaining listeners still run and the writer never sees the
//! panic.
//!
//! Once [`ObservableValue::destroy`] has been called the listener set is empty,
//! further writes are ignored and new subscriptions are inert.  The last value
//! stays readable.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::warn;

/// Callback invoked with every new value.
pub type Listener<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Read side shared by [`ObservableValue`] and every domain object.
pub trait Observable<T> {
    /// Clone of the current value.
    fn get_value(&self) -> T;

    /// Registers `listener`; dropping (or calling `unsubscribe` on) the
    /// returned handle removes it.
    fn subscribe(&self, listener: Listener<T>) -> Subscription;
}

// ── Subscription handle ───────────────────────────────────────────────────────

/// Handle returned by `subscribe`/`listen` calls.
///
/// Removes the registration when dropped.  Calling [`Subscription::unsubscribe`]
/// more than once is impossible by construction, and dropping a handle whose
/// source is already gone does nothing.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Handle that runs `cancel` once when released.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle with nothing to release.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keeps the registration alive for as long as its source lives.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// ── ObservableValue ───────────────────────────────────────────────────────────

struct Registry<T> {
    value: T,
    listeners: Vec<(u64, Arc<dyn Fn(&T) + Send + Sync>)>,
    next_id: u64,
    destroyed: bool,
}

/// Current value plus listeners.  Cloning yields another handle to the same
/// value.
pub struct ObservableValue<T> {
    inner: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> ObservableValue<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                value: initial,
                listeners: Vec::new(),
                next_id: 0,
                destroyed: false,
            })),
        }
    }

    /// Replaces the value and notifies listeners.  No-op after `destroy`.
    pub fn set_value(&self, next: T) {
        self.update(move |_| next);
    }

    /// Replaces the value with `f(&current)` and notifies listeners.
    /// No-op after `destroy`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let (value, listeners) = {
            let mut registry = lock(&self.inner);
            if registry.destroyed {
                return;
            }
            registry.value = f(&registry.value);
            let listeners: Vec<_> = registry.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            (registry.value.clone(), listeners)
        };

        // Listeners run without the lock held so they may read or subscribe.
        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(&value)));
            if outcome.is_err() {
                warn!("observable listener panicked; continuing with remaining listeners");
            }
        }
    }

    /// Clears every listener and turns later writes into no-ops.  Idempotent.
    pub fn destroy(&self) {
        let mut registry = lock(&self.inner);
        registry.destroyed = true;
        registry.listeners.clear();
    }

    pub fn is_destroyed(&self) -> bool {
        lock(&self.inner).destroyed
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

impl<T: Clone + Send + 'static> Observable<T> for ObservableValue<T> {
    fn get_value(&self) -> T {
        lock(&self.inner).value.clone()
    }

    fn subscribe(&self, listener: Listener<T>) -> Subscription {
        let id = {
            let mut registry = lock(&self.inner);
            if registry.destroyed {
                return Subscription::empty();
            }
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Arc::from(listener)));
            id
        };

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }
}

/// Locks `mutex`, recovering the guard if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Listener<i32>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        (hits, Box::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_set_value_notifies_with_new_value() {
        // Arrange
        let obs = ObservableValue::new(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = obs.subscribe(Box::new(move |v| s.lock().unwrap().push(*v)));

        // Act
        obs.set_value(2);
        obs.update(|v| v * 10);

        // Assert
        assert_eq!(*seen.lock().unwrap(), vec![2, 20]);
        assert_eq!(obs.get_value(), 20);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_others() {
        // Arrange
        let obs = ObservableValue::new(0);
        let _bad = obs.subscribe(Box::new(|_| panic!("listener failure")));
        let (hits, listener) = counter();
        let _good = obs.subscribe(listener);

        // Act
        obs.set_value(5);

        // Assert
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(obs.get_value(), 5);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let obs = ObservableValue::new(0);
        let (hits, listener) = counter();
        let sub = obs.subscribe(listener);

        drop(sub);
        obs.set_value(1);

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(obs.listener_count(), 0);
    }

    #[test]
    fn test_detached_subscription_stays_registered() {
        let obs = ObservableValue::new(0);
        let (hits, listener) = counter();
        obs.subscribe(listener).detach();

        obs.set_value(1);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_destroy_makes_writes_noops() {
        // Arrange
        let obs = ObservableValue::new(3);
        let (hits, listener) = counter();
        let _sub = obs.subscribe(listener);

        // Act
        obs.destroy();
        obs.destroy();
        obs.set_value(4);
        obs.update(|v| v + 1);

        // Assert
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(obs.get_value(), 3);
        assert!(obs.is_destroyed());
    }

    #[test]
    fn test_subscribe_after_destroy_is_inert() {
        let obs = ObservableValue::new(0);
        obs.destroy();

        let (hits, listener) = counter();
        let sub = obs.subscribe(listener);
        obs.set_value(1);
        sub.unsubscribe();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(obs.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_read_current_value() {
        // Arrange – a listener that reads back through another handle
        let obs = ObservableValue::new(0);
        let reader = obs.clone();
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        let _sub = obs.subscribe(Box::new(move |_| {
            *s.lock().unwrap() = Some(reader.get_value());
        }));

        // Act
        obs.set_value(9);

        // Assert
        assert_eq!(*seen.lock().unwrap(), Some(9));
    }
}
