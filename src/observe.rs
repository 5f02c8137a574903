//! Observable values with synchronous, ordered change delivery.
//!
//! A [`Published`] value hands every subscriber the current value at
//! subscription time and then each distinct new value, on the thread that
//! performed the mutation, before the mutating call returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Published<T> {
    inner: Arc<PublishedInner<T>>,
}

struct PublishedInner<T> {
    value: RwLock<T>,
    observers: Mutex<Vec<(u64, Observer<T>)>>,
    /// Serializes mutate-then-notify so observers never see values out of order.
    publish: Mutex<()>,
    next_id: AtomicU64,
}

impl<T> Published<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(PublishedInner {
                value: RwLock::new(value),
                observers: Mutex::new(Vec::new()),
                publish: Mutex::new(()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Store `value` and notify observers if it differs from the current one.
    ///
    /// Observers may read the value but must not call `set` or `subscribe`
    /// on the same `Published` from inside the callback.
    pub fn set(&self, value: T) -> bool {
        let _publish = self.inner.publish.lock();
        {
            let mut current = self.inner.value.write();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        for observer in self.snapshot_observers() {
            observer(&value);
        }
        true
    }

    /// Register `observer`; it is called with the current value before this
    /// returns, then on every change until the subscription ends.
    ///
    /// Delivery holds the same non-reentrant lock as [`set`](Self::set), so
    /// the callback must not call `subscribe` or `set` on this `Published`.
    /// Reading it with `get` or subscribing to a different one is fine.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer: Observer<T> = Arc::new(observer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let _publish = self.inner.publish.lock();
        self.inner
            .observers
            .lock()
            .push((id, Arc::clone(&observer)));
        let current = self.get();
        observer(&current);

        let weak: Weak<PublishedInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.lock().retain(|(other, _)| *other != id);
            }
        })
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    fn snapshot_observers(&self) -> Vec<Observer<T>> {
        self.inner
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Published<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Published")
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

/// Handle for one observer registration. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}
