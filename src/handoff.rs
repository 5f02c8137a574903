//! Single-shot value handoff between a waiting action and whoever finishes
//! the work it is waiting on.
//!
//! The waiting side holds a [`Pending`]; the finishing side holds a
//! [`Resolver`] (or a [`SharedResolver`] when the callback it lives in may
//! fire more than once). Exactly one value crosses. Misuse never hangs:
//!
//! - every resolver dropped without a value: the waiter gets
//!   [`HandoffError::Abandoned`];
//! - a second `resolve` on a shared resolver: panics in debug builds,
//!   [`HandoffError::AlreadyResolved`] in release builds.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HandoffError {
    #[error("Handoff dropped without a value")]
    Abandoned,

    #[error("Handoff resolved more than once")]
    AlreadyResolved,

    #[error("Handoff waiter is gone")]
    WaiterGone,
}

/// Create a connected resolver/waiter pair.
pub fn handoff<T>() -> (Resolver<T>, Pending<T>) {
    let (sender, receiver) = oneshot::channel();
    (Resolver { sender }, Pending { receiver })
}

pub struct Resolver<T> {
    sender: oneshot::Sender<T>,
}

impl<T> Resolver<T> {
    pub fn resolve(self, value: T) -> Result<(), HandoffError> {
        self.sender.send(value).map_err(|_| {
            tracing::trace!("handoff value dropped (waiter gone)");
            HandoffError::WaiterGone
        })
    }

    /// Convert into a cloneable resolver for multi-shot callbacks.
    pub fn shared(self) -> SharedResolver<T> {
        SharedResolver {
            sender: Arc::new(Mutex::new(Some(self.sender))),
        }
    }
}

pub struct SharedResolver<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> SharedResolver<T> {
    pub fn resolve(&self, value: T) -> Result<(), HandoffError> {
        let Some(sender) = self.sender.lock().take() else {
            tracing::error!("handoff resolved more than once");
            if cfg!(debug_assertions) {
                panic!("handoff resolved more than once");
            }
            return Err(HandoffError::AlreadyResolved);
        };
        sender.send(value).map_err(|_| {
            tracing::trace!("handoff value dropped (waiter gone)");
            HandoffError::WaiterGone
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl<T> Clone for SharedResolver<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

pub struct Pending<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Pending<T> {
    /// Suspend until the value arrives or every resolver is gone.
    pub async fn wait(self) -> Result<T, HandoffError> {
        self.receiver.await.map_err(|_| {
            tracing::error!("handoff abandoned: resolver dropped without a value");
            HandoffError::Abandoned
        })
    }

    /// Like [`wait`](Self::wait), substituting `fallback` on abandonment.
    pub async fn wait_or(self, fallback: T) -> T {
        self.wait().await.unwrap_or(fallback)
    }
}
