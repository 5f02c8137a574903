//! Shared test utilities.

#![allow(dead_code, unused_imports)]

use parking_lot::Mutex;
use serialloop::config::Config;
use serialloop::runloop::SerialRunLoop;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Thread-safe append-only log of observed values.
#[derive(Clone, Default)]
pub struct Recorder<T> {
    events: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, value: T) {
        self.events.lock().push(value);
    }

    pub fn events(&self) -> Vec<T> {
        self.events.lock().clone()
    }

    /// Observer callback that appends into this recorder.
    pub fn sink(&self) -> impl Fn(&T) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |value: &T| events.lock().push(value.clone())
    }
}

/// Config with a short work delay for real-time tests.
pub fn fast_config(delay_ms: u64) -> Config {
    let mut config = Config::default();
    config.counter.work_delay_ms = delay_ms;
    config
}

/// Resolves once everything already submitted to `run_loop` has run.
pub async fn flush(run_loop: &SerialRunLoop) {
    let (tx, rx) = oneshot::channel();
    run_loop.submit(async move {
        let _ = tx.send(());
    });
    rx.await.expect("run loop flushed");
}
