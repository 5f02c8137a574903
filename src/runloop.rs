//! Serialized asynchronous run loop.
//!
//! Producers hand actions to [`SerialRunLoop::submit`] from any thread; a
//! single worker pulls them off an unbounded channel and awaits each one to
//! completion before taking the next.
//!
//! ```text
//! submit ──→ mpsc (FIFO) ──→ worker ──→ action.await ──→ next
//!                              ↑
//!            shutdown ──→ Cancellation
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

use crate::cancel::Cancellation;
use crate::config::RunLoopConfig;

/// Owned, zero-argument unit of asynchronous work.
pub type Action = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Error)]
pub enum RunLoopError {
    #[error("No tokio runtime is running on this thread")]
    NoRuntime,

    #[error("Failed to spawn run loop thread '{name}': {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where the worker executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerMode {
    /// A task on the runtime that created the loop.
    #[default]
    Task,
    /// A dedicated named thread driving its own current-thread runtime.
    Thread,
}

/// Accounting for submitted actions.
///
/// Once the worker has stopped, `submitted == completed + discarded`. An
/// action that panics counts as discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLoopStats {
    pub submitted: u64,
    pub completed: u64,
    pub discarded: u64,
}

impl RunLoopStats {
    /// Actions queued or in flight.
    pub fn pending(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed)
            .saturating_sub(self.discarded)
    }
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    discarded: AtomicU64,
}

struct Queued {
    seq: u64,
    action: Action,
}

pub struct SerialRunLoop {
    sender: mpsc::UnboundedSender<Queued>,
    cancel: Cancellation,
    counters: Arc<Counters>,
    stopped: watch::Receiver<bool>,
    mode: WorkerMode,
}

impl SerialRunLoop {
    /// Start a loop whose worker is a task on the current tokio runtime.
    pub fn new() -> Result<Self, RunLoopError> {
        Self::with_config(&RunLoopConfig::default())
    }

    pub fn with_config(config: &RunLoopConfig) -> Result<Self, RunLoopError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (stopped_tx, stopped_rx) = watch::channel(false);
        let cancel = Cancellation::new();
        let counters = Arc::new(Counters::default());

        let worker = run_worker(receiver, cancel.clone(), Arc::clone(&counters), stopped_tx);

        match config.worker {
            WorkerMode::Task => {
                let handle = Handle::try_current().map_err(|_| RunLoopError::NoRuntime)?;
                // Detached: the worker exits on its own once cancelled or
                // once every sender is gone.
                drop(handle.spawn(worker));
            }
            WorkerMode::Thread => {
                let name = config.thread_name.clone();
                std::thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || {
                        match tokio::runtime::Builder::new_current_thread()
                            .enable_all()
                            .build()
                        {
                            Ok(runtime) => runtime.block_on(worker),
                            Err(err) => {
                                tracing::error!(error = %err, "run loop runtime failed to start");
                            }
                        }
                    })
                    .map_err(|source| RunLoopError::ThreadSpawn { name, source })?;
            }
        }

        tracing::debug!(mode = ?config.worker, "run loop started");

        Ok(Self {
            sender,
            cancel,
            counters,
            stopped: stopped_rx,
            mode: config.worker,
        })
    }

    /// Enqueue `action` behind everything submitted before it.
    ///
    /// Never blocks. After shutdown the action is dropped unrun and counted
    /// as discarded.
    pub fn submit<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let seq = self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        let queued = Queued {
            seq,
            action: Box::pin(action),
        };
        if self.sender.send(queued).is_err() {
            self.counters.discarded.fetch_add(1, Ordering::SeqCst);
            tracing::trace!(seq, "run loop stopped, action discarded");
        }
    }

    /// Like [`submit`](Self::submit), but the action receives the loop's
    /// cancellation signal so it can stop early on shutdown.
    pub fn submit_with<F, Fut>(&self, action: F)
    where
        F: FnOnce(Cancellation) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.submit(action(self.cancel.clone()));
    }

    /// Stop the worker. The in-flight action (if any) keeps running;
    /// queued actions are discarded. Idempotent.
    pub fn shutdown(&self) {
        if self.cancel.cancel() {
            tracing::debug!(mode = ?self.mode, "run loop shutdown requested");
        }
    }

    pub fn cancellation(&self) -> Cancellation {
        self.cancel.clone()
    }

    pub fn mode(&self) -> WorkerMode {
        self.mode
    }

    pub fn stats(&self) -> RunLoopStats {
        RunLoopStats {
            submitted: self.counters.submitted.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            discarded: self.counters.discarded.load(Ordering::SeqCst),
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow() || self.stopped.has_changed().is_err()
    }

    /// Wait until the worker has exited.
    pub async fn join(&self) {
        let mut stopped = self.stopped.clone();
        let _ = stopped.wait_for(|stopped| *stopped).await;
    }
}

impl Drop for SerialRunLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_worker(
    receiver: mpsc::UnboundedReceiver<Queued>,
    cancel: Cancellation,
    counters: Arc<Counters>,
    stopped: watch::Sender<bool>,
) {
    // Guards run on every exit path, including a panicking action and the
    // runtime dropping this future. Declaration order matters: the queue is
    // drained before the stopped flag is raised.
    let _stopped = scopeguard::guard(stopped, |stopped| {
        stopped.send_replace(true);
        if std::thread::panicking() {
            tracing::error!("run loop worker stopped by a panicking action");
        } else {
            tracing::debug!("run loop worker stopped");
        }
    });
    let drain_counters = Arc::clone(&counters);
    let mut receiver = scopeguard::guard(receiver, move |mut receiver| {
        receiver.close();
        let mut discarded = 0u64;
        while receiver.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            drain_counters
                .discarded
                .fetch_add(discarded, Ordering::SeqCst);
            tracing::debug!(discarded, "run loop discarded queued actions");
        }
    });

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = receiver.recv() => next,
        };
        let Some(Queued { seq, action }) = next else {
            break;
        };

        tracing::trace!(seq, "action started");
        // An action that panics, or is dropped with the runtime, never
        // completes and is counted as discarded.
        let in_flight = scopeguard::guard(Arc::clone(&counters), move |counters| {
            counters.discarded.fetch_add(1, Ordering::SeqCst);
            tracing::error!(seq, "action did not finish");
        });
        action.await;
        scopeguard::ScopeGuard::into_inner(in_flight);
        counters.completed.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(seq, "action finished");
    }
}
