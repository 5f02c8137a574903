//! Headless screen controller.
//!
//! A [`CounterScreen`] owns one [`SerialRunLoop`] and one [`CounterState`].
//! User taps become actions on the loop; observers bind to the counter's
//! published title and busy flag. Presenting a child screen suspends the
//! parent's current action on a [`handoff`] cell until the child is
//! dismissed and reports its count.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::Config;
use crate::counter::{CounterState, WorkOutcome};
use crate::handoff::handoff;
use crate::observe::Subscription;
use crate::runloop::{RunLoopError, SerialRunLoop};

/// Invoked with the final count when a screen is dismissed.
pub type Completion = Box<dyn FnOnce(u64) + Send + 'static>;

/// Whatever shows screens. Screens hold it weakly; its owner keeps it alive.
pub trait Presenter: Send + Sync {
    fn present(&self, screen: CounterScreen);
}

#[derive(Clone)]
pub struct CounterScreen {
    inner: Arc<ScreenInner>,
}

struct ScreenInner {
    id: Uuid,
    config: Config,
    run_loop: SerialRunLoop,
    state: Arc<CounterState>,
    presenter: Weak<dyn Presenter>,
    completion: Mutex<Option<Completion>>,
    bindings: Mutex<Vec<Subscription>>,
}

impl CounterScreen {
    pub fn new(
        config: &Config,
        presenter: Weak<dyn Presenter>,
        completion: Option<Completion>,
    ) -> Result<Self, RunLoopError> {
        let run_loop = SerialRunLoop::with_config(&config.run_loop)?;
        let id = Uuid::new_v4();
        tracing::debug!(screen = %id, "screen created");
        Ok(Self {
            inner: Arc::new(ScreenInner {
                id,
                config: config.clone(),
                run_loop,
                state: Arc::new(CounterState::new(config.counter.work_delay())),
                presenter,
                completion: Mutex::new(completion),
                bindings: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn count(&self) -> u64 {
        self.inner.state.count()
    }

    pub fn title(&self) -> String {
        self.inner.state.title()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.state.is_busy()
    }

    pub fn state(&self) -> &CounterState {
        &self.inner.state
    }

    pub fn run_loop(&self) -> &SerialRunLoop {
        &self.inner.run_loop
    }

    /// Keep `observer` bound to the title until the screen is torn down.
    pub fn on_title<F>(&self, observer: F)
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        let subscription = self.inner.state.subscribe_title(observer);
        self.inner.bindings.lock().push(subscription);
    }

    /// Keep `observer` bound to the busy flag until the screen is torn down.
    pub fn on_busy<F>(&self, observer: F)
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        let subscription = self.inner.state.subscribe_busy(observer);
        self.inner.bindings.lock().push(subscription);
    }

    /// Queue a slow increment.
    pub fn tap_increment(&self) {
        let state = Arc::clone(&self.inner.state);
        let screen = self.inner.id;
        self.inner.run_loop.submit_with(|cancel| async move {
            if state.increment_async(&cancel).await == WorkOutcome::Cancelled {
                tracing::debug!(%screen, "increment cancelled by shutdown");
            }
        });
    }

    /// Queue an immediate increment by `by`.
    pub fn tap_increment_by(&self, by: u64) {
        let state = Arc::clone(&self.inner.state);
        self.inner.run_loop.submit(async move {
            state.increment(by);
        });
    }

    /// Queue an action that presents a child screen, waits for it to be
    /// dismissed, and adds the child's final count to this one.
    pub fn tap_present(&self) {
        let screen = Arc::downgrade(&self.inner);
        self.inner.run_loop.submit(async move {
            let Some(parent) = screen.upgrade() else {
                return;
            };
            let Some(presenter) = parent.presenter.upgrade() else {
                tracing::warn!(screen = %parent.id, "no presenter, child not shown");
                return;
            };

            let (resolver, pending) = handoff::<u64>();
            let completion: Completion = Box::new(move |count| {
                let _ = resolver.resolve(count);
            });
            let child = match CounterScreen::new(
                &parent.config,
                parent.presenter.clone(),
                Some(completion),
            ) {
                Ok(child) => child,
                Err(err) => {
                    tracing::error!(screen = %parent.id, error = %err, "failed to create child screen");
                    return;
                }
            };

            tracing::info!(screen = %parent.id, child = %child.id(), "presenting child screen");
            presenter.present(child);
            // Only a weak reference survives the wait.
            drop(presenter);
            drop(parent);

            let result = pending.wait().await;

            let Some(parent) = screen.upgrade() else {
                return;
            };
            match result {
                Ok(count) => {
                    parent.state.increment(count);
                }
                Err(err) => {
                    tracing::warn!(screen = %parent.id, error = %err, "child screen returned no result");
                }
            }
        });
    }

    /// Resolves once every action queued before this call has finished,
    /// or immediately if the loop has stopped.
    pub async fn settle(&self) {
        let (resolver, pending) = handoff::<()>();
        self.inner.run_loop.submit(async move {
            let _ = resolver.resolve(());
        });
        let _ = pending.wait().await;
    }

    /// Report the final count to the completion (once), release bindings
    /// and stop the run loop. Returns the count.
    pub fn dismiss(&self) -> u64 {
        let count = self.inner.state.count();
        let completion = self.inner.completion.lock().take();
        if let Some(completion) = completion {
            completion(count);
        }
        self.inner.bindings.lock().clear();
        self.inner.run_loop.shutdown();
        tracing::info!(screen = %self.inner.id, count, "screen dismissed");
        count
    }
}

impl Drop for ScreenInner {
    fn drop(&mut self) {
        if self.completion.get_mut().is_some() {
            tracing::warn!(screen = %self.id, "screen torn down without dismissal");
        }
        tracing::debug!(screen = %self.id, "screen torn down");
    }
}

/// Presenter that keeps presented screens on a stack.
pub struct ScreenStack {
    screens: Mutex<Vec<CounterScreen>>,
    depth: watch::Sender<usize>,
}

impl ScreenStack {
    pub fn new() -> Arc<Self> {
        let (depth, _) = watch::channel(0);
        Arc::new(Self {
            screens: Mutex::new(Vec::new()),
            depth,
        })
    }

    /// Create the bottom screen (no completion) and push it.
    pub fn push_root(self: &Arc<Self>, config: &Config) -> Result<CounterScreen, RunLoopError> {
        let stack: Weak<ScreenStack> = Arc::downgrade(self);
        let presenter: Weak<dyn Presenter> = stack;
        let root = CounterScreen::new(config, presenter, None)?;
        self.present(root.clone());
        Ok(root)
    }

    pub fn top(&self) -> Option<CounterScreen> {
        self.screens.lock().last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.screens.lock().len()
    }

    /// Wait until at least `depth` screens are on the stack.
    pub async fn wait_for_depth(&self, depth: usize) {
        let mut receiver = self.depth.subscribe();
        let _ = receiver.wait_for(|current| *current >= depth).await;
    }

    /// Pop and dismiss the top screen, returning its final count.
    pub fn dismiss_top(&self) -> Option<u64> {
        let screen = self.pop()?;
        Some(screen.dismiss())
    }

    /// Pop the top screen and drop it without dismissing, as when a screen
    /// is torn down abnormally. Its completion never fires.
    pub fn discard_top(&self) -> bool {
        self.pop().is_some()
    }

    /// Dismiss every screen, top first.
    pub fn clear(&self) {
        while self.dismiss_top().is_some() {}
    }

    fn pop(&self) -> Option<CounterScreen> {
        let mut screens = self.screens.lock();
        let screen = screens.pop();
        self.depth.send_replace(screens.len());
        screen
    }
}

impl Presenter for ScreenStack {
    fn present(&self, screen: CounterScreen) {
        let mut screens = self.screens.lock();
        screens.push(screen);
        self.depth.send_replace(screens.len());
    }
}
