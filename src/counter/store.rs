use std::time::Duration;

use parking_lot::Mutex;

use crate::cancel::Cancellation;
use crate::counter::intent::CounterIntent;
use crate::counter::reducer::CounterReducer;
use crate::counter::state::CounterSnapshot;
use crate::mvi::Reducer;
use crate::observe::{Published, Subscription};

/// Simulated work duration for [`CounterState::increment_async`].
pub const DEFAULT_WORK_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    Completed,
    Cancelled,
}

/// Reactive counter owned by one screen.
///
/// Mutated only from actions on the owning run loop; everyone else observes
/// through subscriptions. Observers run synchronously inside the mutating
/// call and must not mutate the counter or subscribe to it from inside the
/// callback.
pub struct CounterState {
    snapshot: Published<CounterSnapshot>,
    title: Published<String>,
    busy: Published<bool>,
    writer: Mutex<()>,
    work_delay: Duration,
}

impl CounterState {
    pub fn new(work_delay: Duration) -> Self {
        let initial = CounterSnapshot::default();
        Self {
            title: Published::new(initial.title.clone()),
            busy: Published::new(initial.busy),
            snapshot: Published::new(initial),
            writer: Mutex::new(()),
            work_delay,
        }
    }

    pub fn count(&self) -> u64 {
        self.snapshot.get().count
    }

    pub fn title(&self) -> String {
        self.snapshot.get().title
    }

    pub fn is_busy(&self) -> bool {
        self.snapshot.get().busy
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        self.snapshot.get()
    }

    pub fn work_delay(&self) -> Duration {
        self.work_delay
    }

    /// Add `by` to the count; the title follows before this returns.
    pub fn increment(&self, by: u64) -> CounterSnapshot {
        self.apply(CounterIntent::Increment { by })
    }

    /// Raise busy, wait out the work delay, then count one.
    ///
    /// Busy drops on every exit: normal completion, cancellation, or the
    /// future being dropped mid-wait. A cancelled wait leaves the count alone.
    pub async fn increment_async(&self, cancel: &Cancellation) -> WorkOutcome {
        self.apply(CounterIntent::WorkStarted);
        let _busy = scopeguard::guard((), |()| {
            self.apply(CounterIntent::WorkFinished);
        });

        match cancel
            .run_until_cancelled(tokio::time::sleep(self.work_delay))
            .await
        {
            Some(()) => {
                self.increment(1);
                WorkOutcome::Completed
            }
            None => {
                tracing::debug!("counter work cancelled before completion");
                WorkOutcome::Cancelled
            }
        }
    }

    /// Observe every snapshot. Like the title and busy subscriptions, the
    /// callback must not subscribe to this counter or mutate it.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&CounterSnapshot) + Send + Sync + 'static,
    {
        self.snapshot.subscribe(observer)
    }

    pub fn subscribe_title<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.title.subscribe(observer)
    }

    pub fn subscribe_busy<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.busy.subscribe(observer)
    }

    fn apply(&self, intent: CounterIntent) -> CounterSnapshot {
        let _writer = self.writer.lock();
        let next = CounterReducer::reduce(self.snapshot.get(), intent);
        self.snapshot.set(next.clone());
        self.title.set(next.title.clone());
        self.busy.set(next.busy);
        next
    }
}

impl Default for CounterState {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_DELAY)
    }
}

impl std::fmt::Debug for CounterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterState")
            .field("snapshot", &self.snapshot.get())
            .field("work_delay", &self.work_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn busy_log(state: &CounterState) -> (Arc<Mutex<Vec<bool>>>, Subscription) {
        let log: Arc<Mutex<Vec<bool>>> = Arc::default();
        let sink = Arc::clone(&log);
        let sub = state.subscribe_busy(move |busy| sink.lock().push(*busy));
        (log, sub)
    }

    #[test]
    fn title_tracks_count_after_every_increment() {
        let state = CounterState::default();
        for by in [1, 0, 3, 10, 1] {
            let snapshot = state.increment(by);
            assert_eq!(snapshot.title, format!("count: {}", snapshot.count));
            assert_eq!(state.title(), format!("count: {}", state.count()));
        }
        assert_eq!(state.count(), 15);
    }

    #[test]
    fn title_subscribers_see_each_new_title_once() {
        let state = CounterState::default();
        let titles: Arc<Mutex<Vec<String>>> = Arc::default();
        let _sub = {
            let titles = Arc::clone(&titles);
            state.subscribe_title(move |title| titles.lock().push(title.clone()))
        };

        state.increment(1);
        state.increment(0);
        state.increment(2);

        assert_eq!(*titles.lock(), vec!["count: 0", "count: 1", "count: 3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn increment_async_round_trips_busy_and_counts() {
        let state = CounterState::default();
        let (log, _sub) = busy_log(&state);

        let outcome = state.increment_async(&Cancellation::new()).await;

        assert_eq!(outcome, WorkOutcome::Completed);
        assert_eq!(state.count(), 1);
        assert_eq!(state.title(), "count: 1");
        assert_eq!(*log.lock(), vec![false, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_increment_clears_busy_without_counting() {
        let state = Arc::new(CounterState::default());
        let (log, _sub) = busy_log(&state);
        let cancel = Cancellation::new();

        let work = {
            let state = Arc::clone(&state);
            let cancel = cancel.clone();
            tokio::spawn(async move { state.increment_async(&cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(state.is_busy());

        cancel.cancel();
        let outcome = work.await.expect("work task");

        assert_eq!(outcome, WorkOutcome::Cancelled);
        assert_eq!(state.count(), 0);
        assert!(!state.is_busy());
        assert_eq!(*log.lock(), vec![false, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_increment_future_still_clears_busy() {
        let state = CounterState::default();
        let (log, _sub) = busy_log(&state);
        let cancel = Cancellation::new();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(100), state.increment_async(&cancel)).await;

        assert!(timed_out.is_err());
        assert!(!state.is_busy());
        assert_eq!(state.count(), 0);
        assert_eq!(*log.lock(), vec![false, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_observer_sees_consistent_state() {
        let state = Arc::new(CounterState::new(Duration::from_millis(10)));
        let broken: Arc<Mutex<Vec<CounterSnapshot>>> = Arc::default();
        let _sub = {
            let broken = Arc::clone(&broken);
            state.subscribe(move |snapshot| {
                if snapshot.title != format!("count: {}", snapshot.count) {
                    broken.lock().push(snapshot.clone());
                }
            })
        };

        state.increment(4);
        state.increment_async(&Cancellation::new()).await;
        state.increment(2);

        assert!(broken.lock().is_empty());
        assert_eq!(state.snapshot().count, 7);
    }
}
