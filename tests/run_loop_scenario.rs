mod common;

use common::{flush, Recorder};
use serialloop::cancel::Cancellation;
use serialloop::counter::{CounterState, WorkOutcome, DEFAULT_WORK_DELAY};
use serialloop::runloop::SerialRunLoop;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Busy(bool),
    Started(&'static str),
    Finished(&'static str),
}

#[tokio::test(start_paused = true)]
async fn increment_slow_increment_increment_reaches_seven() {
    let run_loop = SerialRunLoop::new().expect("run loop");
    let state = Arc::new(CounterState::default());
    assert_eq!(state.work_delay(), DEFAULT_WORK_DELAY);

    let log = Recorder::<Event>::new();
    let _busy = {
        let log = log.clone();
        state.subscribe_busy(move |busy| log.push(Event::Busy(*busy)))
    };

    {
        let state = Arc::clone(&state);
        let log = log.clone();
        run_loop.submit(async move {
            log.push(Event::Started("by-1"));
            state.increment(1);
            log.push(Event::Finished("by-1"));
        });
    }
    {
        let state = Arc::clone(&state);
        let log = log.clone();
        run_loop.submit_with(|cancel| async move {
            log.push(Event::Started("slow"));
            let outcome = state.increment_async(&cancel).await;
            assert_eq!(outcome, WorkOutcome::Completed);
            log.push(Event::Finished("slow"));
        });
    }
    {
        let state = Arc::clone(&state);
        let log = log.clone();
        run_loop.submit(async move {
            log.push(Event::Started("by-5"));
            state.increment(5);
            log.push(Event::Finished("by-5"));
        });
    }

    let started = Instant::now();
    flush(&run_loop).await;

    assert_eq!(state.count(), 7);
    assert_eq!(state.title(), "count: 7");
    assert!(!state.is_busy());
    assert!(started.elapsed() >= DEFAULT_WORK_DELAY);
    assert_eq!(
        log.events(),
        vec![
            Event::Busy(false),
            Event::Started("by-1"),
            Event::Finished("by-1"),
            Event::Started("slow"),
            Event::Busy(true),
            Event::Busy(false),
            Event::Finished("slow"),
            Event::Started("by-5"),
            Event::Finished("by-5"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn title_is_never_stale_after_each_action() {
    let run_loop = SerialRunLoop::new().expect("run loop");
    let state = Arc::new(CounterState::new(Duration::from_millis(100)));
    let mismatches = Recorder::<String>::new();

    for step in 0..12u64 {
        let state = Arc::clone(&state);
        let mismatches = mismatches.clone();
        run_loop.submit_with(move |cancel| async move {
            if step % 3 == 0 {
                state.increment_async(&cancel).await;
            } else {
                state.increment(step);
            }
            let expected = format!("count: {}", state.count());
            if state.title() != expected {
                mismatches.push(state.title());
            }
        });
    }
    flush(&run_loop).await;

    assert!(mismatches.events().is_empty());
    // 4 slow increments plus 1+2+4+5+7+8+10+11.
    assert_eq!(state.count(), 4 + 48);
}

#[tokio::test(start_paused = true)]
async fn shutdown_mid_slow_increment_drops_busy_and_discards_rest() {
    let run_loop = SerialRunLoop::new().expect("run loop");
    let state = Arc::new(CounterState::default());
    let busy = Recorder::<bool>::new();
    let _sub = state.subscribe_busy(busy.sink());

    {
        let state = Arc::clone(&state);
        run_loop.submit_with(|cancel| async move {
            state.increment_async(&cancel).await;
        });
    }
    {
        let state = Arc::clone(&state);
        run_loop.submit(async move {
            state.increment(100);
        });
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(state.is_busy());

    run_loop.shutdown();
    run_loop.join().await;

    assert_eq!(state.count(), 0);
    assert!(!state.is_busy());
    assert_eq!(busy.events(), vec![false, true, false]);

    let stats = run_loop.stats();
    assert_eq!(stats.submitted, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.discarded, 1);
}

#[tokio::test]
async fn action_that_ignores_cancellation_runs_to_completion() {
    let run_loop = SerialRunLoop::new().expect("run loop");
    let done = Recorder::<&'static str>::new();
    let (started_tx, started_rx) = tokio::sync::oneshot::channel();

    {
        let done = done.clone();
        run_loop.submit(async move {
            let _ = started_tx.send(());
            tokio::time::sleep(Duration::from_millis(50)).await;
            done.push("finished");
        });
    }
    started_rx.await.expect("started");
    run_loop.shutdown();
    run_loop.join().await;

    assert_eq!(done.events(), vec!["finished"]);
}

#[tokio::test]
async fn cancellation_handle_matches_loop_state() {
    let run_loop = SerialRunLoop::new().expect("run loop");
    let cancel: Cancellation = run_loop.cancellation();
    assert!(!cancel.is_cancelled());
    run_loop.shutdown();
    assert!(cancel.is_cancelled());
}
