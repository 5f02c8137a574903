use crate::mvi::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterIntent {
    /// Add `by` to the count.
    Increment { by: u64 },
    /// A slow increment began; the busy flag goes up.
    WorkStarted,
    /// A slow increment left its window, by any path.
    WorkFinished,
}

impl Intent for CounterIntent {}
