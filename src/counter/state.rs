use crate::mvi::UiState;

/// Immutable view of a counter.
///
/// `title` is always `"count: {count}"`; only the reducer builds new values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub count: u64,
    pub title: String,
    pub busy: bool,
}

impl CounterSnapshot {
    pub(crate) fn title_for(count: u64) -> String {
        format!("count: {}", count)
    }
}

impl Default for CounterSnapshot {
    fn default() -> Self {
        Self {
            count: 0,
            title: Self::title_for(0),
            busy: false,
        }
    }
}

impl UiState for CounterSnapshot {}
