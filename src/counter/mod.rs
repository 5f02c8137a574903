mod intent;
mod reducer;
mod state;
mod store;

pub use intent::CounterIntent;
pub use reducer::CounterReducer;
pub use state::CounterSnapshot;
pub use store::{CounterState, WorkOutcome, DEFAULT_WORK_DELAY};
