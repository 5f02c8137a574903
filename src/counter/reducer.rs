use crate::counter::intent::CounterIntent;
use crate::counter::state::CounterSnapshot;
use crate::mvi::Reducer;

pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterSnapshot;
    type Intent = CounterIntent;

    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State {
        match intent {
            CounterIntent::Increment { by } => {
                let count = state.count.saturating_add(by);
                CounterSnapshot {
                    count,
                    title: CounterSnapshot::title_for(count),
                    busy: state.busy,
                }
            }
            CounterIntent::WorkStarted => CounterSnapshot {
                busy: true,
                ..state
            },
            CounterIntent::WorkFinished => CounterSnapshot {
                busy: false,
                ..state
            },
        }
    }
}
