//! Unidirectional state flow primitives.
//!
//! ```text
//! action ──→ Intent ──→ Reducer ──→ UiState ──→ observers
//! ```
//!
//! State holders keep one immutable [`UiState`] value and replace it whole
//! on every [`Intent`]; nothing mutates a state value field by field.

/// Something that happened: a tap, a finished timer, a child's result.
pub trait Intent: Send + 'static {}

/// Snapshot of everything an observer needs to render.
pub trait UiState: Clone + PartialEq + Default + Send + Sync + 'static {}

/// The single place where state transitions are decided.
pub trait Reducer {
    type State: UiState;
    type Intent: Intent;

    /// Pure `(State, Intent) -> State`; derived fields are recomputed here.
    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State;
}
