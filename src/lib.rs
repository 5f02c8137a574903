//! Serialized asynchronous run loop and the reactive counter it drives.
//!
//! - [`runloop::SerialRunLoop`] runs submitted actions one at a time, in
//!   submission order, on a single worker.
//! - [`counter::CounterState`] holds a count, its derived title and a busy
//!   flag, published to synchronous observers.
//! - [`handoff`] carries one value from a child unit of work back into a
//!   waiting action.
//! - [`screen`] wires the three together the way a UI layer would.

pub mod cancel;
pub mod config;
pub mod counter;
pub mod handoff;
pub mod logging;
pub mod mvi;
pub mod observe;
pub mod runloop;
pub mod screen;
