mod loader;
mod types;

pub use loader::{ConfigError, MAX_WORK_DELAY_MS};
pub use types::{Config, CounterConfig, LoggingConfig, RunLoopConfig};
