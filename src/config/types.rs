use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::runloop::WorkerMode;

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run_loop: RunLoopConfig,
    #[serde(default)]
    pub counter: CounterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Worker placement for every run loop a screen creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLoopConfig {
    /// "task" (default) or "thread".
    #[serde(default)]
    pub worker: WorkerMode,
    /// OS thread name in thread mode (default: "serial-run-loop").
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Simulated work duration for a slow increment (default: 2000).
    #[serde(default = "default_work_delay_ms")]
    pub work_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Write logs to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_thread_name() -> String {
    "serial-run-loop".to_string()
}

fn default_work_delay_ms() -> u64 {
    2000
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            worker: WorkerMode::default(),
            thread_name: default_thread_name(),
        }
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            work_delay_ms: default_work_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

impl CounterConfig {
    pub fn work_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.work_delay_ms)
    }
}
