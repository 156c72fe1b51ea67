//! Background machinery for the Rampart bot.
//!
//! - [`TaskMonitor`] — a registry of named long-running tasks with restart
//!   and a liveness table for the `dash` command.
//! - [`JobPool`] — a bounded pool for work that must not stall the event
//!   loop, with per-job timeouts and a doubling retry schedule.
//! - [`watch_config`] — the config hot-reload task: poll the file, parse,
//!   swap atomically.

pub mod monitor;
pub mod pool;
pub mod watcher;

pub use monitor::{TaskMonitor, TaskStatus};
pub use pool::{JobPolicy, JobPool};
pub use watcher::watch_config;
