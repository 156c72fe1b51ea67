//! Shared foundation for the Rampart bot.
//!
//! This crate holds the pieces every other layer depends on:
//!
//! - [`Error`] — the unified error type for all Rampart APIs.
//! - [`types`] — newtype identifiers for chat-platform and game entities.
//! - [`matching`] — whitespace-tolerant substring search and fuzzy lookup.
//! - [`config`] — the `rampart.toml` configuration model with hot-swap.
//!
//! Nothing here performs I/O except [`config`], which reads and writes the
//! configuration file.

pub mod config;
pub mod error;
pub mod matching;
pub mod types;

pub use config::{BotConfig, ScannerConfig, ScannerKind, SharedConfig};
pub use error::{Error, Result};
pub use types::{CarrierId, ChannelId, GuildId, MessageId, RoleId, UserId};
