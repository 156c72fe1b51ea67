//! The streaming game-event ingestion pipeline.
//!
//! A long-running task subscribes to the journal feed, filters messages by
//! schema, correlates fleet-carrier movements against the tracked-system
//! coverage, persists observations, and archives every message verbatim.
//! A companion task posts periodic carrier summaries to the configured
//! channel. Both observe a cancellation signal and drain cleanly.

pub mod archive;
pub mod ingest;
pub mod message;
pub mod summary;

pub use archive::SchemaArchive;
pub use ingest::{run_ingester, EventSource};
pub use message::{Envelope, Header, Journal};
pub use summary::{run_summary_loop, Notifier};
