//! # Rampart
//!
//! A chat-ops bot core for running a guild faction's fortification and
//! undermining campaigns. The campaign spreadsheets are the system of
//! record; Rampart keeps a structured cache convergent with them, selects
//! targets, enforces permissions, ingests the live game-event feed, and
//! supervises its own background tasks.
//!
//! # Architecture
//!
//! | Crate | Concern |
//! |-------|---------|
//! | `rampart-core` | errors, ids, matching, configuration |
//! | `rampart-store` | entities, tables, transactional sessions |
//! | `rampart-query` | target selection, drops/holds, permissions, tracking |
//! | `rampart-sheets` | column arithmetic, payloads, per-document scanners |
//! | `rampart-dispatch` | command grammar, permission gate, handlers |
//! | `rampart-feed` | event-feed ingestion, carrier summaries |
//! | `rampart-tasks` | task supervisor, job pool, config hot-reload |
//!
//! The chat transport, the remote document API, the streaming event
//! source, the commander lookup and the galaxy catalog are capabilities
//! consumed through traits ([`ChatTransport`], [`SheetClient`],
//! [`EventSource`], [`CmdrLookup`], [`SystemCatalog`]); this crate ships
//! no network adapters of its own.
//!
//! Data flow: chat event -> [`Dispatcher`] -> (read cache, validate,
//! mutate cache, queue payload) -> scanner flush -> remote document.
//! Independently: streaming feed -> ingester -> cache -> notification.
//! Independently: timer -> scanner snapshot -> full reconciliation.

pub use rampart_core::{
    BotConfig, CarrierId, ChannelId, Error, GuildId, MessageId, Result, RoleId, ScannerConfig,
    ScannerKind, SharedConfig, UserId,
};
pub use rampart_dispatch::{
    ChatAuthor, ChatEvent, ChatRole, ChatTransport, CmdrLookup, CmdrProfile, Command,
    Dispatcher, DispatcherBuilder,
};
pub use rampart_feed::{run_ingester, run_summary_loop, EventSource, Notifier, SchemaArchive};
pub use rampart_query::SystemCatalog;
pub use rampart_sheets::{
    CarrierScanner, FortScanner, KosScanner, RecruitScanner, RetryClient, Scanner,
    ScannerRegistry, SheetClient, UmScanner,
};
pub use rampart_store::{Session, Store, Tables};
pub use rampart_tasks::{watch_config, JobPool, TaskMonitor};

pub mod logging;
