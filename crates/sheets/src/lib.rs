//! Sheet access for the Rampart bot: the remote documents are the system
//! of record, this crate keeps the cache convergent with them.
//!
//! - [`column`] — A1 column arithmetic (base-26 letters).
//! - [`cells`] — padded cell grids and tolerant numeric parsing.
//! - [`payload`] — batch-update payload builders shared by all scanners.
//! - [`client`] — the remote document capability and its retry wrapper.
//! - [`formula`] — the tokenizing A1-reference rewriter.
//! - [`scanner`] — the scanner trait, registry and debounced scheduling.
//! - Per-document parsers: [`fort`], [`undermine`], [`kos`], [`carriers`],
//!   [`recruits`].
//!
//! Failure semantics: a failed fetch or parse leaves the cache at its
//! previous state; a failed write after a committed cache mutation warns
//! the user to correct the sheet by hand (local wins over remote during
//! partial failure).

pub mod carriers;
pub mod cells;
pub mod client;
pub mod column;
pub mod formula;
pub mod fort;
pub mod kos;
pub mod payload;
pub mod recruits;
pub mod scanner;
pub mod undermine;

pub use carriers::CarrierScanner;
pub use cells::CellGrid;
pub use client::{RetryClient, RetryPolicy, SheetClient};
pub use column::{column_to_index, index_to_column, Column};
pub use fort::FortScanner;
pub use kos::KosScanner;
pub use payload::CellUpdate;
pub use recruits::{Recruit, RecruitScanner};
pub use scanner::{Scanner, ScannerHandle, ScannerRegistry};
pub use undermine::{NewUmSystem, UmScanner};
