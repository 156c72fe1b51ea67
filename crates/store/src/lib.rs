//! The structured cache backing the Rampart bot.
//!
//! The spreadsheets are the system of record; this crate is the relational
//! cache that must stay convergent with them. It holds the domain entities,
//! a typed table set with uniqueness enforcement, and a transactional
//! session abstraction:
//!
//! - [`entities`] — users, campaign systems, contributions, permissions,
//!   tracked carriers, feed snapshots, per-cycle globals.
//! - [`Tables`] — every table in one cloneable value, inserts enforce the
//!   unique keys the schema declares.
//! - [`Store`] / [`Session`] — snapshot sessions with optimistic commit;
//!   a commit that lost the race to another writer raises a retryable
//!   `SessionConflict`, dropping a session rolls it back.
//!
//! Rows parsed from a sheet are owned by the scanner that parsed them and
//! are dropped wholesale on rescan. Rows created by chat commands survive
//! rescans; [`Tables::empty_tables`] distinguishes the two.

pub mod entities;
pub mod session;
pub mod tables;

pub use entities::fort::{FortDrop, FortKind, FortOrder, FortSystem, FortUser};
pub use entities::global::Global;
pub use entities::kos::KosEntry;
pub use entities::permissions::{AdminPerm, ChannelPerm, RolePerm};
pub use entities::spy::{SpyBounty, SpyPrep, SpySystem, SpyTraffic, SpyVote};
pub use entities::tracking::{TrackSystem, TrackSystemCached, TrackedCarrier, TRACK_SYSTEM_SEP};
pub use entities::undermine::{UmHold, UmKind, UmSheet, UmSystem, UmUser};
pub use entities::user::ChatUser;
pub use session::{Session, Store};
pub use tables::Tables;
