//! High-level queries and mutations over the cache.
//!
//! Everything here is a pure function over a [`Session`]: handlers begin a
//! session, call through this crate, and commit. The modules mirror the
//! campaign domains:
//!
//! - [`users`] — chat-user lifecycle, sheet enrollment, merit leaderboards.
//! - [`fort`] — fortification target selection and drop bookkeeping.
//! - [`undermine`] — undermining targets, holds and redemption.
//! - [`perms`] — admin lifecycle and channel/role command gating.
//! - [`track`] — carrier tracking sets and id registry.
//! - [`kos`] — kill-on-sight lookups.
//! - [`global`] — per-cycle globals and feed snapshot upserts.
//!
//! The external galaxy catalog is consumed through [`SystemCatalog`]; the
//! bot never loads it itself.
//!
//! [`Session`]: rampart_store::Session

pub mod catalog;
pub mod fort;
pub mod global;
pub mod kos;
pub mod perms;
pub mod track;
pub mod undermine;
pub mod users;

pub use catalog::SystemCatalog;
pub use fort::{FortStates, FortView};
pub use undermine::UmView;
