//! Domain entities cached from the sheets and created by chat commands.
//!
//! Entities reference each other by id, never by ownership; the query layer
//! resolves references through a session and builds transient views at read
//! time. Kind discriminators (`FortKind`, `UmKind`) replace the original
//! schema's subclassing, with derived formulas branching on the kind.

pub mod fort;
pub mod global;
pub mod kos;
pub mod permissions;
pub mod spy;
pub mod tracking;
pub mod undermine;
pub mod user;
