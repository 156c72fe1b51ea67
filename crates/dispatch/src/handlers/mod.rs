//! Command handlers, one module per command family.
//!
//! Handlers receive the parsed arguments, the originating event and the
//! dispatcher; they mutate the cache through sessions, queue sheet
//! payloads, and return the replies to post. Typed errors propagate to
//! the dispatcher's outer frame.

pub mod admin;
pub mod drop;
pub mod fort;
pub mod hold;
pub mod info;
pub mod kos;
pub mod track;
pub mod um;
pub mod user;

use rampart_core::{Error, Result};
use rampart_query::users;
use rampart_sheets::payload;
use rampart_store::{ChatUser, FortUser, Session, UmSheet, UmUser};

use crate::event::{ChatAuthor, ChatEvent};

/// Resolve the acting user: a single mention delegates authority, more
/// than one is refused.
pub(crate) fn acting_user(event: &ChatEvent) -> Result<&ChatAuthor> {
    match event.mentions.len() {
        0 => Ok(&event.author),
        1 => Ok(&event.mentions[0]),
        _ => Err(Error::InvalidCommandArgs(
            "Mention at most one user to act on their behalf.".into(),
        )),
    }
}

/// Ensure the acting user has a fort contributor row, enrolling them at
/// the next free row when missing.
///
/// Returns the row and the sheet payloads the enrollment queued.
pub(crate) fn ensure_fort_user(
    session: &mut Session,
    user: &ChatUser,
) -> Result<(FortUser, Vec<payload::CellUpdate>)> {
    if let Some(existing) = users::fort_user_for(session, user) {
        return Ok((existing, Vec::new()));
    }
    let enrolled = users::add_fort_user(session, user)?;
    let payloads = payload::user_row(enrolled.row, &enrolled.cry, &enrolled.name);
    Ok((enrolled, payloads))
}

/// Ensure the acting user has an undermine contributor row on `sheet`.
pub(crate) fn ensure_um_user(
    session: &mut Session,
    user: &ChatUser,
    sheet: UmSheet,
) -> Result<(UmUser, Vec<payload::CellUpdate>)> {
    if let Some(existing) = users::um_user_for(session, user, sheet) {
        return Ok((existing, Vec::new()));
    }
    let enrolled = users::add_um_user(session, user, sheet)?;
    let payloads = payload::user_row(enrolled.row, &enrolled.cry, &enrolled.name);
    Ok((enrolled, payloads))
}
