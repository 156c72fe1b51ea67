//! Chat-user lifecycle, sheet enrollment and merit leaderboards.

use rampart_core::{Error, Result, UserId};
use rampart_store::{ChatUser, FortUser, Session, UmSheet, UmUser};

/// First contributor row on the fort sheet.
pub const FORT_USER_START_ROW: usize = 11;
/// First contributor row on the undermine sheets.
pub const UM_USER_START_ROW: usize = 14;

/// Fetch the chat user with `id`.
pub fn get_user(session: &Session, id: UserId) -> Result<ChatUser> {
    session
        .users
        .get(&id)
        .cloned()
        .ok_or(Error::NoMatch { needle: id.to_string(), kind: "ChatUser" })
}

/// Ensure a chat user exists, creating one on first contact and refreshing
/// the display name otherwise.
pub fn ensure_user(session: &mut Session, id: UserId, display_name: &str) -> Result<ChatUser> {
    if let Some(user) = session.users.get_mut(&id) {
        user.display_name = display_name.to_string();
        return Ok(user.clone());
    }

    let user = ChatUser::new(id, display_name);
    session.insert_user(user.clone())?;
    Ok(user)
}

/// Check that `new_name` is free to take as a preferred name.
pub fn check_pref_name(session: &Session, new_name: &str) -> Result<()> {
    if let Some(existing) = session.pref_name_taken(new_name, None) {
        return Err(Error::InvalidCommandArgs(format!(
            "Sheet name {}, taken by {}.\n\nPlease choose another.",
            new_name, existing.display_name
        )));
    }
    Ok(())
}

/// Rename a user on the sheets; contributor rows follow the new name.
pub fn set_pref_name(session: &mut Session, id: UserId, new_name: &str) -> Result<()> {
    check_pref_name(session, new_name)?;

    let old_name = get_user(session, id)?.pref_name;
    if let Some(user) = session.users.get_mut(&id) {
        user.pref_name = new_name.to_string();
    }
    for fort_user in session.fort_users.values_mut() {
        if fort_user.name == old_name {
            fort_user.name = new_name.to_string();
        }
    }
    for um_user in session.um_users.values_mut() {
        if um_user.name == old_name {
            um_user.name = new_name.to_string();
        }
    }
    Ok(())
}

/// Update a user's battle-cry; contributor rows follow.
pub fn set_pref_cry(session: &mut Session, id: UserId, new_cry: &str) -> Result<()> {
    let name = get_user(session, id)?.pref_name;
    if let Some(user) = session.users.get_mut(&id) {
        user.pref_cry = new_cry.to_string();
    }
    for fort_user in session.fort_users.values_mut() {
        if fort_user.name == name {
            fort_user.cry = new_cry.to_string();
        }
    }
    for um_user in session.um_users.values_mut() {
        if um_user.name == name {
            um_user.cry = new_cry.to_string();
        }
    }
    Ok(())
}

/// The next free 1-based row given the rows already occupied.
///
/// With no rows at all, enrollment starts at `start_row`; otherwise the
/// smallest gap inside (or just past) the occupied span is used.
pub fn next_sheet_row(mut rows: Vec<usize>, start_row: usize) -> usize {
    if rows.is_empty() {
        return start_row;
    }
    rows.sort_unstable();
    let first = rows[0];
    let last = rows[rows.len() - 1];
    (first..=last + 1).find(|candidate| !rows.contains(candidate)).unwrap_or(last + 1)
}

/// The fort contributor row for a chat user, if enrolled.
pub fn fort_user_for(session: &Session, user: &ChatUser) -> Option<FortUser> {
    session.fort_users.values().find(|u| u.name == user.pref_name).cloned()
}

/// Enroll a chat user on the fort sheet at the next free row.
pub fn add_fort_user(session: &mut Session, user: &ChatUser) -> Result<FortUser> {
    let rows = session.fort_users.values().map(|u| u.row).collect();
    let row = next_sheet_row(rows, FORT_USER_START_ROW);
    let fort_user =
        FortUser { id: 0, name: user.pref_name.clone(), row, cry: user.pref_cry.clone() };
    let id = session.insert_fort_user(fort_user.clone())?;
    Ok(FortUser { id, ..fort_user })
}

/// The undermine contributor row for a chat user on `sheet`, if enrolled.
pub fn um_user_for(session: &Session, user: &ChatUser, sheet: UmSheet) -> Option<UmUser> {
    session
        .um_users
        .values()
        .find(|u| u.sheet == sheet && u.name == user.pref_name)
        .cloned()
}

/// Enroll a chat user on an undermine sheet at the next free row.
pub fn add_um_user(session: &mut Session, user: &ChatUser, sheet: UmSheet) -> Result<UmUser> {
    let rows = session
        .um_users
        .values()
        .filter(|u| u.sheet == sheet)
        .map(|u| u.row)
        .collect();
    let row = next_sheet_row(rows, UM_USER_START_ROW);
    let um_user = UmUser {
        id: 0,
        sheet,
        name: user.pref_name.clone(),
        row,
        cry: user.pref_cry.clone(),
    };
    let id = session.insert_um_user(um_user.clone())?;
    Ok(UmUser { id, ..um_user })
}

fn leaderboard(
    session: &Session,
    merits_for: impl Fn(&Session, &ChatUser) -> i64,
) -> Vec<(ChatUser, i64)> {
    let mut rows: Vec<(ChatUser, i64)> = session
        .users
        .values()
        .map(|user| {
            let merits = merits_for(session, user);
            (user.clone(), merits)
        })
        .collect();

    // Merits descending, then name ascending for a stable output.
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.pref_name.cmp(&b.0.pref_name)));
    rows
}

fn fort_merits_of(session: &Session, user: &ChatUser) -> i64 {
    session
        .fort_users
        .values()
        .filter(|f| f.name == user.pref_name)
        .map(|f| session.fort_user_dropped(f.id))
        .sum()
}

fn um_merits_of(session: &Session, user: &ChatUser) -> i64 {
    session
        .um_users
        .values()
        .filter(|u| u.name == user.pref_name)
        .map(|u| {
            let (held, redeemed) = session.um_user_totals(u.id);
            held + redeemed
        })
        .sum()
}

/// Users ranked by fort merits this cycle.
pub fn users_with_fort_merits(session: &Session) -> Vec<(ChatUser, i64)> {
    leaderboard(session, fort_merits_of)
}

/// Users ranked by undermining merits this cycle.
pub fn users_with_um_merits(session: &Session) -> Vec<(ChatUser, i64)> {
    leaderboard(session, um_merits_of)
}

/// Users ranked by combined merits this cycle.
pub fn users_with_all_merits(session: &Session) -> Vec<(ChatUser, i64)> {
    leaderboard(session, |s, u| fort_merits_of(s, u) + um_merits_of(s, u))
}

/// Assign 1-based ranks to an ordered leaderboard; ties share a rank.
pub fn rank_rows(rows: &[(ChatUser, i64)]) -> Vec<(usize, String, i64)> {
    let mut out = Vec::with_capacity(rows.len());
    let mut rank = 0;
    let mut last_merits = None;
    for (ind, (user, merits)) in rows.iter().enumerate() {
        if last_merits != Some(*merits) {
            rank = ind + 1;
            last_merits = Some(*merits);
        }
        out.push((rank, user.pref_name.clone(), *merits));
    }
    out
}
