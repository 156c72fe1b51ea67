//! Admin lifecycle and channel/role command gating.
//!
//! Gate procedure, checked before any handler runs:
//!
//! 1. If any channel rules exist for (command, guild), the invoking channel
//!    must be among them.
//! 2. If any role rules exist for (command, guild), the invoker must hold
//!    at least one listed role.
//! 3. Admin-gated commands additionally require an admin grant.

use chrono::{DateTime, Utc};
use rampart_core::{ChannelId, Error, GuildId, Result, RoleId, UserId};
use rampart_store::{AdminPerm, ChannelPerm, RolePerm, Session};

/// Fetch the admin grant for a user, or `NoMatch`.
pub fn get_admin(session: &Session, id: UserId) -> Result<AdminPerm> {
    session
        .admins
        .get(&id)
        .cloned()
        .ok_or(Error::NoMatch { needle: id.to_string(), kind: "Admin" })
}

/// Grant admin to a user, stamped `now`.
pub fn add_admin(session: &mut Session, id: UserId, now: DateTime<Utc>) -> Result<()> {
    session
        .insert_admin(AdminPerm { id, date: now })
        .map_err(|_| Error::InvalidCommandArgs(format!("User {id} is already an admin.")))
}

/// Remove an admin. Only a strictly senior admin (earlier grant) may do so.
pub fn remove_admin(session: &mut Session, remover: UserId, target: UserId) -> Result<()> {
    let remover_perm = get_admin(session, remover)?;
    let target_perm = get_admin(session, target)?;
    remover_perm.may_remove(&target_perm)?;
    session.admins.remove(&target);
    Ok(())
}

/// Add a channel rule; exact duplicates are a user error.
pub fn add_channel_perm(
    session: &mut Session,
    cmd: &str,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<()> {
    session
        .insert_channel_perm(ChannelPerm { cmd: cmd.to_string(), guild_id, channel_id })
        .map_err(|_| Error::InvalidCommandArgs("Channel permission already exists.".into()))
}

/// Remove a channel rule; removing a missing one is a user error.
pub fn remove_channel_perm(
    session: &mut Session,
    cmd: &str,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<()> {
    let perm = ChannelPerm { cmd: cmd.to_string(), guild_id, channel_id };
    if !session.channel_perms.remove(&perm) {
        return Err(Error::InvalidCommandArgs("Channel permission does not exist.".into()));
    }
    Ok(())
}

/// Add a role rule; exact duplicates are a user error.
pub fn add_role_perm(
    session: &mut Session,
    cmd: &str,
    guild_id: GuildId,
    role_id: RoleId,
) -> Result<()> {
    session
        .insert_role_perm(RolePerm { cmd: cmd.to_string(), guild_id, role_id })
        .map_err(|_| Error::InvalidCommandArgs("Role permission already exists.".into()))
}

/// Remove a role rule; removing a missing one is a user error.
pub fn remove_role_perm(
    session: &mut Session,
    cmd: &str,
    guild_id: GuildId,
    role_id: RoleId,
) -> Result<()> {
    let perm = RolePerm { cmd: cmd.to_string(), guild_id, role_id };
    if !session.role_perms.remove(&perm) {
        return Err(Error::InvalidCommandArgs("Role permission does not exist.".into()));
    }
    Ok(())
}

/// Enforce channel rules for a command.
pub fn check_channel_perms(
    tables: &rampart_store::Tables,
    cmd: &str,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<()> {
    let mut restricted = false;
    for perm in tables.channel_perms.iter() {
        if perm.cmd == cmd && perm.guild_id == guild_id {
            restricted = true;
            if perm.channel_id == channel_id {
                return Ok(());
            }
        }
    }

    if restricted {
        return Err(Error::InvalidPerms(format!(
            "The '{}' command is not permitted on this channel.",
            cmd.to_lowercase()
        )));
    }
    Ok(())
}

/// Enforce role rules for a command.
pub fn check_role_perms(
    tables: &rampart_store::Tables,
    cmd: &str,
    guild_id: GuildId,
    member_roles: &[RoleId],
) -> Result<()> {
    let mut restricted = false;
    for perm in tables.role_perms.iter() {
        if perm.cmd == cmd && perm.guild_id == guild_id {
            restricted = true;
            if member_roles.contains(&perm.role_id) {
                return Ok(());
            }
        }
    }

    if restricted {
        return Err(Error::InvalidPerms("You do not have the roles for the command.".into()));
    }
    Ok(())
}
