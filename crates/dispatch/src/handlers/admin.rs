//! The `admin` handler: the leadership console.

use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};

use rampart_core::{BotConfig, Error, Result};
use rampart_query::{perms, undermine, users};
use rampart_sheets::client::{InputOption, MajorDim, ValueRender};
use rampart_sheets::{NewUmSystem, UmScanner};
use rampart_store::UmSheet;

use crate::command::AdminCmd;
use crate::dispatcher::Dispatcher;
use crate::event::ChatEvent;
use crate::handlers::info::um_trigger;
use crate::registry::registry;
use crate::scanner_names;
use crate::tbl;

/// Route an admin subcommand.
pub async fn run(
    ctx: &Dispatcher,
    event: &ChatEvent,
    cmd: AdminCmd,
    cfg: &BotConfig,
) -> Result<Vec<String>> {
    match cmd {
        AdminCmd::Add { rule_cmd } => add(ctx, event, rule_cmd),
        AdminCmd::Remove { rule_cmd } => remove(ctx, event, rule_cmd),
        AdminCmd::Cycle => cycle(ctx, cfg).await,
        AdminCmd::Deny => Ok(vec![format!(
            "Commands: **{}abled**",
            if ctx.toggle_deny() { "Dis" } else { "En" }
        )]),
        AdminCmd::Dump => dump(ctx),
        AdminCmd::Halt => {
            ctx.signal_shutdown();
            Ok(vec!["Shutdown scheduled. Will wait for jobs to finish or max 60s.".to_string()])
        }
        AdminCmd::Scan => {
            ctx.scanners().schedule_all(Duration::from_secs(1));
            Ok(vec!["All sheets scheduled for update.".to_string()])
        }
        AdminCmd::Top { limit } => top(ctx, limit),
        AdminCmd::AddUm { systems, reinforced, priority } => {
            add_um(ctx, event, &systems, reinforced, &priority, cfg).await
        }
        AdminCmd::RemoveUm { systems } => remove_um(ctx, event, &systems).await,
        AdminCmd::Cast { content } => {
            ctx.transport().broadcast(&content).await?;
            Ok(vec!["Broadcast completed.".to_string()])
        }
        AdminCmd::Info => info_cmd(event),
    }
}

fn check_rule_cmd(rule_cmd: &str) -> Result<()> {
    // Admin itself cannot be restricted, even by admins.
    if rule_cmd != "admin" && registry().contains_key(rule_cmd) {
        return Ok(());
    }
    let known: Vec<&str> =
        registry().keys().copied().filter(|name| *name != "admin").collect();
    Err(Error::InvalidCommandArgs(format!(
        "Rules require a command in the following set:\n\n{known:?}"
    )))
}

/// `admin add`: grant admins to mentions, or add one channel/role rule.
fn add(ctx: &Dispatcher, event: &ChatEvent, rule_cmd: Option<String>) -> Result<Vec<String>> {
    let reply = ctx.store().with_session(|session| {
        if rule_cmd.is_none() && !event.mentions.is_empty() {
            for member in &event.mentions {
                users::ensure_user(session, member.id, &member.display_name)?;
                perms::add_admin(session, member.id, Utc::now())?;
            }
            let names: Vec<&str> =
                event.mentions.iter().map(|m| m.display_name.as_str()).collect();
            return Ok(format!("Admins added:\n\n{}", names.join("\n")));
        }

        let rule_cmd = rule_cmd
            .as_deref()
            .ok_or_else(|| Error::InvalidCommandArgs("Mention users or name a command.".into()))?;
        check_rule_cmd(rule_cmd)?;

        if let Some(channel) = event.channel_mentions.first() {
            perms::add_channel_perm(session, rule_cmd, event.guild_id, *channel)?;
            Ok("Channel permission added.".to_string())
        } else if let Some(role) = event.role_mentions.first() {
            perms::add_role_perm(session, rule_cmd, event.guild_id, *role)?;
            Ok("Role permission added.".to_string())
        } else {
            Err(Error::InvalidCommandArgs("Mention a channel or a role for the rule.".into()))
        }
    })?;
    Ok(vec![reply])
}

/// `admin remove`: the mirror of `add`, seniority enforced for admins.
fn remove(ctx: &Dispatcher, event: &ChatEvent, rule_cmd: Option<String>) -> Result<Vec<String>> {
    let reply = ctx.store().with_session(|session| {
        if rule_cmd.is_none() && !event.mentions.is_empty() {
            for member in &event.mentions {
                perms::remove_admin(session, event.author.id, member.id)?;
            }
            let names: Vec<&str> =
                event.mentions.iter().map(|m| m.display_name.as_str()).collect();
            return Ok(format!("Admins removed:\n\n{}", names.join("\n")));
        }

        let rule_cmd = rule_cmd
            .as_deref()
            .ok_or_else(|| Error::InvalidCommandArgs("Mention users or name a command.".into()))?;
        check_rule_cmd(rule_cmd)?;

        if let Some(channel) = event.channel_mentions.first() {
            perms::remove_channel_perm(session, rule_cmd, event.guild_id, *channel)?;
            Ok("Channel permission removed.".to_string())
        } else if let Some(role) = event.role_mentions.first() {
            perms::remove_role_perm(session, rule_cmd, event.guild_id, *role)?;
            Ok("Role permission removed.".to_string())
        } else {
            Err(Error::InvalidCommandArgs("Mention a channel or a role for the rule.".into()))
        }
    })?;
    Ok(vec![reply])
}

/// Increment the trailing number of a tab name: `Cycle 309` -> `Cycle 310`.
pub(crate) fn number_increment(page: &str) -> Result<String> {
    let digits_at = page.rfind(|c: char| !c.is_ascii_digit()).map(|i| i + 1).unwrap_or(0);
    let (head, digits) = page.split_at(digits_at);
    let number: u64 = digits.parse().map_err(|_| {
        Error::Internal(format!("no numeric suffix to increment in tab {page:?}"))
    })?;
    Ok(format!("{head}{}", number + 1))
}

/// `admin cycle`: roll the campaign scanners to the next cycle tab.
///
/// All-or-nothing: if any tab fails to resolve, already-switched scanners
/// revert to their previous tab and the config is untouched.
async fn cycle(ctx: &Dispatcher, cfg: &BotConfig) -> Result<Vec<String>> {
    let mut next_cfg = cfg.clone();
    let mut rows = vec![vec!["Document".to_string(), "Active Page".to_string()]];
    let mut switched: Vec<(&str, String)> = Vec::new();

    let names = [scanner_names::FORT, scanner_names::UM_MAIN];
    for name in names {
        let scanner_cfg = next_cfg.scanners.get_mut(name).ok_or_else(|| {
            Error::InvalidCommandArgs(format!("no scanner configured under {name:?}"))
        })?;
        let old_page = scanner_cfg.page.clone();
        let new_page = number_increment(&old_page)?;

        let handle = ctx.scanners().get(name)?;
        if let Err(err) = handle.scanner().client().change_worksheet(&new_page).await {
            warn!(name, %err, "cycle tab switch failed, reverting");
            for (done_name, done_page) in &switched {
                let Ok(done) = ctx.scanners().get(done_name) else { continue };
                let _ = done.scanner().client().change_worksheet(done_page).await;
            }
            return Err(Error::Remote(format!(
                "The sheet {name} with tab {new_page} does not exist!"
            )));
        }

        let title =
            handle.scanner().client().title().await.unwrap_or_else(|_| name.to_string());
        rows.push(vec![title, new_page.clone()]);
        scanner_cfg.page = new_page;
        switched.push((name, old_page));
    }

    ctx.update_config(next_cfg)?;
    ctx.scanners().schedule_scan(scanner_names::FORT, Duration::from_secs(1));
    ctx.scanners().schedule_scan(scanner_names::UM_MAIN, Duration::from_secs(1));

    info!("cycle rolled over");
    let prefix = "Cycle incremented. Changed sheets scheduled for update.\n\n";
    Ok(vec![tbl::format_table(&rows, true, prefix)])
}

/// `admin dump`: shunt the cache into a server-side file for examination.
fn dump(ctx: &Dispatcher) -> Result<Vec<String>> {
    let snapshot = ctx.store().snapshot();
    let path = std::env::temp_dir().join("rampart_dbdump.json");
    let text = serde_json::to_string_pretty(&*snapshot)
        .map_err(|e| Error::Internal(format!("dump serialize: {e}")))?;
    std::fs::write(&path, text)?;
    Ok(vec![format!("Db has been dumped to server file: {}", path.display())])
}

/// `admin top`: the three leaderboards, recruits and members separated by
/// the recruit roster.
fn top(ctx: &Dispatcher, limit: usize) -> Result<Vec<String>> {
    let session = ctx.store().begin_session();
    let roster: Vec<String> = ctx
        .recruit_roster()
        .into_iter()
        .map(|recruit| recruit.name)
        .collect();

    let mut parts = Vec::new();
    let boards = [
        ("Top Merits", users::users_with_all_merits(&session)),
        ("Top Fort Merits", users::users_with_fort_merits(&session)),
        ("Top UM Merits", users::users_with_um_merits(&session)),
    ];

    for (title, board) in boards {
        let is_recruit = |name: &str| roster.iter().any(|r| r == name);
        let mut recruits: Vec<(String, i64)> = Vec::new();
        let mut members: Vec<(String, i64)> = Vec::new();
        for (user, merits) in &board {
            if recruits.len() == limit && members.len() == limit {
                break;
            }
            let bucket =
                if is_recruit(&user.pref_name) { &mut recruits } else { &mut members };
            if bucket.len() < limit {
                bucket.push((user.pref_name.clone(), *merits));
            }
        }
        recruits.resize(limit, (String::new(), 0));
        members.resize(limit, (String::new(), 0));

        let mut rows = vec![vec![
            format!("Top {limit} Recruits"),
            "Merits".to_string(),
            format!("Top {limit} Members"),
            "Merits".to_string(),
        ]];
        for (recruit, member) in recruits.iter().zip(members.iter()) {
            rows.push(vec![
                recruit.0.clone(),
                if recruit.0.is_empty() { String::new() } else { recruit.1.to_string() },
                member.0.clone(),
                if member.0.is_empty() { String::new() } else { member.1.to_string() },
            ]);
        }
        parts.push(tbl::format_table(&rows, true, &format!("__{title}__\n")));
    }

    Ok(vec![parts.join("\n\n")])
}

/// `admin addum`: insert systems into the undermine sheet by cloning the
/// template columns.
async fn add_um(
    ctx: &Dispatcher,
    event: &ChatEvent,
    systems: &[String],
    reinforced: i64,
    priority: &str,
    cfg: &BotConfig,
) -> Result<Vec<String>> {
    if !(0..=50).contains(&reinforced) {
        return Err(Error::InvalidCommandArgs("Wrong reinforcement value, min 0 max 50".into()));
    }

    let session = ctx.store().begin_session();
    let in_sheet: Vec<String> = undermine::um_get_systems(&session, UmSheet::Main, false)
        .into_iter()
        .map(|v| v.system.name)
        .collect();
    drop(session);

    let catalog = ctx.catalog()?.clone();
    let mut already = Vec::new();
    let mut new_systems = Vec::new();
    let mut detail_parts = Vec::new();
    for name in systems {
        if in_sheet.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            already.push(name.clone());
            continue;
        }
        let dist = catalog.distance(name, &cfg.power_hq)?;
        let trigger = um_trigger(dist, reinforced);

        detail_parts.push(tbl::format_table(
            &[
                vec!["System".to_string(), name.clone()],
                vec!["UM Trigger".to_string(), um_trigger(dist, 0).to_string()],
                vec![format!("UM Trigger {reinforced}%"), trigger.to_string()],
                vec!["Priority".to_string(), priority.to_string()],
            ],
            false,
            "",
        ));
        new_systems.push(NewUmSystem {
            name: name.clone(),
            power: String::new(),
            trigger,
            priority: priority.to_string(),
        });
    }

    if new_systems.is_empty() {
        return Ok(vec![
            "All systems asked are already in the sheet or are invalid".to_string()
        ]);
    }

    let handle = ctx.scanners().get(scanner_names::UM_MAIN)?;
    let block = handle
        .scanner()
        .client()
        .batch_get(&["D1:13".to_string()], MajorDim::Columns, ValueRender::Formula)
        .await?;
    let columns = block
        .into_iter()
        .next()
        .ok_or_else(|| Error::SheetParsing("empty um template block".into()))?;

    let updates = UmScanner::slide_templates(&columns, &new_systems)?;
    ctx.flush_sheet_with(scanner_names::UM_MAIN, &updates, event, InputOption::UserEntered)
        .await?;
    ctx.scanners().schedule_scan(scanner_names::UM_MAIN, Duration::from_secs(1));

    let mut reply = detail_parts.join("\n");
    reply.push_str("\n\nSystems added to the UM sheet.");
    if !already.is_empty() {
        reply.push_str(&format!(
            "\n\nThe following systems were ignored: {}",
            already.join(", ")
        ));
    }
    Ok(vec![reply])
}

/// `admin removeum`: remove systems from the undermine sheet, sliding the
/// later columns left.
async fn remove_um(
    ctx: &Dispatcher,
    event: &ChatEvent,
    systems: &[String],
) -> Result<Vec<String>> {
    let session = ctx.store().begin_session();
    let in_sheet: Vec<String> = undermine::um_get_systems(&session, UmSheet::Main, false)
        .into_iter()
        .map(|v| v.system.name)
        .collect();
    drop(session);

    let (found, unlisted): (Vec<&String>, Vec<&String>) = systems
        .iter()
        .partition(|name| in_sheet.iter().any(|s| s.eq_ignore_ascii_case(name.as_str())));
    if found.is_empty() {
        return Ok(vec!["All systems asked are not on the sheet".to_string()]);
    }

    let handle = ctx.scanners().get(scanner_names::UM_MAIN)?;
    for name in &found {
        let block = handle
            .scanner()
            .client()
            .batch_get(&["D1:13".to_string()], MajorDim::Columns, ValueRender::Formula)
            .await?;
        let columns = block
            .into_iter()
            .next()
            .ok_or_else(|| Error::SheetParsing("empty um template block".into()))?;
        let updates = UmScanner::remove_um_system(&columns, name.as_str())?;
        ctx.flush_sheet_with(scanner_names::UM_MAIN, &updates, event, InputOption::UserEntered)
            .await?;
    }
    ctx.scanners().schedule_scan(scanner_names::UM_MAIN, Duration::from_secs(1));

    let mut reply = "Systems removed from the UM sheet.".to_string();
    if !unlisted.is_empty() {
        let names: Vec<&str> = unlisted.iter().map(|s| s.as_str()).collect();
        reply.push_str(&format!("\n\nThe following systems were not found: {}", names.join(", ")));
    }
    Ok(vec![reply])
}

/// `admin info`: platform details of the mentioned users.
fn info_cmd(event: &ChatEvent) -> Result<Vec<String>> {
    let targets = if event.mentions.is_empty() {
        std::slice::from_ref(&event.author)
    } else {
        event.mentions.as_slice()
    };

    let mut parts = Vec::new();
    for member in targets {
        let roles: Vec<&str> = member.roles.iter().map(|r| r.name.as_str()).collect();
        let rows = vec![
            vec!["Name".to_string(), member.display_name.clone()],
            vec!["ID".to_string(), member.id.to_string()],
            vec!["Roles".to_string(), roles.join(", ")],
        ];
        parts.push(tbl::format_table(&rows, false, ""));
    }
    Ok(vec![parts.join("\n")])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_increment_bumps_suffix() {
        assert_eq!(number_increment("Cycle 309").unwrap(), "Cycle 310");
        assert_eq!(number_increment("309").unwrap(), "310");
        assert_eq!(number_increment("Sheet v2 99").unwrap(), "Sheet v2 100");
    }

    #[test]
    fn number_increment_requires_digits() {
        assert!(number_increment("Cycle").is_err());
        assert!(number_increment("").is_err());
    }

    #[test]
    fn rule_cmd_must_be_registered_and_not_admin() {
        assert!(check_rule_cmd("drop").is_ok());
        assert!(check_rule_cmd("admin").is_err());
        assert!(check_rule_cmd("bogus").is_err());
    }
}
