//! The `fort` handler: show or mutate fortification state.

use rampart_core::{BotConfig, Error, Result};
use rampart_query::fort;
use rampart_sheets::payload;

use crate::command::FortArgs;
use crate::dispatcher::Dispatcher;
use crate::event::ChatEvent;
use crate::scanner_names;
use crate::tbl;

/// Run `fort` with its many moods.
pub async fn run(
    ctx: &Dispatcher,
    event: &ChatEvent,
    args: FortArgs,
    cfg: &BotConfig,
) -> Result<Vec<String>> {
    let defer = cfg.defer_missing;

    if args.summary {
        return summary(ctx);
    }

    if let Some(set) = &args.set {
        return set_status(ctx, event, &args, set, defer).await;
    }

    if let Some(left) = args.miss {
        return missing(ctx, left, defer);
    }

    if args.details {
        return details(ctx, &args, defer);
    }

    if args.order {
        return order(ctx, &args, defer);
    }

    if !args.systems.is_empty() {
        return search(ctx, &args.systems, defer);
    }

    if let Some(count) = args.next {
        let lines = ctx.store().with_session(|session| {
            let manual = if session.fort_orders.is_empty() { "" } else { " (Manual Order)" };
            let mut lines = vec![format!("__Next Targets{manual}__")];
            for view in fort::fort_get_next_targets(session, count, defer)? {
                lines.push(view.display(None));
            }
            Ok(lines)
        })?;
        return Ok(vec![lines.join("\n")]);
    }

    // Default: active targets, the next few, and the almost-done tail.
    let lines = ctx.store().with_session(|session| {
        let manual = if session.fort_orders.is_empty() { "" } else { " (Manual Order)" };
        let mut lines = vec![format!("__Active Targets{manual}__")];
        for view in fort::fort_get_targets(session, defer)? {
            lines.push(view.display(None));
        }

        lines.push("\n__Next Targets__".to_string());
        for view in fort::fort_get_next_targets(session, 3, defer)? {
            lines.push(view.display(None));
        }

        let deferred = fort::fort_get_deferred_targets(session, defer);
        if !deferred.is_empty() {
            lines.push("\n__Almost Done__".to_string());
            for view in deferred {
                lines.push(view.display(None));
            }
        }
        Ok(lines)
    })?;

    Ok(vec![lines.join("\n")])
}

fn summary(ctx: &Dispatcher) -> Result<Vec<String>> {
    let session = ctx.store().begin_session();
    let states = fort::fort_get_systems_by_state(&session);
    let total = fort::fort_get_systems(&session, true).len();

    let rows = vec![
        vec![
            "Cancelled".to_string(),
            "Fortified".to_string(),
            "Undermined".to_string(),
            "Skipped".to_string(),
            "Left".to_string(),
        ],
        vec![
            format!("{}/{total}", states.cancelled.len()),
            format!("{}/{total}", states.fortified.len()),
            format!("{}/{total}", states.undermined.len()),
            format!("{}/{total}", states.skipped.len()),
            format!("{}/{total}", states.left.len()),
        ],
    ];
    Ok(vec![tbl::format_table(&rows, true, "")])
}

async fn set_status(
    ctx: &Dispatcher,
    event: &ChatEvent,
    args: &FortArgs,
    set: &str,
    defer: i64,
) -> Result<Vec<String>> {
    if args.systems.len() != 1 {
        return Err(Error::InvalidCommandArgs("One system at a time with --set flag".into()));
    }

    let (display, payloads) = ctx.store().with_session(|session| {
        let view = fort::fort_find_system(session, &args.systems[0], true, defer)?;
        let system = session
            .fort_systems
            .get_mut(&view.system.id)
            .ok_or(Error::Internal("system vanished mid-set".into()))?;
        system.set_status(set)?;

        let updated = fort::fort_find_system(session, &view.system.name, true, defer)?;
        let payloads = payload::fort_system(
            &updated.system.sheet_col,
            updated.system.fort_status,
            updated.system.um_status,
        );
        Ok((updated.display(None), payloads))
    })?;

    ctx.flush_sheet(scanner_names::FORT, &payloads, event).await?;
    Ok(vec![display])
}

fn missing(ctx: &Dispatcher, left: i64, _defer: i64) -> Result<Vec<String>> {
    let session = ctx.store().begin_session();
    let mut lines = vec![format!("__Systems Missing {left} Supplies__")];
    for view in fort::fort_get_missing_targets(&session, left) {
        lines.push(view.display(Some(true)));
    }
    Ok(vec![lines.join("\n")])
}

fn details(ctx: &Dispatcher, args: &FortArgs, defer: i64) -> Result<Vec<String>> {
    if args.systems.len() != 1 {
        return Err(Error::InvalidCommandArgs("Exactly one system required.".into()));
    }

    let session = ctx.store().begin_session();
    let view = fort::fort_find_system(&session, &args.systems[0], true, defer)?;

    let miss = if view.missing() > 0 { format!(" ({} left)", view.missing()) } else { String::new() };
    let info_rows = vec![
        vec!["Completion".to_string(), format!("{}%{miss}", view.system.completion(view.merits))],
        vec!["CMDR Merits".to_string(), format!("{}/{}", view.merits, view.system.trigger)],
        vec![
            "Fort Status".to_string(),
            format!("{}/{}", view.system.fort_status, view.system.trigger),
        ],
        vec![
            "UM Status".to_string(),
            format!("{} ({:.2}%)", view.system.um_status, view.system.undermine * 100.0),
        ],
        vec!["Notes".to_string(), view.system.notes.clone()],
    ];

    let mut merit_rows = vec![vec!["CMDR Name".to_string(), "Merits".to_string()]];
    let mut merits: Vec<(i64, String)> = session
        .fort_drops
        .values()
        .filter(|d| d.system_id == view.system.id)
        .filter_map(|d| session.fort_users.get(&d.user_id).map(|u| (d.amount, u.name.clone())))
        .collect();
    merits.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    merit_rows.extend(merits.into_iter().map(|(amount, name)| vec![name, amount.to_string()]));

    let header = format!("**{}**\n", view.system.name);
    let text = format!(
        "{}\n{}",
        tbl::format_table(&info_rows, false, &header),
        tbl::format_table(&merit_rows, true, "")
    );
    Ok(vec![text])
}

fn order(ctx: &Dispatcher, args: &FortArgs, defer: i64) -> Result<Vec<String>> {
    let reply = ctx.store().with_session(|session| {
        session.fort_orders.clear();
        if args.systems.is_empty() {
            return Ok("Manual fort order unset. Resuming normal order.".to_string());
        }

        fort::fort_order_set(session, &args.systems, defer)?;
        Ok("Fort order has been manually set.\n\
            When all systems are completed the order returns to default.\n\
            To unset the override, set an empty list of systems."
            .to_string())
    })?;
    Ok(vec![reply])
}

fn search(ctx: &Dispatcher, systems: &[String], defer: i64) -> Result<Vec<String>> {
    let session = ctx.store().begin_session();
    let mut lines = vec!["__Search Results__".to_string()];
    for name in systems {
        lines.push(fort::fort_find_system(&session, name, true, defer)?.display(None));
    }
    Ok(vec![lines.join("\n")])
}
