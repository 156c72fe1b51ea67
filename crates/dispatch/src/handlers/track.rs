//! The `track` handler: carrier tracking administration.

use chrono::Utc;
use std::time::Duration;

use rampart_core::{BotConfig, CarrierId, Error, Result};
use rampart_query::track;

use crate::command::TrackCmd;
use crate::dispatcher::Dispatcher;
use crate::event::ChatEvent;
use crate::scanner_names;
use crate::tbl;

/// How many covered systems a reply names before truncating.
const TRACK_LIMIT: usize = 20;

/// Route a track subcommand.
pub async fn run(
    ctx: &Dispatcher,
    event: &ChatEvent,
    cmd: TrackCmd,
    _cfg: &BotConfig,
) -> Result<Vec<String>> {
    match cmd {
        TrackCmd::Add { distance, systems } => add(ctx, distance, &systems),
        TrackCmd::Remove { systems } => remove(ctx, &systems),
        TrackCmd::Ids { add, remove, squad } => ids(ctx, &add, &remove, &squad),
        TrackCmd::Show => show(ctx),
        TrackCmd::Channel => channel(ctx, event),
        TrackCmd::Scan => {
            ctx.scanners().schedule_scan(scanner_names::CARRIERS, Duration::from_secs(1));
            Ok(vec!["Carrier registry scheduled for scan.".to_string()])
        }
    }
}

fn add(ctx: &Dispatcher, distance: i64, systems: &[String]) -> Result<Vec<String>> {
    let catalog = ctx.catalog()?.clone();
    let added = ctx
        .store()
        .with_session(|session| track::track_add_systems(session, &*catalog, systems, distance))?;

    let mut reply = format!(
        "__Systems Added To Tracking__\n\nSystems added: {}. First few follow ...\n\n",
        added.len()
    );
    reply.push_str(&added.iter().take(TRACK_LIMIT).cloned().collect::<Vec<_>>().join(", "));
    Ok(vec![reply])
}

fn remove(ctx: &Dispatcher, systems: &[String]) -> Result<Vec<String>> {
    let catalog = ctx.catalog()?.clone();
    let removed = ctx
        .store()
        .with_session(|session| track::track_remove_systems(session, &*catalog, systems))?;

    let mut reply = format!(
        "__Systems Removed From Tracking__\n\nSystems removed: {}. First few follow ...\n\n",
        removed.len()
    );
    reply.push_str(&removed.iter().take(TRACK_LIMIT).cloned().collect::<Vec<_>>().join(", "));
    Ok(vec![reply])
}

fn ids(ctx: &Dispatcher, add: &[String], remove: &[String], squad: &str) -> Result<Vec<String>> {
    if add.is_empty() && remove.is_empty() {
        // No mutation: show the registry table.
        let snapshot = ctx.store().snapshot();
        let mut rows =
            vec![vec!["ID".to_string(), "Squad".to_string(), "System".to_string(), "Last System".to_string()]];
        for carrier in snapshot.carriers.values() {
            rows.push(carrier.table_line().to_vec());
        }
        return Ok(vec![tbl::format_table(&rows, true, "__Tracked Carriers__\n")]);
    }

    let to_add = parse_ids(add)?;
    let to_remove = parse_ids(remove)?;

    let reply = ctx.store().with_session(|session| {
        if !to_add.is_empty() {
            let triples: Vec<(CarrierId, String, bool)> = to_add
                .iter()
                .map(|id| (id.clone(), squad.to_string(), true))
                .collect();
            track::track_ids_update(session, &triples, Utc::now());
        }
        if !to_remove.is_empty() {
            track::track_ids_remove(session, &to_remove);
        }
        Ok(match (to_add.is_empty(), to_remove.is_empty()) {
            (false, true) => "Carrier IDs added successfully to tracking.",
            (true, false) => "Carrier IDs removed successfully from tracking.",
            _ => "Carrier ID tracking updated.",
        }
        .to_string())
    })?;
    Ok(vec![reply])
}

fn parse_ids(raw: &[String]) -> Result<Vec<CarrierId>> {
    raw.iter().map(|r| CarrierId::new(r)).collect::<Result<Vec<_>>>().map_err(|_| {
        Error::InvalidCommandArgs("Carrier ids are 7 characters, like XXX-000.".into())
    })
}

fn show(ctx: &Dispatcher) -> Result<Vec<String>> {
    let snapshot = ctx.store().snapshot();
    let mut lines = vec!["__Tracked Systems__".to_string()];
    for system in snapshot.track_systems.values() {
        lines.push(system.to_string());
    }
    lines.push(format!("\nTotal systems under coverage: {}", snapshot.track_cached.len()));
    Ok(vec![lines.join("\n")])
}

/// Make the invoking channel the carrier summary channel, persisted.
fn channel(ctx: &Dispatcher, event: &ChatEvent) -> Result<Vec<String>> {
    let mut cfg = (*ctx.config_snapshot()).clone();
    cfg.carrier_channel = Some(event.channel_id);
    ctx.update_config(cfg)?;
    Ok(vec![format!("Channel set to: {}", event.channel_name)])
}
