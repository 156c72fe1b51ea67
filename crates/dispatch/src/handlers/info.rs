//! Informational handlers: `time`, `status`, `help`, `dash`, `dist`,
//! `whois`, `feedback`.

use chrono::{Datelike, Duration as ChronoDuration, Utc, Weekday};

use rampart_core::{BotConfig, Error, Result};

use crate::dispatcher::Dispatcher;
use crate::event::ChatEvent;
use crate::registry::registry;
use crate::tbl;

/// Approximate the default undermine trigger from HQ distance.
pub(crate) fn um_trigger(dist_ly: f64, reinforced: i64) -> i64 {
    let normal = 5000.0 + 2_750_000.0 / dist_ly.powf(1.5);
    (normal.round() * (1.0 + reinforced as f64 / 100.0)).round() as i64
}

/// Approximate the default fortification trigger from HQ distance.
pub(crate) fn fort_trigger(dist_ly: f64) -> i64 {
    (5000.0 - 5.0 * dist_ly + 0.4 * dist_ly * dist_ly).round() as i64
}

/// The next weekly tick: Thursday 07:00 UTC.
pub(crate) fn next_weekly_tick(now: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
    let mut tick = now
        .date_naive()
        .and_hms_opt(7, 0, 0)
        .expect("07:00 is a valid time")
        .and_utc();
    while tick <= now || tick.weekday() != Weekday::Thu {
        tick += ChronoDuration::days(1);
    }
    tick
}

/// `time`: game time and the time remaining to the weekly tick.
pub fn time() -> Result<Vec<String>> {
    let now = Utc::now();
    let tick = next_weekly_tick(now);
    let left = tick - now;

    let lines = [
        format!("Game Time: **{}**", now.format("%H:%M:%S")),
        format!(
            "Time to Cycle Tick: **{}h {}m** (at {})",
            left.num_hours(),
            left.num_minutes() % 60,
            tick.format("%A %H:%M UTC")
        ),
    ];
    Ok(vec![lines.join("\n")])
}

/// `status`: version, uptime and task health in one table.
pub fn status(ctx: &Dispatcher) -> Result<Vec<String>> {
    let uptime = Utc::now() - ctx.started_at();
    let tasks = ctx.monitor().status_table();
    let running =
        tasks.iter().skip(1).filter(|row| row[1].starts_with("Running")).count();

    let rows = vec![
        vec!["Version".to_string(), env!("CARGO_PKG_VERSION").to_string()],
        vec![
            "Uptime".to_string(),
            format!("{}d {}h {}m", uptime.num_days(), uptime.num_hours() % 24, uptime.num_minutes() % 60),
        ],
        vec![
            "Tasks".to_string(),
            format!("{running}/{} running", tasks.len().saturating_sub(1)),
        ],
    ];
    Ok(vec![tbl::format_table(&rows, false, "__Rampart__\n")])
}

/// `help`: the command overview from the registry.
pub fn help(cfg: &BotConfig) -> Result<Vec<String>> {
    let prefix = &cfg.prefix;
    let overview = format!(
        "Here is an overview of my commands.\n\nFor more information do: `{prefix}Command -h`\n       \
         Example: `{prefix}drop -h`\n\n"
    );

    let mut rows = vec![vec!["Command".to_string(), "Effect".to_string()]];
    for spec in registry().values() {
        rows.push(vec![format!("{prefix}{}", spec.name), spec.summary.to_string()]);
    }
    Ok(vec![tbl::format_table(&rows, true, &overview)])
}

/// `dash`: the supervisor's liveness table.
pub fn dash(ctx: &Dispatcher) -> Result<Vec<String>> {
    let rows: Vec<Vec<String>> =
        ctx.monitor().status_table().into_iter().map(|r| r.to_vec()).collect();
    Ok(vec![tbl::format_table(&rows, true, "__Background Tasks__\n")])
}

/// `dist`: distances from the first named system to the rest.
///
/// Catalog math runs through the job pool so a slow catalog cannot stall
/// the event loop.
pub async fn dist(ctx: &Dispatcher, systems: &[String]) -> Result<Vec<String>> {
    let catalog = ctx.catalog()?.clone();
    let (origin, rest) = systems
        .split_first()
        .ok_or_else(|| Error::InvalidCommandArgs("dist needs systems".into()))?;

    let mut entries = ctx
        .pool()
        .run("dist", || {
            let catalog = catalog.clone();
            async move {
                let mut entries = Vec::new();
                for target in rest {
                    let dist = catalog.distance(origin, target)?;
                    entries.push((target.clone(), dist));
                }
                Ok(entries)
            }
        })
        .await?;
    entries.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut rows = vec![vec!["System".to_string(), "Distance".to_string()]];
    for (name, dist) in entries {
        rows.push(vec![name, format!("{dist:.1} ly")]);
    }
    Ok(vec![tbl::format_table(&rows, true, &format!("__Distances from {origin}__\n"))])
}

/// `trigger`: predicted fort and undermine triggers relative to our HQ.
pub async fn trigger(ctx: &Dispatcher, systems: &[String], cfg: &BotConfig) -> Result<Vec<String>> {
    let catalog = ctx.catalog()?.clone();
    let mut parts = vec![format!(
        "__Predicted Triggers__\nPower HQ: {}\n",
        cfg.power_hq
    )];

    for name in systems {
        let dist = catalog.distance(&cfg.power_hq, name)?;
        let rows = vec![
            vec!["System".to_string(), name.clone()],
            vec!["Distance".to_string(), format!("{dist:.1}")],
            vec!["Fort Trigger".to_string(), fort_trigger(dist).to_string()],
            vec!["UM Trigger".to_string(), um_trigger(dist, 0).to_string()],
        ];
        parts.push(tbl::format_table(&rows, false, ""));
    }
    Ok(vec![parts.join("\n")])
}

/// `whois`: the external commander lookup.
pub async fn whois(ctx: &Dispatcher, name: &str) -> Result<Vec<String>> {
    let lookup = ctx.cmdr_lookup()?.clone();
    match lookup.lookup(name).await? {
        Some(profile) => {
            let rows = vec![
                vec!["Name".to_string(), profile.name],
                vec!["Squad".to_string(), profile.squad],
                vec!["Role".to_string(), profile.role],
                vec!["Profile".to_string(), profile.url],
            ];
            Ok(vec![tbl::format_table(&rows, false, "")])
        }
        None => Ok(vec![format!("No commander found matching \"{name}\".")]),
    }
}

/// `feedback`: forward a report to the configured feedback channel.
pub async fn feedback(
    ctx: &Dispatcher,
    event: &ChatEvent,
    content: &str,
    cfg: &BotConfig,
) -> Result<Vec<String>> {
    let Some(channel) = cfg.feedback_channel else {
        return Err(Error::InvalidCommandArgs(
            "No feedback channel is configured. Tell leadership directly.".into(),
        ));
    };

    let rows = vec![
        vec!["Guild".to_string(), event.guild_name.clone()],
        vec!["Channel".to_string(), event.channel_name.clone()],
        vec!["Author".to_string(), event.author.display_name.clone()],
        vec!["Date (UTC)".to_string(), event.timestamp.to_rfc3339()],
    ];
    let report = format!(
        "{}\n__Bug Report Follows__\n\n{content}",
        tbl::format_table(&rows, false, "")
    );

    ctx.transport().send(channel, &report).await?;
    Ok(vec!["Thanks for the report.".to_string()])
}
