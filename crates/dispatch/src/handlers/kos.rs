//! The `kos` handler: the kill-on-sight list.

use std::time::Duration;

use rampart_core::{BotConfig, Result};
use rampart_query::kos;
use rampart_sheets::KosScanner;
use rampart_store::KosEntry;

use crate::command::KosCmd;
use crate::dispatcher::Dispatcher;
use crate::event::ChatEvent;
use crate::scanner_names;
use crate::tbl;

/// Route a kos subcommand.
pub async fn run(
    ctx: &Dispatcher,
    event: &ChatEvent,
    cmd: KosCmd,
    _cfg: &BotConfig,
) -> Result<Vec<String>> {
    match cmd {
        KosCmd::Search { term } => search(ctx, &term),
        KosCmd::Pull => {
            ctx.scanners().schedule_scan(scanner_names::KOS, Duration::from_secs(1));
            Ok(vec!["KOS sheet scheduled for pull.".to_string()])
        }
        KosCmd::Report { cmdr, squad, reason, friendly } => {
            report(ctx, event, &cmdr, &squad, &reason, friendly).await
        }
    }
}

fn search(ctx: &Dispatcher, term: &str) -> Result<Vec<String>> {
    let session = ctx.store().begin_session();
    let hits = kos::kos_search_cmdr(&session, term);

    let mut rows = vec![vec![
        "CMDR".to_string(),
        "Squad".to_string(),
        "Reason".to_string(),
        "Verdict".to_string(),
    ]];
    for entry in &hits {
        rows.push(vec![
            entry.cmdr.clone(),
            entry.squad.clone(),
            entry.reason.clone(),
            entry.verdict().to_string(),
        ]);
    }

    let prefix = format!("__KOS Matches For \"{term}\"__ ({} found)\n", hits.len());
    Ok(vec![tbl::format_table(&rows, true, &prefix)])
}

/// Add the report to the cache, append it to the sheet, and schedule a
/// confirming rescan.
///
/// Without an explicit `--friendly` or `--reason`, the reporter is asked
/// interactively which verdict they intend.
async fn report(
    ctx: &Dispatcher,
    event: &ChatEvent,
    cmdr: &str,
    squad: &str,
    reason: &str,
    mut friendly: bool,
) -> Result<Vec<String>> {
    if !friendly && reason.is_empty() {
        let choice = ctx
            .prompts()
            .ask_choice(
                ctx.transport(),
                event.channel_id,
                event.author.id,
                &format!("How should CMDR {cmdr} be listed?"),
                &["KILL", "FRIENDLY"],
            )
            .await?;
        friendly = choice == 1;
    }

    let row = ctx.store().with_session(|session| {
        kos::kos_add(
            session,
            KosEntry {
                id: 0,
                cmdr: cmdr.to_string(),
                squad: squad.to_string(),
                reason: reason.to_string(),
                is_friendly: friendly,
            },
        )?;
        // Entries start at sheet row 2 under the header.
        Ok(session.kos.len() + 1)
    })?;

    let payloads = KosScanner::report_payload(row, cmdr, squad, reason, friendly);
    ctx.flush_sheet(scanner_names::KOS, &payloads, event).await?;
    ctx.scanners().schedule_scan(scanner_names::KOS, Duration::from_secs(5));

    let verdict = if friendly { "FRIENDLY" } else { "KILL" };
    Ok(vec![format!("CMDR {cmdr} reported as {verdict}. Leadership will review.")])
}
