//! The `drop` handler: record a fort contribution.

use rampart_core::{BotConfig, Result};
use rampart_query::{fort, users};
use rampart_sheets::payload;
use rampart_store::Store;
use tracing::info;

use crate::dispatcher::Dispatcher;
use crate::event::ChatEvent;
use crate::handlers::{acting_user, ensure_fort_user};
use crate::scanner_names;

/// Run `drop AMOUNT SYSTEM [--set F[:U]]`.
pub async fn run(
    ctx: &Dispatcher,
    event: &ChatEvent,
    amount: i64,
    system_name: &str,
    set: Option<&str>,
    cfg: &BotConfig,
) -> Result<Vec<String>> {
    let actor = acting_user(event)?;

    struct Outcome {
        payloads: Vec<payload::CellUpdate>,
        display: String,
        fortified: bool,
        display_name: String,
        system_id: i64,
        system_name: String,
    }

    let outcome = ctx.store().with_session(|session| {
        let user = users::ensure_user(session, actor.id, &actor.display_name)?;
        let (fort_user, mut payloads) = ensure_fort_user(session, &user)?;

        let target = fort::fort_find_system(session, system_name, true, cfg.defer_missing)?;
        let drop = fort::fort_add_drop(
            session,
            fort_user.id,
            target.system.id,
            amount,
            cfg.max_drop,
        )?;

        if let Some(set) = set {
            let system = session.fort_systems.get_mut(&target.system.id).ok_or(
                rampart_core::Error::Internal("target vanished mid-drop".into()),
            )?;
            system.set_status(set)?;
        }

        // Re-read for the reply and the sheet payloads.
        let updated = fort::fort_find_system(session, &target.system.name, true, cfg.defer_missing)?;
        payloads.extend(payload::fort_system(
            &updated.system.sheet_col,
            updated.system.fort_status,
            updated.system.um_status,
        ));
        payloads.extend(payload::fort_drop(
            &updated.system.sheet_col,
            fort_user.row,
            drop.amount,
        ));

        Ok(Outcome {
            payloads,
            display: updated.display(None),
            fortified: updated.is_fortified(),
            display_name: user.display_name.clone(),
            system_id: updated.system.id,
            system_name: updated.system.name.clone(),
        })
    })?;

    ctx.flush_sheet(scanner_names::FORT, &outcome.payloads, event).await?;
    info!(author = %outcome.display_name, amount, system = %outcome.system_name, "drop applied");

    let mut reply = outcome.display;
    if outcome.fortified {
        reply.push_str(&finished_flourish(
            ctx.store(),
            cfg.defer_missing,
            &outcome.display_name,
            outcome.system_id,
            &outcome.system_name,
        ));
    }
    Ok(vec![reply])
}

/// The celebration block when a target flips to fortified: the next
/// target plus everyone tied at the top contribution.
fn finished_flourish(
    store: &Store,
    defer_missing: i64,
    display_name: &str,
    system_id: i64,
    system_name: &str,
) -> String {
    let next_line = store
        .with_session(|session| {
            let targets = fort::fort_get_targets(session, defer_missing)?;
            Ok(targets.first().map(|t| t.display(None)))
        })
        .ok()
        .flatten();

    let mut text = match next_line {
        Some(display) => format!("\n\n__Next Fort Target__:\n{display}"),
        None => "\n\n Could not determine next fort target.".to_string(),
    };

    let mut lines =
        vec![format!("**{display_name}** Have a :cookie: for completing {system_name}")];

    let snapshot = store.snapshot();
    let mut merits: Vec<(i64, String)> = snapshot
        .fort_drops
        .values()
        .filter(|d| d.system_id == system_id && d.amount > 0)
        .filter_map(|d| {
            snapshot.fort_users.get(&d.user_id).map(|u| (d.amount, u.name.clone()))
        })
        .collect();
    merits.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    match merits.first().map(|(top, _)| *top) {
        Some(top) => {
            lines.push("Bonus for highest contribution:".to_string());
            for (amount, name) in merits.iter().take_while(|(amount, _)| *amount == top) {
                lines.push(format!("    :cookie: for **{name}** with {amount} supplies"));
            }
        }
        None => {
            lines.push(
                "No found contributions. Heres a :cookie: for the unknown commanders."
                    .to_string(),
            );
        }
    }

    text.push_str("\n\n");
    text.push_str(&lines.join("\n"));
    text
}
