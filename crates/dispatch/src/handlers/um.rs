//! The `um` handler: show or mutate undermining state.

use rampart_core::{BotConfig, Error, Result};
use rampart_query::undermine;
use rampart_sheets::payload;
use rampart_store::UmSheet;

use crate::command::UmArgs;
use crate::dispatcher::Dispatcher;
use crate::event::ChatEvent;
use crate::scanner_names;
use crate::tbl;

/// Run `um`.
pub async fn run(
    ctx: &Dispatcher,
    event: &ChatEvent,
    args: UmArgs,
    _cfg: &BotConfig,
) -> Result<Vec<String>> {
    let sheet = UmSheet::Main;

    if (args.set.is_some() || args.offset.is_some() || args.priority.is_some())
        && args.systems.is_empty()
    {
        return Err(Error::InvalidCommandArgs(
            "You forgot to specify a system to update.".into(),
        ));
    }

    if args.list {
        let session = ctx.store().begin_session();
        let rows = undermine::um_all_held_merits(&session, sheet);
        return Ok(vec![tbl::format_table(&rows, true, "**Held Merits**\n\n")]);
    }

    if !args.systems.is_empty() {
        let name = args.systems.join(" ");
        let mutating = args.set.is_some() || args.offset.is_some() || args.priority.is_some();

        let (display, payloads, priority_payloads) = ctx.store().with_session(|session| {
            let view = undermine::um_find_system(session, sheet, &name)?;
            let mut payloads = Vec::new();
            let mut priority_payloads = Vec::new();

            if mutating {
                let system = session
                    .um_systems
                    .get_mut(&view.system.id)
                    .ok_or(Error::Internal("system vanished mid-um".into()))?;
                if let Some(offset) = args.offset {
                    system.map_offset = offset;
                }
                if let Some(set) = &args.set {
                    system.set_status(set)?;
                }
                if let Some(priority) = &args.priority {
                    system.priority = priority.clone();
                    priority_payloads.extend(payload::um_priority(&system.sheet_col, priority)?);
                }
                payloads.extend(payload::um_system(
                    &system.sheet_col,
                    system.progress_us,
                    system.progress_them,
                    system.map_offset,
                ));
            }

            let updated = undermine::um_find_system(session, sheet, &view.system.name)?;
            Ok((updated.display(), payloads, priority_payloads))
        })?;

        if mutating {
            ctx.flush_sheet(scanner_names::UM_MAIN, &payloads, event).await?;
            ctx.flush_sheet(scanner_names::UM_MAIN, &priority_payloads, event).await?;
        }
        return Ok(vec![display]);
    }

    // Default: all active undermining targets.
    let session = ctx.store().begin_session();
    let systems = undermine::um_get_systems(&session, sheet, true);
    let mut parts = vec!["__Current UM Targets__".to_string()];
    for view in systems {
        parts.push(view.display());
    }
    Ok(vec![parts.join("\n\n")])
}
