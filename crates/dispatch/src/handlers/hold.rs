//! The `hold` handler: declare, reset and redeem undermining merits.

use rampart_core::{BotConfig, Error, Result};
use rampart_query::{undermine, users};
use rampart_sheets::payload;
use rampart_store::{Session, UmHold, UmSheet};

use crate::command::HoldArgs;
use crate::dispatcher::Dispatcher;
use crate::event::ChatEvent;
use crate::handlers::{acting_user, ensure_um_user};
use crate::scanner_names;
use crate::tbl;

/// Run `hold` in one of its modes.
pub async fn run(
    ctx: &Dispatcher,
    event: &ChatEvent,
    args: HoldArgs,
    _cfg: &BotConfig,
) -> Result<Vec<String>> {
    let actor = acting_user(event)?;
    let sheet = UmSheet::Main;

    struct Outcome {
        payloads: Vec<payload::CellUpdate>,
        reply: String,
    }

    let outcome = ctx.store().with_session(|session| {
        let user = users::ensure_user(session, actor.id, &actor.display_name)?;
        let (um_user, mut payloads) = ensure_um_user(session, &user, sheet)?;

        let (touched, reply): (Vec<UmHold>, String) = if args.died {
            let touched = undermine::um_reset_held(session, um_user.id);
            (touched, "Sorry you died :(. Held merits reset.".to_string())
        } else if args.redeem {
            let (touched, total) = undermine::um_redeem_merits(session, um_user.id);
            let reply = redeem_summary(session, um_user.id, total);
            (touched, reply)
        } else if let Some(names) = &args.redeem_systems {
            let (touched, total) = undermine::um_redeem_systems(session, um_user.id, names)?;
            let reply = redeem_summary(session, um_user.id, total);
            (touched, reply)
        } else {
            let Some(system_name) = &args.system else {
                return Err(Error::InvalidCommandArgs(
                    "You forgot to specify a system to update.".into(),
                ));
            };
            let amount = args.amount.ok_or_else(|| {
                Error::InvalidCommandArgs("hold needs an amount with a system".into())
            })?;

            let view = undermine::um_find_system(session, sheet, system_name)?;
            let hold =
                undermine::um_add_hold(session, sheet, um_user.id, view.system.id, amount)?;

            if let Some(set) = &args.set {
                let system = session
                    .um_systems
                    .get_mut(&view.system.id)
                    .ok_or(Error::Internal("system vanished mid-hold".into()))?;
                system.set_status(set)?;
                payloads.extend(payload::um_system(
                    &system.sheet_col,
                    system.progress_us,
                    system.progress_them,
                    system.map_offset,
                ));
            }

            let updated = undermine::um_find_system(session, sheet, &view.system.name)?;
            let mut reply = updated.display();
            if updated.is_undermined() {
                reply.push_str(
                    "\n\nSystem is finished with held merits. Type `um` for more targets.",
                );
                reply.push_str(&format!(
                    "\n\n**{}** Have a :skull: for completing {}. Don't forget to redeem.",
                    user.display_name, updated.system.name
                ));
            }
            (vec![hold], reply)
        };

        // One hold-pair write per touched hold.
        for hold in &touched {
            let Some(system) = session.um_systems.get(&hold.system_id) else {
                continue;
            };
            payloads.extend(payload::um_hold(
                &system.sheet_col,
                um_user.row,
                hold.held,
                hold.redeemed,
            )?);
        }

        Ok(Outcome { payloads, reply })
    })?;

    ctx.flush_sheet(scanner_names::UM_MAIN, &outcome.payloads, event).await?;
    Ok(vec![outcome.reply])
}

/// The cycle summary table shown after a redeem.
fn redeem_summary(session: &Session, um_user_id: i64, total: i64) -> String {
    let mut rows =
        vec![vec!["System".to_string(), "Hold".to_string(), "Redeemed".to_string()]];
    for hold in session.um_holds.values() {
        if hold.user_id != um_user_id || hold.held + hold.redeemed <= 0 {
            continue;
        }
        let system = session
            .um_systems
            .get(&hold.system_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        rows.push(vec![system, hold.held.to_string(), hold.redeemed.to_string()]);
    }

    format!(
        "**Redeemed Now** {total}\n\n__Cycle Summary__\n{}",
        tbl::format_table(&rows, true, "")
    )
}
