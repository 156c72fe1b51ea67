//! The `user` handler: sheet name and battle-cry management.

use rampart_core::{BotConfig, Result};
use rampart_query::users;
use rampart_sheets::payload;

use crate::dispatcher::Dispatcher;
use crate::event::ChatEvent;
use crate::command::UserArgs;
use crate::scanner_names;
use crate::tbl;

/// Run `user [--name NAME] [--cry CRY]`.
///
/// A rename or new cry propagates to every contributor row the user holds,
/// on both campaign sheets.
pub async fn run(
    ctx: &Dispatcher,
    event: &ChatEvent,
    args: UserArgs,
    _cfg: &BotConfig,
) -> Result<Vec<String>> {
    let author = &event.author;

    struct Outcome {
        fort_payloads: Vec<payload::CellUpdate>,
        um_payloads: Vec<payload::CellUpdate>,
        reply: String,
    }

    let outcome = ctx.store().with_session(|session| {
        users::ensure_user(session, author.id, &author.display_name)?;

        if let Some(name) = &args.name {
            users::set_pref_name(session, author.id, name)?;
        }
        if let Some(cry) = &args.cry {
            users::set_pref_cry(session, author.id, cry)?;
        }

        let user = users::get_user(session, author.id)?;
        let mut fort_payloads = Vec::new();
        let mut um_payloads = Vec::new();
        if args.name.is_some() || args.cry.is_some() {
            if let Some(fort_user) = users::fort_user_for(session, &user) {
                fort_payloads =
                    payload::user_row(fort_user.row, &fort_user.cry, &fort_user.name);
            }
            if let Some(um_user) =
                users::um_user_for(session, &user, rampart_store::UmSheet::Main)
            {
                um_payloads = payload::user_row(um_user.row, &um_user.cry, &um_user.name);
            }
        }

        // Summarize the user's standing.
        let mut rows = vec![vec!["".to_string(), user.pref_name.clone()]];
        if !user.pref_cry.is_empty() {
            rows.push(vec!["Cry".to_string(), user.pref_cry.clone()]);
        }
        if let Some(fort_user) = users::fort_user_for(session, &user) {
            rows.push(vec![
                "Fort".to_string(),
                format!("Dropped {}", session.fort_user_dropped(fort_user.id)),
            ]);
        }
        if let Some(um_user) = users::um_user_for(session, &user, rampart_store::UmSheet::Main)
        {
            let (held, redeemed) = session.um_user_totals(um_user.id);
            rows.push(vec![
                "UM".to_string(),
                format!("Holding {held}, Redeemed {redeemed}"),
            ]);
        }

        let reply = tbl::format_table(&rows, false, &format!("__{}__\n", user.display_name));
        Ok(Outcome { fort_payloads, um_payloads, reply })
    })?;

    ctx.flush_sheet(scanner_names::FORT, &outcome.fort_payloads, event).await?;
    ctx.flush_sheet(scanner_names::UM_MAIN, &outcome.um_payloads, event).await?;
    Ok(vec![outcome.reply])
}
