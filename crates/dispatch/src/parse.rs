//! The strict command grammar.
//!
//! Each command is independently parsed from whitespace tokens. Bad input
//! raises `ArgumentParse` carrying the command's usage text; `-h` or
//! `--help` anywhere raises `ArgumentHelp` with the same text. Mention
//! tokens (`<@..>`, `<#..>`, `<@&..>`) are carried structurally on the
//! event, so the parser drops them from the token stream.

use rampart_core::{Error, Result};

use crate::command::{
    AdminCmd, Command, FortArgs, HoldArgs, KosCmd, TrackCmd, UmArgs, UserArgs,
};
use crate::registry;

/// Parse raw message content.
///
/// Returns `Ok(None)` for messages without the prefix (not for the bot),
/// an error for a prefixed but unknown or malformed command.
pub fn parse_content(content: &str, prefix: &str) -> Result<Option<Command>> {
    let Some(stripped) = content.strip_prefix(prefix) else {
        return Ok(None);
    };

    let tokens: Vec<String> = stripped
        .split_whitespace()
        .filter(|tok| !is_mention(tok))
        .map(str::to_string)
        .collect();
    let Some((name, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let name = name.to_lowercase();
    let Some(spec) = registry::registry().get(name.as_str()) else {
        return Err(Error::ArgumentParse(format!(
            "{name} is not a command I know. Try `{prefix}help`."
        )));
    };

    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Err(Error::ArgumentHelp(spec.usage.to_string()));
    }

    (spec.parser)(args).map(Some).map_err(|err| match err {
        Error::ArgumentParse(msg) => {
            Error::ArgumentParse(format!("{msg}\n\nUsage: {}", spec.usage))
        }
        other => other,
    })
}

fn is_mention(token: &str) -> bool {
    token.starts_with("<@") || token.starts_with("<#")
}

/// Join free arguments and split them on commas into system names.
pub fn process_system_args(args: &[String]) -> Vec<String> {
    args.join(" ")
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Remove a bare flag, reporting whether it was present.
fn take_flag(tokens: &mut Vec<String>, flag: &str) -> bool {
    match tokens.iter().position(|t| t == flag) {
        Some(ind) => {
            tokens.remove(ind);
            true
        }
        None => false,
    }
}

/// Remove `--flag value`, returning the value.
fn take_value(tokens: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    let Some(ind) = tokens.iter().position(|t| t == flag) else {
        return Ok(None);
    };
    if ind + 1 >= tokens.len() {
        return Err(Error::ArgumentParse(format!("{flag} needs a value")));
    }
    tokens.remove(ind);
    Ok(Some(tokens.remove(ind)))
}

/// Remove `--flag word word ...`, consuming words until the next flag.
fn take_rest(tokens: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    let Some(ind) = tokens.iter().position(|t| t == flag) else {
        return Ok(None);
    };
    tokens.remove(ind);
    let mut words = Vec::new();
    while ind < tokens.len() && !tokens[ind].starts_with("--") {
        words.push(tokens.remove(ind));
    }
    if words.is_empty() {
        return Err(Error::ArgumentParse(format!("{flag} needs a value")));
    }
    Ok(Some(words.join(" ")))
}

fn parse_i64(token: &str, what: &str) -> Result<i64> {
    token
        .parse()
        .map_err(|_| Error::ArgumentParse(format!("{what} must be a whole number, got {token:?}")))
}

fn parse_usize(token: &str, what: &str) -> Result<usize> {
    token
        .parse()
        .map_err(|_| Error::ArgumentParse(format!("{what} must be a positive number, got {token:?}")))
}

fn reject_unknown_flags(tokens: &[String]) -> Result<()> {
    if let Some(flag) = tokens.iter().find(|t| t.starts_with("--")) {
        return Err(Error::ArgumentParse(format!("unrecognized flag {flag}")));
    }
    Ok(())
}

// =========================================================================
// Per-command parsers, referenced by the registry.
// =========================================================================

pub(crate) fn parse_drop(args: &[String]) -> Result<Command> {
    let mut tokens = args.to_vec();
    let set = take_value(&mut tokens, "--set")?;
    reject_unknown_flags(&tokens)?;

    let Some((amount_tok, system_toks)) = tokens.split_first() else {
        return Err(Error::ArgumentParse("drop needs an amount and a system".into()));
    };
    let amount = parse_i64(amount_tok, "amount")?;
    if system_toks.is_empty() {
        return Err(Error::ArgumentParse("drop needs a system".into()));
    }

    Ok(Command::Drop { amount, system: system_toks.join(" "), set })
}

pub(crate) fn parse_fort(args: &[String]) -> Result<Command> {
    let mut tokens = args.to_vec();
    let mut parsed = FortArgs {
        summary: take_flag(&mut tokens, "--summary"),
        details: take_flag(&mut tokens, "--details"),
        order: take_flag(&mut tokens, "--order"),
        set: take_value(&mut tokens, "--set")?,
        ..FortArgs::default()
    };
    if let Some(next) = take_value(&mut tokens, "--next")? {
        parsed.next = Some(parse_usize(&next, "--next")?);
    }
    if let Some(miss) = take_value(&mut tokens, "--miss")? {
        parsed.miss = Some(parse_i64(&miss, "--miss")?);
    }
    reject_unknown_flags(&tokens)?;
    parsed.systems = process_system_args(&tokens);

    Ok(Command::Fort(parsed))
}

pub(crate) fn parse_hold(args: &[String]) -> Result<Command> {
    let mut tokens = args.to_vec();
    let mut parsed = HoldArgs {
        died: take_flag(&mut tokens, "--died"),
        redeem: take_flag(&mut tokens, "--redeem"),
        set: take_value(&mut tokens, "--set")?,
        ..HoldArgs::default()
    };
    if let Some(systems) = take_rest(&mut tokens, "--redeem-systems")? {
        parsed.redeem_systems = Some(process_system_args(&[systems]));
    }
    reject_unknown_flags(&tokens)?;

    if let Some((amount_tok, system_toks)) = tokens.split_first() {
        parsed.amount = Some(parse_i64(amount_tok, "amount")?);
        if system_toks.is_empty() {
            return Err(Error::ArgumentParse("hold needs a system with an amount".into()));
        }
        parsed.system = Some(system_toks.join(" "));
    }

    if parsed.amount.is_none()
        && !parsed.died
        && !parsed.redeem
        && parsed.redeem_systems.is_none()
        && parsed.set.is_none()
    {
        return Err(Error::ArgumentParse("hold needs an amount or a flag".into()));
    }
    Ok(Command::Hold(parsed))
}

pub(crate) fn parse_um(args: &[String]) -> Result<Command> {
    let mut tokens = args.to_vec();
    let mut parsed = UmArgs {
        list: take_flag(&mut tokens, "--list"),
        set: take_value(&mut tokens, "--set")?,
        priority: take_rest(&mut tokens, "--priority")?,
        ..UmArgs::default()
    };
    if let Some(offset) = take_value(&mut tokens, "--offset")? {
        parsed.offset = Some(parse_i64(&offset, "--offset")?);
    }
    reject_unknown_flags(&tokens)?;
    parsed.systems = process_system_args(&tokens);

    Ok(Command::Um(parsed))
}

pub(crate) fn parse_user(args: &[String]) -> Result<Command> {
    let mut tokens = args.to_vec();
    let parsed = UserArgs {
        name: take_rest(&mut tokens, "--name")?,
        cry: take_rest(&mut tokens, "--cry")?,
    };
    reject_unknown_flags(&tokens)?;
    if !tokens.is_empty() {
        return Err(Error::ArgumentParse("user only takes --name and --cry".into()));
    }
    Ok(Command::User(parsed))
}

pub(crate) fn parse_admin(args: &[String]) -> Result<Command> {
    let Some((sub, rest)) = args.split_first() else {
        return Err(Error::ArgumentParse("admin needs a subcommand".into()));
    };
    let mut tokens = rest.to_vec();

    let cmd = match sub.to_lowercase().as_str() {
        "add" => AdminCmd::Add { rule_cmd: tokens.first().cloned() },
        "remove" => AdminCmd::Remove { rule_cmd: tokens.first().cloned() },
        "cycle" => AdminCmd::Cycle,
        "deny" => AdminCmd::Deny,
        "dump" => AdminCmd::Dump,
        "halt" => AdminCmd::Halt,
        "scan" => AdminCmd::Scan,
        "top" => {
            let limit = match tokens.first() {
                Some(tok) => parse_usize(tok, "limit")?,
                None => 5,
            };
            AdminCmd::Top { limit }
        }
        "addum" => {
            let reinforced = match take_value(&mut tokens, "--reinforced")? {
                Some(val) => parse_i64(&val, "--reinforced")?,
                None => 0,
            };
            let priority = take_rest(&mut tokens, "--priority")?
                .unwrap_or_else(|| "Normal".to_string());
            let systems = process_system_args(&tokens);
            if systems.is_empty() {
                return Err(Error::ArgumentParse("addum needs at least one system".into()));
            }
            AdminCmd::AddUm { systems, reinforced, priority }
        }
        "removeum" => {
            let systems = process_system_args(&tokens);
            if systems.is_empty() {
                return Err(Error::ArgumentParse("removeum needs at least one system".into()));
            }
            AdminCmd::RemoveUm { systems }
        }
        "cast" => AdminCmd::Cast { content: tokens.join(" ") },
        "info" => AdminCmd::Info,
        other => {
            return Err(Error::ArgumentParse(format!("bad admin subcommand {other:?}")));
        }
    };
    Ok(Command::Admin(cmd))
}

pub(crate) fn parse_track(args: &[String]) -> Result<Command> {
    let Some((sub, rest)) = args.split_first() else {
        return Err(Error::ArgumentParse("track needs a subcommand".into()));
    };
    let mut tokens = rest.to_vec();

    let cmd = match sub.to_lowercase().as_str() {
        "add" => {
            let Some(distance_tok) = (!tokens.is_empty()).then(|| tokens.remove(0)) else {
                return Err(Error::ArgumentParse("track add needs a distance".into()));
            };
            let distance = parse_i64(&distance_tok, "distance")?;
            let systems = process_system_args(&tokens);
            if systems.is_empty() {
                return Err(Error::ArgumentParse("track add needs at least one system".into()));
            }
            TrackCmd::Add { distance, systems }
        }
        "remove" => {
            let systems = process_system_args(&tokens);
            if systems.is_empty() {
                return Err(Error::ArgumentParse(
                    "track remove needs at least one system".into(),
                ));
            }
            TrackCmd::Remove { systems }
        }
        "ids" => {
            let add = take_rest(&mut tokens, "--add")?
                .map(|joined| process_system_args(&[joined]))
                .unwrap_or_default();
            let remove = take_rest(&mut tokens, "--remove")?
                .map(|joined| process_system_args(&[joined]))
                .unwrap_or_default();
            let squad = take_rest(&mut tokens, "--squad")?.unwrap_or_default();
            reject_unknown_flags(&tokens)?;
            TrackCmd::Ids { add, remove, squad }
        }
        "show" => TrackCmd::Show,
        "channel" => TrackCmd::Channel,
        "scan" => TrackCmd::Scan,
        other => {
            return Err(Error::ArgumentParse(format!("bad track subcommand {other:?}")));
        }
    };
    Ok(Command::Track(cmd))
}

pub(crate) fn parse_kos(args: &[String]) -> Result<Command> {
    let Some((sub, rest)) = args.split_first() else {
        return Err(Error::ArgumentParse("kos needs a subcommand".into()));
    };
    let mut tokens = rest.to_vec();

    let cmd = match sub.to_lowercase().as_str() {
        "report" => {
            let friendly = take_flag(&mut tokens, "--friendly");
            let squad = take_rest(&mut tokens, "--squad")?.unwrap_or_default();
            let reason = take_rest(&mut tokens, "--reason")?.unwrap_or_default();
            reject_unknown_flags(&tokens)?;
            if tokens.is_empty() {
                return Err(Error::ArgumentParse("kos report needs a cmdr name".into()));
            }
            KosCmd::Report { cmdr: tokens.join(" "), squad, reason, friendly }
        }
        "search" => {
            if tokens.is_empty() {
                return Err(Error::ArgumentParse("kos search needs a term".into()));
            }
            KosCmd::Search { term: tokens.join(" ") }
        }
        "pull" => KosCmd::Pull,
        other => {
            return Err(Error::ArgumentParse(format!("bad kos subcommand {other:?}")));
        }
    };
    Ok(Command::Kos(cmd))
}

pub(crate) fn parse_dist(args: &[String]) -> Result<Command> {
    let systems = process_system_args(args);
    if systems.len() < 2 {
        return Err(Error::ArgumentParse("dist needs at least two systems".into()));
    }
    Ok(Command::Dist { systems })
}

pub(crate) fn parse_trigger(args: &[String]) -> Result<Command> {
    let systems = process_system_args(args);
    if systems.is_empty() {
        return Err(Error::ArgumentParse("trigger needs at least one system".into()));
    }
    Ok(Command::Trigger { systems })
}

pub(crate) fn parse_whois(args: &[String]) -> Result<Command> {
    if args.is_empty() {
        return Err(Error::ArgumentParse("whois needs a cmdr name".into()));
    }
    Ok(Command::Whois { name: args.join(" ") })
}

pub(crate) fn parse_feedback(args: &[String]) -> Result<Command> {
    if args.is_empty() {
        return Err(Error::ArgumentParse("feedback needs some text".into()));
    }
    Ok(Command::Feedback { content: args.join(" ") })
}
