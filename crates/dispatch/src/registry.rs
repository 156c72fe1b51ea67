//! The explicit command registry.
//!
//! Every command the bot understands has one entry: its parser, its usage
//! text and whether the admin gate applies. Channel and role rules attach
//! to the command *name* at runtime through the permission tables; the
//! registry itself is immutable after startup.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use rampart_core::Result;

use crate::command::Command;
use crate::parse;

/// One registered command.
pub struct CommandSpec {
    /// Registry name, matched against the first message token.
    pub name: &'static str,
    /// One-line purpose, shown by `help`.
    pub summary: &'static str,
    /// Usage text shown on parse errors and `-h`.
    pub usage: &'static str,
    /// Whether an admin grant is required in addition to channel/role rules.
    pub admin_only: bool,
    /// The argument parser.
    pub parser: fn(&[String]) -> Result<Command>,
}

static REGISTRY: Lazy<BTreeMap<&'static str, CommandSpec>> = Lazy::new(|| {
    let specs = [
        CommandSpec {
            name: "admin",
            summary: "Admin commands",
            usage: "admin {add,remove,cycle,deny,dump,halt,scan,top,addum,removeum,cast,info}",
            admin_only: true,
            parser: parse::parse_admin,
        },
        CommandSpec {
            name: "dash",
            summary: "Background task liveness",
            usage: "dash",
            admin_only: true,
            parser: |_| Ok(Command::Dash),
        },
        CommandSpec {
            name: "dist",
            summary: "Distance from the first system to the others",
            usage: "dist SYSTEM, SYSTEM[, ...]",
            admin_only: false,
            parser: parse::parse_dist,
        },
        CommandSpec {
            name: "drop",
            summary: "Drop forts into the fort sheet",
            usage: "drop AMOUNT SYSTEM [@user] [--set F[:U]]",
            admin_only: false,
            parser: parse::parse_drop,
        },
        CommandSpec {
            name: "feedback",
            summary: "Give feedback or report a bug",
            usage: "feedback TEXT",
            admin_only: false,
            parser: parse::parse_feedback,
        },
        CommandSpec {
            name: "fort",
            summary: "Get information about our fort systems",
            usage: "fort [SYSTEM[, ...]] [--next N] [--miss N] [--set F[:U]] [--order s,...] [--details] [--summary]",
            admin_only: false,
            parser: parse::parse_fort,
        },
        CommandSpec {
            name: "help",
            summary: "This help message",
            usage: "help",
            admin_only: false,
            parser: |_| Ok(Command::Help),
        },
        CommandSpec {
            name: "hold",
            summary: "Declare held merits or redeem them",
            usage: "hold [AMOUNT SYSTEM] [@user] [--died] [--redeem] [--redeem-systems s,...] [--set U[:T]]",
            admin_only: false,
            parser: parse::parse_hold,
        },
        CommandSpec {
            name: "kos",
            summary: "Manage or search the KOS list",
            usage: "kos {report NAME [--squad S] [--reason R] [--friendly], search TERM, pull}",
            admin_only: false,
            parser: parse::parse_kos,
        },
        CommandSpec {
            name: "status",
            summary: "Info about this bot",
            usage: "status",
            admin_only: false,
            parser: |_| Ok(Command::Status),
        },
        CommandSpec {
            name: "time",
            summary: "Show game time and time to tick",
            usage: "time",
            admin_only: false,
            parser: |_| Ok(Command::Time),
        },
        CommandSpec {
            name: "track",
            summary: "Track carrier movement by system or id",
            usage: "track {add D s1,..., remove s1,..., ids [--add i,...] [--remove i,...] [--squad S], show, channel, scan}",
            admin_only: true,
            parser: parse::parse_track,
        },
        CommandSpec {
            name: "trigger",
            summary: "Predict fort and um triggers for systems",
            usage: "trigger SYSTEM[, ...]",
            admin_only: false,
            parser: parse::parse_trigger,
        },
        CommandSpec {
            name: "um",
            summary: "Get information about undermining targets",
            usage: "um [SYSTEM] [--set U[:T]] [--offset N] [--priority P] [--list]",
            admin_only: false,
            parser: parse::parse_um,
        },
        CommandSpec {
            name: "user",
            summary: "Manage your sheet name and cry",
            usage: "user [--name NAME] [--cry CRY]",
            admin_only: false,
            parser: parse::parse_user,
        },
        CommandSpec {
            name: "whois",
            summary: "Look up a commander",
            usage: "whois NAME",
            admin_only: false,
            parser: parse::parse_whois,
        },
    ];

    specs.into_iter().map(|spec| (spec.name, spec)).collect()
});

/// The command registry, keyed by name.
pub fn registry() -> &'static BTreeMap<&'static str, CommandSpec> {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_is_registered() {
        let names: Vec<&str> = registry().keys().copied().collect();
        for expected in [
            "admin", "dash", "dist", "drop", "feedback", "fort", "help", "hold", "kos",
            "status", "time", "track", "um", "user", "whois",
        ] {
            assert!(names.contains(&expected), "{expected} missing from registry");
        }
    }

    #[test]
    fn admin_gating_flags() {
        assert!(registry()["admin"].admin_only);
        assert!(registry()["track"].admin_only);
        assert!(registry()["dash"].admin_only);
        assert!(!registry()["drop"].admin_only);
        assert!(!registry()["fort"].admin_only);
    }
}
