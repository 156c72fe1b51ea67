//! The typed command set.
//!
//! Every chat command parses into a variant here before any handler runs:
//! self-contained, no closures, all parameters explicit. The dispatcher
//! routes on the variant; handlers never re-parse text.

/// A fully parsed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// The admin console.
    Admin(AdminCmd),
    /// Supervisor liveness table.
    Dash,
    /// Distances from the first system to the rest.
    Dist {
        /// Systems, first is the origin.
        systems: Vec<String>,
    },
    /// Record a fort contribution.
    Drop {
        /// Signed merit amount.
        amount: i64,
        /// Target system, fuzzy-matched.
        system: String,
        /// Optional `fort[:um]` status override.
        set: Option<String>,
    },
    /// Forward a bug report to the maintainers' channel.
    Feedback {
        /// Report text.
        content: String,
    },
    /// Show or mutate fort state.
    Fort(FortArgs),
    /// Command overview.
    Help,
    /// Hold or redeem undermining merits.
    Hold(HoldArgs),
    /// The kill-on-sight list.
    Kos(KosCmd),
    /// Bot version and uptime.
    Status,
    /// Game time and time to tick.
    Time,
    /// Carrier tracking.
    Track(TrackCmd),
    /// Predicted fort and undermine triggers.
    Trigger {
        /// Systems to predict for.
        systems: Vec<String>,
    },
    /// Show or mutate undermining state.
    Um(UmArgs),
    /// Manage sheet name and battle-cry.
    User(UserArgs),
    /// Look a commander up on the external service.
    Whois {
        /// Commander name.
        name: String,
    },
}

impl Command {
    /// The registry name this command dispatches under.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Admin(_) => "admin",
            Command::Dash => "dash",
            Command::Dist { .. } => "dist",
            Command::Drop { .. } => "drop",
            Command::Feedback { .. } => "feedback",
            Command::Fort(_) => "fort",
            Command::Help => "help",
            Command::Hold(_) => "hold",
            Command::Kos(_) => "kos",
            Command::Status => "status",
            Command::Time => "time",
            Command::Track(_) => "track",
            Command::Trigger { .. } => "trigger",
            Command::Um(_) => "um",
            Command::User(_) => "user",
            Command::Whois { .. } => "whois",
        }
    }
}

/// Arguments of `fort`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FortArgs {
    /// Systems to look up, comma separated in the message.
    pub systems: Vec<String>,
    /// Show the next N targets.
    pub next: Option<usize>,
    /// Show targets missing at most N merits.
    pub miss: Option<i64>,
    /// Set `fort[:um]` status on one system.
    pub set: Option<String>,
    /// Replace the manual order with `systems` (empty clears it).
    pub order: bool,
    /// Detailed single-system view.
    pub details: bool,
    /// State-bucket summary.
    pub summary: bool,
}

/// Arguments of `hold`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoldArgs {
    /// New held amount.
    pub amount: Option<i64>,
    /// System the hold is against.
    pub system: Option<String>,
    /// Reset all held merits to zero.
    pub died: bool,
    /// Redeem all held merits.
    pub redeem: bool,
    /// Redeem only at the named systems.
    pub redeem_systems: Option<Vec<String>>,
    /// Set `progress_us[:progress_them%]` on the system.
    pub set: Option<String>,
}

/// Arguments of `um`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UmArgs {
    /// Systems to look up.
    pub systems: Vec<String>,
    /// Set `progress_us[:progress_them%]`.
    pub set: Option<String>,
    /// Set the map offset.
    pub offset: Option<i64>,
    /// Set the priority string.
    pub priority: Option<String>,
    /// Show everyone's held merits.
    pub list: bool,
}

/// Arguments of `user`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserArgs {
    /// New sheet name.
    pub name: Option<String>,
    /// New battle-cry.
    pub cry: Option<String>,
}

/// The admin console subcommands.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCmd {
    /// Grant admin to mentioned users, or add a channel/role rule.
    Add {
        /// Command the rule applies to; admins are granted when absent.
        rule_cmd: Option<String>,
    },
    /// Remove admins or a channel/role rule.
    Remove {
        /// Command the rule applies to; admins are removed when absent.
        rule_cmd: Option<String>,
    },
    /// Roll scanners to the next cycle tab.
    Cycle,
    /// Toggle acceptance of commands.
    Deny,
    /// Dump the cache to a server-side file.
    Dump,
    /// Schedule a safe shutdown.
    Halt,
    /// Schedule all sheets for rescan.
    Scan,
    /// Top contributors per campaign.
    Top {
        /// Rows per table.
        limit: usize,
    },
    /// Insert systems into the undermine sheet.
    AddUm {
        /// Systems to insert.
        systems: Vec<String>,
        /// Reinforcement percentage in [0, 50].
        reinforced: i64,
        /// Priority string written to the new columns.
        priority: String,
    },
    /// Remove systems from the undermine sheet.
    RemoveUm {
        /// Systems to remove.
        systems: Vec<String>,
    },
    /// Broadcast a message to every guild.
    Cast {
        /// Message text.
        content: String,
    },
    /// Show platform info for mentioned users.
    Info,
}

/// The carrier tracking subcommands.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackCmd {
    /// Track centres at a distance.
    Add {
        /// Radius in light years.
        distance: i64,
        /// Centre systems.
        systems: Vec<String>,
    },
    /// Stop tracking centres.
    Remove {
        /// Centre systems.
        systems: Vec<String>,
    },
    /// Add carrier ids with an optional squad, or remove them.
    Ids {
        /// Ids to add with override.
        add: Vec<String>,
        /// Ids to remove.
        remove: Vec<String>,
        /// Squad attached to added ids.
        squad: String,
    },
    /// Show tracked centres.
    Show,
    /// Make the invoking channel the carrier summary channel.
    Channel,
    /// Rescan the carrier registry sheet.
    Scan,
}

/// The kill-on-sight subcommands.
#[derive(Debug, Clone, PartialEq)]
pub enum KosCmd {
    /// Report a pilot onto the sheet.
    Report {
        /// Commander name.
        cmdr: String,
        /// Their squadron.
        squad: String,
        /// Why they are reported.
        reason: String,
        /// Report as friendly instead of hostile.
        friendly: bool,
    },
    /// Search the list.
    Search {
        /// Substring to look for.
        term: String,
    },
    /// Pull the latest sheet into the cache.
    Pull,
}
