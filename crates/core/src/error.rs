//! Error types for the Rampart bot.
//!
//! The [`Error`] type is the unified error for all Rampart APIs. Every layer
//! (store, query, sheets, dispatch, feed) raises variants of this enum so the
//! dispatcher's outer frame can decide, from the kind alone, whether an error
//! is the user's fault (transient chat reply), a remote hiccup (retry), or an
//! internal problem (log with context, tell the user to contact leadership).
//!
//! ## Categories
//!
//! - **User**: bad arguments, failed lookups, permission refusals.
//! - **Parsing**: a sheet snapshot could not be interpreted.
//! - **Conflict**: a uniqueness or optimistic-commit violation.
//! - **Remote**: the sheet API or the event feed is unreachable.
//! - **Internal**: invariant violations and everything unexpected.

use std::io;
use thiserror::Error;

/// Result type alias for Rampart operations.
pub type Result<T> = std::result::Result<T, Error>;

fn list_matches(matches: &[String]) -> String {
    matches.iter().map(|m| format!("    - {m}")).collect::<Vec<_>>().join("\n")
}

/// The unified error type for the bot.
#[derive(Debug, Error)]
pub enum Error {
    /// A lookup returned zero rows when exactly one was required.
    #[error("No match when one was required. Looked for __{needle}__ in {kind}s.")]
    NoMatch {
        /// What was searched for.
        needle: String,
        /// Human name of the entity kind searched.
        kind: &'static str,
    },

    /// A substring lookup was ambiguous.
    #[error(
        "Unable to match exactly one result. Refine the search.\n\n\
         Looked for __{needle}__ in {kind}s. Potentially matched:\n{}",
        list_matches(.matches)
    )]
    MoreThanOneMatch {
        /// What was searched for.
        needle: String,
        /// Display names of all candidates that matched.
        matches: Vec<String>,
        /// Human name of the entity kind searched.
        kind: &'static str,
    },

    /// The command arguments were understood but unacceptable.
    #[error("{0}")]
    InvalidCommandArgs(String),

    /// The command line could not be parsed at all. Carries usage text.
    #[error("{0}")]
    ArgumentParse(String),

    /// The user asked for help (`-h`/`--help`). Carries usage text.
    #[error("{0}")]
    ArgumentHelp(String),

    /// A channel, role or admin permission check failed.
    #[error("{0}")]
    InvalidPerms(String),

    /// A value failed validation at the store layer.
    ///
    /// This indicates a bug or a corrupt remote sheet, not user error.
    #[error("Validation failed: {0}")]
    ValidationFail(String),

    /// A uniqueness constraint was violated (e.g. name collision on rename).
    #[error("Integrity conflict: {0}")]
    IntegrityConflict(String),

    /// An optimistic session commit lost the race to another writer.
    ///
    /// Retryable: re-read and re-apply.
    #[error("Session conflict: {0}")]
    SessionConflict(String),

    /// The fort target list is exhausted.
    #[error("No more fort targets at this time.")]
    NoMoreTargets,

    /// A full sheet scan failed; the cache keeps its previous state.
    #[error("Sheet parsing failed: {0}")]
    SheetParsing(String),

    /// Two contributor rows in a sheet carry the same name.
    #[error(
        "CMDR \"{name}\" found in rows {rows:?} of the {sheet} sheet.\n\n\
         To resolve: delete or rename the cmdr in one of these rows,\n\
         then run `admin scan` to reload."
    )]
    NameCollision {
        /// Which sheet the collision was found in.
        sheet: String,
        /// The colliding name.
        name: String,
        /// All 1-based rows carrying the name.
        rows: Vec<usize>,
    },

    /// A required remote (sheet API, event feed) cannot be reached.
    #[error("Remote unavailable: {0}")]
    Remote(String),

    /// A retried job ran out of attempts.
    #[error("Job failed after all attempts: {0}")]
    FailedJob(String),

    /// The configuration file is missing or unreadable.
    #[error("Configuration problem: {0}")]
    MissingConfig(String),

    /// I/O error (archives, config file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Anything unexpected. Logged with full context by the dispatcher.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error was caused by the invoking user and should be
    /// surfaced as a transient chat message rather than logged as a fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::NoMatch { .. }
                | Error::MoreThanOneMatch { .. }
                | Error::InvalidCommandArgs(_)
                | Error::ArgumentParse(_)
                | Error::ArgumentHelp(_)
                | Error::InvalidPerms(_)
                | Error::NoMoreTargets
        )
    }

    /// True when retrying the operation may succeed.
    ///
    /// Only remote failures and optimistic-commit conflicts qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Remote(_) | Error::SessionConflict(_))
    }

    /// True when a sheet scan aborted and the cache kept its previous state.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Error::SheetParsing(_) | Error::NameCollision { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_are_classified() {
        assert!(Error::InvalidCommandArgs("bad".into()).is_user_error());
        assert!(Error::NoMatch { needle: "fre".into(), kind: "FortSystem" }.is_user_error());
        assert!(!Error::ValidationFail("range".into()).is_user_error());
        assert!(!Error::Remote("down".into()).is_user_error());
    }

    #[test]
    fn retryable_errors_are_classified() {
        assert!(Error::Remote("timeout".into()).is_retryable());
        assert!(Error::SessionConflict("stale base".into()).is_retryable());
        assert!(!Error::IntegrityConflict("dup".into()).is_retryable());
    }

    #[test]
    fn more_than_one_match_lists_candidates() {
        let err = Error::MoreThanOneMatch {
            needle: "ra".into(),
            matches: vec!["Rana".into(), "Rhea".into()],
            kind: "FortSystem",
        };
        let text = err.to_string();
        assert!(text.contains("- Rana"));
        assert!(text.contains("- Rhea"));
    }

    #[test]
    fn name_collision_names_rows() {
        let err = Error::NameCollision {
            sheet: "KOS".into(),
            name: "Bob".into(),
            rows: vec![2, 5],
        };
        let text = err.to_string();
        assert!(text.contains("Bob"));
        assert!(text.contains("[2, 5]"));
    }
}
