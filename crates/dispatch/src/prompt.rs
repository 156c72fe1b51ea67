//! Interactive choice prompts.
//!
//! A handler can ask the invoking user to pick one of N options. The
//! prompt is a small state machine keyed by (channel, user): the next
//! message from that user on that channel resolves it, a timer cancels it
//! after the timeout, and both the prompt and the answer are transient.
//! There is no resumption of arbitrary call stacks — just one pending
//! answer slot per (channel, user).

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use rampart_core::{ChannelId, Error, Result, UserId};

use crate::event::ChatTransport;

/// How long a prompt waits before cancelling itself.
pub const PROMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// The pending-answer registry.
#[derive(Default)]
pub struct PromptBook {
    pending: DashMap<(ChannelId, UserId), oneshot::Sender<String>>,
}

impl PromptBook {
    /// An empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a message into a pending prompt.
    ///
    /// Returns true when the message answered a prompt and must not be
    /// parsed as a command.
    pub fn try_answer(&self, channel: ChannelId, user: UserId, content: &str) -> bool {
        if let Some((_, sender)) = self.pending.remove(&(channel, user)) {
            let _ = sender.send(content.trim().to_string());
            return true;
        }
        false
    }

    /// Whether a prompt is pending for (channel, user).
    pub fn is_pending(&self, channel: ChannelId, user: UserId) -> bool {
        self.pending.contains_key(&(channel, user))
    }

    /// Ask `user` on `channel` to pick one of `options` (1-based reply).
    ///
    /// The question and the answer window are transient; after
    /// [`PROMPT_TIMEOUT`] the prompt cancels with a user error. A second
    /// prompt for the same (channel, user) replaces the first, cancelling
    /// it.
    pub async fn ask_choice(
        &self,
        transport: &Arc<dyn ChatTransport>,
        channel: ChannelId,
        user: UserId,
        question: &str,
        options: &[&str],
    ) -> Result<usize> {
        let mut text = format!("{question}\n");
        for (ind, option) in options.iter().enumerate() {
            text.push_str(&format!("    {}) {option}\n", ind + 1));
        }
        text.push_str(&format!(
            "Reply with a number within {} seconds.",
            PROMPT_TIMEOUT.as_secs()
        ));
        transport.send_ttl(channel, &text, PROMPT_TIMEOUT).await?;

        let (sender, receiver) = oneshot::channel();
        self.pending.insert((channel, user), sender);

        let answer = match tokio::time::timeout(PROMPT_TIMEOUT, receiver).await {
            Ok(Ok(answer)) => answer,
            // Timed out or replaced; clear the slot if it is still ours.
            _ => {
                self.pending.remove(&(channel, user));
                return Err(Error::InvalidCommandArgs(
                    "Prompt timed out or was cancelled. Start over.".into(),
                ));
            }
        };

        match answer.parse::<usize>() {
            Ok(choice) if (1..=options.len()).contains(&choice) => Ok(choice - 1),
            _ => Err(Error::InvalidCommandArgs(format!(
                "Pick a number in [1, {}]. Start over.",
                options.len()
            ))),
        }
    }
}
