//! Periodic carrier summaries.
//!
//! Every `delay` seconds the poster reports carriers seen since its last
//! run to the carrier channel; once a day it posts a larger summary of all
//! movement over the preceding 24 hours, and reaps stale non-override
//! rows. No channel configured means the observations still accumulate,
//! they just are not posted.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use rampart_core::{ChannelId, Result, SharedConfig};
use rampart_query::track;
use rampart_store::Store;

/// Capability for posting summaries to a channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `text` to `channel`.
    async fn notify(&self, channel: ChannelId, text: &str) -> Result<()>;
}

/// Run the summary poster until `cancel` flips true.
pub async fn run_summary_loop(
    store: Store,
    config: SharedConfig,
    notifier: Box<dyn Notifier>,
    mut cancel: watch::Receiver<bool>,
) -> Result<()> {
    let mut last_run = Utc::now();
    let mut next_daily = Utc::now() + ChronoDuration::days(1);

    loop {
        let delay = config.snapshot().scheduler_delay.max(1);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(delay)) => {}
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    info!("carrier summary poster cancelled");
                    return Ok(());
                }
                continue;
            }
        }

        let now = Utc::now();
        let text = if now >= next_daily {
            next_daily = now + ChronoDuration::days(1);
            summarize(&store, now - ChronoDuration::days(1), true)
        } else {
            summarize(&store, last_run, false)
        };
        last_run = now;

        // Reap rows that went quiet, keeping overrides.
        let reaped = store
            .with_session_retry(3, |session| Ok(track::track_ids_reap_old(session, now)))
            .unwrap_or_default();
        if !reaped.is_empty() {
            info!(count = reaped.len(), "reaped stale carriers");
        }

        let Some(channel) = config.snapshot().carrier_channel else {
            continue;
        };
        if let Some(text) = text {
            if let Err(err) = notifier.notify(channel, &text).await {
                warn!(%err, "failed to post carrier summary");
            }
        }
    }
}

/// Build the summary text for movement since `since`; `None` when quiet.
pub fn summarize(store: &Store, since: DateTime<Utc>, daily: bool) -> Option<String> {
    let session = store.begin_session();
    let movements = track::track_ids_newer_than(&session, since);
    if movements.is_empty() {
        return None;
    }

    let header = if daily {
        format!("__Daily Fleet Carrier Summary__ ({} movements)", movements.len())
    } else {
        format!("__Fleet Carriers Detected__ ({} movements)", movements.len())
    };

    let mut lines = vec![header];
    for carrier in movements {
        lines.push(carrier.to_string());
    }
    Some(lines.join("\n"))
}
