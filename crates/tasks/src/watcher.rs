//! Config hot-reload.
//!
//! The watcher polls the config file's modification time and, on change,
//! parses the whole file and swaps it into the [`SharedConfig`] handle.
//! A file that fails to parse is logged and skipped — the last good
//! configuration stays active. Writers use append-then-replace, so the
//! watcher never observes a half-written file.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tracing::{info, warn};

use rampart_core::{BotConfig, Result, SharedConfig};

/// Poll `path` every `interval`, swapping reloads into `shared` until
/// `cancel` flips true.
pub async fn watch_config(
    path: PathBuf,
    shared: SharedConfig,
    interval: Duration,
    mut cancel: watch::Receiver<bool>,
) -> Result<()> {
    let mut last_seen = modified_at(&path);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    info!("config watcher cancelled");
                    return Ok(());
                }
            }
        }

        let stamp = modified_at(&path);
        if stamp == last_seen {
            continue;
        }
        last_seen = stamp;

        match BotConfig::load_or_init(&path) {
            Ok(cfg) => {
                shared.swap(cfg);
                info!(path = %path.display(), "configuration reloaded");
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "config reload failed, keeping previous");
            }
        }
    }
}

fn modified_at(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reload_swaps_on_file_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rampart.toml");
        let initial = BotConfig::default();
        initial.write(&path).unwrap();

        let shared = SharedConfig::new(initial);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(watch_config(
            path.clone(),
            shared.clone(),
            Duration::from_millis(20),
            cancel_rx,
        ));

        // Rewrite the file with a different max_drop; mtime granularity on
        // some filesystems needs a breather first.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut next = BotConfig::default();
        next.max_drop = 1000;
        next.write(&path).unwrap();

        // Wait for the watcher to pick it up.
        for _ in 0..100 {
            if shared.snapshot().max_drop == 1000 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(shared.snapshot().max_drop, 1000);

        cancel_tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bad_reload_keeps_previous_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rampart.toml");
        BotConfig::default().write(&path).unwrap();

        let shared = SharedConfig::new(BotConfig::default());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(watch_config(
            path.clone(),
            shared.clone(),
            Duration::from_millis(20),
            cancel_rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(&path, "max_drop = \"garbage\"").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(shared.snapshot().max_drop, 800);
        cancel_tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }
}
