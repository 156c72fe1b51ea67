//! The outer dispatch frame.
//!
//! `handle_event` parses, gates and routes; handlers raise typed errors
//! which are converted here into user-visible replies. A handler error
//! never propagates out of the frame — the loop survives everything and
//! the user always gets an answer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use rampart_core::{BotConfig, Error, Result, SharedConfig};
use rampart_query::{perms, SystemCatalog};
use rampart_sheets::client::InputOption;
use rampart_sheets::{CellUpdate, ScannerRegistry};
use rampart_store::Store;
use rampart_tasks::{JobPool, TaskMonitor};

use crate::command::Command;
use crate::event::{ChatEvent, ChatTransport};
use crate::parse::parse_content;
use crate::prompt::PromptBook;
use crate::registry::registry;
use crate::tbl::{split_message, MSG_LIMIT};
use crate::handlers;

/// A commander profile from the external lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdrProfile {
    /// Commander name as registered there.
    pub name: String,
    /// Squadron, when listed.
    pub squad: String,
    /// Role or rank text.
    pub role: String,
    /// Profile URL.
    pub url: String,
}

/// Capability onto the external commander lookup.
#[async_trait]
pub trait CmdrLookup: Send + Sync {
    /// Find the profile for `name`, if any.
    async fn lookup(&self, name: &str) -> Result<Option<CmdrProfile>>;
}

/// Builder for [`Dispatcher`]; the collaborators are numerous and most
/// have sensible test defaults.
pub struct DispatcherBuilder {
    store: Store,
    config: SharedConfig,
    config_path: Option<PathBuf>,
    scanners: Arc<ScannerRegistry>,
    transport: Arc<dyn ChatTransport>,
    monitor: Arc<TaskMonitor>,
    catalog: Option<Arc<dyn SystemCatalog>>,
    cmdr_lookup: Option<Arc<dyn CmdrLookup>>,
    recruits: Option<Arc<rampart_sheets::RecruitScanner>>,
    maintainer: String,
}

impl DispatcherBuilder {
    /// Start a builder over the required collaborators.
    pub fn new(
        store: Store,
        config: SharedConfig,
        scanners: Arc<ScannerRegistry>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            store,
            config,
            config_path: None,
            scanners,
            transport,
            monitor: Arc::new(TaskMonitor::new()),
            catalog: None,
            cmdr_lookup: None,
            recruits: None,
            maintainer: "leadership".to_string(),
        }
    }

    /// File the config is persisted to (`track channel`, `admin cycle`).
    pub fn config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// The task monitor backing `dash` and `admin halt`.
    pub fn monitor(mut self, monitor: Arc<TaskMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// The galaxy catalog backing `track` and `dist`.
    pub fn catalog(mut self, catalog: Arc<dyn SystemCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// The commander lookup backing `whois`.
    pub fn cmdr_lookup(mut self, lookup: Arc<dyn CmdrLookup>) -> Self {
        self.cmdr_lookup = Some(lookup);
        self
    }

    /// The recruit roster scanner backing `admin top`.
    pub fn recruits(mut self, recruits: Arc<rampart_sheets::RecruitScanner>) -> Self {
        self.recruits = Some(recruits);
        self
    }

    /// Who unexpected-error replies point the user at.
    pub fn maintainer(mut self, maintainer: &str) -> Self {
        self.maintainer = maintainer.to_string();
        self
    }

    /// Finish the dispatcher.
    pub fn build(self) -> Dispatcher {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Dispatcher {
            store: self.store,
            config: self.config,
            config_path: self.config_path,
            scanners: self.scanners,
            transport: self.transport,
            monitor: self.monitor,
            catalog: self.catalog,
            cmdr_lookup: self.cmdr_lookup,
            recruits: self.recruits,
            pool: JobPool::new(10),
            prompts: PromptBook::new(),
            deny_commands: AtomicBool::new(false),
            shutdown_tx,
            shutdown_rx,
            maintainer: self.maintainer,
            started_at: Utc::now(),
        }
    }
}

/// The command dispatcher.
pub struct Dispatcher {
    store: Store,
    config: SharedConfig,
    config_path: Option<PathBuf>,
    scanners: Arc<ScannerRegistry>,
    transport: Arc<dyn ChatTransport>,
    monitor: Arc<TaskMonitor>,
    catalog: Option<Arc<dyn SystemCatalog>>,
    cmdr_lookup: Option<Arc<dyn CmdrLookup>>,
    recruits: Option<Arc<rampart_sheets::RecruitScanner>>,
    pool: JobPool,
    prompts: PromptBook,
    deny_commands: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    maintainer: String,
    started_at: DateTime<Utc>,
}

impl Dispatcher {
    /// The cache.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The scanner registry.
    pub fn scanners(&self) -> &Arc<ScannerRegistry> {
        &self.scanners
    }

    /// The chat transport.
    pub fn transport(&self) -> &Arc<dyn ChatTransport> {
        &self.transport
    }

    /// The background task monitor.
    pub fn monitor(&self) -> &Arc<TaskMonitor> {
        &self.monitor
    }

    /// The bounded job pool for offloaded work.
    pub fn pool(&self) -> &JobPool {
        &self.pool
    }

    /// The interactive prompt registry.
    pub fn prompts(&self) -> &PromptBook {
        &self.prompts
    }

    /// The galaxy catalog, when wired.
    pub fn catalog(&self) -> Result<&Arc<dyn SystemCatalog>> {
        self.catalog
            .as_ref()
            .ok_or_else(|| Error::Remote("the system catalog is not available".into()))
    }

    /// The commander lookup, when wired.
    pub fn cmdr_lookup(&self) -> Result<&Arc<dyn CmdrLookup>> {
        self.cmdr_lookup
            .as_ref()
            .ok_or_else(|| Error::Remote("the commander lookup is not available".into()))
    }

    /// When the dispatcher came up.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The recruit roster from the last completed roster scan.
    pub fn recruit_roster(&self) -> Vec<rampart_sheets::Recruit> {
        self.recruits.as_ref().map(|r| r.roster()).unwrap_or_default()
    }

    /// Toggle acceptance of commands; returns the new deny state.
    pub fn toggle_deny(&self) -> bool {
        !self.deny_commands.fetch_xor(true, Ordering::SeqCst)
    }

    /// Signal every cooperating task to shut down.
    pub fn signal_shutdown(&self) {
        self.deny_commands.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);
    }

    /// A receiver of the shutdown signal for background tasks.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Persist a mutated configuration and swap it in.
    pub fn update_config(&self, cfg: BotConfig) -> Result<()> {
        if let Some(path) = &self.config_path {
            cfg.write(path)?;
        }
        self.config.swap(cfg);
        Ok(())
    }

    /// Current configuration snapshot.
    pub fn config_snapshot(&self) -> Arc<BotConfig> {
        self.config.snapshot()
    }

    /// Push `payloads` to a scanner's document.
    ///
    /// A write failure after the cache already committed is non-fatal:
    /// the user is warned to correct the sheet by hand.
    pub async fn flush_sheet(
        &self,
        scanner: &str,
        payloads: &[CellUpdate],
        event: &ChatEvent,
    ) -> Result<()> {
        self.flush_sheet_with(scanner, payloads, event, InputOption::Raw).await
    }

    /// [`Dispatcher::flush_sheet`] with an explicit input option.
    pub async fn flush_sheet_with(
        &self,
        scanner: &str,
        payloads: &[CellUpdate],
        event: &ChatEvent,
        input: InputOption,
    ) -> Result<()> {
        if payloads.is_empty() {
            return Ok(());
        }

        let handle = self.scanners.get(scanner)?;
        match handle.send_batch(payloads, input).await {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(scanner, %err, "sheet write failed after cache commit");
                let text = format!(
                    "WARNING {}, I could NOT sync part of the following request to the sheet:\n        {}\n\
                     I STRONGLY advise you to update the sheet manually to correct this.",
                    event.author.mention, event.content
                );
                let _ = self.transport.send(event.channel_id, &text).await;
                Ok(())
            }
        }
    }

    /// Process one chat event end to end. Never returns an error; every
    /// failure becomes a reply.
    pub async fn handle_event(&self, event: ChatEvent) {
        let cfg = self.config.snapshot();

        // A pending prompt owns the user's next message on that channel.
        if self.prompts.try_answer(event.channel_id, event.author.id, &event.content) {
            return;
        }

        let command = match parse_content(&event.content, &cfg.prefix) {
            Ok(Some(command)) => command,
            Ok(None) => return,
            Err(err) => {
                self.reply_error(&event, &cfg, err).await;
                return;
            }
        };

        info!(
            command = command.name(),
            author = %event.author.display_name,
            channel = %event.channel_name,
            "dispatching command"
        );

        if let Err(err) = self.gate(&event, &command) {
            self.reply_error(&event, &cfg, err).await;
            return;
        }

        match self.execute(&event, command, &cfg).await {
            Ok(replies) => {
                for reply in replies {
                    for part in split_message(&reply, MSG_LIMIT) {
                        if let Err(err) = self.transport.send(event.channel_id, &part).await {
                            warn!(%err, "failed to deliver reply");
                        }
                    }
                }
            }
            Err(err) => self.reply_error(&event, &cfg, err).await,
        }
    }

    /// The permission gate: channel rules, role rules, admin grant.
    fn gate(&self, event: &ChatEvent, command: &Command) -> Result<()> {
        let name = command.name();
        let spec = registry()
            .get(name)
            .ok_or_else(|| Error::Internal(format!("{name} routed but not registered")))?;

        if self.deny_commands.load(Ordering::SeqCst) && !spec.admin_only {
            return Err(Error::InvalidCommandArgs(
                "Commands are temporarily disabled. Try again soon.".into(),
            ));
        }

        let snapshot = self.store.snapshot();
        perms::check_channel_perms(&snapshot, name, event.guild_id, event.channel_id)?;
        perms::check_role_perms(&snapshot, name, event.guild_id, &event.author.role_ids())?;

        if spec.admin_only && !snapshot.admins.contains_key(&event.author.id) {
            return Err(Error::InvalidPerms(format!(
                "{} You are not an admin!",
                event.author.mention
            )));
        }
        Ok(())
    }

    async fn execute(
        &self,
        event: &ChatEvent,
        command: Command,
        cfg: &BotConfig,
    ) -> Result<Vec<String>> {
        match command {
            Command::Admin(cmd) => handlers::admin::run(self, event, cmd, cfg).await,
            Command::Dash => handlers::info::dash(self),
            Command::Dist { systems } => handlers::info::dist(self, &systems).await,
            Command::Drop { amount, system, set } => {
                handlers::drop::run(self, event, amount, &system, set.as_deref(), cfg).await
            }
            Command::Feedback { content } => {
                handlers::info::feedback(self, event, &content, cfg).await
            }
            Command::Fort(args) => handlers::fort::run(self, event, args, cfg).await,
            Command::Help => handlers::info::help(cfg),
            Command::Hold(args) => handlers::hold::run(self, event, args, cfg).await,
            Command::Kos(cmd) => handlers::kos::run(self, event, cmd, cfg).await,
            Command::Status => handlers::info::status(self),
            Command::Time => handlers::info::time(),
            Command::Track(cmd) => handlers::track::run(self, event, cmd, cfg).await,
            Command::Trigger { systems } => handlers::info::trigger(self, &systems, cfg).await,
            Command::Um(args) => handlers::um::run(self, event, args, cfg).await,
            Command::User(args) => handlers::user::run(self, event, args, cfg).await,
            Command::Whois { name } => handlers::info::whois(self, &name).await,
        }
    }

    /// Convert an error into a user-visible reply.
    async fn reply_error(&self, event: &ChatEvent, cfg: &BotConfig, err: Error) {
        let ttl = Duration::from_secs(cfg.ttl);

        if err.is_user_error() {
            info!(context = %event.log_context(), %err, "user error");
            let _ = self.transport.send_ttl(event.channel_id, &err.to_string(), ttl).await;
            let _ = self.transport.delete(event.channel_id, event.message_id).await;
            return;
        }

        match &err {
            Error::ValidationFail(_) | Error::IntegrityConflict(_) => {
                error!(context = %event.log_context(), %err, "cache invariant violated");
                let text = format!(
                    "A data validation problem occurred. Please contact {}.",
                    self.maintainer
                );
                let _ = self.transport.send_ttl(event.channel_id, &text, ttl).await;
            }
            Error::Remote(_) | Error::FailedJob(_) => {
                warn!(context = %event.log_context(), %err, "remote unavailable");
                let text = "A required service is temporarily unavailable. Try again shortly.";
                let _ = self.transport.send_ttl(event.channel_id, text, ttl).await;
            }
            Error::SheetParsing(_) | Error::NameCollision { .. } => {
                error!(context = %event.log_context(), %err, "sheet parse failed");
                let _ = self.transport.send(event.channel_id, &err.to_string()).await;
            }
            _ => {
                error!(context = %event.log_context(), %err, "unexpected error in handler");
                let text = format!(
                    "Something unexpected went wrong and has been logged. Poke {} if it persists.",
                    self.maintainer
                );
                let _ = self.transport.send(event.channel_id, &text).await;
            }
        }
    }
}
