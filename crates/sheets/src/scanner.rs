//! The scanner trait, registry and debounced scheduling.
//!
//! One scanner exists per remote document. A scan pulls a full snapshot,
//! parses it into domain rows and atomically replaces the cache subset the
//! scanner owns; a failed fetch or parse leaves the cache untouched. All
//! writes to a document — scans and handler batches alike — serialize on
//! the registry's per-scanner writer lock, giving exactly one writer per
//! document at any instant.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

use rampart_core::{Error, Result};
use rampart_store::{Session, Store};

use crate::client::{InputOption, RetryClient};
use crate::payload::CellUpdate;

/// A per-document scanner.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Registry name, e.g. `fort` or `undermine_main`.
    fn name(&self) -> &str;

    /// The retrying client this scanner fetches and writes through.
    fn client(&self) -> &RetryClient;

    /// Fetch the full worksheet into the scanner's cell snapshot.
    /// Idempotent; does not touch the cache.
    async fn update_cells(&self) -> Result<()>;

    /// Parse the current snapshot, drop the rows this scanner owns and
    /// insert the parsed replacements in dependency order.
    ///
    /// Runs inside a session: any error rolls the whole scan back.
    fn parse_into(&self, session: &mut Session) -> Result<()>;

    /// Full scan: refresh cells, then parse-and-replace inside a session.
    async fn scan(&self, store: &Store) -> Result<()> {
        self.update_cells().await?;
        store.with_session_retry(3, |session| self.parse_into(session))
    }
}

/// A registered scanner plus its single-writer lock.
#[derive(Clone)]
pub struct ScannerHandle {
    scanner: Arc<dyn Scanner>,
    writer: Arc<Mutex<()>>,
}

impl ScannerHandle {
    /// The wrapped scanner.
    pub fn scanner(&self) -> &Arc<dyn Scanner> {
        &self.scanner
    }

    /// Run a full scan holding the writer lock.
    pub async fn scan(&self, store: &Store) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.scanner.scan(store).await
    }

    /// Send a write batch holding the writer lock.
    pub async fn send_batch(&self, updates: &[CellUpdate], input: InputOption) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let _writer = self.writer.lock().await;
        info!(scanner = self.scanner.name(), count = updates.len(), "sending sheet batch");
        self.scanner.client().batch_update(updates, input).await
    }

}

/// Scanner registry: written once at startup, reread on cycle tick.
///
/// `schedule_scan` debounces: while a scan for a name is pending, further
/// requests coalesce into it.
pub struct ScannerRegistry {
    store: Store,
    scanners: DashMap<String, ScannerHandle>,
    pending: Arc<DashMap<String, ()>>,
}

impl ScannerRegistry {
    /// An empty registry over `store`.
    pub fn new(store: Store) -> Self {
        Self { store, scanners: DashMap::new(), pending: Arc::new(DashMap::new()) }
    }

    /// The store scans write into.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Register a scanner under its name.
    pub fn insert(&self, scanner: Arc<dyn Scanner>) {
        let name = scanner.name().to_string();
        self.scanners
            .insert(name, ScannerHandle { scanner, writer: Arc::new(Mutex::new(())) });
    }

    /// Fetch a handle by name.
    pub fn get(&self, name: &str) -> Result<ScannerHandle> {
        self.scanners.get(name).map(|entry| entry.clone()).ok_or_else(|| {
            Error::InvalidCommandArgs(
                "The scanners are not ready. Please try again in 15 seconds.".into(),
            )
        })
    }

    /// Names of all registered scanners.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.scanners.iter().map(|entry| entry.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Scan a document immediately, holding its writer lock.
    pub async fn scan_now(&self, name: &str) -> Result<()> {
        self.get(name)?.scan(&self.store).await
    }

    /// Schedule a debounced scan after `delay`.
    ///
    /// While one is pending for `name`, further calls coalesce.
    pub fn schedule_scan(self: &Arc<Self>, name: &str, delay: Duration) {
        if self.pending.insert(name.to_string(), ()).is_some() {
            return;
        }

        let registry = Arc::clone(self);
        let name = name.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.pending.remove(&name);
            if let Err(err) = registry.scan_now(&name).await {
                error!(scanner = %name, %err, "scheduled scan failed, cache retains previous state");
            }
        });
    }

    /// Schedule every registered scanner.
    pub fn schedule_all(self: &Arc<Self>, delay: Duration) {
        for name in self.names() {
            self.schedule_scan(&name, delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MajorDim, SheetClient, ValueRender};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullClient;

    #[async_trait]
    impl SheetClient for NullClient {
        async fn title(&self) -> Result<String> {
            Ok("doc".into())
        }
        async fn whole_sheet(&self) -> Result<Vec<Vec<String>>> {
            Ok(vec![])
        }
        async fn batch_get(
            &self,
            _r: &[String],
            _d: MajorDim,
            _v: ValueRender,
        ) -> Result<Vec<Vec<Vec<String>>>> {
            Ok(vec![])
        }
        async fn batch_update(&self, _u: &[CellUpdate], _i: InputOption) -> Result<()> {
            Ok(())
        }
        async fn change_worksheet(&self, _p: &str) -> Result<()> {
            Ok(())
        }
    }

    struct CountingScanner {
        client: RetryClient,
        scans: AtomicUsize,
    }

    #[async_trait]
    impl Scanner for CountingScanner {
        fn name(&self) -> &str {
            "counting"
        }
        fn client(&self) -> &RetryClient {
            &self.client
        }
        async fn update_cells(&self) -> Result<()> {
            Ok(())
        }
        fn parse_into(&self, _session: &mut Session) -> Result<()> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn registry() -> (Arc<ScannerRegistry>, Arc<CountingScanner>) {
        let registry = Arc::new(ScannerRegistry::new(Store::new()));
        let scanner = Arc::new(CountingScanner {
            client: RetryClient::new(Arc::new(NullClient)),
            scans: AtomicUsize::new(0),
        });
        registry.insert(Arc::clone(&scanner) as Arc<dyn Scanner>);
        (registry, scanner)
    }

    #[tokio::test]
    async fn unknown_scanner_is_a_user_error() {
        let (registry, _) = registry();
        assert!(registry.get("nope").unwrap_err().is_user_error());
    }

    #[tokio::test]
    async fn scan_now_parses() {
        let (registry, scanner) = registry();
        registry.scan_now("counting").await.unwrap();
        assert_eq!(scanner.scans.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_scans_coalesce() {
        let (registry, scanner) = registry();

        registry.schedule_scan("counting", Duration::from_secs(10));
        registry.schedule_scan("counting", Duration::from_secs(10));
        registry.schedule_scan("counting", Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(11)).await;
        // Let the spawned task run to completion.
        tokio::task::yield_now().await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(scanner.scans.load(Ordering::SeqCst), 1);
    }
}
