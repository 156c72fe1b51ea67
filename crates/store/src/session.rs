//! Transactional sessions over the cache.
//!
//! A [`Session`] is a snapshot clone of the whole table set. Mutations touch
//! only the clone; [`Session::commit`] swaps it back in under an optimistic
//! version check. A commit whose base version lost the race to another
//! writer raises [`Error::SessionConflict`], which is retryable — re-begin
//! and re-apply. Dropping a session without committing rolls it back.
//!
//! Nested sessions are not supported; take one session per logical
//! transaction and hold it no longer than that transaction.

use parking_lot::RwLock;
use rampart_core::{Error, Result};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::debug;

use crate::tables::Tables;

struct Versioned {
    version: u64,
    tables: Arc<Tables>,
}

/// Shared handle on the cache. Clone freely; all clones see the same data.
#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<Versioned>>,
}

impl Store {
    /// An empty cache.
    pub fn new() -> Self {
        Self::with_tables(Tables::default())
    }

    /// A cache seeded with `tables`, mainly for tests.
    pub fn with_tables(tables: Tables) -> Self {
        Self { inner: Arc::new(RwLock::new(Versioned { version: 0, tables: Arc::new(tables) })) }
    }

    /// Cheap read-only snapshot of the current tables.
    pub fn snapshot(&self) -> Arc<Tables> {
        Arc::clone(&self.inner.read().tables)
    }

    /// Begin a transactional session.
    pub fn begin_session(&self) -> Session {
        let guard = self.inner.read();
        Session {
            store: Arc::clone(&self.inner),
            base_version: guard.version,
            tables: (*guard.tables).clone(),
        }
    }

    /// Run `op` inside a session, committing on `Ok` and rolling back on
    /// `Err` — the scoped-acquisition contract.
    pub fn with_session<T>(&self, op: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut session = self.begin_session();
        let out = op(&mut session)?;
        session.commit()?;
        Ok(out)
    }

    /// Like [`Store::with_session`] but re-running `op` on commit conflicts,
    /// up to `attempts` times. Used by writers that race the dispatcher,
    /// such as the feed ingester.
    pub fn with_session_retry<T>(
        &self,
        attempts: usize,
        mut op: impl FnMut(&mut Session) -> Result<T>,
    ) -> Result<T> {
        let mut last = None;
        for attempt in 0..attempts.max(1) {
            let mut session = self.begin_session();
            let out = op(&mut session)?;
            match session.commit() {
                Ok(()) => return Ok(out),
                Err(err) if err.is_retryable() => {
                    debug!(attempt, "session commit conflict, retrying");
                    last = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last.unwrap_or_else(|| Error::Internal("retry loop without attempts".into())))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// A private working copy of the tables with commit/rollback.
pub struct Session {
    store: Arc<RwLock<Versioned>>,
    base_version: u64,
    tables: Tables,
}

impl Session {
    /// Commit the working copy.
    ///
    /// Fails with a retryable [`Error::SessionConflict`] when another
    /// session committed since this one began.
    pub fn commit(self) -> Result<()> {
        let mut guard = self.store.write();
        if guard.version != self.base_version {
            return Err(Error::SessionConflict(format!(
                "base version {} is stale, store is at {}",
                self.base_version, guard.version
            )));
        }
        guard.version += 1;
        guard.tables = Arc::new(self.tables);
        Ok(())
    }
}

impl Deref for Session {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &self.tables
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Tables {
        &mut self.tables
    }
}
