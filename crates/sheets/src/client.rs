//! The remote document capability and its retry wrapper.
//!
//! The actual sheet API (auth, rate limiting, transport) is an external
//! collaborator behind [`SheetClient`]. Scanners talk to a [`RetryClient`]
//! wrapper which gives every call a bounded timeout, doubling it on each
//! retry, and surfaces `RemoteError` once the attempts run out.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use rampart_core::{Error, Result};

use crate::payload::CellUpdate;

/// Major dimension for a batched range read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MajorDim {
    /// Blocks come back row-major.
    Rows,
    /// Blocks come back column-major.
    Columns,
}

/// How cell values are rendered by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRender {
    /// Rendered as displayed (formatted strings).
    Formatted,
    /// Raw stored values.
    Unformatted,
    /// Formula text for formula cells.
    Formula,
}

/// How written values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOption {
    /// Store as-is.
    Raw,
    /// Parse as if typed into the sheet (formulas evaluate).
    UserEntered,
}

/// Capability onto one remote document + active tab.
///
/// A1 ranges are inclusive on both ends and the sheet is 1-indexed.
#[async_trait]
pub trait SheetClient: Send + Sync {
    /// The document's title.
    async fn title(&self) -> Result<String>;

    /// The entire active tab, row-major, rows possibly ragged.
    async fn whole_sheet(&self) -> Result<Vec<Vec<String>>>;

    /// Read several A1 ranges in one call, one block per range.
    async fn batch_get(
        &self,
        ranges: &[String],
        dim: MajorDim,
        render: ValueRender,
    ) -> Result<Vec<Vec<Vec<String>>>>;

    /// Apply a batch of ranged writes.
    async fn batch_update(&self, updates: &[CellUpdate], input: InputOption) -> Result<()>;

    /// Retarget the client at another tab of the same document.
    async fn change_worksheet(&self, page: &str) -> Result<()>;
}

/// Timeout and retry schedule for remote calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Timeout of the first attempt.
    pub base_timeout: Duration,
    /// Total attempts before giving up.
    pub attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { base_timeout: Duration::from_secs(8), attempts: 3 }
    }
}

impl RetryPolicy {
    /// The timeout of a given 0-based attempt: base doubled per retry.
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.base_timeout * 2u32.saturating_pow(attempt)
    }
}

/// A [`SheetClient`] wrapper applying [`RetryPolicy`] to every call.
#[derive(Clone)]
pub struct RetryClient {
    inner: Arc<dyn SheetClient>,
    policy: RetryPolicy,
}

impl RetryClient {
    /// Wrap a client with the default policy.
    pub fn new(inner: Arc<dyn SheetClient>) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    /// Wrap a client with an explicit policy.
    pub fn with_policy(inner: Arc<dyn SheetClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn run<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T>
    where
        F: FnMut(Arc<dyn SheetClient>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last = None;
        for attempt in 0..self.policy.attempts {
            let timeout = self.policy.timeout_for(attempt);
            match tokio::time::timeout(timeout, call(Arc::clone(&self.inner))).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) if err.is_retryable() => {
                    warn!(what, attempt, %err, "remote call failed, will retry");
                    last = Some(err);
                }
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    warn!(what, attempt, ?timeout, "remote call timed out, will retry");
                    last = Some(Error::Remote(format!("{what} timed out after {timeout:?}")));
                }
            }
        }
        Err(last.unwrap_or_else(|| Error::Remote(format!("{what} failed with no attempts"))))
    }

    /// See [`SheetClient::title`].
    pub async fn title(&self) -> Result<String> {
        self.run("title", |c| async move { c.title().await }).await
    }

    /// See [`SheetClient::whole_sheet`].
    pub async fn whole_sheet(&self) -> Result<Vec<Vec<String>>> {
        self.run("whole_sheet", |c| async move { c.whole_sheet().await }).await
    }

    /// See [`SheetClient::batch_get`].
    pub async fn batch_get(
        &self,
        ranges: &[String],
        dim: MajorDim,
        render: ValueRender,
    ) -> Result<Vec<Vec<Vec<String>>>> {
        let ranges = ranges.to_vec();
        self.run("batch_get", move |c| {
            let ranges = ranges.clone();
            async move { c.batch_get(&ranges, dim, render).await }
        })
        .await
    }

    /// See [`SheetClient::batch_update`].
    pub async fn batch_update(&self, updates: &[CellUpdate], input: InputOption) -> Result<()> {
        let updates = updates.to_vec();
        self.run("batch_update", move |c| {
            let updates = updates.clone();
            async move { c.batch_update(&updates, input).await }
        })
        .await
    }

    /// See [`SheetClient::change_worksheet`].
    pub async fn change_worksheet(&self, page: &str) -> Result<()> {
        let page = page.to_string();
        self.run("change_worksheet", move |c| {
            let page = page.clone();
            async move { c.change_worksheet(&page).await }
        })
        .await
    }
}
