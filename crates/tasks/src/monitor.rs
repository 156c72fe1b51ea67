//! A monitor for tasks that should be running constantly.
//!
//! Each entry holds a factory so a crashed or cancelled task can be
//! respawned without the handler code knowing how it is built. The status
//! table keeps liveness observable from chat.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;

use rampart_core::Result;

type BoxFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type TaskFactory = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

/// Observed state of a monitored task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task is alive.
    Running,
    /// The task exited; the cause when one was recorded.
    Stopped(String),
}

struct TaskEntry {
    factory: TaskFactory,
    handle: JoinHandle<()>,
    fault: Arc<Mutex<Option<String>>>,
    description: String,
}

/// A registry of named background tasks.
#[derive(Default)]
pub struct TaskMonitor {
    tasks: Mutex<BTreeMap<String, TaskEntry>>,
}

impl TaskMonitor {
    /// An empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn(factory: &TaskFactory, name: &str) -> (JoinHandle<()>, Arc<Mutex<Option<String>>>) {
        let fault = Arc::new(Mutex::new(None));
        let fut = factory();
        let fault_slot = Arc::clone(&fault);
        let name = name.to_string();
        let handle = tokio::spawn(async move {
            if let Err(err) = fut.await {
                error!(task = %name, %err, "monitored task stopped with error");
                *fault_slot.lock() = Some(err.to_string());
            }
        });
        (handle, fault)
    }

    /// Register and immediately start a task.
    ///
    /// A task already registered under `name` is cancelled and replaced.
    pub fn add<F, Fut>(&self, name: &str, description: &str, factory: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let factory: TaskFactory = Arc::new(move || {
            let fut: BoxFuture = Box::pin(factory());
            fut
        });
        let (handle, fault) = Self::spawn(&factory, name);

        let mut tasks = self.tasks.lock();
        if let Some(previous) = tasks.insert(
            name.to_string(),
            TaskEntry { factory, handle, fault, description: description.to_string() },
        ) {
            previous.handle.abort();
        }
    }

    /// Cancel the named task and spawn a fresh one from its factory.
    pub fn restart(&self, name: &str) -> Result<()> {
        let mut tasks = self.tasks.lock();
        let entry = tasks.get_mut(name).ok_or(rampart_core::Error::NoMatch {
            needle: name.to_string(),
            kind: "Task",
        })?;

        entry.handle.abort();
        let (handle, fault) = Self::spawn(&entry.factory, name);
        entry.handle = handle;
        entry.fault = fault;
        Ok(())
    }

    /// The status of one task.
    pub fn status(&self, name: &str) -> Option<TaskStatus> {
        let tasks = self.tasks.lock();
        tasks.get(name).map(|entry| {
            if entry.handle.is_finished() {
                let cause =
                    entry.fault.lock().clone().unwrap_or_else(|| "Unknown cause".to_string());
                TaskStatus::Stopped(cause)
            } else {
                TaskStatus::Running
            }
        })
    }

    /// Rows of (name, status, description) for the `dash` table, header
    /// first.
    pub fn status_table(&self) -> Vec<[String; 3]> {
        let tasks = self.tasks.lock();
        let mut rows =
            vec![["Name".to_string(), "Status".to_string(), "Description".to_string()]];

        for (name, entry) in tasks.iter() {
            let status = if entry.handle.is_finished() {
                let cause =
                    entry.fault.lock().clone().unwrap_or_else(|| "Unknown cause".to_string());
                format!("Stopped ({cause})")
            } else {
                "Running".to_string()
            };
            rows.push([name.clone(), status, entry.description.clone()]);
        }

        rows
    }

    /// Cancel every task; used on shutdown.
    pub fn abort_all(&self) {
        for entry in self.tasks.lock().values() {
            entry.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_core::Error;
    use std::time::Duration;

    #[tokio::test]
    async fn running_tasks_show_running() {
        let monitor = TaskMonitor::new();
        monitor.add("forever", "spins", || async {
            loop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        });

        tokio::task::yield_now().await;
        assert_eq!(monitor.status("forever"), Some(TaskStatus::Running));
        monitor.abort_all();
    }

    #[tokio::test]
    async fn failed_tasks_record_their_cause() {
        let monitor = TaskMonitor::new();
        monitor.add("doomed", "fails fast", || async {
            Err(Error::Remote("feed went away".into()))
        });

        // Give the task a moment to run to completion.
        tokio::time::sleep(Duration::from_millis(20)).await;
        match monitor.status("doomed") {
            Some(TaskStatus::Stopped(cause)) => assert!(cause.contains("feed went away")),
            other => panic!("expected stopped, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn restart_revives_a_finished_task() {
        let monitor = TaskMonitor::new();
        monitor.add("oneshot", "runs once", || async { Ok(()) });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(monitor.status("oneshot"), Some(TaskStatus::Stopped(_))));

        monitor.restart("oneshot").unwrap();
        // The fresh instance finishes cleanly again; the point is the
        // factory respawned it at all.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(monitor.status("oneshot").is_some());

        assert!(monitor.restart("missing").is_err());
    }

    #[tokio::test]
    async fn status_table_has_header_and_rows() {
        let monitor = TaskMonitor::new();
        monitor.add("a", "first", || async { Ok(()) });
        monitor.add("b", "second", || async {
            loop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        });

        let table = monitor.status_table();
        assert_eq!(table[0], ["Name", "Status", "Description"]);
        assert_eq!(table.len(), 3);
        monitor.abort_all();
    }
}
