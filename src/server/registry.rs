//! In-memory record of triggered automation runs.

use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::automation::{AutomationRequest, AutomationRun};
use crate::config::AutomationConfig;
use crate::device::{DeviceBridge, sanitize_serial};
use crate::error::Result;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

/// One triggered run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub device: String,
    pub package: String,
    pub video: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Finished runs kept by [`RunRegistry::new`].
pub const DEFAULT_RUN_HISTORY: usize = 256;

#[derive(Debug, Default)]
struct Runs {
    records: HashMap<Uuid, RunRecord>,
    /// Ids in registration order.
    order: VecDeque<Uuid>,
}

impl Runs {
    /// Drop the oldest finished runs until at most `history` remain.
    /// Running entries are never dropped.
    fn prune(&mut self, history: usize) {
        let finished = self
            .records
            .values()
            .filter(|r| r.status != RunStatus::Running)
            .count();
        let mut excess = finished.saturating_sub(history);
        if excess == 0 {
            return;
        }
        let records = &mut self.records;
        self.order.retain(|id| {
            let evict = excess > 0
                && records
                    .get(id)
                    .is_some_and(|r| r.status != RunStatus::Running);
            if evict {
                records.remove(id);
                excess -= 1;
            }
            !evict
        });
        debug!(remaining = records.len(), "Evicted finished runs");
    }
}

/// Shared, cloneable registry of runs.
///
/// Keeps every running entry plus the most recent `history` finished ones.
#[derive(Debug, Clone)]
pub struct RunRegistry {
    runs: Arc<RwLock<Runs>>,
    history: usize,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::with_history(DEFAULT_RUN_HISTORY)
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry keeping at most `history` finished runs.
    pub fn with_history(history: usize) -> Self {
        Self {
            runs: Arc::default(),
            history,
        }
    }

    /// Record a new run in the `running` state and return its id.
    pub fn register(&self, request: &AutomationRequest) -> Uuid {
        let id = Uuid::new_v4();
        let record = RunRecord {
            id,
            device: request.serial.clone(),
            package: request.package.clone(),
            video: request.url.clone(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
        };
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        runs.records.insert(id, record);
        runs.order.push_back(id);
        id
    }

    /// Mark a run finished. Unknown ids are ignored.
    pub fn finish(&self, id: Uuid, succeeded: bool) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = runs.records.get_mut(&id) {
            record.status = if succeeded {
                RunStatus::Succeeded
            } else {
                RunStatus::Failed
            };
            record.finished_at = Some(Utc::now());
            runs.prune(self.history);
        }
    }

    pub fn get(&self, id: Uuid) -> Option<RunRecord> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .get(&id)
            .cloned()
    }

    /// All runs, oldest first.
    pub fn list(&self) -> Vec<RunRecord> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.order
            .iter()
            .filter_map(|id| runs.records.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Register a run and execute it on its own OS thread.
///
/// The thread is named `tapbot-run-<serial>`. A panic inside the run is
/// caught and recorded as a failure.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned; the run is then
/// recorded as failed.
pub fn spawn_run(
    registry: &RunRegistry,
    bridge: Arc<dyn DeviceBridge>,
    config: &AutomationConfig,
    request: AutomationRequest,
) -> Result<Uuid> {
    let id = registry.register(&request);
    let thread_name = format!("tapbot-run-{}", sanitize_serial(&request.serial));
    let config = config.clone();
    let worker_registry = registry.clone();

    let spawned = thread::Builder::new().name(thread_name).spawn(move || {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            match AutomationRun::new(bridge, &request, &config) {
                Ok(mut run) => run.run(),
                Err(e) => {
                    error!(serial = %request.serial, error = %e, "Could not start run");
                    false
                }
            }
        }));
        let succeeded = outcome.unwrap_or_else(|_| {
            error!(serial = %request.serial, run_id = %id, "Run panicked");
            false
        });
        info!(run_id = %id, succeeded, "Run finished");
        worker_registry.finish(id, succeeded);
    });

    if let Err(e) = spawned {
        registry.finish(id, false);
        return Err(e.into());
    }
    Ok(id)
}
