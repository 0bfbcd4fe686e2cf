//! The reconciliation run.
//!
//! Loads the auxiliary lookup sets once, then walks every shard:
//! fetch all records, reclassify, and patch back only the records whose
//! cached stage actually changed. Shard failures are recorded and the
//! run moves on; at most one run executes at a time, and a concurrent
//! trigger is rejected immediately rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};
use wallog_core::{fields, Clock, ShardSet, ShardView};
use wallog_store::{QuerySpec, RemoteStore};

use crate::classify::classify;
use crate::error::{EngineError, EngineResult};
use crate::lookups::{load_disputed_serials, load_problem_facilities};
use crate::pipeline::{MutationPipeline, PatchOp};

/// Cap on the error list carried in a run summary.
const ERROR_CAP: usize = 50;

/// Preferred page size for the per-shard full scans.
const SCAN_PAGE_SIZE: u32 = 5000;

/// Which part of the run an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    /// Loading a shard's records.
    Fetch,
    /// Writing reclassified stages back.
    Update,
}

/// One recorded failure of a run.
#[derive(Debug, Clone, Serialize)]
pub struct JobErrorEntry {
    pub shard: String,
    pub phase: JobPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub detail: String,
}

/// Structured summary of one reconciliation run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub total_processed: usize,
    pub total_updated: usize,
    pub total_skipped: usize,
    pub total_errors: usize,
    /// First [`ERROR_CAP`] errors; `total_errors` carries the full count.
    pub errors: Vec<JobErrorEntry>,
    pub duration_seconds: f64,
    pub completed_at: DateTime<Utc>,
}

/// Orchestrates reconciliation runs over a shard set.
pub struct ReconciliationJob {
    store: Arc<dyn RemoteStore>,
    shards: ShardSet,
    clock: Arc<dyn Clock>,
    pipeline: MutationPipeline,
    /// Run guard, scoped to this orchestrator instance.
    running: AtomicBool,
}

impl ReconciliationJob {
    pub fn new(store: Arc<dyn RemoteStore>, shards: ShardSet, clock: Arc<dyn Clock>) -> Self {
        Self {
            pipeline: MutationPipeline::new(store.clone()),
            store,
            shards,
            clock,
            running: AtomicBool::new(false),
        }
    }

    /// Replace the pipeline (tests tune the chunk size).
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: MutationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Whether a run is currently in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Trigger one run. Rejects immediately with `AlreadyRunning` when a
    /// run is in progress - concurrent triggers are not queued.
    pub async fn try_run(&self) -> EngineResult<RunSummary> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Reconciliation trigger rejected, run already in progress");
            return Err(EngineError::AlreadyRunning);
        }

        let result = self.run().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run(&self) -> EngineResult<RunSummary> {
        let started = Instant::now();
        info!("Starting reconciliation run");

        // Both lookup sets, loaded jointly. Without complete sets every
        // classification downstream would be suspect, so this is fatal.
        let (disputed, problem_facilities) = tokio::join!(
            load_disputed_serials(self.store.as_ref()),
            load_problem_facilities(self.store.as_ref()),
        );
        let disputed =
            disputed.map_err(|e| EngineError::lookup_failed(format!("disputed serials: {e}")))?;
        let problem_facilities = problem_facilities
            .map_err(|e| EngineError::lookup_failed(format!("problem facilities: {e}")))?;

        info!(
            disputed = disputed.len(),
            problem_facilities = problem_facilities.len(),
            "Auxiliary lookups loaded"
        );

        let today = self.clock.today();
        let mut summary = RunSummary {
            total_processed: 0,
            total_updated: 0,
            total_skipped: 0,
            total_errors: 0,
            errors: Vec::new(),
            duration_seconds: 0.0,
            completed_at: self.clock.now(),
        };
        let mut all_errors: Vec<JobErrorEntry> = Vec::new();

        for view in &self.shards {
            let records = match self.fetch_shard(view).await {
                Ok(records) => records,
                Err(err) => {
                    error!(shard = %view.key, error = %err, "Shard fetch failed");
                    all_errors.push(JobErrorEntry {
                        shard: view.key.clone(),
                        phase: JobPhase::Fetch,
                        id: None,
                        detail: err.to_string(),
                    });
                    continue;
                }
            };

            info!(shard = %view.key, records = records.len(), "Reclassifying shard");
            summary.total_processed += records.len();

            let mut patches: Vec<PatchOp> = Vec::new();
            for record in &records {
                let fresh = classify(record, &disputed, &problem_facilities, today);
                let cached = record.get_str(fields::STAGE);

                if fresh.map(|s| s.as_str()) == cached {
                    summary.total_skipped += 1;
                    continue;
                }

                let Some(id) = record.get_str(&view.id_field) else {
                    all_errors.push(JobErrorEntry {
                        shard: view.key.clone(),
                        phase: JobPhase::Update,
                        id: None,
                        detail: format!("record missing id field '{}'", view.id_field),
                    });
                    continue;
                };

                let mut body = Map::new();
                body.insert(
                    fields::STAGE.to_string(),
                    fresh.map_or(Value::Null, |s| Value::String(s.as_str().to_string())),
                );
                patches.push(PatchOp {
                    collection: view.collection.clone(),
                    id: id.to_string(),
                    body,
                });
            }

            info!(
                shard = %view.key,
                to_update = patches.len(),
                unchanged = records.len() - patches.len(),
                "Shard reclassified"
            );

            let outcome = self.pipeline.submit_patches(patches).await;
            summary.total_updated += outcome.succeeded;
            for failure in outcome.failures {
                all_errors.push(JobErrorEntry {
                    shard: view.key.clone(),
                    phase: JobPhase::Update,
                    id: failure.id,
                    detail: failure.detail,
                });
            }
        }

        summary.total_errors = all_errors.len();
        all_errors.truncate(ERROR_CAP);
        summary.errors = all_errors;
        summary.duration_seconds = started.elapsed().as_secs_f64();
        summary.completed_at = self.clock.now();

        info!(
            processed = summary.total_processed,
            updated = summary.total_updated,
            skipped = summary.total_skipped,
            errors = summary.total_errors,
            duration_seconds = summary.duration_seconds,
            "Reconciliation run complete"
        );

        Ok(summary)
    }

    async fn fetch_shard(
        &self,
        view: &ShardView,
    ) -> Result<Vec<wallog_store::RecordData>, wallog_store::StoreError> {
        let spec = QuerySpec::new()
            .with_select(view.stage_select())
            .with_page_size_hint(SCAN_PAGE_SIZE);
        self.store.query_all(&view.collection, &spec).await
    }
}
