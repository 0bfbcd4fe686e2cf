//! Chunked batch mutation.
//!
//! Mutations are grouped into bounded chunks, each submitted as one
//! independent-operation batch. Chunks run in parallel; operations
//! inside a chunk are independent of each other, and nothing is
//! retried - failures are reconciled against the chunk and reported.
//!
//! Three response shapes exist: overall success with no sub-responses
//! (everything succeeded), overall failure with no sub-responses
//! (everything failed with the batch status), and per-operation
//! sub-responses correlated by content id - where operations omitted
//! from the responses are no-content successes.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{Map, Value};
use serde::Serialize;
use tracing::{error, info, warn};
use wallog_store::{BatchOperation, RemoteStore};

use crate::diff::ChangeEntry;
use wallog_core::fields::change_log;

/// The remote store's own batch limit.
pub const BATCH_LIMIT: usize = 1000;

/// One field patch against a shard record.
#[derive(Debug, Clone)]
pub struct PatchOp {
    pub collection: String,
    pub id: String,
    pub body: Map<String, Value>,
}

/// One operation that did not make it.
#[derive(Debug, Clone, Serialize)]
pub struct OperationFailure {
    pub collection: String,
    /// Record id for patches; absent for audit-entry creations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub detail: String,
}

/// Aggregated result of one submission.
#[derive(Debug, Default)]
pub struct SubmitOutcome {
    pub succeeded: usize,
    pub failures: Vec<OperationFailure>,
}

impl SubmitOutcome {
    fn absorb(&mut self, other: SubmitOutcome) {
        self.succeeded += other.succeeded;
        self.failures.extend(other.failures);
    }
}

/// Result of a two-phase apply.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    /// Audit-entry creation results. Failures here never block patches.
    pub entries: SubmitOutcome,
    /// Field patch results.
    pub patches: SubmitOutcome,
}

struct PendingOp {
    operation: BatchOperation,
    collection: String,
    id: Option<String>,
}

/// Chunked, non-transactional batch mutation against the remote store.
pub struct MutationPipeline {
    store: Arc<dyn RemoteStore>,
    chunk_size: usize,
}

impl MutationPipeline {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            chunk_size: BATCH_LIMIT,
        }
    }

    /// Override the chunk bound (tests, smaller stores).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Submit audit entries first, then the patches. Entry-creation
    /// failures are logged and reported but never block or roll back
    /// the patches.
    pub async fn apply(&self, entries: Vec<ChangeEntry>, patches: Vec<PatchOp>) -> ApplyOutcome {
        let entry_outcome = if entries.is_empty() {
            SubmitOutcome::default()
        } else {
            let outcome = self.submit_entries(entries).await;
            for failure in &outcome.failures {
                warn!(detail = %failure.detail, "Audit entry creation failed");
            }
            outcome
        };

        let patch_outcome = self.submit_patches(patches).await;

        ApplyOutcome {
            entries: entry_outcome,
            patches: patch_outcome,
        }
    }

    /// Submit audit-entry creations.
    pub async fn submit_entries(&self, entries: Vec<ChangeEntry>) -> SubmitOutcome {
        let pending: Vec<PendingOp> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| PendingOp {
                operation: BatchOperation::post(
                    format!("/{}", change_log::COLLECTION),
                    entry.to_payload(),
                    chunk_local_id(i, self.chunk_size),
                ),
                collection: change_log::COLLECTION.to_string(),
                id: None,
            })
            .collect();

        self.submit(pending).await
    }

    /// Submit field patches.
    pub async fn submit_patches(&self, patches: Vec<PatchOp>) -> SubmitOutcome {
        let pending: Vec<PendingOp> = patches
            .into_iter()
            .enumerate()
            .map(|(i, patch)| PendingOp {
                operation: BatchOperation::patch(
                    format!("/{}({})", patch.collection, patch.id),
                    Value::Object(patch.body),
                    chunk_local_id(i, self.chunk_size),
                ),
                collection: patch.collection,
                id: Some(patch.id),
            })
            .collect();

        self.submit(pending).await
    }

    async fn submit(&self, pending: Vec<PendingOp>) -> SubmitOutcome {
        if pending.is_empty() {
            return SubmitOutcome::default();
        }

        let chunks: Vec<Vec<PendingOp>> = chunk(pending, self.chunk_size);
        let total_chunks = chunks.len();

        // Disjoint chunks run in parallel.
        let submissions = chunks.into_iter().enumerate().map(|(index, chunk)| {
            let store = self.store.clone();
            async move {
                info!(
                    chunk = index + 1,
                    of = total_chunks,
                    operations = chunk.len(),
                    "Submitting batch chunk"
                );
                submit_chunk(store.as_ref(), chunk).await
            }
        });

        let mut outcome = SubmitOutcome::default();
        for chunk_outcome in join_all(submissions).await {
            outcome.absorb(chunk_outcome);
        }
        outcome
    }
}

/// Content ids restart at 1 inside every chunk.
fn chunk_local_id(index: usize, chunk_size: usize) -> u32 {
    (index % chunk_size) as u32 + 1
}

fn chunk(pending: Vec<PendingOp>, size: usize) -> Vec<Vec<PendingOp>> {
    let mut chunks = Vec::new();
    let mut current = Vec::with_capacity(size.min(pending.len()));
    for op in pending {
        current.push(op);
        if current.len() == size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

async fn submit_chunk(store: &dyn RemoteStore, chunk: Vec<PendingOp>) -> SubmitOutcome {
    let operations: Vec<BatchOperation> =
        chunk.iter().map(|p| p.operation.clone()).collect();

    let outcome = match store.submit_batch(&operations).await {
        Ok(outcome) => outcome,
        Err(err) => {
            // The whole chunk failed to reach the store.
            error!(error = %err, "Batch submission failed");
            return SubmitOutcome {
                succeeded: 0,
                failures: chunk
                    .into_iter()
                    .map(|p| OperationFailure {
                        collection: p.collection,
                        id: p.id,
                        status: None,
                        code: None,
                        detail: err.to_string(),
                    })
                    .collect(),
            };
        }
    };

    if outcome.responses.is_empty() {
        if outcome.ok {
            // Shape (a): every operation succeeded without a part.
            return SubmitOutcome {
                succeeded: chunk.len(),
                failures: Vec::new(),
            };
        }
        // Shape (b): the batch was rejected wholesale.
        return SubmitOutcome {
            succeeded: 0,
            failures: chunk
                .into_iter()
                .map(|p| OperationFailure {
                    collection: p.collection,
                    id: p.id,
                    status: Some(outcome.status),
                    code: None,
                    detail: format!("batch failed with status {}", outcome.status),
                })
                .collect(),
        };
    }

    // Shape (c): correlate sub-responses; silence means success.
    let by_content_id: HashMap<&str, &wallog_store::OperationResponse> = outcome
        .responses
        .iter()
        .map(|r| (r.content_id.as_str(), r))
        .collect();

    let mut result = SubmitOutcome::default();
    for op in chunk {
        match by_content_id.get(op.operation.content_id.to_string().as_str()) {
            Some(response) if !response.is_success() => {
                result.failures.push(OperationFailure {
                    collection: op.collection,
                    id: op.id,
                    status: Some(response.status),
                    code: response.error_code(),
                    detail: response.error_message(),
                });
            }
            _ => result.succeeded += 1,
        }
    }
    result
}
