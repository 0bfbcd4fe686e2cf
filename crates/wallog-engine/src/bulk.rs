//! Bulk upload processing.
//!
//! Externally edited rows come back as `{shard, id, fields}` items.
//! Each row is validated up front (bad rows fail the whole request
//! before any remote call), then fetched, diffed and routed through the
//! mutation pipeline. Rows whose record has vanished, or whose patch is
//! rejected, are reported in the summary - one bad row never aborts the
//! rest.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::{Map, Value};
use serde::Serialize;
use tracing::{info, warn};
use wallog_core::{fields, ShardSet, ShardView};
use wallog_store::{RemoteStore, StoreError};

use crate::diff::{diff_record, ChangeEntry, FieldWarning};
use crate::error::{EngineError, EngineResult};
use crate::permissions::FieldPermissions;
use crate::pipeline::{MutationPipeline, PatchOp};

/// One uploaded row.
#[derive(Debug, Clone)]
pub struct UploadItem {
    /// Shard key naming the collection the record lives in.
    pub shard: String,
    /// Shard-local record id.
    pub id: String,
    /// Proposed field values.
    pub fields: Map<String, Value>,
}

/// Who is uploading, and under which permission regime.
pub enum UploadMode<'a> {
    /// Every changed field is accepted and audited; no rules apply.
    Reviewer,
    /// Only editable fields from the permission set, each validated
    /// against its rule.
    Supplier(&'a FieldPermissions),
}

/// A rule rejection on one row.
#[derive(Debug, Clone, Serialize)]
pub struct RowWarning {
    pub shard: String,
    pub id: String,
    pub field: String,
    pub message: String,
}

/// A row that could not be processed or written.
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub shard: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub detail: String,
}

/// Structured result of one upload.
#[derive(Debug, Default, Serialize)]
pub struct UploadSummary {
    pub total_received: usize,
    /// Rows with at least one successfully patched field.
    pub total_updated: usize,
    /// Rows with no real change.
    pub total_skipped: usize,
    /// Audit entries created.
    pub total_change_entries: usize,
    pub validation_warnings: Vec<RowWarning>,
    pub errors: Vec<RowError>,
}

/// Bulk update processor.
pub struct BulkUpdater {
    store: Arc<dyn RemoteStore>,
    shards: ShardSet,
    pipeline: MutationPipeline,
}

impl BulkUpdater {
    pub fn new(store: Arc<dyn RemoteStore>, shards: ShardSet) -> Self {
        Self {
            pipeline: MutationPipeline::new(store.clone()),
            store,
            shards,
        }
    }

    /// Replace the pipeline (tests tune the chunk size).
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: MutationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Apply one batch of uploaded rows.
    ///
    /// Fails with a `Validation` error - before any remote call - when a
    /// row is missing its id or names an unknown shard. Everything past
    /// validation is reported in the summary instead of thrown.
    pub async fn apply(
        &self,
        items: Vec<UploadItem>,
        mode: UploadMode<'_>,
        actor: &str,
        source: &str,
    ) -> EngineResult<UploadSummary> {
        if items.is_empty() {
            return Err(EngineError::validation("upload contains no rows"));
        }

        // Reject malformed input outright.
        for (index, item) in items.iter().enumerate() {
            if item.id.trim().is_empty() {
                return Err(EngineError::validation(format!(
                    "row {index} is missing its record id"
                )));
            }
            if self.shards.get(&item.shard).is_none() {
                return Err(EngineError::validation(format!(
                    "row {index} names unknown shard '{}'",
                    item.shard
                )));
            }
        }

        let mut summary = UploadSummary {
            total_received: items.len(),
            ..UploadSummary::default()
        };

        let permissions = match &mode {
            UploadMode::Reviewer => None,
            UploadMode::Supplier(set) => Some(*set),
        };

        // Fetch and diff every row concurrently.
        let rows = items.iter().map(|item| {
            let view = self.shards.get(&item.shard).expect("validated above");
            self.diff_row(item, view, permissions, actor, source)
        });

        let mut entries: Vec<ChangeEntry> = Vec::new();
        let mut patches: Vec<PatchOp> = Vec::new();

        for outcome in join_all(rows).await {
            match outcome {
                RowOutcome::Changed {
                    patch,
                    row_entries,
                    warnings,
                } => {
                    summary.extend_warnings(warnings);
                    entries.extend(row_entries);
                    patches.push(patch);
                }
                RowOutcome::Skipped { warnings } => {
                    summary.extend_warnings(warnings);
                    summary.total_skipped += 1;
                }
                RowOutcome::Failed(error) => summary.errors.push(error),
            }
        }

        info!(
            rows = summary.total_received,
            to_patch = patches.len(),
            entries = entries.len(),
            "Upload diff complete"
        );

        let applied = self.pipeline.apply(entries, patches).await;

        summary.total_change_entries = applied.entries.succeeded;
        summary.total_updated = applied.patches.succeeded;
        for failure in applied.entries.failures {
            summary.errors.push(RowError {
                shard: String::new(),
                id: None,
                detail: format!("audit entry not recorded: {}", failure.detail),
            });
        }
        for failure in applied.patches.failures {
            let shard = self
                .shards
                .iter()
                .find(|v| v.collection == failure.collection)
                .map(|v| v.key.clone())
                .unwrap_or_default();
            summary.errors.push(RowError {
                shard,
                id: failure.id,
                detail: failure.detail,
            });
        }

        Ok(summary)
    }

    async fn diff_row(
        &self,
        item: &UploadItem,
        view: &ShardView,
        permissions: Option<&FieldPermissions>,
        actor: &str,
        source: &str,
    ) -> RowOutcome {
        let current = match self
            .store
            .fetch_by_id(&view.collection, &item.id, None)
            .await
        {
            Ok(record) => record,
            Err(StoreError::NotFound { .. }) => {
                return RowOutcome::Failed(RowError {
                    shard: item.shard.clone(),
                    id: Some(item.id.clone()),
                    detail: "record not found".to_string(),
                });
            }
            Err(err) => {
                warn!(shard = %item.shard, id = %item.id, error = %err, "Row fetch failed");
                return RowOutcome::Failed(RowError {
                    shard: item.shard.clone(),
                    id: Some(item.id.clone()),
                    detail: err.to_string(),
                });
            }
        };

        let proposed = strip_reserved(&item.fields, view);
        let case_id = current
            .get_str(fields::NOTIFICATION_ID)
            .unwrap_or(item.id.as_str())
            .to_string();

        let diff = diff_record(&current, &proposed, permissions, &case_id, actor, source);

        let warnings = diff
            .warnings
            .into_iter()
            .map(|FieldWarning { field, message }| RowWarning {
                shard: item.shard.clone(),
                id: item.id.clone(),
                field,
                message,
            })
            .collect();

        if diff.accepted.is_empty() {
            return RowOutcome::Skipped { warnings };
        }

        RowOutcome::Changed {
            patch: PatchOp {
                collection: view.collection.clone(),
                id: item.id.clone(),
                body: diff.accepted,
            },
            row_entries: diff.entries,
            warnings,
        }
    }
}

enum RowOutcome {
    Changed {
        patch: PatchOp,
        row_entries: Vec<ChangeEntry>,
        warnings: Vec<RowWarning>,
    },
    Skipped {
        warnings: Vec<RowWarning>,
    },
    Failed(RowError),
}

impl UploadSummary {
    fn extend_warnings(&mut self, warnings: Vec<RowWarning>) {
        self.validation_warnings.extend(warnings);
    }
}

/// Fields a caller may never write, whatever the permission set says.
fn strip_reserved(proposed: &Map<String, Value>, view: &ShardView) -> Map<String, Value> {
    proposed
        .iter()
        .filter(|(field, _)| {
            field.as_str() != fields::STAGE
                && field.as_str() != fields::CREATED_ON
                && field.as_str() != fields::VERSION
                && field.as_str() != view.id_field.as_str()
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
