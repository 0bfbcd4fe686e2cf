//! Bulk upload tests against the fake store.

mod common;

use std::sync::Arc;

use serde_json::json;
use wallog_core::{ShardSet, ShardView};
use wallog_engine::permissions::{FieldPermission, FieldPermissions, FieldRule};
use wallog_engine::{BulkUpdater, EngineError, UploadItem, UploadMode};
use wallog_store::BatchMethod;

use common::FakeStore;

fn shards() -> ShardSet {
    ShardSet::new(vec![ShardView::new("alpha", "alphacases", "alphacaseid")])
}

fn item(id: &str, fields: serde_json::Value) -> UploadItem {
    UploadItem {
        shard: "alpha".to_string(),
        id: id.to_string(),
        fields: fields.as_object().unwrap().clone(),
    }
}

fn seeded_store() -> Arc<FakeStore> {
    let store = Arc::new(FakeStore::new());
    store.seed(
        "alphacases",
        "alphacaseid",
        vec![json!({
            "alphacaseid": "1",
            "notificationid": "N-1",
            "remark": "old",
            "trackingnumber": null,
        })],
    );
    store
}

fn open_permissions() -> FieldPermissions {
    FieldPermissions::new()
        .with("remark", FieldPermission::editable())
        .with("trackingnumber", FieldPermission::editable())
}

#[tokio::test]
async fn test_single_changed_row_patches_and_audits() {
    let store = seeded_store();
    let updater = BulkUpdater::new(store.clone(), shards());
    let permissions = open_permissions();

    let summary = updater
        .apply(
            vec![item("1", json!({"remark": "new"}))],
            UploadMode::Supplier(&permissions),
            "ops@example.com",
            "upload",
        )
        .await
        .unwrap();

    assert_eq!(summary.total_received, 1);
    assert_eq!(summary.total_updated, 1);
    assert_eq!(summary.total_change_entries, 1);
    assert_eq!(summary.total_skipped, 0);
    assert!(summary.errors.is_empty());

    let ops = store.submitted_operations();
    assert_eq!(ops.len(), 2);

    // Audit entry first, then the patch.
    let entry = &ops[0];
    assert_eq!(entry.method, BatchMethod::Post);
    assert!(entry.path.contains("changehistories"));
    let entry_body = entry.body.as_ref().unwrap();
    assert_eq!(entry_body["notificationid"], json!("N-1"));
    assert_eq!(entry_body["oldvalue"], json!("old"));
    assert_eq!(entry_body["newvalue"], json!("new"));
    assert_eq!(entry_body["changedby"], json!("ops@example.com"));

    let patch = &ops[1];
    assert_eq!(patch.method, BatchMethod::Patch);
    assert!(patch.path.contains("alphacases(1)"));
    assert_eq!(patch.body.as_ref().unwrap()["remark"], json!("new"));
}

#[tokio::test]
async fn test_unchanged_row_is_skipped_without_traffic() {
    let store = seeded_store();
    let updater = BulkUpdater::new(store.clone(), shards());
    let permissions = open_permissions();

    let summary = updater
        .apply(
            // null -> "" is not a change; "old" -> "old" neither.
            vec![item("1", json!({"remark": "old", "trackingnumber": ""}))],
            UploadMode::Supplier(&permissions),
            "a",
            "upload",
        )
        .await
        .unwrap();

    assert_eq!(summary.total_skipped, 1);
    assert_eq!(summary.total_updated, 0);
    assert_eq!(summary.total_change_entries, 0);
    assert_eq!(store.batch_count(), 0);
}

#[tokio::test]
async fn test_malformed_row_rejects_whole_upload_before_any_call() {
    let store = seeded_store();
    let updater = BulkUpdater::new(store.clone(), shards());

    let err = updater
        .apply(
            vec![
                item("1", json!({"remark": "new"})),
                UploadItem {
                    shard: "ghost".to_string(),
                    id: "9".to_string(),
                    fields: json!({}).as_object().unwrap().clone(),
                },
            ],
            UploadMode::Reviewer,
            "a",
            "upload",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Validation { .. }));
    assert_eq!(store.batch_count(), 0);

    let err = updater
        .apply(
            vec![item("", json!({"remark": "new"}))],
            UploadMode::Reviewer,
            "a",
            "upload",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
}

#[tokio::test]
async fn test_rule_rejection_warns_and_row_is_skipped() {
    let store = seeded_store();
    let updater = BulkUpdater::new(store.clone(), shards());
    let permissions = FieldPermissions::new().with(
        "trackingnumber",
        FieldPermission::editable()
            .with_rule(FieldRule::new("^1Z", Some("must start with 1Z".into())).unwrap()),
    );

    let summary = updater
        .apply(
            vec![item("1", json!({"trackingnumber": "BAD-7"}))],
            UploadMode::Supplier(&permissions),
            "a",
            "upload",
        )
        .await
        .unwrap();

    assert_eq!(summary.total_skipped, 1);
    assert_eq!(summary.validation_warnings.len(), 1);
    assert_eq!(summary.validation_warnings[0].field, "trackingnumber");
    assert_eq!(summary.validation_warnings[0].message, "must start with 1Z");
    // A rejected value is a warning, not an error.
    assert!(summary.errors.is_empty());
    assert_eq!(store.batch_count(), 0);
}

#[tokio::test]
async fn test_vanished_record_is_reported_not_fatal() {
    let store = seeded_store();
    let updater = BulkUpdater::new(store.clone(), shards());

    let summary = updater
        .apply(
            vec![
                item("1", json!({"remark": "new"})),
                item("404", json!({"remark": "whatever"})),
            ],
            UploadMode::Reviewer,
            "a",
            "upload",
        )
        .await
        .unwrap();

    assert_eq!(summary.total_updated, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].id.as_deref(), Some("404"));
    assert!(summary.errors[0].detail.contains("not found"));
}

#[tokio::test]
async fn test_reviewer_mode_ignores_permissions_but_not_reserved_fields() {
    let store = seeded_store();
    let updater = BulkUpdater::new(store.clone(), shards());

    let summary = updater
        .apply(
            vec![item(
                "1",
                json!({
                    "remark": "edited",
                    // Engine-owned; must never reach the patch.
                    "stage": "gr-si",
                }),
            )],
            UploadMode::Reviewer,
            "reviewer",
            "upload",
        )
        .await
        .unwrap();

    assert_eq!(summary.total_updated, 1);

    let ops = store.submitted_operations();
    let patch = ops.iter().find(|op| op.method == BatchMethod::Patch).unwrap();
    let body = patch.body.as_ref().unwrap();
    assert!(body.get("stage").is_none());
    assert_eq!(body["remark"], json!("edited"));
}
