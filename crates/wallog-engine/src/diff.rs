//! Change detection against the current remote state.
//!
//! Uploaded rows propose field values; only semantically real changes
//! survive. Values are compared by canonical text form, so `null`, a
//! missing field and `""` are one "empty" value, and `"1"` equals the
//! number `1`. Every accepted change yields an immutable audit entry.

use serde_json::{Map, Value};
use wallog_core::fields::{self, change_log};
use wallog_store::record::value_text;
use wallog_store::RecordData;

use crate::permissions::FieldPermissions;

/// One accepted field change, recorded for approval.
///
/// Created once per diff and never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    /// Case id of the record the change belongs to.
    pub case_id: String,
    pub field: String,
    /// Stringified previous value; empty for "was not set".
    pub old_value: String,
    /// Stringified proposed value; empty for "cleared".
    pub new_value: String,
    /// Who proposed the change.
    pub actor: String,
    /// Where the change came from, e.g. `"upload"`.
    pub source: String,
}

impl ChangeEntry {
    /// The creation payload for the change-log collection, always in
    /// pending-approval status.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            fields::NOTIFICATION_ID.to_string(),
            Value::String(self.case_id.clone()),
        );
        body.insert(
            change_log::FIELD.to_string(),
            Value::String(self.field.clone()),
        );
        body.insert(
            change_log::OLD_VALUE.to_string(),
            Value::String(self.old_value.clone()),
        );
        body.insert(
            change_log::NEW_VALUE.to_string(),
            Value::String(self.new_value.clone()),
        );
        body.insert(
            change_log::CHANGED_BY.to_string(),
            Value::String(self.actor.clone()),
        );
        body.insert(
            change_log::SOURCE.to_string(),
            Value::String(self.source.clone()),
        );
        body.insert(
            change_log::STATUS.to_string(),
            Value::from(change_log::STATUS_PENDING),
        );
        Value::Object(body)
    }
}

/// A proposed value rejected by its field rule. Not an error: the field
/// is simply excluded from the mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub field: String,
    pub message: String,
}

/// Result of diffing one record.
#[derive(Debug, Default)]
pub struct RecordDiff {
    /// Fields to write, with their proposed values.
    pub accepted: Map<String, Value>,
    /// Audit entries for the accepted fields.
    pub entries: Vec<ChangeEntry>,
    /// Rule rejections.
    pub warnings: Vec<FieldWarning>,
}

impl RecordDiff {
    /// A record with nothing to write is skipped, not failed.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Compare proposed values against the current record.
///
/// With a permission set, only fields present in it and not read-only
/// participate, and each changed value must pass the field's rule.
/// Without one (the reviewer path), every proposed field participates
/// and no rules apply.
#[must_use]
pub fn diff_record(
    current: &RecordData,
    proposed: &Map<String, Value>,
    permissions: Option<&FieldPermissions>,
    case_id: &str,
    actor: &str,
    source: &str,
) -> RecordDiff {
    let mut diff = RecordDiff::default();

    for (field, proposed_value) in proposed {
        let rule = match permissions {
            Some(set) => {
                let Some(permission) = set.get(field) else {
                    continue;
                };
                if permission.read_only {
                    continue;
                }
                permission.rule.as_ref()
            }
            None => None,
        };

        let old_text = current.field_text(field);
        let new_text = value_text(proposed_value);

        if old_text == new_text {
            continue;
        }

        if let Some(rule) = rule {
            if !rule.accepts(&new_text) {
                diff.warnings.push(FieldWarning {
                    field: field.clone(),
                    message: rule.message(),
                });
                continue;
            }
        }

        diff.entries.push(ChangeEntry {
            case_id: case_id.to_string(),
            field: field.clone(),
            old_value: old_text,
            new_value: new_text,
            actor: actor.to_string(),
            source: source.to_string(),
        });
        diff.accepted.insert(field.clone(), proposed_value.clone());
    }

    diff
}
