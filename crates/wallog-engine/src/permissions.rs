//! Per-field write permissions and validation rules.
//!
//! Permissions arrive as one remote record whose values are JSON
//! strings of the shape `{"isReadOnly":bool,"rule":{"pattern":...,
//! "message":...}}`. Entries that fail to parse are skipped - a broken
//! permission must hide a field, not break an upload.

use std::collections::HashMap;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use wallog_store::{RecordData, RemoteStore, StoreResult};

/// A pattern rule guarding a field's proposed values.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pattern: Regex,
    message: Option<String>,
}

impl FieldRule {
    /// Compile a rule. Fails on an invalid pattern.
    pub fn new(pattern: &str, message: Option<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            message,
        })
    }

    /// Whether a proposed value satisfies the rule.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }

    /// The message reported when a value is rejected.
    #[must_use]
    pub fn message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("value does not match pattern {}", self.pattern.as_str()))
    }
}

/// Permission of one field.
#[derive(Debug, Clone, Default)]
pub struct FieldPermission {
    pub read_only: bool,
    pub rule: Option<FieldRule>,
}

impl FieldPermission {
    /// An editable field without a rule.
    #[must_use]
    pub fn editable() -> Self {
        Self::default()
    }

    /// A read-only field.
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            rule: None,
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.rule = Some(rule);
        self
    }
}

/// The permission set of an upload.
#[derive(Debug, Clone, Default)]
pub struct FieldPermissions {
    map: HashMap<String, FieldPermission>,
}

#[derive(Debug, Deserialize)]
struct RawPermission {
    #[serde(rename = "isReadOnly", default)]
    is_read_only: bool,
    rule: Option<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    pattern: String,
    message: Option<String>,
}

impl FieldPermissions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, permission: FieldPermission) {
        self.map.insert(field.into(), permission);
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, permission: FieldPermission) -> Self {
        self.insert(field, permission);
        self
    }

    /// The permission of a field, if it is governed at all.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldPermission> {
        self.map.get(field)
    }

    /// Whether a field may be written.
    #[must_use]
    pub fn is_editable(&self, field: &str) -> bool {
        self.map.get(field).is_some_and(|p| !p.read_only)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Parse the permission record. Annotation keys and unparseable
    /// values are skipped.
    #[must_use]
    pub fn from_record(record: &RecordData) -> Self {
        let mut permissions = Self::new();

        for (key, value) in record.iter() {
            if key.starts_with('@') || key.starts_with('_') {
                continue;
            }
            let Some(text) = value.as_str() else {
                continue;
            };
            let Ok(raw) = serde_json::from_str::<RawPermission>(text) else {
                debug!(field = %key, "Skipping unparseable field permission");
                continue;
            };

            let rule = raw.rule.and_then(|r| {
                match FieldRule::new(&r.pattern, r.message) {
                    Ok(rule) => Some(rule),
                    Err(_) => {
                        debug!(field = %key, "Skipping invalid permission pattern");
                        None
                    }
                }
            });

            permissions.insert(
                key.clone(),
                FieldPermission {
                    read_only: raw.is_read_only,
                    rule,
                },
            );
        }

        permissions
    }

    /// Fetch and parse the permission record from the store.
    pub async fn load(
        store: &dyn RemoteStore,
        collection: &str,
        record_id: &str,
    ) -> StoreResult<Self> {
        let record = store.fetch_by_id(collection, record_id, None).await?;
        Ok(Self::from_record(&record))
    }
}
