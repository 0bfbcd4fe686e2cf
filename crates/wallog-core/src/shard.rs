//! Shard configuration.
//!
//! Each supplier owns a physically separate remote collection holding
//! the same conceptual record type. A [`ShardView`] names one of those
//! collections together with its identifier field and the columns the
//! listing surface projects; a [`ShardSet`] is the immutable set of
//! shards a deployment works against.

use serde::{Deserialize, Serialize};

use crate::fields;

/// One supplier-owned record collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardView {
    /// Short routing key (e.g. `"alpha"`). Unique within a set.
    pub key: String,
    /// Remote collection name.
    pub collection: String,
    /// Name of the shard-local identifier field.
    pub id_field: String,
    /// Columns projected on listing reads. Empty means "all".
    #[serde(default)]
    pub select: Vec<String>,
}

impl ShardView {
    /// Create a view with an empty projection.
    pub fn new(
        key: impl Into<String>,
        collection: impl Into<String>,
        id_field: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            collection: collection.into(),
            id_field: id_field.into(),
            select: Vec::new(),
        }
    }

    /// Set the projected columns.
    #[must_use]
    pub fn with_select<I, S>(mut self, select: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = select.into_iter().map(Into::into).collect();
        self
    }

    /// Columns needed to classify records of this shard: the shard id
    /// plus the stage-relevant fields, deduplicated.
    #[must_use]
    pub fn stage_select(&self) -> Vec<String> {
        let mut cols = vec![self.id_field.clone()];
        for field in fields::STAGE_SELECT {
            if *field != self.id_field {
                cols.push((*field).to_string());
            }
        }
        cols
    }
}

/// The immutable set of shards a deployment reconciles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardSet {
    views: Vec<ShardView>,
}

impl ShardSet {
    /// Build a set from its views.
    #[must_use]
    pub fn new(views: Vec<ShardView>) -> Self {
        Self { views }
    }

    /// Look up a shard by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ShardView> {
        self.views.iter().find(|v| v.key == key)
    }

    /// Iterate over all shards.
    pub fn iter(&self) -> impl Iterator<Item = &ShardView> {
        self.views.iter()
    }

    /// All shard keys, in configuration order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.views.iter().map(|v| v.key.as_str()).collect()
    }

    /// Number of shards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

impl<'a> IntoIterator for &'a ShardSet {
    type Item = &'a ShardView;
    type IntoIter = std::slice::Iter<'a, ShardView>;

    fn into_iter(self) -> Self::IntoIter {
        self.views.iter()
    }
}
