//! Watermark merge cursor.
//!
//! A merged scan reads N independently-ordered shard streams and serves
//! one globally ordered page sequence. All pagination state lives in an
//! opaque token the caller passes back: a watermark (the `createdon` of
//! the last served item) plus, for each shard that was partially
//! consumed at exactly that instant, the lowest version already served.
//! Nothing is stored server-side; re-running a page against unchanged
//! data yields the same page and the same next token.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wallog_core::fields;
use wallog_store::{Filter, RecordData};

use crate::error::{EngineError, EngineResult};

/// Pagination state of one merged scan.
///
/// Invariants: the watermark never increases across successive pages of
/// one scan, and within one watermark instant the per-shard versions
/// only decrease.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Timestamp boundary separating consumed items from the rest.
    #[serde(rename = "w", skip_serializing_if = "Option::is_none")]
    pub watermark: Option<DateTime<Utc>>,
    /// Lowest version already served per shard, valid only at the
    /// watermark instant.
    #[serde(rename = "v", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub last_versions: BTreeMap<String, i64>,
}

impl Cursor {
    /// The cursor of a fresh scan.
    #[must_use]
    pub fn start() -> Self {
        Self::default()
    }

    /// Encode to the opaque token handed to callers.
    #[must_use]
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("cursor serializes to JSON");
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a caller-supplied token.
    pub fn decode(token: &str) -> EngineResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| EngineError::validation("cursor token is not valid base64"))?;
        serde_json::from_slice(&bytes)
            .map_err(|_| EngineError::validation("cursor token does not decode to a cursor"))
    }

    /// The paging constraint this cursor imposes on one shard's query,
    /// `None` on the first page.
    ///
    /// A shard that already gave up items at the watermark instant is
    /// constrained below its last served version there; any other shard
    /// may still hold unseen items at the instant itself.
    #[must_use]
    pub fn paging_filter(&self, shard_key: &str) -> Option<Filter> {
        let watermark = self.watermark?;

        let filter = match self.last_versions.get(shard_key) {
            Some(&version) => Filter::lt(fields::CREATED_ON, watermark).or_with(
                Filter::eq(fields::CREATED_ON, watermark)
                    .and_with(Filter::lt(fields::VERSION, version)),
            ),
            None => Filter::le(fields::CREATED_ON, watermark),
        };

        Some(filter)
    }
}

/// One record of a merged page, tagged with its shard.
#[derive(Debug, Clone, Serialize)]
pub struct MergedItem {
    pub shard: String,
    pub record: RecordData,
    #[serde(skip)]
    created_on: DateTime<Utc>,
    #[serde(skip)]
    version: i64,
}

impl MergedItem {
    fn new(shard: &str, record: RecordData) -> Self {
        let created_on = record
            .get_str(fields::CREATED_ON)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let version = record.get_i64(fields::VERSION).unwrap_or(0);
        Self {
            shard: shard.to_string(),
            record,
            created_on,
            version,
        }
    }

    #[must_use]
    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }

    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }
}

/// Merge per-shard result batches into one page.
///
/// Sorts everything descending by `(createdon, version)` with the shard
/// key as the final tiebreak - a total order even when timestamps and
/// versions collide exactly - then serves the first `page_size` items.
/// Returns the page and, when it is full, the cursor of the remainder.
#[must_use]
pub fn merge_page(
    shard_batches: Vec<(String, Vec<RecordData>)>,
    previous: &Cursor,
    page_size: usize,
) -> (Vec<MergedItem>, Option<Cursor>) {
    let mut merged: Vec<MergedItem> = shard_batches
        .into_iter()
        .flat_map(|(shard, records)| {
            records
                .into_iter()
                .map(move |record| MergedItem::new(&shard, record))
        })
        .collect();

    merged.sort_by(|a, b| {
        b.created_on
            .cmp(&a.created_on)
            .then(b.version.cmp(&a.version))
            .then(a.shard.cmp(&b.shard))
    });

    if merged.len() <= page_size {
        let next = if merged.len() == page_size && page_size > 0 {
            next_cursor(&merged, previous)
        } else {
            None
        };
        return (merged, next);
    }

    merged.truncate(page_size);
    let next = next_cursor(&merged, previous);
    (merged, next)
}

fn next_cursor(page: &[MergedItem], previous: &Cursor) -> Option<Cursor> {
    let watermark = page.last()?.created_on;

    // Per-shard minimum version among the items served at the new
    // watermark instant, merged with the previous cursor when the
    // watermark did not move, reset otherwise.
    let mut last_versions = if previous.watermark == Some(watermark) {
        previous.last_versions.clone()
    } else {
        BTreeMap::new()
    };

    for item in page.iter().filter(|i| i.created_on == watermark) {
        last_versions
            .entry(item.shard.clone())
            .and_modify(|v| *v = (*v).min(item.version))
            .or_insert(item.version);
    }

    Some(Cursor {
        watermark: Some(watermark),
        last_versions,
    })
}
