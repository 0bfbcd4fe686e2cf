#![allow(dead_code)]
//! In-memory `RemoteStore` fake for engine tests.
//!
//! Evaluates filter ASTs structurally, honors ordering/top/pagination,
//! and lets tests script arbitrary batch outcomes - whole-batch
//! success, wholesale failure, per-operation responses with omissions,
//! or a transport error.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use wallog_store::{
    BatchOperation, BatchOutcome, Filter, FilterValue, OperationResponse, QueryPage, QuerySpec,
    RecordData, RemoteStore, StoreError, StoreResult,
};

/// How the fake answers `submit_batch`.
#[derive(Clone)]
pub enum BatchBehavior {
    /// Overall success, no sub-responses.
    Succeed,
    /// Overall failure with the given status, no sub-responses.
    FailWholesale(u16),
    /// Fixed sub-responses; operations not listed are omitted.
    Scripted {
        ok: bool,
        responses: Vec<(String, u16, Option<Value>)>,
    },
    /// The batch request itself errors.
    TransportError,
}

#[derive(Default)]
struct Collections {
    /// collection -> (id field, records)
    data: HashMap<String, (String, Vec<RecordData>)>,
}

pub struct FakeStore {
    collections: Mutex<Collections>,
    failing_collections: Mutex<Vec<String>>,
    pending_pages: Mutex<HashMap<String, Vec<RecordData>>>,
    batch_behavior: Mutex<BatchBehavior>,
    pub batch_log: Mutex<Vec<Vec<BatchOperation>>>,
    page_size: Option<usize>,
    query_delay: Option<Duration>,
    token_counter: Mutex<u64>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(Collections::default()),
            failing_collections: Mutex::new(Vec::new()),
            pending_pages: Mutex::new(HashMap::new()),
            batch_behavior: Mutex::new(BatchBehavior::Succeed),
            batch_log: Mutex::new(Vec::new()),
            page_size: None,
            query_delay: None,
            token_counter: Mutex::new(0),
        }
    }

    /// Serve query results in pages of `size`.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Delay every query (concurrency tests).
    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    pub fn seed(&self, collection: &str, id_field: &str, records: Vec<Value>) {
        let records = records
            .into_iter()
            .map(|v| RecordData::from_value(v).expect("seed rows are objects"))
            .collect();
        self.collections
            .lock()
            .unwrap()
            .data
            .insert(collection.to_string(), (id_field.to_string(), records));
    }

    /// Make queries against a collection fail.
    pub fn fail_collection(&self, collection: &str) {
        self.failing_collections
            .lock()
            .unwrap()
            .push(collection.to_string());
    }

    pub fn set_batch_behavior(&self, behavior: BatchBehavior) {
        *self.batch_behavior.lock().unwrap() = behavior;
    }

    /// All batched operations, flattened across chunks.
    pub fn submitted_operations(&self) -> Vec<BatchOperation> {
        self.batch_log
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn batch_count(&self) -> usize {
        self.batch_log.lock().unwrap().len()
    }
}

fn created_on(record: &RecordData) -> DateTime<Utc> {
    record
        .get_str("createdon")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn compare_to_literal(record: &RecordData, field: &str, value: &FilterValue) -> Option<Ordering> {
    let actual = record.get(field)?;
    match value {
        FilterValue::Str(expected) => actual.as_str().map(|a| a.cmp(expected.as_str())),
        FilterValue::Int(expected) => actual.as_i64().map(|a| a.cmp(expected)),
        FilterValue::Timestamp(expected) => actual
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|a| a.with_timezone(&Utc).cmp(expected)),
        FilterValue::Null => None,
    }
}

pub fn eval_filter(filter: &Filter, record: &RecordData) -> bool {
    match filter {
        Filter::And { filters } => filters.iter().all(|f| eval_filter(f, record)),
        Filter::Or { filters } => filters.iter().any(|f| eval_filter(f, record)),
        Filter::Contains { field, value } => record
            .get_str(field)
            .is_some_and(|s| s.contains(value.as_str())),
        Filter::Eq { field, value } => match value {
            FilterValue::Null => record.get(field).is_none_or(Value::is_null),
            _ => compare_to_literal(record, field, value) == Some(Ordering::Equal),
        },
        Filter::Ne { field, value } => match value {
            FilterValue::Null => record.get(field).is_some_and(|v| !v.is_null()),
            _ => matches!(
                compare_to_literal(record, field, value),
                Some(Ordering::Less | Ordering::Greater)
            ),
        },
        Filter::Ge { field, value } => matches!(
            compare_to_literal(record, field, value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Filter::Le { field, value } => matches!(
            compare_to_literal(record, field, value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Filter::Lt { field, value } => {
            compare_to_literal(record, field, value) == Some(Ordering::Less)
        }
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn query(&self, collection: &str, spec: &QuerySpec) -> StoreResult<QueryPage> {
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }

        if self
            .failing_collections
            .lock()
            .unwrap()
            .iter()
            .any(|c| c == collection)
        {
            return Err(StoreError::unavailable(503, "injected failure"));
        }

        let mut items: Vec<RecordData> = {
            let collections = self.collections.lock().unwrap();
            let Some((_, records)) = collections.data.get(collection) else {
                return Ok(QueryPage::of(Vec::new()));
            };
            records
                .iter()
                .filter(|r| spec.filter.as_ref().map_or(true, |f| eval_filter(f, r)))
                .cloned()
                .collect()
        };

        if spec.order_by.is_some() {
            // The engine only ever orders by (createdon desc, version desc).
            items.sort_by(|a, b| {
                created_on(b)
                    .cmp(&created_on(a))
                    .then(b.get_i64("versionnumber").cmp(&a.get_i64("versionnumber")))
            });
        }

        let total_count = spec.include_count.then_some(items.len() as u64);

        if let Some(top) = spec.top {
            items.truncate(top as usize);
        }

        let next_link = match self.page_size {
            Some(size) if items.len() > size => {
                let rest = items.split_off(size);
                let mut counter = self.token_counter.lock().unwrap();
                *counter += 1;
                let token = format!("continuation-{}", *counter);
                self.pending_pages
                    .lock()
                    .unwrap()
                    .insert(token.clone(), rest);
                Some(token)
            }
            _ => None,
        };

        Ok(QueryPage {
            items,
            next_link,
            total_count,
        })
    }

    async fn query_next(&self, next_link: &str) -> StoreResult<QueryPage> {
        let mut remainder = self
            .pending_pages
            .lock()
            .unwrap()
            .remove(next_link)
            .ok_or_else(|| StoreError::rejected(400, "unknown continuation token"))?;

        let next_link = match self.page_size {
            Some(size) if remainder.len() > size => {
                let rest = remainder.split_off(size);
                let mut counter = self.token_counter.lock().unwrap();
                *counter += 1;
                let token = format!("continuation-{}", *counter);
                self.pending_pages.lock().unwrap().insert(token.clone(), rest);
                Some(token)
            }
            _ => None,
        };

        Ok(QueryPage {
            items: remainder,
            next_link,
            total_count: None,
        })
    }

    async fn fetch_by_id(
        &self,
        collection: &str,
        id: &str,
        _select: Option<&[String]>,
    ) -> StoreResult<RecordData> {
        let collections = self.collections.lock().unwrap();
        let Some((id_field, records)) = collections.data.get(collection) else {
            return Err(StoreError::not_found(collection, id));
        };
        records
            .iter()
            .find(|r| r.get_str(id_field) == Some(id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn submit_batch(&self, operations: &[BatchOperation]) -> StoreResult<BatchOutcome> {
        self.batch_log.lock().unwrap().push(operations.to_vec());

        let behavior = self.batch_behavior.lock().unwrap().clone();
        match behavior {
            BatchBehavior::Succeed => Ok(BatchOutcome {
                ok: true,
                status: 200,
                responses: Vec::new(),
            }),
            BatchBehavior::FailWholesale(status) => Ok(BatchOutcome {
                ok: false,
                status,
                responses: Vec::new(),
            }),
            BatchBehavior::Scripted { ok, responses } => Ok(BatchOutcome {
                ok,
                status: if ok { 200 } else { 400 },
                responses: responses
                    .into_iter()
                    .map(|(content_id, status, body)| OperationResponse {
                        content_id,
                        status,
                        status_text: String::new(),
                        body,
                    })
                    .collect(),
            }),
            BatchBehavior::TransportError => {
                Err(StoreError::connection_failed("injected batch failure"))
            }
        }
    }
}
