//! The remote store collaborator interface.
//!
//! Everything above this crate talks to the record shards through
//! [`RemoteStore`], so the merge cursor, the diff pipeline and the
//! reconciliation job are all testable against an in-memory fake that
//! returns arbitrary page shapes and batch outcomes.

use async_trait::async_trait;

use crate::batch::{BatchOperation, BatchOutcome};
use crate::error::StoreResult;
use crate::query::{QueryPage, QuerySpec};
use crate::record::RecordData;

/// Capability interface of the external system of record.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Run a filtered, ordered, projected query against a collection.
    async fn query(&self, collection: &str, spec: &QuerySpec) -> StoreResult<QueryPage>;

    /// Continue a query from a page's continuation token.
    async fn query_next(&self, next_link: &str) -> StoreResult<QueryPage>;

    /// Fetch a single record by id. Fails with `NotFound` when absent.
    async fn fetch_by_id(
        &self,
        collection: &str,
        id: &str,
        select: Option<&[String]>,
    ) -> StoreResult<RecordData>;

    /// Submit a batch of independent operations. A failing operation
    /// must not abort its siblings; the outcome carries whatever
    /// per-operation responses the store produced.
    async fn submit_batch(&self, operations: &[BatchOperation]) -> StoreResult<BatchOutcome>;

    /// Drain a query to exhaustion, following continuation tokens.
    ///
    /// Used by loaders that must never return partial sets; a failure
    /// on any page fails the whole drain.
    async fn query_all(&self, collection: &str, spec: &QuerySpec) -> StoreResult<Vec<RecordData>> {
        let mut page = self.query(collection, spec).await?;
        let mut items = std::mem::take(&mut page.items);

        while let Some(link) = page.next_link {
            page = self.query_next(&link).await?;
            items.append(&mut page.items);
        }

        Ok(items)
    }
}
