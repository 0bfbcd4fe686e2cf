//! # Record reconciliation engine
//!
//! The logic that keeps hardware-return cases honest across several
//! supplier-owned record shards:
//!
//! - [`classify`](classify::classify) - the ordered stage-classification
//!   rule chain, deriving "where is this case stuck" from a record's
//!   timestamps and flags under a business-day aging policy.
//! - [`cursor`] / [`listing`] - the watermark merge protocol that turns
//!   N independently-paginated shard streams into one globally ordered,
//!   resumable page sequence behind an opaque cursor token.
//! - [`diff`] / [`pipeline`] / [`bulk`] - change detection against the
//!   current remote state, per-field permission and rule validation,
//!   audit-entry emission, and non-transactional chunked batch
//!   mutation with per-operation failure reconciliation.
//! - [`job`] - the reconciliation run that reclassifies every record
//!   and writes back only the ones whose stage actually changed, at
//!   most one run at a time.
//!
//! All remote access goes through `wallog_store::RemoteStore`, so every
//! piece here is testable against an in-memory fake.

pub mod bulk;
pub mod calendar;
pub mod classify;
pub mod cursor;
pub mod diff;
pub mod error;
pub mod job;
pub mod listing;
pub mod lookups;
pub mod permissions;
pub mod pipeline;

pub use bulk::{BulkUpdater, UploadItem, UploadMode, UploadSummary};
pub use cursor::Cursor;
pub use diff::{diff_record, ChangeEntry, FieldWarning, RecordDiff};
pub use error::{EngineError, EngineResult};
pub use job::{ReconciliationJob, RunSummary};
pub use listing::{ListCriteria, ListItem, ListOptions, ListPage, Lister};
pub use permissions::{FieldPermission, FieldPermissions, FieldRule};
pub use pipeline::{MutationPipeline, OperationFailure, PatchOp, SubmitOutcome};
