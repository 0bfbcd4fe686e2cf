//! # Remote store access
//!
//! The narrow collaborator interface every other part of the system
//! talks to the record shards through, plus its OData-style Web API
//! implementation.
//!
//! - [`RemoteStore`] - query with filter/order/paging, fetch by id,
//!   submit an independent-operation batch.
//! - [`Filter`] - the fixed textual filter grammar, built as an AST and
//!   rendered on the way out.
//! - [`batch`] - the multipart `$batch` wire protocol (independent
//!   operations, continue-on-error, per-operation responses correlated
//!   by content id).
//! - [`WebApiStore`] - `reqwest`-backed implementation with lazy cached
//!   bearer credentials.

pub mod auth;
pub mod batch;
pub mod client;
pub mod error;
pub mod filter;
pub mod query;
pub mod record;
pub mod traits;

pub use auth::{CachedToken, ClientCredentials, IssuedToken, StaticToken, TokenSource};
pub use batch::{BatchMethod, BatchOperation, BatchOutcome, OperationResponse};
pub use client::{WebApiConfig, WebApiStore};
pub use error::{StoreError, StoreResult};
pub use filter::{Filter, FilterValue};
pub use query::{QueryPage, QuerySpec};
pub use record::RecordData;
pub use traits::RemoteStore;
