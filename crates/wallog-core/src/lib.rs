//! # Wallog core vocabulary
//!
//! Shared types for the hardware-return tracking engine: the pipeline
//! stage enumeration, shard and owner configuration, the common field
//! names of the supplier record schema, and the clock capability.
//!
//! This crate holds configuration and vocabulary only - no I/O. The
//! remote-store abstraction lives in `wallog-store`, the reconciliation
//! logic in `wallog-engine`.

pub mod clock;
pub mod fields;
pub mod owner;
pub mod shard;
pub mod stage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use owner::Owner;
pub use shard::{ShardSet, ShardView};
pub use stage::Stage;
