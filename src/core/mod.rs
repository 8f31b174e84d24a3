//! Core aggregation algorithms: intra-second micro-allocation, V-bar
//! segmentation, finalization, and re-aggregation into coarser buckets.
//!
//! Everything here is pure or single-threaded streaming state — no I/O.
//! [`crate::store`] and [`crate::orchestrator`] are the only modules that
//! touch the filesystem or network.

pub mod aggregator;
pub mod micro_allocator;
pub mod reaggregate;
pub mod types;

pub use aggregator::{AggregatorError, VBarAggregator};
pub use micro_allocator::{micro_allocate, MicroAllocConfig, MicroAllocation};
pub use types::{Ohlc, SecondRecord, VBar};
