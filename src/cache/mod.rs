//! Bounded memoization caches.
//!
//! # Data Flow
//! ```text
//! config cdn.cache_size ("5MB")
//!     → size.rs (parse size specification into bytes)
//!     → bounded.rs (BoundedCache<V>, capacity fixed for its lifetime)
//!     → owned by the rewrite engine and its classifiers
//! ```
//!
//! # Design Decisions
//! - Capacity is measured in approximate bytes (key + value), not entries
//! - Least-recently-used entries are evicted until an insert fits
//! - An entry larger than the whole capacity is never stored
//! - One mutex guards both the LRU order and the size counter

pub mod bounded;
pub mod size;

pub use bounded::{BoundedCache, CacheStats, CacheWeight};
pub use size::{parse_size, SizeParseError};
