//! Response buffering filter.
//!
//! # Data Flow
//! ```text
//! upstream body chunks
//!     → body.rs (async stream adapter)
//!     → buffer.rs (Buffering: accumulate until </html>)
//!         → rewrite::document (parse, rewrite attributes, serialize)
//!     → Flushed: rewritten document once, then raw pass-through
//! ```
//!
//! # Design Decisions
//! - The filter is a plain `std::io::Write` state machine; only the adapter
//!   knows about async bodies
//! - Any transform failure writes the buffered bytes verbatim, so a response
//!   is never lost

pub mod body;
pub mod buffer;

pub use body::rewrite_body;
pub use buffer::{FilterError, FilterState, ResponseFilter};
