//! Url rewrite subsystem.
//!
//! # Data Flow
//! ```text
//! parsed HTML document
//!     → document.rs (find href/src attributes worth rewriting)
//!     → classifier.rs (exclude patterns, memoized)
//!     → engine.rs (host substitution, versioning, memoized)
//!         → content store / filesystem collaborators
//!     → attribute updated in place
//!
//! media url generation hook
//!     → media.rs (switch + access policy)
//!     → engine.rs
//! ```
//!
//! # Design Decisions
//! - Every public entry point is total: failures degrade to the input url
//! - `RewriteOutcome` still tells callers why a url was left alone

pub mod classifier;
pub mod document;
pub mod engine;
pub mod error;
pub mod media;
pub mod urls;

pub use classifier::{PatternClassifier, PatternSet};
pub use document::{parse_html, rewrite_document, serialize_html, DocumentStats};
pub use engine::{CdnRewriter, RewriteFlags, RewritePatterns, RewriteRequest, RewriteSettings, SiteContext, STOP_TOKEN};
pub use error::{RewriteError, RewriteOutcome};
pub use media::CdnUrlSwitch;
