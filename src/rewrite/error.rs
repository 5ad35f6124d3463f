//! Rewrite error and outcome types.

use thiserror::Error;

use crate::content::CollaboratorError;

/// Errors that can occur while rewriting a single url.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The url could not be parsed or re-serialized.
    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The CDN hostname could not be applied to the url.
    #[error("Invalid CDN hostname: {0}")]
    InvalidHostname(String),

    /// A content store or filesystem call failed.
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

/// Result of a rewrite attempt.
///
/// Callers that only need the url use [`RewriteOutcome::into_url`]; every
/// variant yields a usable url.
#[derive(Debug)]
pub enum RewriteOutcome {
    /// The url was transformed.
    Rewritten(String),
    /// Policy left the url as it was (foreign, stop token, private media).
    Unchanged(String),
    /// Something failed; `url` is the original input.
    Failed { url: String, error: RewriteError },
}

impl RewriteOutcome {
    /// The url to emit.
    pub fn url(&self) -> &str {
        match self {
            RewriteOutcome::Rewritten(url) | RewriteOutcome::Unchanged(url) => url,
            RewriteOutcome::Failed { url, .. } => url,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            RewriteOutcome::Rewritten(url) | RewriteOutcome::Unchanged(url) => url,
            RewriteOutcome::Failed { url, .. } => url,
        }
    }

    /// Label used in metrics and the admin API.
    pub fn kind(&self) -> &'static str {
        match self {
            RewriteOutcome::Rewritten(_) => "rewritten",
            RewriteOutcome::Unchanged(_) => "unchanged",
            RewriteOutcome::Failed { .. } => "failed",
        }
    }
}
