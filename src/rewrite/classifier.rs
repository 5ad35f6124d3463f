//! Include/exclude pattern classification.
//!
//! # Responsibilities
//! - Hold an ordered, immutable set of compiled regular expressions
//! - Answer "does any pattern match this url" with memoization
//!
//! # Design Decisions
//! - Patterns compile case-insensitively
//! - Configuration order is preserved for diagnostics; the answer is an OR
//! - Decisions are cached as booleans, never as strings

use regex::{Regex, RegexBuilder};

use crate::cache::{BoundedCache, CacheStats};

/// Ordered sequence of compiled regular expressions with "any match" semantics.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compile patterns in configuration order.
    pub fn compile<S: AsRef<str>>(sources: &[S]) -> Result<Self, regex::Error> {
        let patterns = sources
            .iter()
            .map(|s| Self::compile_one(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Compile a single pattern the way every set does.
    pub fn compile_one(source: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(source).case_insensitive(true).build()
    }

    /// True if any pattern matches. An empty set never matches.
    pub fn is_match(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }

    /// Index of the first matching pattern, in configuration order.
    pub fn first_match(&self, url: &str) -> Option<usize> {
        self.patterns.iter().position(|re| re.is_match(url))
    }

    /// Pattern sources in configuration order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|re| re.as_str())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// A pattern set paired with its own decision cache.
pub struct PatternClassifier {
    patterns: PatternSet,
    cache: BoundedCache<bool>,
}

impl PatternClassifier {
    /// `name` identifies the cache in stats and metrics.
    pub fn new(name: &str, patterns: PatternSet, cache_capacity: usize) -> Self {
        Self {
            patterns,
            cache: BoundedCache::new(name, cache_capacity),
        }
    }

    /// Memoized "any pattern matches" check.
    pub fn matches(&self, url: &str) -> bool {
        if let Some(hit) = self.cache.get(url) {
            return hit;
        }

        let result = match self.patterns.first_match(url) {
            Some(index) => {
                tracing::trace!(cache = %self.cache.name(), url, pattern = index, "Pattern matched");
                true
            }
            None => false,
        };
        self.cache.set(url, result);
        result
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
