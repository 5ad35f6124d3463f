//! Size specification parsing ("5MB", "512KB", "1048576").

use thiserror::Error;

/// Errors produced while parsing a size specification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("size specification is empty")]
    Empty,

    #[error("invalid size specification: {0}")]
    Invalid(String),

    #[error("size specification overflows: {0}")]
    Overflow(String),
}

const UNITS: &[(&str, u64)] = &[
    ("GB", 1024 * 1024 * 1024),
    ("MB", 1024 * 1024),
    ("KB", 1024),
    ("G", 1024 * 1024 * 1024),
    ("M", 1024 * 1024),
    ("K", 1024),
    ("B", 1),
];

/// Parse a size specification into a byte count.
///
/// Units are binary (1KB = 1024 bytes) and case-insensitive. A bare number is
/// taken as bytes. Fractional values such as "1.5MB" are accepted.
pub fn parse_size(spec: &str) -> Result<usize, SizeParseError> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(SizeParseError::Empty);
    }

    let upper = trimmed.to_ascii_uppercase();
    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|n| (n.trim(), *mult)))
        .unwrap_or((upper.as_str(), 1));

    let value: f64 = number
        .parse()
        .map_err(|_| SizeParseError::Invalid(spec.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(SizeParseError::Invalid(spec.to_string()));
    }

    let bytes = value * multiplier as f64;
    if bytes > usize::MAX as f64 {
        return Err(SizeParseError::Overflow(spec.to_string()));
    }
    Ok(bytes as usize)
}
