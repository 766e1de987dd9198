//! Line classification and category filtering.
//!
//! Each data line carries its category in the third whitespace token
//! (`TRACE_IO:`, `TRACE_TS:`, ...) and its operation tag in the fourth.
//! Callers select a subset of categories up front; lines outside the
//! selection are dropped before any field extraction, which matters for
//! the typical multi-gigabyte trace where only one category is wanted.

use crate::utils::error::ConfigError;
use std::collections::HashSet;
use std::str::FromStr;

/// Trace line categories of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceCategory {
    /// Block-storage I/O (`TRACE_IO`)
    Io,
    /// Inter-node messaging (`TRACE_TS`)
    Messaging,
    /// RDMA transfers (`TRACE_RDMA`); selectable, no correlator yet
    Rdma,
    /// Byte-range locks (`TRACE_BRL`); selectable, no correlator yet
    ByteRangeLock,
}

impl TraceCategory {
    /// Map a category tag token (trailing `:` already stripped) to a category
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "TRACE_IO" => Some(Self::Io),
            "TRACE_TS" => Some(Self::Messaging),
            "TRACE_RDMA" => Some(Self::Rdma),
            "TRACE_BRL" => Some(Self::ByteRangeLock),
            _ => None,
        }
    }
}

impl FromStr for TraceCategory {
    type Err = ConfigError;

    /// Parse a user-supplied filter name; `ts` and `brl` are the legacy
    /// short spellings
    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "io" => Ok(Self::Io),
            "messaging" | "ts" => Ok(Self::Messaging),
            "rdma" => Ok(Self::Rdma),
            "byte-range-lock" | "brl" => Ok(Self::ByteRangeLock),
            other => Err(ConfigError::UnknownFilter(other.to_string())),
        }
    }
}

/// Parse a comma-separated filter list, failing fast on any unknown name
pub fn parse_filters(names: &str) -> Result<HashSet<TraceCategory>, ConfigError> {
    let mut filters = HashSet::new();
    for name in names.split(',') {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        filters.insert(name.parse::<TraceCategory>()?);
    }
    Ok(filters)
}

/// A classified data line: category, operation tag, and the full token list
#[derive(Debug)]
pub struct ClassifiedLine<'a> {
    pub category: TraceCategory,
    pub op_tag: &'a str,
}

/// Classify one data line from its third and fourth tokens.
///
/// Returns `None` for lines that are too short or belong to a category we
/// do not recognize; trace files contain many line kinds that are simply
/// not of interest, so this is not an error.
pub fn classify<'a>(tokens: &[&'a str]) -> Option<ClassifiedLine<'a>> {
    if tokens.len() < 4 {
        return None;
    }
    let category = TraceCategory::from_tag(tokens[2].trim_end_matches(':'))?;
    Some(ClassifiedLine {
        category,
        op_tag: tokens[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filters_accepts_all_spellings() {
        let filters = parse_filters("io,messaging,rdma,byte-range-lock").unwrap();
        assert_eq!(filters.len(), 4);
        let legacy = parse_filters("io,ts,brl").unwrap();
        assert!(legacy.contains(&TraceCategory::Messaging));
        assert!(legacy.contains(&TraceCategory::ByteRangeLock));
    }

    #[test]
    fn test_parse_filters_unknown_name_fails_fast() {
        let err = parse_filters("io,bogus").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFilter(ref n) if n == "bogus"));
    }

    #[test]
    fn test_classify_io_line() {
        let tokens: Vec<&str> = "0.000001 1234 TRACE_IO: QIO: read data"
            .split_whitespace()
            .collect();
        let c = classify(&tokens).unwrap();
        assert_eq!(c.category, TraceCategory::Io);
        assert_eq!(c.op_tag, "QIO:");
    }

    #[test]
    fn test_classify_foreign_category_ignored() {
        let tokens: Vec<&str> = "0.000001 1234 TRACE_FS: open:".split_whitespace().collect();
        assert!(classify(&tokens).is_none());
    }

    #[test]
    fn test_classify_short_line_ignored() {
        let tokens = ["0.000001", "1234"];
        assert!(classify(&tokens).is_none());
    }
}
