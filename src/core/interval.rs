//! Genomic intervals and region literals.
//!
//! Intervals are stored 0-based and half-open (`[start, end)`). Region literals
//! use the 1-based, inclusive convention users type on the command line:
//!
//! | Literal | Interval |
//! |---------|----------|
//! | `chr1` | the whole contig (needs the contig list to resolve) |
//! | `chr1:10` | `[9, 10)` |
//! | `chr1:10-20` | `[9, 20)` |
//! | `chr20:10,000,000-10,000,100` | `[9_999_999, 10_000_100)` |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::contig::Contig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("Empty region literal")]
    Empty,

    #[error("Invalid position in region literal '{literal}': {reason}")]
    InvalidPosition { literal: String, reason: String },

    #[error("Region literal '{0}' has no coordinates")]
    MissingCoordinates(String),

    #[error("Invalid interval {contig}:[{start}, {end}): end must be greater than start")]
    EmptyInterval { contig: String, start: u64, end: u64 },
}

/// A half-open interval `[start, end)` on a single contig
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub contig: String,
    pub start: u64,
    pub end: u64,
}

impl Interval {
    /// Create an interval, rejecting empty or inverted ones.
    ///
    /// # Errors
    ///
    /// Returns `LiteralError::EmptyInterval` if `end <= start`.
    pub fn new(contig: impl Into<String>, start: u64, end: u64) -> Result<Self, LiteralError> {
        let contig = contig.into();
        if end <= start {
            return Err(LiteralError::EmptyInterval { contig, start, end });
        }
        Ok(Self { contig, start, end })
    }

    /// Parse a literal with explicit coordinates (`chr1:10` or `chr1:10-20`).
    ///
    /// # Errors
    ///
    /// Returns a `LiteralError` if the literal is malformed or names only a contig.
    pub fn from_literal(literal: &str) -> Result<Self, LiteralError> {
        match literal.parse::<RegionLiteral>()? {
            RegionLiteral::Span(interval) => Ok(interval),
            RegionLiteral::Contig(_) => Err(LiteralError::MissingCoordinates(literal.to_string())),
        }
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Always false; intervals are never empty. Present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.contig == other.contig && self.start < other.end && other.start < self.end
    }

    #[must_use]
    pub fn contains_position(&self, contig: &str, position: u64) -> bool {
        self.contig == contig && self.start <= position && position < self.end
    }

    /// The 1-based inclusive literal form, e.g. `chr1:10-20`.
    #[must_use]
    pub fn to_literal(&self) -> String {
        format!("{}:{}-{}", self.contig, self.start + 1, self.end)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_literal())
    }
}

/// A parsed region literal, before it is resolved against a contig list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionLiteral {
    /// A bare contig name, meaning the whole contig
    Contig(String),
    /// Explicit coordinates
    Span(Interval),
}

impl RegionLiteral {
    #[must_use]
    pub fn contig(&self) -> &str {
        match self {
            Self::Contig(name) => name,
            Self::Span(interval) => &interval.contig,
        }
    }

    /// Resolve against `contigs`. Unknown contigs resolve to `None`.
    ///
    /// Spans are not clipped to the contig here; callers intersect with the
    /// genome extent when they need that.
    #[must_use]
    pub fn resolve(&self, contigs: &[Contig]) -> Option<Interval> {
        let contig = contigs.iter().find(|c| c.name == self.contig())?;
        match self {
            Self::Contig(_) => contig.extent(),
            Self::Span(interval) => Some(interval.clone()),
        }
    }
}

impl FromStr for RegionLiteral {
    type Err = LiteralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let literal = s.trim();
        if literal.is_empty() {
            return Err(LiteralError::Empty);
        }

        // Contig names may themselves contain ':' (e.g. HLA alleles), so only
        // treat the last ':' as a separator when what follows looks like coordinates.
        let Some((contig, coords)) = literal.rsplit_once(':') else {
            return Ok(Self::Contig(literal.to_string()));
        };
        let coords = coords.replace(',', "");
        if contig.is_empty()
            || coords.is_empty()
            || !coords.chars().all(|c| c.is_ascii_digit() || c == '-')
        {
            return Ok(Self::Contig(literal.to_string()));
        }

        let invalid = |reason: &str| LiteralError::InvalidPosition {
            literal: literal.to_string(),
            reason: reason.to_string(),
        };
        let parse_position = |text: &str| -> Result<u64, LiteralError> {
            let position: u64 = text.parse().map_err(|_| invalid("not a number"))?;
            if position == 0 {
                return Err(invalid("positions are 1-based"));
            }
            Ok(position)
        };

        let (start, end) = match coords.split_once('-') {
            Some((start, end)) => (parse_position(start)?, parse_position(end)?),
            None => {
                let position = parse_position(&coords)?;
                (position, position)
            }
        };
        if end < start {
            return Err(invalid("end is before start"));
        }

        Ok(Self::Span(Interval::new(contig, start - 1, end)?))
    }
}
