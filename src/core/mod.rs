//! Core data types for region planning and candidate generation.
//!
//! - [`Contig`]: a named reference sequence with its length and file-order index
//! - [`Interval`]: a half-open `[start, end)` span on one contig
//! - [`IntervalSet`]: merged, sorted intervals with union/intersection/difference
//! - [`Variant`], [`Candidate`], [`Label`], [`Example`], [`Read`]: pipeline records
//!
//! ## Coordinates
//!
//! Everything is 0-based half-open internally. Region literals on the command
//! line and in output are 1-based and inclusive:
//!
//! | Literal | Interval |
//! |---------|----------|
//! | `chr1:1-100` | `[0, 100)` |
//! | `chr1:5` | `[4, 5)` |

pub mod contig;
pub mod interval;
pub mod range_set;
pub mod types;

pub use contig::Contig;
pub use interval::{Interval, LiteralError, RegionLiteral};
pub use range_set::IntervalSet;
