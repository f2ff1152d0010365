//! BED region files.
//!
//! BED coordinates are already 0-based half-open, so `chrom start end` maps
//! directly onto an [`Interval`]. Header lines (`#`, `track`, `browser`) are
//! skipped and columns past the third are ignored.

use std::io::BufRead;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::interval::Interval;
use crate::core::range_set::IntervalSet;
use crate::parsing::fasta::open_maybe_gzipped;
use crate::parsing::sam::ParseError;

/// Whether a region argument names a BED file rather than a literal.
#[must_use]
pub fn is_bed_file(arg: &str) -> bool {
    let lower = arg.to_lowercase();
    lower.ends_with(".bed") || lower.ends_with(".bed.gz")
}

/// Read a plain or gzipped BED file into a merged interval set.
///
/// # Errors
///
/// Returns `ParseError` if the file cannot be read or a line is malformed.
pub fn parse_bed_file(path: &Path) -> Result<IntervalSet, ParseError> {
    let regions = parse_bed_reader(open_maybe_gzipped(path)?)?;
    debug!(
        path = %path.display(),
        num_intervals = regions.len(),
        "Read BED file"
    );
    Ok(regions)
}

/// # Errors
///
/// Returns `ParseError::InvalidFormat` for lines with fewer than three columns
/// or non-numeric coordinates.
pub fn parse_bed_reader<R: BufRead>(reader: R) -> Result<IntervalSet, ParseError> {
    let mut intervals = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with("track")
            || trimmed.starts_with("browser")
        {
            continue;
        }

        let fields: Vec<&str> = trimmed.split('\t').collect();
        if fields.len() < 3 {
            return Err(ParseError::InvalidFormat(format!(
                "BED line {} has {} fields, expected at least 3",
                i + 1,
                fields.len()
            )));
        }

        let coordinate = |text: &str| -> Result<u64, ParseError> {
            text.parse().map_err(|_| {
                ParseError::InvalidFormat(format!("Invalid BED coordinate on line {}: {text}", i + 1))
            })
        };
        let start = coordinate(fields[1])?;
        let end = coordinate(fields[2])?;

        match Interval::new(fields[0], start, end) {
            Ok(interval) => intervals.push(interval),
            Err(_) => warn!(line = i + 1, start, end, "Skipping empty BED interval"),
        }
    }

    Ok(IntervalSet::from_intervals(intervals))
}
