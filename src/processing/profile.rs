//! Runtime by region.
//!
//! One row per processed region with the time spent in each stage and the
//! amount of data it handled, written as TSV for later inspection.

use std::io::{self, Write};

use serde::Serialize;

use crate::core::interval::Interval;
use crate::processing::processor::{RegionOutput, StageTimings};

pub const PROFILE_COLUMNS: [&str; 8] = [
    "region",
    "get reads",
    "find candidates",
    "make pileup images",
    "label candidates",
    "num reads",
    "num candidates",
    "num examples",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionProfile {
    pub region: String,
    pub timings: StageTimings,
    pub num_reads: usize,
    pub num_candidates: usize,
    pub num_examples: usize,
}

impl RegionProfile {
    #[must_use]
    pub fn new(region: &Interval, output: &RegionOutput) -> Self {
        Self {
            region: region.to_literal(),
            timings: output.timings,
            num_reads: output.num_reads,
            num_candidates: output.candidates.len(),
            num_examples: output.examples.len(),
        }
    }
}

/// Write a header and one row per region, stage times in seconds.
///
/// # Errors
///
/// Returns any error of the underlying writer.
pub fn write_profile_tsv<W: Write>(mut writer: W, rows: &[RegionProfile]) -> io::Result<()> {
    writeln!(writer, "{}", PROFILE_COLUMNS.join("\t"))?;
    for row in rows {
        let t = &row.timings;
        writeln!(
            writer,
            "{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{}\t{}\t{}",
            row.region,
            t.get_reads.as_secs_f64(),
            t.find_candidates.as_secs_f64(),
            t.make_pileup_images.as_secs_f64(),
            t.label_candidates.as_secs_f64(),
            row.num_reads,
            row.num_candidates,
            row.num_examples,
        )?;
    }
    writer.flush()
}
