//! Deciding which genomic positions a worker processes.
//!
//! - [`calling`]: combine include/exclude region arguments into a calling set
//! - [`contigs`]: check that reference, reads and truth agree on their contigs
//! - [`partition`]: split the calling set into bounded pieces and shard them
//!
//! Everything here runs once at startup; a failure aborts the run before any
//! region is processed.

use thiserror::Error;

use crate::core::LiteralError;
use crate::parsing::sam::ParseError;

pub mod calling;
pub mod contigs;
pub mod partition;

pub use calling::{build_calling_regions, filter_regions_by_vcf, processing_regions};
pub use contigs::{common_contigs, ensure_consistent_contigs, validate_reference_contig_coverage};
pub use partition::{regions_to_process, Shard};

#[derive(Error, Debug)]
pub enum RegionError {
    #[error("partition_size must be greater than zero")]
    InvalidPartitionSize,

    #[error("Invalid shard arguments (task_id={task_id:?}, num_shards={num_shards:?}): {reason}")]
    InvalidShard {
        task_id: Option<i64>,
        num_shards: Option<i64>,
        reason: &'static str,
    },

    #[error("Invalid region: {0}")]
    Literal(#[from] LiteralError),

    #[error("Failed to read regions file: {0}")]
    RegionsFile(#[from] ParseError),

    #[error(
        "The regions to call is empty. Check that the regions and exclude regions \
         name contigs present in the reference ({num_contigs} contigs)"
    )]
    EmptyCallingRegions { num_contigs: usize },

    #[error(
        "Reference contigs span {reference_span} bases but only {common_span} bases \
         ({coverage_percent:.2}%) were found in common among our input files, below the \
         required {required_percent:.2}% (short by {shortfall} bases). Check that the \
         sources were created on a common genome reference build. Common contigs: [{common}]"
    )]
    InsufficientContigCoverage {
        reference_span: u64,
        common_span: u64,
        coverage_percent: f64,
        required_percent: f64,
        shortfall: u64,
        common: String,
    },
}
