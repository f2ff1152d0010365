//! Turning the reads of one region into candidates, examples and gVCF records.
//!
//! - [`processor::RegionProcessor`]: the per-region pipeline, initialized on
//!   first use
//! - [`allele_counter`] and [`caller`]: read evidence to candidates
//! - [`allele_frequency`]: population frequencies for candidates
//! - [`sources`]: the traits every external collaborator implements
//! - [`profile`]: per-region runtime rows
//!
//! [`process_regions`] drives a processor over a worker's regions in order.

use thiserror::Error;
use tracing::info;

use crate::core::interval::Interval;

pub mod allele_counter;
pub mod allele_frequency;
pub mod caller;
pub mod options;
pub mod processor;
pub mod profile;
pub mod sources;

pub use processor::{RegionOutput, RegionProcessor, StageTimings};
pub use profile::{write_profile_tsv, RegionProfile};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Cannot add a non-confident label to an example")]
    NonConfidentLabel,

    #[error(
        "Reference mismatch for variant {variant}: expected '{expected}' but the reference has '{observed}'"
    )]
    ReferenceMismatch {
        variant: String,
        expected: String,
        observed: String,
    },

    #[error("Invalid variant {0}")]
    InvalidVariant(String),

    #[error("Training mode requires a labeler")]
    MissingLabeler,

    #[error("Region processor is not initialized")]
    NotInitialized,

    #[error(transparent)]
    Source(#[from] sources::SourceError),
}

/// Process `regions` in order, handing each region's output and profile row to
/// `on_region`. Stops at the first failing region.
///
/// # Errors
///
/// Returns the error of the first region that fails.
pub fn process_regions<F>(
    processor: &mut RegionProcessor,
    regions: &[Interval],
    mut on_region: F,
) -> Result<usize, ProcessError>
where
    F: FnMut(&Interval, RegionOutput, RegionProfile),
{
    for region in regions {
        let output = processor.process(region)?;
        let profile = RegionProfile::new(region, &output);
        on_region(region, output, profile);
    }

    info!(num_regions = regions.len(), "Processed regions");
    Ok(regions.len())
}
