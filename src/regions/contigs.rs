//! Checking that the reference, the reads and the truth variants describe the
//! same genome.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::core::contig::{total_length, Contig};
use crate::regions::RegionError;
use crate::utils::validation::count_to_f64;

/// Contigs present, with identical name and length, in every list.
///
/// Order and indices come from the first list.
#[must_use]
pub fn common_contigs(lists: &[&[Contig]]) -> Vec<Contig> {
    let Some((first, rest)) = lists.split_first() else {
        return Vec::new();
    };

    let others: Vec<HashSet<(&str, u64)>> = rest
        .iter()
        .map(|list| list.iter().map(|c| (c.name.as_str(), c.length)).collect())
        .collect();

    first
        .iter()
        .filter(|c| {
            others
                .iter()
                .all(|names| names.contains(&(c.name.as_str(), c.length)))
        })
        .cloned()
        .collect()
}

/// Fail unless `common` spans at least `min_coverage_fraction` of `reference`.
///
/// An empty `common` always fails, whatever the threshold.
///
/// # Errors
///
/// Returns `RegionError::InsufficientContigCoverage`, whose message starts with
/// `Reference contigs span {N} bases`.
pub fn validate_reference_contig_coverage(
    reference: &[Contig],
    common: &[Contig],
    min_coverage_fraction: f64,
) -> Result<(), RegionError> {
    let reference_span = total_length(reference);
    let common_span = total_length(common);
    let coverage = if reference_span == 0 {
        0.0
    } else {
        count_to_f64(common_span) / count_to_f64(reference_span)
    };

    if common.is_empty() || coverage < min_coverage_fraction {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let required_span = (min_coverage_fraction * count_to_f64(reference_span)).ceil() as u64;
        let names: Vec<&str> = common.iter().map(|c| c.name.as_str()).collect();
        return Err(RegionError::InsufficientContigCoverage {
            reference_span,
            common_span,
            coverage_percent: coverage * 100.0,
            required_percent: min_coverage_fraction * 100.0,
            shortfall: required_span.saturating_sub(common_span),
            common: names.join(", "),
        });
    }

    Ok(())
}

/// The contigs every input agrees on, in reference order.
///
/// Contigs named in `exclude_names` are removed from the reference first, and
/// coverage is measured against what remains. An empty `reads` or `truth` list
/// is skipped with a warning rather than wiping out every contig.
///
/// # Errors
///
/// Returns `RegionError::InsufficientContigCoverage` when the common contigs
/// cover too little of the reference.
pub fn ensure_consistent_contigs(
    reference: &[Contig],
    reads: &[Contig],
    truth: Option<&[Contig]>,
    exclude_names: &[String],
    min_coverage_fraction: f64,
) -> Result<Vec<Contig>, RegionError> {
    let excluded: HashSet<&str> = exclude_names.iter().map(String::as_str).collect();
    let kept: Vec<Contig> = reference
        .iter()
        .filter(|c| !excluded.contains(c.name.as_str()))
        .cloned()
        .collect();

    let mut lists: Vec<&[Contig]> = vec![kept.as_slice()];
    for (source, contigs) in [("reads", Some(reads)), ("truth variants", truth)] {
        match contigs {
            Some([]) => warn!(source, "No contigs found; skipping it in the consistency check"),
            Some(contigs) => lists.push(contigs),
            None => {}
        }
    }

    let common = common_contigs(&lists);
    validate_reference_contig_coverage(&kept, &common, min_coverage_fraction)?;

    info!(
        num_common = common.len(),
        num_reference = reference.len(),
        "Common contigs across inputs"
    );
    Ok(common)
}
