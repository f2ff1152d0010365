//! Building the set of positions to call from include/exclude arguments.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::core::contig::Contig;
use crate::core::interval::{Interval, RegionLiteral};
use crate::core::range_set::IntervalSet;
use crate::parsing::bed::{is_bed_file, parse_bed_file};
use crate::processing::options::RegionOptions;
use crate::regions::RegionError;

/// Resolve region arguments (literals or BED files) against `contigs`.
///
/// Literals naming an unknown contig are skipped with a debug log. BED files
/// are read as-is; their intervals on unknown contigs disappear once the result
/// is intersected with the genome.
///
/// # Errors
///
/// Returns `RegionError::Literal` for malformed literals and
/// `RegionError::RegionsFile` for unreadable BED files.
pub fn resolve_region_args<S: AsRef<str>>(
    args: &[S],
    contigs: &[Contig],
) -> Result<IntervalSet, RegionError> {
    let mut intervals = Vec::new();

    for arg in args {
        let arg = arg.as_ref().trim();
        if is_bed_file(arg) {
            intervals.extend(parse_bed_file(Path::new(arg))?.iter().cloned());
            continue;
        }

        let literal: RegionLiteral = arg.parse()?;
        match literal.resolve(contigs) {
            Some(interval) => intervals.push(interval),
            None => debug!(region = %arg, "Ignoring region on a contig not in the reference"),
        }
    }

    Ok(IntervalSet::from_intervals(intervals))
}

/// `includes − excludes`, where empty `includes` means every contig in full.
///
/// The result is limited to the extents of `contigs`.
///
/// # Errors
///
/// Returns a `RegionError` if any argument cannot be resolved.
pub fn build_calling_regions<S: AsRef<str>>(
    contigs: &[Contig],
    includes: &[S],
    excludes: &[S],
) -> Result<IntervalSet, RegionError> {
    let genome = IntervalSet::from_contigs(contigs);

    let included = if includes.is_empty() {
        genome
    } else {
        resolve_region_args(includes, contigs)?.intersection(&genome)
    };

    if excludes.is_empty() {
        return Ok(included);
    }
    Ok(included.difference(&resolve_region_args(excludes, contigs)?))
}

/// The calling regions of a run, which must not be empty.
///
/// # Errors
///
/// Returns `RegionError::EmptyCallingRegions` when the includes and excludes
/// leave nothing to call, or any error of [`build_calling_regions`].
pub fn processing_regions(
    contigs: &[Contig],
    options: &RegionOptions,
) -> Result<IntervalSet, RegionError> {
    let regions = build_calling_regions(contigs, &options.regions, &options.exclude_regions)?;

    if regions.is_empty() {
        return Err(RegionError::EmptyCallingRegions {
            num_contigs: contigs.len(),
        });
    }

    info!(
        num_intervals = regions.len(),
        total_bases = regions.total_length(),
        "Built calling regions"
    );
    Ok(regions)
}

/// Keep, in order, the regions containing the start of at least one variant.
///
/// A variant spanning several regions belongs only to the region it starts in.
#[must_use]
pub fn filter_regions_by_vcf(regions: &[Interval], variant_positions: &[Interval]) -> Vec<Interval> {
    let mut starts: HashMap<&str, Vec<u64>> = HashMap::new();
    for variant in variant_positions {
        starts
            .entry(variant.contig.as_str())
            .or_default()
            .push(variant.start);
    }
    for positions in starts.values_mut() {
        positions.sort_unstable();
    }

    regions
        .iter()
        .filter(|region| {
            starts.get(region.contig.as_str()).is_some_and(|positions| {
                let idx = positions.partition_point(|&p| p < region.start);
                positions.get(idx).is_some_and(|&p| p < region.end)
            })
        })
        .cloned()
        .collect()
}
