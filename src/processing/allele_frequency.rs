//! Population allele frequencies for candidates.
//!
//! The same indel can be written at different positions and with different
//! padding, so frequencies are not matched on coordinates. Instead the candidate
//! and every nearby population variant are applied as edits to one shared window
//! of reference sequence, and alleles whose resulting haplotypes are identical
//! are treated as the same event.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::core::interval::Interval;
use crate::core::types::{Candidate, Variant};
use crate::processing::sources::{PopulationSource, PopulationVariant, ReferenceSource, SourceError};
use crate::processing::ProcessError;

/// Reference bases fetched on each side of an indel to find its equivalent span
const LEFT_ALIGN_CONTEXT: u64 = 100;

/// One alternate allele of a variant applied to a reference window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Haplotype {
    pub haplotype: String,
    pub alt: String,
    pub variant: Variant,
}

pub(crate) fn describe(variant: &Variant) -> String {
    format!(
        "{}:{} {}>{}",
        variant.contig,
        variant.start + 1,
        variant.reference_bases,
        variant.alternate_bases.join(",")
    )
}

/// Apply each alternate of `variant` to `ref_haplotype`, which starts at
/// `ref_offset`. Haplotypes are returned in alternate order.
///
/// # Errors
///
/// Returns `ProcessError::ReferenceMismatch` when the variant's reference bases
/// are not what the window holds at its position.
pub fn update_haplotype(
    variant: &Variant,
    ref_haplotype: &str,
    ref_offset: u64,
) -> Result<Vec<Haplotype>, ProcessError> {
    let span = variant
        .start
        .checked_sub(ref_offset)
        .zip(variant.end.checked_sub(ref_offset))
        .and_then(|(s, e)| Some((usize::try_from(s).ok()?, usize::try_from(e).ok()?)));
    let observed = span.and_then(|(s, e)| ref_haplotype.get(s..e));

    let (Some((start, end)), Some(observed)) = (span, observed) else {
        return Err(ProcessError::ReferenceMismatch {
            variant: describe(variant),
            expected: variant.reference_bases.clone(),
            observed: String::new(),
        });
    };
    if observed != variant.reference_bases {
        return Err(ProcessError::ReferenceMismatch {
            variant: describe(variant),
            expected: variant.reference_bases.clone(),
            observed: observed.to_string(),
        });
    }

    let prefix = &ref_haplotype[..start];
    let suffix = &ref_haplotype[end..];
    Ok(variant
        .alternate_bases
        .iter()
        .map(|alt| Haplotype {
            haplotype: format!("{prefix}{alt}{suffix}"),
            alt: alt.clone(),
            variant: variant.clone(),
        })
        .collect())
}

/// Reference bases spanning `variant` and every `cohort` variant, with the
/// position they start at.
///
/// # Errors
///
/// Returns `SourceError` if the reference cannot serve the window.
pub fn ref_haplotype_and_offset(
    variant: &Variant,
    cohort: &[Variant],
    reference: &dyn ReferenceSource,
) -> Result<(String, u64), SourceError> {
    let start = cohort
        .iter()
        .map(|v| v.start)
        .fold(variant.start, u64::min);
    let end = cohort.iter().map(|v| v.end).fold(variant.end, u64::max);

    let window = Interval::new(variant.contig.clone(), start, end)
        .map_err(|e| SourceError::Failed(e.to_string()))?;
    Ok((reference.bases(&window)?, start))
}

/// An insertion or deletion reduced to its breakpoint, the inserted or
/// deleted bases, and how many reference bases it removes.
fn indel_event(variant: &Variant, alt: &str) -> Option<(u64, Vec<u8>, u64)> {
    let reference = variant.reference_bases.as_bytes();
    let alt = alt.as_bytes();
    let shared = reference
        .iter()
        .zip(alt)
        .take_while(|(r, a)| r == a)
        .count();
    let (ref_rest, alt_rest) = (&reference[shared..], &alt[shared..]);
    let breakpoint = variant.start + shared as u64;

    match (ref_rest.is_empty(), alt_rest.is_empty()) {
        (true, false) => Some((breakpoint, alt_rest.to_vec(), 0)),
        (false, true) => Some((breakpoint, ref_rest.to_vec(), ref_rest.len() as u64)),
        _ => None,
    }
}

/// The span an indel can slide over through repeated reference sequence while
/// describing the same haplotype, including an anchor base on the left.
fn equivalent_span(
    context: &[u8],
    context_start: u64,
    breakpoint: u64,
    bases: &[u8],
    deleted: u64,
) -> (u64, u64) {
    let base_at = |position: u64| {
        position
            .checked_sub(context_start)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| context.get(i))
            .copied()
    };

    let mut rotating = bases.to_vec();
    let mut left = breakpoint;
    while left > 0 && base_at(left - 1).is_some_and(|b| rotating.last() == Some(&b)) {
        rotating.rotate_right(1);
        left -= 1;
    }

    let mut rotating = bases.to_vec();
    let mut right = breakpoint + deleted;
    while base_at(right).is_some_and(|b| rotating.first() == Some(&b)) {
        rotating.rotate_left(1);
        right += 1;
    }

    (left.saturating_sub(1), right + 1)
}

/// Reference bases around `variant` used to slide its indels, with their start.
fn reference_context(variant: &Variant, reference: &dyn ReferenceSource) -> Option<(String, u64)> {
    let length = reference.contig_length(&variant.contig)?;
    let context_start = variant.start.saturating_sub(LEFT_ALIGN_CONTEXT);
    let context_end = (variant.end + LEFT_ALIGN_CONTEXT).min(length);
    let span = Interval::new(variant.contig.clone(), context_start, context_end).ok()?;
    reference.bases(&span).ok().map(|bases| (bases, context_start))
}

fn indel_spans<'a>(
    variant: &'a Variant,
    context: &'a [u8],
    context_start: u64,
) -> impl Iterator<Item = (u64, u64)> + 'a {
    variant
        .alternate_bases
        .iter()
        .filter_map(move |alt| indel_event(variant, alt))
        .map(move |(breakpoint, bases, deleted)| {
            equivalent_span(context, context_start, breakpoint, &bases, deleted)
        })
}

/// The region to query the population source over: the candidate, widened to
/// every equivalent placement of its indels, plus `padding` on both sides.
fn population_query_span(
    variant: &Variant,
    context: Option<&(String, u64)>,
    contig_length: Option<u64>,
    padding: u64,
) -> (u64, u64) {
    let (mut start, mut end) = (variant.start, variant.end);
    if let Some((bases, context_start)) = context {
        for (left, right) in indel_spans(variant, bases.as_bytes(), *context_start) {
            start = start.min(left);
            end = end.max(right);
        }
    }

    let end = end.saturating_add(padding);
    (
        start.saturating_sub(padding),
        contig_length.map_or(end, |length| end.min(length)),
    )
}

/// Leftmost anchor of the reference locus an indel-bearing `variant` edits.
/// Indels slide left through repeats so differently padded records of one
/// locus share an anchor.
fn indel_anchor(variant: &Variant, context: Option<&(String, u64)>) -> Option<u64> {
    let (bases, context_start) = context?;
    indel_spans(variant, bases.as_bytes(), *context_start)
        .map(|(left, _)| left)
        .min()
}

fn default_frequencies(variant: &Variant) -> BTreeMap<String, f64> {
    let mut frequencies: BTreeMap<String, f64> = variant
        .alternate_bases
        .iter()
        .map(|alt| (alt.clone(), 0.0))
        .collect();
    frequencies.insert(variant.reference_bases.clone(), 1.0);
    frequencies
}

/// Per-allele population frequency of `variant`, keyed by allele bases.
///
/// Alternates take the frequency of the population allele whose haplotype
/// they reproduce, or 0. The reference takes the reference frequency of the
/// population record at the same locus: one starting where `variant` starts,
/// or one whose indels left-align to the same anchor. Without such a record it
/// is 1 minus every alternate of the matched records. Without a population
/// source, a reference, or any overlapping population variant, every
/// alternate is 0 and the reference 1.
///
/// # Errors
///
/// Returns `ProcessError::ReferenceMismatch` if the candidate disagrees with
/// the reference, or `ProcessError::Source` if the population query fails.
pub fn find_matching_allele_frequency(
    variant: &Variant,
    population: Option<&dyn PopulationSource>,
    reference: Option<&dyn ReferenceSource>,
    padding: u64,
) -> Result<BTreeMap<String, f64>, ProcessError> {
    let (Some(population), Some(reference)) = (population, reference) else {
        return Ok(default_frequencies(variant));
    };

    let context = reference_context(variant, reference);
    let (query_start, query_end) = population_query_span(
        variant,
        context.as_ref(),
        reference.contig_length(&variant.contig),
        padding,
    );
    let query = Interval::new(variant.contig.clone(), query_start, query_end)
        .map_err(|_| ProcessError::InvalidVariant(describe(variant)))?;
    let cohort: Vec<PopulationVariant> = population.query(&query)?;
    if cohort.is_empty() {
        return Ok(default_frequencies(variant));
    }

    let cohort_variants: Vec<Variant> = cohort.iter().map(|p| p.variant.clone()).collect();
    let (ref_haplotype, ref_offset) =
        match ref_haplotype_and_offset(variant, &cohort_variants, reference) {
            Ok(window) => window,
            Err(e) => {
                debug!(variant = %describe(variant), error = %e, "Reference window unavailable");
                return Ok(default_frequencies(variant));
            }
        };

    let candidate_haplotypes = update_haplotype(variant, &ref_haplotype, ref_offset)?;

    // (index into cohort, index of the alt, haplotype string)
    let mut cohort_haplotypes: Vec<(usize, usize, String)> = Vec::new();
    for (i, population_variant) in cohort.iter().enumerate() {
        match update_haplotype(&population_variant.variant, &ref_haplotype, ref_offset) {
            Ok(haplotypes) => cohort_haplotypes.extend(
                haplotypes
                    .into_iter()
                    .enumerate()
                    .map(|(alt_index, h)| (i, alt_index, h.haplotype)),
            ),
            Err(e) => warn!(error = %e, "Skipping population variant"),
        }
    }

    let mut frequencies = default_frequencies(variant);
    let mut matched: BTreeSet<usize> = BTreeSet::new();
    for candidate in &candidate_haplotypes {
        let hit = cohort_haplotypes
            .iter()
            .find(|(_, _, haplotype)| *haplotype == candidate.haplotype);
        if let Some(&(i, alt_index, _)) = hit {
            let frequency = cohort[i]
                .alt_frequencies
                .get(alt_index)
                .copied()
                .unwrap_or(0.0);
            frequencies.insert(candidate.alt.clone(), frequency);
            matched.insert(i);
        }
    }

    // The reference allele is shared by every record of the same locus,
    // however each one pads its alleles.
    let anchor = indel_anchor(variant, context.as_ref());
    let same_locus = cohort
        .iter()
        .find(|p| p.variant.start == variant.start)
        .or_else(|| {
            let anchor = anchor?;
            cohort
                .iter()
                .find(|p| indel_anchor(&p.variant, context.as_ref()) == Some(anchor))
        });
    let ref_frequency = match same_locus {
        Some(p) => p
            .ref_frequency
            .unwrap_or_else(|| 1.0 - p.alt_frequencies.iter().sum::<f64>()),
        None => {
            1.0 - matched
                .iter()
                .flat_map(|&i| cohort[i].alt_frequencies.iter())
                .sum::<f64>()
        }
    };
    frequencies.insert(variant.reference_bases.clone(), ref_frequency.clamp(0.0, 1.0));

    Ok(frequencies)
}

/// Candidates with their `allele_frequency` filled in, in input order.
///
/// # Errors
///
/// Returns the first error of [`find_matching_allele_frequency`].
pub fn add_allele_frequencies_to_candidates(
    candidates: Vec<Candidate>,
    population: Option<&dyn PopulationSource>,
    reference: Option<&dyn ReferenceSource>,
    padding: u64,
) -> Result<Vec<Candidate>, ProcessError> {
    candidates
        .into_iter()
        .map(|candidate| {
            let frequencies =
                find_matching_allele_frequency(&candidate.variant, population, reference, padding)?;
            Ok(candidate.with_allele_frequency(frequencies))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::fasta::InMemoryReference;
    use crate::parsing::vcf::PopulationVcf;

    const POPULATION: &str = "##fileformat=VCFv4.2
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
chr20\t60169\t.\tC\tT\t.\tPASS\tAF=0.0002
chr20\t60280\t.\tTTTCCA\tT,TTTCCATTCCA\t.\tPASS\tAF=0.000399,0.0002
chr20\t60286\t.\tTTCCAG\tT\t.\tPASS\tAF=0.001198
chr20\t60295\t.\tATTCCA\tA,ATTCCATTCCA\t.\tPASS\tAF=0.000399,0.075679
chr20\t61001\t.\tCTT\tCT,CTTTT,CTTTTT,CTTTTTT\t.\tPASS\tAF=0.167732,0.215256,0.145367,0.029553
chr20\t61066\t.\tTA\tCA,TG\t.\tPASS\tAF=0.079872,0.000399
";

    /// A stretch of chr20 with the bases around each population record in place.
    fn chr20() -> InMemoryReference {
        let mut sequence = vec![b'G'; 61_200];
        sequence[60_165..60_171].copy_from_slice(b"GCACCT");
        sequence[60_279..60_301].copy_from_slice(b"TTTCCATTCCAGTCCATTCCAT");
        sequence[61_000..61_007].copy_from_slice(b"CTTTTAG");
        sequence[61_065..61_067].copy_from_slice(b"TA");
        InMemoryReference::from_sequences([("chr20", sequence)])
    }

    fn population() -> PopulationVcf {
        PopulationVcf::from_reader(POPULATION.as_bytes()).unwrap()
    }

    fn frequencies(variant: &Variant) -> BTreeMap<String, f64> {
        let reference = chr20();
        let population = population();
        find_matching_allele_frequency(variant, Some(&population), Some(&reference), 0).unwrap()
    }

    fn assert_frequencies(actual: &BTreeMap<String, f64>, expected: &[(&str, f64)]) {
        let alleles: BTreeSet<&str> = expected.iter().map(|(allele, _)| *allele).collect();
        assert_eq!(actual.keys().map(String::as_str).collect::<BTreeSet<_>>(), alleles);
        for (allele, frequency) in expected {
            assert!(
                (actual[*allele] - frequency).abs() < 1e-9,
                "{allele}: {} != {frequency}",
                actual[*allele]
            );
        }
    }

    #[test]
    fn test_update_haplotype() {
        let cases: &[(Variant, &str, u64, &str)] = &[
            (Variant::new("chr20", 60168, "C", ["T"]), "GCACCT", 60165, "GCATCT"),
            (
                Variant::new("chr20", 60284, "ATTCCAG", ["AT"]),
                "TTTCCATTCCAGTCCAT",
                60279,
                "TTTCCATTCCAT",
            ),
            (
                Variant::new("chr20", 60279, "TTTCCA", ["TTTCCATTCCA"]),
                "TTTCCATTCCAGTCCAT",
                60279,
                "TTTCCATTCCATTCCAGTCCAT",
            ),
            (
                Variant::new("chr20", 60284, "ATTCCAG", ["AT"]),
                "TTTCCATTCCAG",
                60279,
                "TTTCCAT",
            ),
            (
                Variant::new("chr20", 60279, "TTTCCA", ["TTTCCATTCCA"]),
                "TTTCCATTCCAG",
                60279,
                "TTTCCATTCCATTCCAG",
            ),
        ];

        for (variant, window, offset, expected) in cases {
            let haplotypes = update_haplotype(variant, window, *offset).unwrap();
            assert_eq!(
                haplotypes,
                vec![Haplotype {
                    haplotype: (*expected).to_string(),
                    alt: variant.alternate_bases[0].clone(),
                    variant: variant.clone(),
                }]
            );
        }
    }

    #[test]
    fn test_update_haplotype_reference_mismatch() {
        let variant = Variant::new("chr20", 60168, "G", ["T"]);
        let err = update_haplotype(&variant, "GCACCT", 60165).unwrap_err();
        assert!(matches!(err, ProcessError::ReferenceMismatch { .. }));
        assert!(err.to_string().contains("chr20:60169"));

        // Outside the window.
        let variant = Variant::new("chr20", 60100, "G", ["T"]);
        assert!(update_haplotype(&variant, "GCACCT", 60165).is_err());
    }

    #[test]
    fn test_ref_haplotype_and_offset() {
        let reference = chr20();
        let candidate = Variant::new("chr20", 60284, "ATTCCAG", ["AT"]);
        let cohort = [
            Variant::new("chr20", 60279, "TTTCCA", ["T", "TTTCCATTCCA"]),
            Variant::new("chr20", 60285, "TTCCAG", ["T"]),
        ];
        let (haplotype, offset) = ref_haplotype_and_offset(&candidate, &cohort, &reference).unwrap();
        assert_eq!(haplotype, "TTTCCATTCCAG");
        assert_eq!(offset, 60279);
    }

    #[test]
    fn test_find_matching_allele_frequency() {
        let cases: &[(Variant, &[(&str, f64)])] = &[
            (
                Variant::new("chr20", 60168, "C", ["T"]),
                &[("C", 0.9998), ("T", 0.0002)],
            ),
            (
                Variant::new("chr20", 60285, "TTCCAG", ["T"]),
                &[("T", 0.001198), ("TTCCAG", 0.998802)],
            ),
            (
                Variant::new("chr20", 60284, "ATTCCAG", ["A"]),
                &[("A", 0.0), ("ATTCCAG", 1.0)],
            ),
            (
                Variant::new("chr20", 60284, "ATTCCAG", ["AT"]),
                &[("AT", 0.001198), ("ATTCCAG", 0.998802)],
            ),
            (
                Variant::new("chr20", 60150, "G", ["T"]),
                &[("G", 1.0), ("T", 0.0)],
            ),
            (
                Variant::new("chr20", 60168, "C", ["T", "A"]),
                &[("C", 0.9998), ("T", 0.0002), ("A", 0.0)],
            ),
            (
                Variant::new("chr20", 60168, "C", ["A"]),
                &[("C", 0.9998), ("A", 0.0)],
            ),
            (
                Variant::new("chr20", 60279, "TTTCCA", ["T", "TTTCCATTCCA"]),
                &[("TTTCCA", 0.999401), ("T", 0.000399), ("TTTCCATTCCA", 0.0002)],
            ),
            (
                Variant::new("chr20", 60279, "TTTCCA", ["T", "TATCCATTCCA"]),
                &[("TTTCCA", 0.999401), ("T", 0.000399), ("TATCCATTCCA", 0.0)],
            ),
            (
                Variant::new("chr20", 60279, "TTTCCA", ["T"]),
                &[("TTTCCA", 0.999401), ("T", 0.000399)],
            ),
        ];

        for (variant, expected) in cases {
            assert_frequencies(&frequencies(variant), expected);
        }
    }

    #[test]
    fn test_reference_frequency_from_differently_padded_records() {
        let cases: &[(Variant, &[(&str, f64)])] = &[
            // A deletion written from a different anchor: the reference
            // accounts for every alternate of the matched record.
            (
                Variant::new("chr20", 60295, "TTCCAT", ["T"]),
                &[("T", 0.000399), ("TTCCAT", 0.923922)],
            ),
            // Left-aligned repeat indels at the record's own start.
            (
                Variant::new("chr20", 61000, "CT", ["C", "CTTT"]),
                &[("C", 0.167732), ("CTTT", 0.215256), ("CT", 0.442092)],
            ),
            (
                Variant::new("chr20", 61000, "C", ["CTTT"]),
                &[("CTTT", 0.145367), ("C", 0.442092)],
            ),
            (
                Variant::new("chr20", 61000, "CTT", ["CTTA"]),
                &[("CTTA", 0.0), ("CTT", 0.442092)],
            ),
            // An unmatched deletion further into the repeat.
            (
                Variant::new("chr20", 61001, "TTTT", ["T"]),
                &[("T", 0.0), ("TTTT", 0.442092)],
            ),
            // A SNP matched through a two-base population record.
            (
                Variant::new("chr20", 61065, "T", ["C"]),
                &[("C", 0.079872), ("T", 0.919729)],
            ),
        ];

        for (variant, expected) in cases {
            assert_frequencies(&frequencies(variant), expected);
        }
    }

    #[test]
    fn test_reference_frequency_ignores_ref_padding() {
        let mut sequence = vec![b'G'; 206];
        sequence[100..106].copy_from_slice(b"CTTTAG");
        let reference = InMemoryReference::from_sequences([("chr1", sequence)]);
        let population = PopulationVcf::from_reader(
            "##fileformat=VCFv4.2
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
chr1\t101\t.\tCTTT\tC,CTTTTTT\t.\tPASS\tAF=0.2,0.1
"
            .as_bytes(),
        )
        .unwrap();

        let cases: &[(Variant, &[(&str, f64)])] = &[
            (Variant::new("chr1", 100, "CTTT", ["C"]), &[("CTTT", 0.7), ("C", 0.2)]),
            (Variant::new("chr1", 100, "C", ["CTTT"]), &[("C", 0.7), ("CTTT", 0.1)]),
            (Variant::new("chr1", 100, "CTT", ["CTTA"]), &[("CTT", 0.7), ("CTTA", 0.0)]),
            (Variant::new("chr1", 101, "TT", ["T"]), &[("TT", 0.7), ("T", 0.0)]),
        ];
        for (variant, expected) in cases {
            let actual =
                find_matching_allele_frequency(variant, Some(&population), Some(&reference), 0).unwrap();
            assert_frequencies(&actual, expected);
        }
    }

    #[test]
    fn test_annotated_reference_frequency_is_used() {
        let reference = chr20();
        let population = PopulationVcf::from_reader(
            "##fileformat=VCFv4.2
##INFO=<ID=AF,Number=R,Type=Float,Description=\"Allele Frequency\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
chr20\t60169\t.\tC\tT\t.\tPASS\tAF=0.9,0.0002
"
            .as_bytes(),
        )
        .unwrap();

        // Not 1 - 0.0002: the record carries its own reference frequency.
        let matched = Variant::new("chr20", 60168, "C", ["T"]);
        let actual = find_matching_allele_frequency(&matched, Some(&population), Some(&reference), 0).unwrap();
        assert_frequencies(&actual, &[("C", 0.9), ("T", 0.0002)]);

        let unmatched = Variant::new("chr20", 60168, "C", ["A"]);
        let actual = find_matching_allele_frequency(&unmatched, Some(&population), Some(&reference), 0).unwrap();
        assert_frequencies(&actual, &[("C", 0.9), ("A", 0.0)]);
    }

    #[test]
    fn test_shifted_insertion_found_by_widening() {
        // The same TTCCA insertion written one repeat unit to the right, past
        // the end of the population record.
        let variant = Variant::new("chr20", 60289, "A", ["ATTCCA"]);
        assert_frequencies(&frequencies(&variant), &[("A", 0.999401), ("ATTCCA", 0.0002)]);
    }

    #[test]
    fn test_candidate_reference_mismatch_is_an_error() {
        let reference = chr20();
        let population = population();
        let variant = Variant::new("chr20", 60168, "A", ["T"]);
        let result =
            find_matching_allele_frequency(&variant, Some(&population), Some(&reference), 0);
        assert!(matches!(result, Err(ProcessError::ReferenceMismatch { .. })));
    }

    #[test]
    fn test_missing_sources_default_frequencies() {
        let reference = chr20();
        let population = population();
        let variant = Variant::new("chr20", 60168, "C", ["T"]);
        let expected = [("C", 1.0), ("T", 0.0)];

        let none = find_matching_allele_frequency(&variant, None, Some(&reference), 0).unwrap();
        assert_frequencies(&none, &expected);
        let none = find_matching_allele_frequency(&variant, Some(&population), None, 0).unwrap();
        assert_frequencies(&none, &expected);
    }

    #[test]
    fn test_padding_reaches_nearby_population_variants() {
        let reference = chr20();
        let population = population();
        let variant = Variant::new("chr20", 60165, "G", ["A"]);

        let without = find_matching_allele_frequency(&variant, Some(&population), Some(&reference), 0).unwrap();
        assert_frequencies(&without, &[("G", 1.0), ("A", 0.0)]);

        // The C>T three bases away now shares the window but does not match.
        let padded = find_matching_allele_frequency(&variant, Some(&population), Some(&reference), 5).unwrap();
        assert_frequencies(&padded, &[("G", 1.0), ("A", 0.0)]);
    }

    #[test]
    fn test_add_allele_frequencies_keeps_order() {
        let reference = chr20();
        let population = population();
        let candidates = vec![
            Candidate::new(Variant::new("chr20", 60279, "TTTCCA", ["T"])),
            Candidate::new(Variant::new("chr20", 60168, "C", ["T"])),
        ];

        let enriched =
            add_allele_frequencies_to_candidates(candidates.clone(), Some(&population), Some(&reference), 0)
                .unwrap();
        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].variant, candidates[0].variant);
        assert_eq!(enriched[1].variant, candidates[1].variant);
        assert!((enriched[0].allele_frequency["T"] - 0.000399).abs() < 1e-9);
        assert!((enriched[1].allele_frequency["T"] - 0.0002).abs() < 1e-9);
        // The input is untouched.
        assert!(candidates[0].allele_frequency.is_empty());
    }
}
