//! The per-region pipeline.
//!
//! A [`RegionProcessor`] starts uninitialized and opens its collaborators
//! through the [`ProcessorFactory`] the first time a region is processed. Each
//! region then goes through four timed stages:
//!
//! 1. get reads: query every read source, optionally realign, and replace the
//!    in-memory read cache
//! 2. find candidates: count alleles and call candidates (plus gVCF records)
//! 3. make pileup images: zero or more examples per candidate, built with the
//!    reads near it and its alt haplotypes
//! 4. label candidates: training mode only
//!
//! Outputs keep candidate order, and each candidate's examples stay together.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::core::interval::Interval;
use crate::core::types::{Candidate, Example, GvcfRecord, Label, Read, Variant};
use crate::processing::allele_counter::AlleleCounter;
use crate::processing::allele_frequency::{add_allele_frequencies_to_candidates, describe};
use crate::processing::options::ProcessorOptions;
use crate::processing::sources::{
    HaplotypeAlignments, ProcessorFactory, ReadSource, Realigner, ReferenceSource, Resources,
    SourceError,
};
use crate::processing::ProcessError;

/// Wall-clock time of each stage of one region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub get_reads: Duration,
    pub find_candidates: Duration,
    pub make_pileup_images: Duration,
    pub label_candidates: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionOutput {
    pub candidates: Vec<Candidate>,
    pub examples: Vec<Example>,
    pub gvcf_records: Vec<GvcfRecord>,
    pub num_reads: usize,
    pub timings: StageTimings,
}

enum State {
    Uninitialized,
    Initialized(Box<Resources>),
}

pub struct RegionProcessor {
    options: ProcessorOptions,
    factory: Box<dyn ProcessorFactory>,
    state: State,
}

impl RegionProcessor {
    #[must_use]
    pub fn new(options: ProcessorOptions, factory: Box<dyn ProcessorFactory>) -> Self {
        Self {
            options,
            factory,
            state: State::Uninitialized,
        }
    }

    #[must_use]
    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Initialized(_))
    }

    /// Open the collaborators unless that already happened.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::Source` if the factory fails; the processor then
    /// stays uninitialized.
    pub fn ensure_initialized(&mut self) -> Result<(), ProcessError> {
        if !self.is_initialized() {
            let resources = self.factory.initialize(&self.options)?;
            info!(mode = ?self.options.mode, "Initialized region processor");
            self.state = State::Initialized(Box::new(resources));
        }
        Ok(())
    }

    /// Run every stage over `region`.
    ///
    /// # Errors
    ///
    /// Returns the first collaborator failure, a reference mismatch found while
    /// matching allele frequencies, or a non-confident label in training mode.
    pub fn process(&mut self, region: &Interval) -> Result<RegionOutput, ProcessError> {
        self.ensure_initialized()?;
        let State::Initialized(resources) = &mut self.state else {
            return Err(ProcessError::NotInitialized);
        };
        let options = &self.options;
        let mut timings = StageTimings::default();

        let started = Instant::now();
        let reads = region_reads(resources, options, region)?;
        let num_reads = reads.len();
        resources.reads_cache.replace_reads(reads);
        timings.get_reads = started.elapsed();

        let started = Instant::now();
        let (candidates, gvcf_records) = candidates_in_region(resources, options, region)?;
        timings.find_candidates = started.elapsed();

        if candidates.is_empty() {
            debug!(region = %region, num_reads, "No candidates");
            return Ok(RegionOutput {
                candidates,
                examples: Vec::new(),
                gvcf_records,
                num_reads,
                timings,
            });
        }

        let started = Instant::now();
        let grouped = candidates
            .iter()
            .map(|candidate| create_pileup_examples(resources, options, candidate))
            .collect::<Result<Vec<_>, _>>()?;
        timings.make_pileup_images = started.elapsed();

        let started = Instant::now();
        let examples = if options.is_training() {
            let labeler = resources
                .labeler
                .as_mut()
                .ok_or(ProcessError::MissingLabeler)?;
            let labels = labeler.label_candidates(&candidates, region)?;
            label_examples(&candidates, grouped, &labels)?
        } else {
            grouped.into_iter().flatten().collect()
        };
        timings.label_candidates = started.elapsed();

        debug!(
            region = %region,
            num_reads,
            num_candidates = candidates.len(),
            num_examples = examples.len(),
            "Processed region"
        );
        Ok(RegionOutput {
            candidates,
            examples,
            gvcf_records,
            num_reads,
            timings,
        })
    }
}

/// Reads of `region` from every read source in order, realigned when enabled.
///
/// # Errors
///
/// Returns `ProcessError::Source` if a source or the realigner fails.
pub fn region_reads(
    resources: &mut Resources,
    options: &ProcessorOptions,
    region: &Interval,
) -> Result<Vec<Read>, ProcessError> {
    let mut reads = Vec::new();
    for source in &resources.read_sources {
        reads.extend(source.query(region)?);
    }

    if options.realigner_enabled {
        if let Some(realigner) = resources.realigner.as_mut() {
            let (realigned, info) = realigner.realign_reads(reads, region)?;
            debug!(
                region = %region,
                num_haplotypes = info.haplotypes.len(),
                "Realigned reads"
            );
            reads = realigned;
        }
    }
    Ok(reads)
}

/// Candidates and gVCF records from the cached reads of `region`.
///
/// A region without reads yields nothing and never builds an allele counter.
///
/// # Errors
///
/// Returns `ProcessError` if the reference, the caller or allele-frequency
/// matching fails.
pub fn candidates_in_region(
    resources: &Resources,
    options: &ProcessorOptions,
    region: &Interval,
) -> Result<(Vec<Candidate>, Vec<GvcfRecord>), ProcessError> {
    let reads = resources.reads_cache.query(region)?;
    if reads.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let mut counter = AlleleCounter::new(
        resources.reference.as_ref(),
        region.clone(),
        options.allele_counter.clone(),
    )?;
    for read in &reads {
        counter.add(read, &options.sample_name);
    }

    let (candidates, gvcf_records) = resources
        .variant_caller
        .calls_and_gvcfs(&counter, options.include_gvcfs)?;

    if !options.use_allele_frequency {
        return Ok((candidates, gvcf_records));
    }
    let candidates = add_allele_frequencies_to_candidates(
        candidates,
        resources.population.as_deref(),
        Some(resources.reference.as_ref()),
        options.allele_frequency_padding,
    )?;
    Ok((candidates, gvcf_records))
}

/// Each alt allele of `variant` spliced into the reference, keyed by alt. A
/// sequence starts `half_window` bases before the variant and is cut to
/// `2 * half_window + 1` bases, or less at the end of the contig. Returns the
/// sequences with the reference window they start in.
///
/// # Errors
///
/// Returns `ProcessError::ReferenceMismatch` when the variant's reference bases
/// disagree with the reference, or `ProcessError::Source` if the reference
/// cannot serve the window.
pub fn haplotype_sequences(
    variant: &Variant,
    reference: &dyn ReferenceSource,
    half_window: u64,
) -> Result<(BTreeMap<String, String>, Interval), ProcessError> {
    let width = 2 * half_window + 1;
    let length = reference
        .contig_length(&variant.contig)
        .ok_or_else(|| SourceError::UnknownContig(variant.contig.clone()))?;
    let window_start = variant.start.saturating_sub(half_window);
    let fetch_end = (variant.end + width).min(length);
    let span = Interval::new(variant.contig.clone(), window_start, fetch_end)
        .map_err(|_| ProcessError::InvalidVariant(describe(variant)))?;
    let bases = reference.bases(&span)?;

    let offset = |position: u64| usize::try_from(position - window_start).ok();
    let (Some(start), Some(end)) = (offset(variant.start), offset(variant.end)) else {
        return Err(ProcessError::InvalidVariant(describe(variant)));
    };
    let observed = bases.get(start..end);
    if observed != Some(variant.reference_bases.as_str()) {
        return Err(ProcessError::ReferenceMismatch {
            variant: describe(variant),
            expected: variant.reference_bases.clone(),
            observed: observed.unwrap_or_default().to_string(),
        });
    }

    let (prefix, suffix) = (&bases[..start], &bases[end..]);
    let sequences = variant
        .alternate_bases
        .iter()
        .map(|alt| {
            let mut haplotype = format!("{prefix}{alt}{suffix}");
            haplotype.truncate(usize::try_from(width).unwrap_or(usize::MAX));
            (alt.clone(), haplotype)
        })
        .collect();

    let window_end = (window_start + width).min(length);
    let window = Interval::new(variant.contig.clone(), window_start, window_end)
        .map_err(|_| ProcessError::InvalidVariant(describe(variant)))?;
    Ok((sequences, window))
}

/// `reads` aligned against every alt haplotype, keyed by alt.
///
/// # Errors
///
/// Returns `ProcessError::Source` if an alignment fails.
pub fn align_to_all_haplotypes(
    realigner: &dyn Realigner,
    sequences: &BTreeMap<String, String>,
    reads: &[Read],
    window: &Interval,
) -> Result<HaplotypeAlignments, ProcessError> {
    let mut alignments = HaplotypeAlignments::new();
    for (alt, haplotype) in sequences {
        alignments.insert(alt.clone(), realigner.align_to_haplotype(haplotype, reads, window)?);
    }
    Ok(alignments)
}

/// One example per image the pileup creator builds for `candidate`.
///
/// # Errors
///
/// Returns `ProcessError::ReferenceMismatch` if the candidate disagrees with
/// the reference, or `ProcessError::Source` if image creation fails.
pub fn create_pileup_examples(
    resources: &Resources,
    options: &ProcessorOptions,
    candidate: &Candidate,
) -> Result<Vec<Example>, ProcessError> {
    let variant = &candidate.variant;
    let reads = Interval::new(
        variant.contig.clone(),
        variant.start.saturating_sub(options.pileup_half_window),
        variant.end.max(variant.start + 1) + options.pileup_half_window,
    )
    .map(|window| resources.reads_cache.overlapping(&window))
    .unwrap_or_default();

    let (sequences, window) = haplotype_sequences(
        variant,
        resources.reference.as_ref(),
        options.pileup_half_window,
    )?;
    let alignments = match (&resources.realigner, options.alt_aligned_pileup) {
        (Some(realigner), true) => Some(align_to_all_haplotypes(
            realigner.as_ref(),
            &sequences,
            &reads,
            &window,
        )?),
        _ => None,
    };

    let pileup = resources.pileup_image.as_ref();
    let Some(images) =
        pileup.create_pileup_images(candidate, &[reads], alignments.as_ref(), Some(&sequences))?
    else {
        return Ok(Vec::new());
    };

    let shape = pileup.image_shape();
    Ok(images
        .into_iter()
        .map(|(alt_alleles, image)| {
            Example::new(
                variant.clone(),
                alt_alleles,
                image,
                shape.clone(),
                pileup.image_format(),
            )
        })
        .collect())
}

/// Stamp `label` onto `example`.
///
/// The example's variant becomes the label's variant carrying the label's
/// genotype, and its label value is the number of called alleles among the
/// example's alt alleles.
///
/// # Errors
///
/// Returns `ProcessError::NonConfidentLabel` for a non-confident label.
pub fn add_label_to_example(mut example: Example, label: &Label) -> Result<Example, ProcessError> {
    if !label.is_confident {
        return Err(ProcessError::NonConfidentLabel);
    }

    let alt_allele_indices = example.alt_allele_indices();
    example.variant = label.variant.clone().with_genotype(label.genotype.clone());
    example.label = Some(label.label_for_alt_alleles(&alt_allele_indices));
    Ok(example)
}

/// Label the examples of every labeled candidate, dropping the rest.
fn label_examples(
    candidates: &[Candidate],
    grouped: Vec<Vec<Example>>,
    labels: &[(Candidate, Label)],
) -> Result<Vec<Example>, ProcessError> {
    let mut labeled = Vec::new();
    for (candidate, examples) in candidates.iter().zip(grouped) {
        let Some((_, label)) = labels
            .iter()
            .find(|(c, _)| c.variant == candidate.variant)
        else {
            continue;
        };
        for example in examples {
            labeled.push(add_label_to_example(example, label)?);
        }
    }
    Ok(labeled)
}
