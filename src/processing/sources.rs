//! Collaborator interfaces reached by the region processor.
//!
//! Each external capability (read access, realignment, variant calling, pileup
//! encoding, labeling, reference and population lookups) sits behind one narrow
//! trait. [`ProcessorFactory::initialize`] is the only place the concrete
//! implementations are opened.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::contig::Contig;
use crate::core::interval::Interval;
use crate::core::types::{Candidate, GvcfRecord, Label, Read, Variant};
use crate::processing::allele_counter::AlleleCounter;
use crate::processing::options::ProcessorOptions;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Unknown contig '{0}'")]
    UnknownContig(String),

    #[error("Region {region} extends past the end of contig '{contig}' ({length} bases)")]
    OutOfBounds {
        region: String,
        contig: String,
        length: u64,
    },

    #[error("Failed to open {what}: {reason}")]
    Open { what: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// A stream of aligned reads that can be queried by region
pub trait ReadSource {
    /// Reads overlapping `region`, in source order.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the underlying reads cannot be fetched.
    fn query(&self, region: &Interval) -> Result<Vec<Read>, SourceError>;
}

/// What a realigner reports alongside the realigned reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealignmentInfo {
    /// Candidate haplotypes the reads were realigned against
    pub haplotypes: Vec<String>,
}

pub trait Realigner {
    /// # Errors
    ///
    /// Returns `SourceError` if realignment fails.
    fn realign_reads(
        &mut self,
        reads: Vec<Read>,
        region: &Interval,
    ) -> Result<(Vec<Read>, RealignmentInfo), SourceError>;

    /// `reads` aligned against `haplotype`, whose first base sits at the start
    /// of `window`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if alignment fails.
    fn align_to_haplotype(
        &self,
        haplotype: &str,
        reads: &[Read],
        window: &Interval,
    ) -> Result<Vec<Read>, SourceError>;
}

pub trait VariantCaller {
    /// Candidate variants from the counted alleles, plus per-position gVCF
    /// records when `include_gvcfs` is set.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the caller fails.
    fn calls_and_gvcfs(
        &self,
        counter: &AlleleCounter<'_>,
        include_gvcfs: bool,
    ) -> Result<(Vec<Candidate>, Vec<GvcfRecord>), SourceError>;
}

/// Reads aligned to each alt haplotype of a candidate, keyed by alt allele
pub type HaplotypeAlignments = BTreeMap<String, Vec<Read>>;

/// Alt-allele subset and the encoded image built for it
pub type PileupImage = (Vec<String>, Vec<u8>);

pub trait PileupImageCreator {
    /// Images for `candidate`, one per alt-allele subset. `None` when no image
    /// can be built (for example, too few reads).
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if image creation fails.
    fn create_pileup_images(
        &self,
        candidate: &Candidate,
        reads_for_samples: &[Vec<Read>],
        haplotype_alignments: Option<&HaplotypeAlignments>,
        haplotype_sequences: Option<&BTreeMap<String, String>>,
    ) -> Result<Option<Vec<PileupImage>>, SourceError>;

    fn image_shape(&self) -> Vec<usize>;

    fn image_format(&self) -> &str;
}

pub trait Labeler {
    /// Truth labels for `candidates`, in candidate order. Candidates without a
    /// label are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the truth set cannot be read.
    fn label_candidates(
        &mut self,
        candidates: &[Candidate],
        region: &Interval,
    ) -> Result<Vec<(Candidate, Label)>, SourceError>;
}

/// A variant from a population (cohort) resource with its allele frequencies
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationVariant {
    pub variant: Variant,

    /// One frequency per alternate allele, in `alternate_bases` order
    pub alt_frequencies: Vec<f64>,

    /// The reference allele's frequency, when the resource annotates it
    pub ref_frequency: Option<f64>,
}

pub trait PopulationSource {
    /// Population variants overlapping `region`, sorted by start.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the resource cannot be read.
    fn query(&self, region: &Interval) -> Result<Vec<PopulationVariant>, SourceError>;
}

pub trait ReferenceSource {
    fn contigs(&self) -> &[Contig];

    /// Upper-case reference bases of `region`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::UnknownContig` or `SourceError::OutOfBounds` when
    /// the region cannot be served.
    fn bases(&self, region: &Interval) -> Result<String, SourceError>;

    /// Length of `contig`, if known.
    fn contig_length(&self, contig: &str) -> Option<u64> {
        self.contigs()
            .iter()
            .find(|c| c.name == contig)
            .map(|c| c.length)
    }
}

/// Every collaborator a region processor needs, opened once
pub struct Resources {
    pub read_sources: Vec<Box<dyn ReadSource>>,
    pub reads_cache: InMemoryReads,
    pub realigner: Option<Box<dyn Realigner>>,
    pub variant_caller: Box<dyn VariantCaller>,
    pub pileup_image: Box<dyn PileupImageCreator>,
    pub labeler: Option<Box<dyn Labeler>>,
    pub reference: Box<dyn ReferenceSource>,
    pub population: Option<Box<dyn PopulationSource>>,
}

/// Opens the collaborators for a processor
pub trait ProcessorFactory {
    /// # Errors
    ///
    /// Returns `SourceError` if any collaborator cannot be opened.
    fn initialize(&self, options: &ProcessorOptions) -> Result<Resources, SourceError>;
}

/// The reads of the region being processed, replaced wholesale per region
#[derive(Debug, Clone, Default)]
pub struct InMemoryReads {
    reads: Vec<Read>,
}

impl InMemoryReads {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_reads(&mut self, reads: Vec<Read>) {
        self.reads = reads;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Cached reads overlapping `region`.
    #[must_use]
    pub fn overlapping(&self, region: &Interval) -> Vec<Read> {
        self.reads
            .iter()
            .filter(|read| read.overlaps(region))
            .cloned()
            .collect()
    }
}

impl ReadSource for InMemoryReads {
    fn query(&self, region: &Interval) -> Result<Vec<Read>, SourceError> {
        Ok(self.overlapping(region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::parse_cigar;

    fn read(name: &str, start: u64, cigar: &str) -> Read {
        let cigar = parse_cigar(cigar).unwrap();
        Read {
            fragment_name: name.to_string(),
            read_number: 0,
            contig: "chr1".to_string(),
            start,
            mapping_quality: 60,
            cigar,
            sequence: b"ACGTACGTAC".to_vec(),
            qualities: vec![30; 10],
        }
    }

    #[test]
    fn test_in_memory_reads_replace_and_query() {
        let mut cache = InMemoryReads::new();
        assert!(cache.is_empty());

        cache.replace_reads(vec![read("a", 0, "10M"), read("b", 100, "10M")]);
        assert_eq!(cache.len(), 2);

        let region = Interval::new("chr1", 5, 20).unwrap();
        let hits = cache.query(&region).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fragment_name, "a");

        cache.replace_reads(vec![read("c", 10, "10M")]);
        let hits = cache.query(&region).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fragment_name, "c");
    }
}
