use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::interval::Interval;

/// A variant: a reference allele and zero or more alternates at `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    pub contig: String,
    pub start: u64,
    pub end: u64,
    pub reference_bases: String,
    pub alternate_bases: Vec<String>,

    /// Genotype of the single call on this variant, if known (e.g. `[0, 1]`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genotype: Vec<i32>,
}

impl Variant {
    /// Create a variant whose end is implied by the length of its reference allele.
    pub fn new<S: Into<String>>(
        contig: impl Into<String>,
        start: u64,
        reference_bases: impl Into<String>,
        alternate_bases: impl IntoIterator<Item = S>,
    ) -> Self {
        let reference_bases = reference_bases.into();
        Self {
            contig: contig.into(),
            start,
            end: start + reference_bases.len() as u64,
            reference_bases,
            alternate_bases: alternate_bases.into_iter().map(Into::into).collect(),
            genotype: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_genotype(mut self, genotype: Vec<i32>) -> Self {
        self.genotype = genotype;
        self
    }

    /// The span of the variant. `None` for a malformed variant with `end <= start`.
    #[must_use]
    pub fn interval(&self) -> Option<Interval> {
        Interval::new(self.contig.clone(), self.start, self.end).ok()
    }

    /// Reference allele followed by the alternates.
    pub fn alleles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.reference_bases.as_str())
            .chain(self.alternate_bases.iter().map(String::as_str))
    }

    /// True when the reference and every alternate are a single base.
    #[must_use]
    pub fn is_snp(&self) -> bool {
        self.reference_bases.len() == 1 && self.alternate_bases.iter().all(|a| a.len() == 1)
    }
}

/// A putative variant site with its read evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub variant: Variant,

    /// Allele -> keys of the reads supporting it
    #[serde(default)]
    pub allele_support: BTreeMap<String, Vec<String>>,

    /// Allele -> population allele frequency, filled in by allele-frequency enrichment
    #[serde(default)]
    pub allele_frequency: BTreeMap<String, f64>,
}

impl Candidate {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            allele_support: BTreeMap::new(),
            allele_frequency: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_allele_frequency(mut self, allele_frequency: BTreeMap<String, f64>) -> Self {
        self.allele_frequency = allele_frequency;
        self
    }
}

/// The truth label for one candidate, produced by a labeler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub is_confident: bool,
    pub variant: Variant,
    pub genotype: Vec<i32>,
}

impl Label {
    /// Number of called alleles that fall into `alt_allele_indices` (0-based
    /// indices into the variant's alternates). 0, 1 or 2 for a diploid call.
    #[must_use]
    pub fn label_for_alt_alleles(&self, alt_allele_indices: &[usize]) -> u8 {
        let count = self
            .genotype
            .iter()
            .filter(|&&g| {
                usize::try_from(g)
                    .ok()
                    .and_then(|g| g.checked_sub(1))
                    .is_some_and(|alt| alt_allele_indices.contains(&alt))
            })
            .count();
        u8::try_from(count).unwrap_or(u8::MAX)
    }
}

/// An encoded pileup example. Only `variant` and `label` are touched by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub variant: Variant,
    pub alt_alleles: Vec<String>,
    pub encoded_image: Vec<u8>,
    pub image_shape: Vec<usize>,
    pub image_format: String,
    pub label: Option<u8>,
}

impl Example {
    pub fn new(
        variant: Variant,
        alt_alleles: Vec<String>,
        encoded_image: Vec<u8>,
        image_shape: Vec<usize>,
        image_format: impl Into<String>,
    ) -> Self {
        Self {
            variant,
            alt_alleles,
            encoded_image,
            image_shape,
            image_format: image_format.into(),
            label: None,
        }
    }

    /// 0-based indices of this example's alt alleles within the variant's alternates.
    #[must_use]
    pub fn alt_allele_indices(&self) -> Vec<usize> {
        self.alt_alleles
            .iter()
            .filter_map(|alt| self.variant.alternate_bases.iter().position(|a| a == alt))
            .collect()
    }
}

/// A per-position gVCF summary for positions without a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GvcfRecord {
    pub contig: String,
    pub start: u64,
    pub end: u64,
    pub ref_base: String,
    pub ref_support: u32,
    pub total: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CigarError {
    #[error("Invalid CIGAR string '{0}'")]
    Invalid(String),

    #[error("Unknown CIGAR operation '{0}'")]
    UnknownOperation(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarKind {
    Match,
    Insertion,
    Deletion,
    Skip,
    SoftClip,
    HardClip,
    Pad,
    SequenceMatch,
    SequenceMismatch,
}

impl CigarKind {
    fn from_char(c: char) -> Result<Self, CigarError> {
        Ok(match c {
            'M' => Self::Match,
            'I' => Self::Insertion,
            'D' => Self::Deletion,
            'N' => Self::Skip,
            'S' => Self::SoftClip,
            'H' => Self::HardClip,
            'P' => Self::Pad,
            '=' => Self::SequenceMatch,
            'X' => Self::SequenceMismatch,
            other => return Err(CigarError::UnknownOperation(other)),
        })
    }

    /// Whether the operation advances along the reference.
    #[must_use]
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            Self::Match
                | Self::Deletion
                | Self::Skip
                | Self::Pad
                | Self::SequenceMatch
                | Self::SequenceMismatch
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: u32,
}

impl CigarOp {
    pub fn new(kind: CigarKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Parse a CIGAR string such as `10M2I5M`.
///
/// # Errors
///
/// Returns `CigarError` for empty strings, missing lengths or unknown operations.
pub fn parse_cigar(cigar: &str) -> Result<Vec<CigarOp>, CigarError> {
    let mut ops = Vec::new();
    let mut len: Option<u32> = None;
    for c in cigar.chars() {
        if let Some(digit) = c.to_digit(10) {
            let current = len.unwrap_or(0);
            len = Some(
                current
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or_else(|| CigarError::Invalid(cigar.to_string()))?,
            );
        } else {
            let op_len = len.take().ok_or_else(|| CigarError::Invalid(cigar.to_string()))?;
            ops.push(CigarOp::new(CigarKind::from_char(c)?, op_len));
        }
    }
    if ops.is_empty() || len.is_some() {
        return Err(CigarError::Invalid(cigar.to_string()));
    }
    Ok(ops)
}

/// A minimal aligned read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub fragment_name: String,
    pub read_number: u8,
    pub contig: String,
    /// 0-based alignment start on the reference
    pub start: u64,
    pub mapping_quality: u8,
    pub cigar: Vec<CigarOp>,
    pub sequence: Vec<u8>,
    pub qualities: Vec<u8>,
}

impl Read {
    /// Reference position one past the last aligned base.
    #[must_use]
    pub fn reference_end(&self) -> u64 {
        self.start
            + self
                .cigar
                .iter()
                .filter(|op| op.kind.consumes_reference())
                .map(|op| u64::from(op.len))
                .sum::<u64>()
    }

    #[must_use]
    pub fn interval(&self) -> Option<Interval> {
        Interval::new(self.contig.clone(), self.start, self.reference_end()).ok()
    }

    #[must_use]
    pub fn overlaps(&self, region: &Interval) -> bool {
        self.contig == region.contig && self.start < region.end && region.start < self.reference_end()
    }

    /// Key identifying the read within its fragment, `name/read_number`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.fragment_name, self.read_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_new_computes_end() {
        let variant = Variant::new("chr20", 60284, "ATTCCAG", ["AT"]);
        assert_eq!(variant.end, 60291);
        assert_eq!(variant.alleles().collect::<Vec<_>>(), vec!["ATTCCAG", "AT"]);
        assert!(!variant.is_snp());
        assert!(Variant::new("chr20", 1, "C", ["T", "A"]).is_snp());
    }

    #[test]
    fn test_label_for_alt_alleles() {
        let variant = Variant::new("1", 10, "A", ["C", "G"]);
        let het = Label {
            is_confident: true,
            variant: variant.clone(),
            genotype: vec![0, 1],
        };
        assert_eq!(het.label_for_alt_alleles(&[0]), 1);
        assert_eq!(het.label_for_alt_alleles(&[1]), 0);

        let hom_alt = Label {
            is_confident: true,
            variant: variant.clone(),
            genotype: vec![2, 2],
        };
        assert_eq!(hom_alt.label_for_alt_alleles(&[1]), 2);
        assert_eq!(hom_alt.label_for_alt_alleles(&[0, 1]), 2);

        let hom_ref = Label {
            is_confident: true,
            variant,
            genotype: vec![0, 0],
        };
        assert_eq!(hom_ref.label_for_alt_alleles(&[0]), 0);
    }

    #[test]
    fn test_example_alt_allele_indices() {
        let variant = Variant::new("1", 10, "A", ["C", "G"]);
        let example = Example::new(variant, vec!["G".to_string()], vec![], vec![5, 5, 7], "raw");
        assert_eq!(example.alt_allele_indices(), vec![1]);
    }

    #[test]
    fn test_parse_cigar() {
        let ops = parse_cigar("10M2I5D3S").unwrap();
        assert_eq!(
            ops,
            vec![
                CigarOp::new(CigarKind::Match, 10),
                CigarOp::new(CigarKind::Insertion, 2),
                CigarOp::new(CigarKind::Deletion, 5),
                CigarOp::new(CigarKind::SoftClip, 3),
            ]
        );
        assert!(parse_cigar("").is_err());
        assert!(parse_cigar("M").is_err());
        assert!(parse_cigar("10").is_err());
        assert_eq!(parse_cigar("5Q"), Err(CigarError::UnknownOperation('Q')));
    }

    #[test]
    fn test_read_reference_end() {
        let read = Read {
            fragment_name: "r1".to_string(),
            read_number: 0,
            contig: "1".to_string(),
            start: 100,
            mapping_quality: 60,
            cigar: parse_cigar("5S10M2I5D10M").unwrap(),
            sequence: vec![b'A'; 27],
            qualities: vec![30; 27],
        };
        assert_eq!(read.reference_end(), 125);
        assert_eq!(read.key(), "r1/0");
        assert!(read.overlaps(&Interval::new("1", 124, 200).unwrap()));
        assert!(!read.overlaps(&Interval::new("1", 125, 200).unwrap()));
    }
}
