//! Per-position allele counts from aligned reads.
//!
//! An [`AlleleCounter`] covers one region. Each read is walked along its CIGAR
//! and every aligned base, insertion, deletion and soft clip becomes an allele
//! at a reference position. Indels and soft clips follow the VCF convention:
//! they sit on the base preceding the event and their bases start with that
//! anchor base.
//!
//! Reference-matching bases only bump a counter; every other allele is kept per
//! read (keyed `fragment/read_number`) and per sample.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::interval::Interval;
use crate::core::types::{CigarKind, CigarOp, Read};
use crate::processing::options::AlleleCounterOptions;
use crate::processing::sources::{ReferenceSource, SourceError};
use crate::utils::validation::{are_canonical_bases, is_canonical_base};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlleleType {
    Reference,
    Substitution,
    Insertion,
    Deletion,
    SoftClip,
}

impl AlleleType {
    #[must_use]
    pub fn is_indel(self) -> bool {
        matches!(self, Self::Insertion | Self::Deletion)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allele {
    pub bases: String,
    pub kind: AlleleType,
    pub count: u32,
    pub is_low_quality: bool,
}

impl Allele {
    fn new(bases: impl Into<String>, kind: AlleleType, count: u32, is_low_quality: bool) -> Self {
        Self {
            bases: bases.into(),
            kind,
            count,
            is_low_quality,
        }
    }
}

/// Alleles observed at one reference position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlleleCount {
    pub contig: String,
    pub position: u64,
    pub ref_base: String,
    pub ref_supporting_read_count: u32,

    /// Read key -> the non-reference allele that read shows here
    pub read_alleles: BTreeMap<String, Allele>,

    /// Sample -> alleles contributed by that sample's reads
    pub sample_alleles: BTreeMap<String, Vec<Allele>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlleleCountSummary {
    pub contig: String,
    pub position: u64,
    pub ref_base: String,
    pub ref_supporting_read_count: u32,
    pub total_read_count: u32,
}

/// Distinct alleles at a position with the number of reads showing each.
///
/// Reference support is reported as one synthetic `Reference` allele.
#[must_use]
pub fn sum_allele_counts(count: &AlleleCount, include_low_quality: bool) -> Vec<Allele> {
    let mut sums: BTreeMap<(&str, AlleleType), u32> = BTreeMap::new();
    for allele in count.read_alleles.values() {
        if include_low_quality || !allele.is_low_quality {
            *sums.entry((allele.bases.as_str(), allele.kind)).or_default() += 1;
        }
    }

    let mut alleles: Vec<Allele> = sums
        .into_iter()
        .map(|((bases, kind), n)| Allele::new(bases, kind, n, false))
        .collect();

    if count.ref_supporting_read_count > 0 {
        alleles.push(Allele::new(
            count.ref_base.clone(),
            AlleleType::Reference,
            count.ref_supporting_read_count,
            false,
        ));
    }
    alleles
}

/// Reads counted at a position: reference support plus non-reference alleles.
#[must_use]
pub fn total_allele_counts(count: &AlleleCount, include_low_quality: bool) -> u32 {
    let non_ref = count
        .read_alleles
        .values()
        .filter(|a| (include_low_quality || !a.is_low_quality) && a.kind != AlleleType::Reference)
        .count();
    u32::try_from(non_ref).unwrap_or(u32::MAX) + count.ref_supporting_read_count
}

/// An allele observed on one read, before it is added to the counts
#[derive(Debug, Clone)]
struct ReadAllele {
    /// Offset from the region start; negative or past the end for reads
    /// hanging over the region edges
    offset: i64,
    bases: String,
    kind: AlleleType,
    is_low_quality: bool,
}

pub struct AlleleCounter<'r> {
    reference: &'r dyn ReferenceSource,
    interval: Interval,
    ref_bases: Vec<u8>,
    counts: Vec<AlleleCount>,
    options: AlleleCounterOptions,
    reads_counted: usize,
}

impl<'r> AlleleCounter<'r> {
    /// Start counting over `interval`, fetching its reference bases.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the reference cannot serve the interval.
    pub fn new(
        reference: &'r dyn ReferenceSource,
        interval: Interval,
        options: AlleleCounterOptions,
    ) -> Result<Self, SourceError> {
        let ref_bases = reference.bases(&interval)?.into_bytes();
        let counts = ref_bases
            .iter()
            .zip(interval.start..)
            .map(|(&base, position)| AlleleCount {
                contig: interval.contig.clone(),
                position,
                ref_base: char::from(base).to_string(),
                ref_supporting_read_count: 0,
                read_alleles: BTreeMap::new(),
                sample_alleles: BTreeMap::new(),
            })
            .collect();

        Ok(Self {
            reference,
            interval,
            ref_bases,
            counts,
            options,
            reads_counted: 0,
        })
    }

    #[must_use]
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    /// One entry per position of the interval, in order.
    #[must_use]
    pub fn counts(&self) -> &[AlleleCount] {
        &self.counts
    }

    #[must_use]
    pub fn reads_counted(&self) -> usize {
        self.reads_counted
    }

    /// Reference bases at `[offset, offset + len)` relative to the region start.
    ///
    /// `None` when the span falls off the contig.
    fn ref_bases_at(&self, offset: i64, len: u32) -> Option<String> {
        let start = u64::try_from(i64::try_from(self.interval.start).ok()? + offset).ok()?;
        let end = start + u64::from(len);

        if start >= self.interval.start && end <= self.interval.end {
            let from = usize::try_from(start - self.interval.start).ok()?;
            let to = usize::try_from(end - self.interval.start).ok()?;
            return Some(String::from_utf8_lossy(&self.ref_bases[from..to]).into_owned());
        }

        let span = Interval::new(self.interval.contig.clone(), start, end).ok()?;
        self.reference.bases(&span).ok()
    }

    fn is_valid_offset(&self, offset: i64) -> bool {
        usize::try_from(offset).is_ok_and(|o| o < self.counts.len())
    }

    /// `Some(is_low_quality)` when `len` read bases from `offset` are all
    /// canonical, `None` when any is not (or the read is too short).
    fn usable_bases(&self, read: &Read, offset: usize, len: usize) -> Option<bool> {
        let bases = read.sequence.get(offset..offset + len)?;
        let qualities = read.qualities.get(offset..offset + len)?;
        if !bases.iter().copied().all(is_canonical_base) {
            return None;
        }
        let total: u32 = qualities.iter().map(|&q| u32::from(q)).sum();
        let min_total = u32::from(self.options.min_base_quality) * u32::try_from(len).ok()?;
        Some(total < min_total)
    }

    fn previous_base(&self, read: &Read, read_offset: usize, interval_offset: i64) -> Option<String> {
        if read_offset == 0 {
            // The event starts the read, so the anchor comes from the reference.
            self.ref_bases_at(interval_offset - 1, 1)
        } else {
            read.sequence
                .get(read_offset - 1)
                .map(|&b| char::from(b).to_string())
        }
    }

    fn indel_allele(
        &self,
        read: &Read,
        interval_offset: i64,
        read_offset: usize,
        op: CigarOp,
    ) -> Option<ReadAllele> {
        let len = usize::try_from(op.len).ok()?;
        let prev_base = self.previous_base(read, read_offset, interval_offset)?;
        if !are_canonical_bases(prev_base.as_bytes()) {
            return None;
        }

        let (kind, bases, is_low_quality) = match op.kind {
            CigarKind::Deletion => {
                let deleted = self.ref_bases_at(interval_offset, op.len)?;
                if !are_canonical_bases(deleted.as_bytes()) {
                    return None;
                }
                (AlleleType::Deletion, deleted, false)
            }
            CigarKind::Insertion | CigarKind::SoftClip => {
                let is_low_quality = self.usable_bases(read, read_offset, len)?;
                let inserted = read.sequence.get(read_offset..read_offset + len)?;
                let kind = if op.kind == CigarKind::Insertion {
                    AlleleType::Insertion
                } else {
                    AlleleType::SoftClip
                };
                (kind, String::from_utf8_lossy(inserted).into_owned(), is_low_quality)
            }
            _ => return None,
        };

        Some(ReadAllele {
            offset: interval_offset - 1,
            bases: format!("{prev_base}{bases}"),
            kind,
            is_low_quality,
        })
    }

    /// Count the alleles of `read` under `sample`.
    ///
    /// Reads on another contig or below the minimum mapping quality are ignored.
    pub fn add(&mut self, read: &Read, sample: &str) {
        if read.contig != self.interval.contig
            || read.mapping_quality < self.options.min_mapping_quality
        {
            return;
        }
        let (Ok(read_start), Ok(region_start)) =
            (i64::try_from(read.start), i64::try_from(self.interval.start))
        else {
            return;
        };

        let mut to_add = Vec::with_capacity(read.sequence.len());
        let mut read_offset = 0_usize;
        let mut interval_offset = read_start - region_start;

        for &op in &read.cigar {
            let len = op.len as usize;
            match op.kind {
                CigarKind::Match | CigarKind::SequenceMatch | CigarKind::SequenceMismatch => {
                    for i in 0..len {
                        let ref_offset = interval_offset + i as i64;
                        let base_offset = read_offset + i;
                        if !self.is_valid_offset(ref_offset) {
                            continue;
                        }
                        let Some(is_low_quality) = self.usable_bases(read, base_offset, 1) else {
                            continue;
                        };
                        let base = read.sequence[base_offset];
                        let kind = if self.ref_bases[ref_offset as usize] == base {
                            AlleleType::Reference
                        } else {
                            AlleleType::Substitution
                        };
                        to_add.push(ReadAllele {
                            offset: ref_offset,
                            bases: char::from(base).to_string(),
                            kind,
                            is_low_quality,
                        });
                    }
                    read_offset += len;
                    interval_offset += i64::from(op.len);
                }
                CigarKind::Insertion | CigarKind::SoftClip => {
                    to_add.extend(self.indel_allele(read, interval_offset, read_offset, op));
                    read_offset += len;
                }
                CigarKind::Deletion => {
                    to_add.extend(self.indel_allele(read, interval_offset, read_offset, op));
                    interval_offset += i64::from(op.len);
                }
                CigarKind::Pad | CigarKind::Skip => {
                    interval_offset += i64::from(op.len);
                }
                CigarKind::HardClip => {}
            }
        }

        self.add_read_alleles(read, sample, &to_add);
        self.reads_counted += 1;
    }

    fn add_read_alleles(&mut self, read: &Read, sample: &str, to_add: &[ReadAllele]) {
        let key = read.key();

        for (i, allele) in to_add.iter().enumerate() {
            if !self.is_valid_offset(allele.offset) {
                continue;
            }
            // An indel anchored on a base supersedes that base's own allele.
            if to_add
                .get(i + 1)
                .is_some_and(|next| next.offset == allele.offset)
            {
                continue;
            }

            let count = &mut self.counts[allele.offset as usize];
            if allele.kind == AlleleType::Reference {
                if !allele.is_low_quality {
                    count.ref_supporting_read_count += 1;
                }
                continue;
            }

            let stored = Allele::new(allele.bases.clone(), allele.kind, 1, allele.is_low_quality);
            if count.read_alleles.contains_key(&key) {
                debug!(read = %key, position = count.position, "Duplicate read at position");
            }
            count.read_alleles.insert(key.clone(), stored.clone());
            count
                .sample_alleles
                .entry(sample.to_string())
                .or_default()
                .push(stored);
        }
    }

    #[must_use]
    pub fn summary_counts(&self) -> Vec<AlleleCountSummary> {
        self.counts
            .iter()
            .map(|count| AlleleCountSummary {
                contig: count.contig.clone(),
                position: count.position,
                ref_base: count.ref_base.clone(),
                ref_supporting_read_count: count.ref_supporting_read_count,
                total_read_count: total_allele_counts(count, false),
            })
            .collect()
    }
}
