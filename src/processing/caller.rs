//! A threshold variant caller over allele counts.
//!
//! A non-reference allele becomes a candidate alternate when enough reads show
//! it, both in absolute count and as a fraction of the reads at the position.
//! SNPs and indels have separate thresholds; soft clips never become
//! candidates.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::types::{Candidate, GvcfRecord, Variant};
use crate::processing::allele_counter::{
    sum_allele_counts, total_allele_counts, Allele, AlleleCount, AlleleCounter, AlleleType,
};
use crate::processing::options::CallerOptions;
use crate::processing::sources::{SourceError, VariantCaller};
use crate::utils::validation::{are_canonical_bases, count_to_f64};

#[derive(Debug, Clone, Default)]
pub struct ThresholdCaller {
    options: CallerOptions,
}

impl ThresholdCaller {
    #[must_use]
    pub fn new(options: CallerOptions) -> Self {
        Self { options }
    }

    fn passes(&self, allele: &Allele, total: u32) -> bool {
        let (min_count, min_fraction) = match allele.kind {
            AlleleType::Substitution => (self.options.min_count_snps, self.options.min_fraction_snps),
            AlleleType::Insertion | AlleleType::Deletion => {
                (self.options.min_count_indels, self.options.min_fraction_indels)
            }
            AlleleType::Reference | AlleleType::SoftClip => return false,
        };
        total > 0
            && allele.count >= min_count
            && count_to_f64(u64::from(allele.count)) / count_to_f64(u64::from(total)) >= min_fraction
    }

    /// The candidate at one position, if any allele passes the thresholds.
    #[must_use]
    pub fn call_position(&self, count: &AlleleCount) -> Option<Candidate> {
        if !are_canonical_bases(count.ref_base.as_bytes()) {
            return None;
        }

        let total = total_allele_counts(count, false);
        let alleles: Vec<Allele> = sum_allele_counts(count, false)
            .into_iter()
            .filter(|a| self.passes(a, total))
            .collect();
        if alleles.is_empty() {
            return None;
        }

        // The longest deletion decides how far the reference allele extends.
        let deleted_tail = alleles
            .iter()
            .filter(|a| a.kind == AlleleType::Deletion)
            .map(|a| &a.bases[1..])
            .max_by_key(|tail| tail.len())
            .unwrap_or_default();
        let reference_bases = format!("{}{deleted_tail}", count.ref_base);

        let mut alternates: Vec<String> = Vec::new();
        let mut allele_support: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for allele in &alleles {
            let alt = alternate_bases(allele, &reference_bases);
            if !alternates.contains(&alt) {
                alternates.push(alt.clone());
            }
            let supporting = count
                .read_alleles
                .iter()
                .filter(|(_, a)| !a.is_low_quality && a.kind == allele.kind && a.bases == allele.bases)
                .map(|(key, _)| key.clone());
            allele_support.entry(alt).or_default().extend(supporting);
        }

        let variant = Variant::new(
            count.contig.clone(),
            count.position,
            reference_bases,
            alternates,
        );
        let mut candidate = Candidate::new(variant);
        candidate.allele_support = allele_support;
        Some(candidate)
    }
}

/// The alternate allele of `allele` against a reference allele that may have
/// been extended by a longer deletion at the same position.
fn alternate_bases(allele: &Allele, reference_bases: &str) -> String {
    let anchor = &reference_bases[..1];
    match allele.kind {
        AlleleType::Deletion => {
            let tail = reference_bases.get(allele.bases.len()..).unwrap_or_default();
            format!("{anchor}{tail}")
        }
        AlleleType::Insertion => {
            format!("{anchor}{}{}", &allele.bases[1..], &reference_bases[1..])
        }
        _ => format!("{}{}", allele.bases, &reference_bases[1..]),
    }
}

impl VariantCaller for ThresholdCaller {
    fn calls_and_gvcfs(
        &self,
        counter: &AlleleCounter<'_>,
        include_gvcfs: bool,
    ) -> Result<(Vec<Candidate>, Vec<GvcfRecord>), SourceError> {
        let mut candidates = Vec::new();
        let mut gvcf_records = Vec::new();

        for count in counter.counts() {
            if let Some(candidate) = self.call_position(count) {
                candidates.push(candidate);
            } else if include_gvcfs {
                gvcf_records.push(GvcfRecord {
                    contig: count.contig.clone(),
                    start: count.position,
                    end: count.position + 1,
                    ref_base: count.ref_base.clone(),
                    ref_support: count.ref_supporting_read_count,
                    total: total_allele_counts(count, false),
                });
            }
        }

        debug!(
            region = %counter.interval(),
            num_candidates = candidates.len(),
            num_gvcf_records = gvcf_records.len(),
            "Called candidates"
        );
        Ok((candidates, gvcf_records))
    }
}
