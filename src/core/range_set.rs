//! Set algebra over genomic intervals.
//!
//! An [`IntervalSet`] keeps, per contig, a sorted list of merged intervals. Two
//! intervals are merged when they overlap or touch (`a.end >= b.start`), so the
//! stored lists never contain adjacent or overlapping entries.

use std::collections::BTreeMap;

use crate::core::contig::Contig;
use crate::core::interval::Interval;

/// A merged, sorted set of intervals keyed by contig name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    by_contig: BTreeMap<String, Vec<Interval>>,
}

impl IntervalSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from arbitrary (unsorted, overlapping) intervals.
    pub fn from_intervals(intervals: impl IntoIterator<Item = Interval>) -> Self {
        let mut grouped: BTreeMap<String, Vec<Interval>> = BTreeMap::new();
        for interval in intervals {
            grouped
                .entry(interval.contig.clone())
                .or_default()
                .push(interval);
        }

        let by_contig = grouped
            .into_iter()
            .map(|(contig, mut intervals)| {
                intervals.sort_by_key(|iv| (iv.start, iv.end));
                (contig, merge_sorted(intervals))
            })
            .collect();

        Self { by_contig }
    }

    /// The full extent `[0, length)` of every non-empty contig.
    #[must_use]
    pub fn from_contigs(contigs: &[Contig]) -> Self {
        Self::from_intervals(contigs.iter().filter_map(Contig::extent))
    }

    pub fn insert(&mut self, interval: Interval) {
        let intervals = self.by_contig.entry(interval.contig.clone()).or_default();
        intervals.push(interval);
        intervals.sort_by_key(|iv| (iv.start, iv.end));
        let merged = merge_sorted(std::mem::take(intervals));
        *intervals = merged;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_contig.is_empty()
    }

    /// Number of merged intervals across all contigs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_contig.values().map(Vec::len).sum()
    }

    /// Total number of positions covered.
    #[must_use]
    pub fn total_length(&self) -> u64 {
        self.iter().map(Interval::len).sum()
    }

    /// Intervals on `contig`, sorted by start. Empty for unknown contigs.
    #[must_use]
    pub fn intervals_for(&self, contig: &str) -> &[Interval] {
        self.by_contig.get(contig).map_or(&[], Vec::as_slice)
    }

    /// Names of contigs that have at least one interval, in name order.
    pub fn contig_names(&self) -> impl Iterator<Item = &str> {
        self.by_contig.keys().map(String::as_str)
    }

    /// All intervals, grouped by contig name and sorted by start within a contig.
    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.by_contig.values().flatten()
    }

    #[must_use]
    pub fn overlaps(&self, interval: &Interval) -> bool {
        let intervals = self.intervals_for(&interval.contig);
        let idx = intervals.partition_point(|iv| iv.end <= interval.start);
        intervals
            .get(idx)
            .is_some_and(|iv| iv.start < interval.end)
    }

    #[must_use]
    pub fn union(&self, other: &IntervalSet) -> IntervalSet {
        IntervalSet::from_intervals(self.iter().chain(other.iter()).cloned())
    }

    #[must_use]
    pub fn intersection(&self, other: &IntervalSet) -> IntervalSet {
        let mut by_contig = BTreeMap::new();
        for (contig, ours) in &self.by_contig {
            let Some(theirs) = other.by_contig.get(contig) else {
                continue;
            };

            let mut result = Vec::new();
            let (mut i, mut j) = (0, 0);
            while i < ours.len() && j < theirs.len() {
                let (a, b) = (&ours[i], &theirs[j]);
                let start = a.start.max(b.start);
                let end = a.end.min(b.end);
                if start < end {
                    result.push(Interval {
                        contig: contig.clone(),
                        start,
                        end,
                    });
                }
                if a.end < b.end {
                    i += 1;
                } else {
                    j += 1;
                }
            }

            if !result.is_empty() {
                by_contig.insert(contig.clone(), result);
            }
        }
        IntervalSet { by_contig }
    }

    /// Positions in `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &IntervalSet) -> IntervalSet {
        let mut by_contig = BTreeMap::new();
        for (contig, ours) in &self.by_contig {
            let theirs = other.intervals_for(contig);
            if theirs.is_empty() {
                by_contig.insert(contig.clone(), ours.clone());
                continue;
            }

            let mut result = Vec::new();
            let mut j = 0;
            for interval in ours {
                let mut start = interval.start;
                // Skip subtrahends entirely to the left of this interval.
                while j < theirs.len() && theirs[j].end <= start {
                    j += 1;
                }
                let mut k = j;
                while k < theirs.len() && theirs[k].start < interval.end {
                    let cut = &theirs[k];
                    if cut.start > start {
                        result.push(Interval {
                            contig: contig.clone(),
                            start,
                            end: cut.start,
                        });
                    }
                    start = start.max(cut.end);
                    k += 1;
                }
                if start < interval.end {
                    result.push(Interval {
                        contig: contig.clone(),
                        start,
                        end: interval.end,
                    });
                }
            }

            if !result.is_empty() {
                by_contig.insert(contig.clone(), result);
            }
        }
        IntervalSet { by_contig }
    }

    /// Split every interval of `contig` into pieces of at most `max_size` positions.
    ///
    /// Pieces never span two intervals; the last piece of each interval may be
    /// shorter than `max_size`. A `max_size` of zero yields no pieces.
    #[must_use]
    pub fn partition_contig(&self, contig: &str, max_size: u64) -> Vec<Interval> {
        if max_size == 0 {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        for interval in self.intervals_for(contig) {
            let mut start = interval.start;
            while start < interval.end {
                let end = (start + max_size).min(interval.end);
                pieces.push(Interval {
                    contig: interval.contig.clone(),
                    start,
                    end,
                });
                start = end;
            }
        }
        pieces
    }
}

impl FromIterator<Interval> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = Interval>>(iter: T) -> Self {
        Self::from_intervals(iter)
    }
}

/// Merge intervals already sorted by start. Touching intervals are merged.
fn merge_sorted(sorted: Vec<Interval>) -> Vec<Interval> {
    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}
