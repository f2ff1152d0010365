use serde::{Deserialize, Serialize};

use crate::core::interval::Interval;

/// A single contig/sequence in a reference genome
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contig {
    /// Sequence name (SN tag in SAM, ID in a VCF ##contig line)
    pub name: String,

    /// Sequence length in bases
    pub length: u64,

    /// Position of the contig in its source file.
    /// This, not the name, defines the order regions are emitted in.
    pub index: usize,
}

impl Contig {
    pub fn new(name: impl Into<String>, length: u64, index: usize) -> Self {
        Self {
            name: name.into(),
            length,
            index,
        }
    }

    /// The whole contig as a half-open interval `[0, length)`.
    ///
    /// Returns `None` for zero-length contigs, which have no positions to process.
    #[must_use]
    pub fn extent(&self) -> Option<Interval> {
        Interval::new(self.name.clone(), 0, self.length).ok()
    }
}

/// Build contigs from `(name, length)` pairs, numbering them in order.
pub fn contigs_from_pairs<S: AsRef<str>>(pairs: &[(S, u64)]) -> Vec<Contig> {
    pairs
        .iter()
        .enumerate()
        .map(|(index, (name, length))| Contig::new(name.as_ref(), *length, index))
        .collect()
}

/// Sum of the lengths of `contigs`.
#[must_use]
pub fn total_length(contigs: &[Contig]) -> u64 {
    contigs.iter().map(|c| c.length).sum()
}
