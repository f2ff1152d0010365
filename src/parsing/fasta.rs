//! FASTA files via noodles: contig lists and an in-memory reference.
//!
//! Supported extensions:
//! - `.fa`, `.fasta`, `.fna` (uncompressed)
//! - `.fa.gz`, `.fasta.gz`, `.fna.gz` (gzip compressed)
//! - `.fa.bgz`, `.fasta.bgz`, `.fna.bgz` (bgzip compressed)

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::fasta;
use tracing::debug;

use crate::core::contig::Contig;
use crate::core::interval::Interval;
use crate::parsing::sam::ParseError;
use crate::processing::sources::{ReferenceSource, SourceError};
use crate::utils::validation::check_contig_limit;

/// Check if the path has a FASTA extension
pub fn is_fasta_file(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();

    if path_str.ends_with(".fa.gz")
        || path_str.ends_with(".fasta.gz")
        || path_str.ends_with(".fna.gz")
        || path_str.ends_with(".fa.bgz")
        || path_str.ends_with(".fasta.bgz")
        || path_str.ends_with(".fna.bgz")
    {
        return true;
    }

    matches!(
        path.extension()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .as_deref(),
        Some("fa" | "fasta" | "fna")
    )
}

#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
pub(crate) fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Open `path` for buffered reading, decompressing gzip/bgzip transparently.
pub(crate) fn open_maybe_gzipped(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Parse a FASTA file and extract contig names and lengths.
///
/// This reads through the entire FASTA file to determine sequence lengths.
/// For large files, consider using an existing .fai index instead.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// parsing fails, `ParseError::InvalidFormat` if no contigs are found, or
/// `ParseError::TooManyContigs` if the limit is exceeded.
pub fn parse_fasta_file(path: &Path) -> Result<Vec<Contig>, ParseError> {
    let mut reader = fasta::io::Reader::new(open_maybe_gzipped(path)?);
    let mut contigs = Vec::new();

    for result in reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        if check_contig_limit(contigs.len()).is_some() {
            return Err(ParseError::TooManyContigs(contigs.len()));
        }

        let name = String::from_utf8_lossy(record.name()).to_string();
        let length = record.sequence().len() as u64;
        contigs.push(Contig::new(name, length, contigs.len()));
    }

    if contigs.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No sequences found in FASTA file".to_string(),
        ));
    }

    Ok(contigs)
}

/// A reference genome held fully in memory, upper-cased
#[derive(Debug, Clone, Default)]
pub struct InMemoryReference {
    contigs: Vec<Contig>,
    sequences: HashMap<String, Vec<u8>>,
}

impl InMemoryReference {
    /// Build a reference from `(name, sequence)` pairs, indexed in order.
    pub fn from_sequences<N, S>(sequences: impl IntoIterator<Item = (N, S)>) -> Self
    where
        N: Into<String>,
        S: AsRef<[u8]>,
    {
        let mut reference = Self::default();
        for (name, sequence) in sequences {
            reference.push(name.into(), sequence.as_ref());
        }
        reference
    }

    /// Load every record of a FASTA file.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the file cannot be read or holds no sequences.
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let mut reader = fasta::io::Reader::new(open_maybe_gzipped(path)?);
        let mut reference = Self::default();

        for result in reader.records() {
            let record = result
                .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

            if check_contig_limit(reference.contigs.len()).is_some() {
                return Err(ParseError::TooManyContigs(reference.contigs.len()));
            }

            let name = String::from_utf8_lossy(record.name()).to_string();
            reference.push(name, record.sequence().as_ref());
        }

        if reference.contigs.is_empty() {
            return Err(ParseError::InvalidFormat(
                "No sequences found in FASTA file".to_string(),
            ));
        }

        debug!(
            path = %path.display(),
            num_contigs = reference.contigs.len(),
            "Loaded reference"
        );
        Ok(reference)
    }

    fn push(&mut self, name: String, sequence: &[u8]) {
        let bases: Vec<u8> = sequence.iter().map(u8::to_ascii_uppercase).collect();
        self.contigs
            .push(Contig::new(name.clone(), bases.len() as u64, self.contigs.len()));
        self.sequences.insert(name, bases);
    }
}

impl ReferenceSource for InMemoryReference {
    fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    fn bases(&self, region: &Interval) -> Result<String, SourceError> {
        let sequence = self
            .sequences
            .get(&region.contig)
            .ok_or_else(|| SourceError::UnknownContig(region.contig.clone()))?;

        let out_of_bounds = || SourceError::OutOfBounds {
            region: region.to_literal(),
            contig: region.contig.clone(),
            length: sequence.len() as u64,
        };
        let start = usize::try_from(region.start).map_err(|_| out_of_bounds())?;
        let end = usize::try_from(region.end).map_err(|_| out_of_bounds())?;
        let bases = sequence.get(start..end).ok_or_else(out_of_bounds)?;

        Ok(String::from_utf8_lossy(bases).into_owned())
    }
}
