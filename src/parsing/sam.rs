use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::core::contig::Contig;
use crate::utils::validation::check_contig_limit;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Too many contigs: {0} exceeds maximum allowed (100000)")]
    TooManyContigs(usize),
}

/// Parse a SAM/BAM/CRAM file and extract the contigs of its header
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// parsing fails, `ParseError::UnsupportedFormat` for unknown extensions,
/// or `ParseError::TooManyContigs` if the limit is exceeded.
pub fn parse_file(path: &Path) -> Result<Vec<Contig>, ParseError> {
    header_to_contigs(&read_header(path)?)
}

/// Sample name of a SAM/BAM/CRAM file's read groups, or `default`.
///
/// # Errors
///
/// Returns the errors of [`parse_file`] except `TooManyContigs`.
pub fn parse_sample_name(path: &Path, default: &str) -> Result<String, ParseError> {
    Ok(sample_name_from_header(&read_header(path)?, default))
}

/// The first non-empty `SM` of the header's read groups, or `default` when no
/// read group names a sample.
#[must_use]
pub fn sample_name_from_header(header: &noodles::sam::Header, default: &str) -> String {
    use noodles::sam::header::record::value::map::read_group::tag;

    let mut samples = header
        .read_groups()
        .values()
        .filter_map(|read_group| read_group.other_fields().get(&tag::SAMPLE))
        .filter(|sample| !sample.is_empty())
        .map(ToString::to_string);

    let Some(sample) = samples.next() else {
        warn!(default, "No non-empty sample name found in the reads, using the default");
        return default.to_string();
    };
    let others: Vec<String> = samples.filter(|other| *other != sample).collect();
    if !others.is_empty() {
        warn!(%sample, ?others, "Reads name more than one sample, using the first");
    }
    sample
}

fn read_header(path: &Path) -> Result<noodles::sam::Header, ParseError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("sam") => read_sam_header(path),
        Some("bam") => read_bam_header(path),
        Some("cram") => read_cram_header(path),
        Some(ext) => Err(ParseError::UnsupportedFormat(ext.to_string())),
        None => read_sam_header(path),
    }
}

fn read_sam_header(path: &Path) -> Result<noodles::sam::Header, ParseError> {
    use noodles::sam;

    let mut reader = std::fs::File::open(path)
        .map(BufReader::new)
        .map(sam::io::Reader::new)?;

    reader
        .read_header()
        .map_err(|e| ParseError::Noodles(e.to_string()))
}

fn read_bam_header(path: &Path) -> Result<noodles::sam::Header, ParseError> {
    use noodles::bam;

    let mut reader = std::fs::File::open(path).map(bam::io::Reader::new)?;

    reader
        .read_header()
        .map_err(|e| ParseError::Noodles(e.to_string()))
}

fn read_cram_header(path: &Path) -> Result<noodles::sam::Header, ParseError> {
    use noodles::cram;

    let mut reader = std::fs::File::open(path).map(cram::io::Reader::new)?;

    reader
        .read_file_definition()
        .map_err(|e| ParseError::Noodles(e.to_string()))?;

    reader
        .read_file_header()
        .map_err(|e| ParseError::Noodles(e.to_string()))
}

/// Contigs of a noodles header, indexed in `@SQ` order
fn header_to_contigs(header: &noodles::sam::Header) -> Result<Vec<Contig>, ParseError> {
    let mut contigs = Vec::new();

    for (name, map) in header.reference_sequences() {
        if check_contig_limit(contigs.len()).is_some() {
            return Err(ParseError::TooManyContigs(contigs.len()));
        }

        let length = map.length().get() as u64;
        contigs.push(Contig::new(name.to_string(), length, contigs.len()));
    }

    Ok(contigs)
}

/// Parse `@SQ` lines from raw header text.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if an `@SQ` line has an unparseable
/// length or no `@SQ` lines are found, or `ParseError::TooManyContigs`
/// if the limit is exceeded.
pub fn parse_header_text(text: &str) -> Result<Vec<Contig>, ParseError> {
    let mut contigs = Vec::new();

    for line in text.lines() {
        if !line.starts_with("@SQ") {
            continue;
        }

        let mut name: Option<&str> = None;
        let mut length: Option<&str> = None;

        for field in line.split('\t').skip(1) {
            if let Some((tag, value)) = field.split_once(':') {
                match tag {
                    "SN" => name = Some(value),
                    "LN" => length = Some(value),
                    _ => {}
                }
            }
        }

        if let (Some(name), Some(length)) = (name, length) {
            if check_contig_limit(contigs.len()).is_some() {
                return Err(ParseError::TooManyContigs(contigs.len()));
            }

            let length: u64 = length.parse().map_err(|_| {
                ParseError::InvalidFormat(format!("Invalid length for contig '{name}': {length}"))
            })?;
            contigs.push(Contig::new(name, length, contigs.len()));
        }
    }

    if contigs.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No @SQ lines found in header".to_string(),
        ));
    }

    Ok(contigs)
}
