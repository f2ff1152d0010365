//! VCF parsing: header `##contig` lines, variant records and a population
//! allele-frequency resource.
//!
//! Contig definitions look like `##contig=<ID=chr1,length=248956422>` and are
//! read from the header text. Records are read with noodles; only `CHROM`,
//! `POS`, `REF`, `ALT` and the `AF` INFO field are interpreted, with the `AF`
//! `Number` taken from the header. Plain and gzip/bgzip files are accepted.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use noodles::vcf;
use noodles::vcf::header::record::value::map::info::Number;
use noodles::vcf::variant::record_buf::info::field::value::Array;
use noodles::vcf::variant::record_buf::info::field::Value;
use noodles::vcf::variant::RecordBuf;
use tracing::{debug, warn};

use crate::core::contig::Contig;
use crate::core::interval::Interval;
use crate::core::types::Variant;
use crate::parsing::fasta::open_maybe_gzipped;
use crate::parsing::sam::ParseError;
use crate::processing::sources::{PopulationSource, PopulationVariant, SourceError};
use crate::utils::validation::check_contig_limit;

/// Parse VCF file and extract contig definitions from header
///
/// # Errors
///
/// Returns `ParseError` if the file cannot be read or has no `##contig` lines.
pub fn parse_vcf_file(path: &Path) -> Result<Vec<Contig>, ParseError> {
    let mut header = String::new();
    for line in open_maybe_gzipped(path)?.lines() {
        let line = line?;
        if !line.starts_with('#') {
            break;
        }
        header.push_str(&line);
        header.push('\n');
    }
    parse_vcf_header_text(&header)
}

/// Parse VCF header text and extract contig definitions
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` for malformed `##contig` lines or when
/// none are present, `ParseError::TooManyContigs` if the limit is exceeded.
pub fn parse_vcf_header_text(text: &str) -> Result<Vec<Contig>, ParseError> {
    let mut contigs = Vec::new();

    for line in text.lines() {
        if !line.starts_with("##contig=") {
            if line.starts_with("#CHROM") {
                break;
            }
            continue;
        }

        if let Some((name, length)) = parse_contig_line(line)? {
            if check_contig_limit(contigs.len()).is_some() {
                return Err(ParseError::TooManyContigs(contigs.len()));
            }
            contigs.push(Contig::new(name, length, contigs.len()));
        }
    }

    if contigs.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No ##contig lines found in VCF header".to_string(),
        ));
    }

    Ok(contigs)
}

/// Parse a single `##contig=<...>` line into its ID and length
fn parse_contig_line(line: &str) -> Result<Option<(String, u64)>, ParseError> {
    let content = line
        .strip_prefix("##contig=<")
        .and_then(|s| s.strip_suffix('>'))
        .ok_or_else(|| ParseError::InvalidFormat(format!("Invalid contig line format: {line}")))?;

    let mut name: Option<String> = None;
    let mut length: Option<u64> = None;

    for part in split_header_fields(content) {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim().trim_matches('"');
            match key.trim().to_lowercase().as_str() {
                "id" => name = Some(value.to_string()),
                "length" => length = value.parse().ok(),
                _ => {}
            }
        }
    }

    match (name, length) {
        (Some(name), Some(length)) => Ok(Some((name, length))),
        (Some(name), None) => Err(ParseError::InvalidFormat(format!(
            "Contig '{name}' missing length"
        ))),
        _ => Ok(None),
    }
}

/// Split `key=value` header fields, keeping commas inside quoted values.
fn split_header_fields(content: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in content.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(&content[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if start <= content.len() {
        fields.push(&content[start..]);
    }

    fields
}

/// How the `AF` INFO field is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfNumber {
    /// One value per alternate allele (`Number=A`)
    PerAlt,
    /// Reference first, then one per alternate (`Number=R`)
    PerAllele,
}

impl AfNumber {
    /// Undeclared `AF` falls back to the VCF definition, one per alternate.
    fn from_header(header: &vcf::Header) -> Self {
        match header.infos().get(AF).map(|info| info.number()) {
            Some(Number::ReferenceAlternateBases) => Self::PerAllele,
            _ => Self::PerAlt,
        }
    }
}

const AF: &str = "AF";

/// Open a noodles VCF reader and read its header.
fn read_vcf_header<R: BufRead>(inner: R) -> Result<(vcf::io::Reader<R>, vcf::Header), ParseError> {
    let mut reader = vcf::io::Reader::new(inner);
    let header = reader
        .read_header()
        .map_err(|e| ParseError::Noodles(format!("Failed to read VCF header: {e}")))?;
    Ok((reader, header))
}

/// Read the next record into `record`; `false` at end of file.
fn next_record<R: BufRead>(
    reader: &mut vcf::io::Reader<R>,
    header: &vcf::Header,
    record: &mut RecordBuf,
    record_number: usize,
) -> Result<bool, ParseError> {
    let n = reader
        .read_record_buf(header, record)
        .map_err(|e| ParseError::Noodles(format!("Invalid VCF record {record_number}: {e}")))?;
    Ok(n != 0)
}

/// A noodles record as a 0-based `Variant` with upper-case alleles.
fn record_to_variant(record: &RecordBuf, record_number: usize) -> Result<Variant, ParseError> {
    let contig = record.reference_sequence_name();
    let start = record
        .variant_start()
        .map(usize::from)
        .and_then(|position| position.checked_sub(1))
        .ok_or_else(|| {
            ParseError::InvalidFormat(format!(
                "Missing POS in VCF record {record_number} on {contig}"
            ))
        })?;
    let reference = record.reference_bases().to_ascii_uppercase();
    if reference.is_empty() {
        return Err(ParseError::InvalidFormat(format!(
            "Missing REF in VCF record {record_number} on {contig}"
        )));
    }
    let alternates = record
        .alternate_bases()
        .as_ref()
        .iter()
        .filter(|alt| alt.as_str() != ".")
        .map(|alt| alt.to_ascii_uppercase());

    Ok(Variant::new(contig, start as u64, reference, alternates))
}

/// Values of the `AF` INFO field. Missing values (`.`) count as zero.
fn allele_frequencies(record: &RecordBuf, record_number: usize) -> Result<Option<Vec<f64>>, ParseError> {
    let Some(value) = record.info().get(AF).flatten() else {
        return Ok(None);
    };

    let invalid = |what: &str| {
        ParseError::InvalidFormat(format!(
            "Invalid AF value in VCF record {record_number}: {what}"
        ))
    };
    let parse_text = |text: &str| text.parse::<f64>().map_err(|_| invalid(text));

    let frequencies = match value {
        Value::Float(f) => vec![widen(*f)],
        Value::Integer(n) => vec![f64::from(*n)],
        Value::String(text) => text
            .split(',')
            .map(|v| if v == "." { Ok(0.0) } else { parse_text(v) })
            .collect::<Result<_, _>>()?,
        Value::Array(Array::Float(values)) => values.iter().map(|v| v.map_or(0.0, widen)).collect(),
        Value::Array(Array::Integer(values)) => values
            .iter()
            .map(|v| v.map_or(0.0, f64::from))
            .collect(),
        Value::Array(Array::String(values)) => values
            .iter()
            .map(|v| v.as_deref().map_or(Ok(0.0), &parse_text))
            .collect::<Result<_, _>>()?,
        other => return Err(invalid(&format!("{other:?}"))),
    };
    Ok(Some(frequencies))
}

/// `f32` to the `f64` with the same shortest decimal form, so `0.0002` stays
/// `0.0002`.
fn widen(value: f32) -> f64 {
    value.to_string().parse().unwrap_or_else(|_| f64::from(value))
}

/// Every record of a VCF file as a `Variant`, in file order.
///
/// # Errors
///
/// Returns `ParseError` if the file cannot be read or a record is malformed.
pub fn parse_vcf_variants(path: &Path) -> Result<Vec<Variant>, ParseError> {
    let (mut reader, header) = read_vcf_header(open_maybe_gzipped(path)?)?;
    let mut record = RecordBuf::default();
    let mut variants = Vec::new();

    while next_record(&mut reader, &header, &mut record, variants.len() + 1)? {
        variants.push(record_to_variant(&record, variants.len() + 1)?);
    }
    Ok(variants)
}

/// A population VCF with allele frequencies, held in memory
#[derive(Debug, Clone, Default)]
pub struct PopulationVcf {
    by_contig: BTreeMap<String, Vec<PopulationVariant>>,
}

impl PopulationVcf {
    /// Load a population VCF. Records without an `AF` field get zero alt
    /// frequencies.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the file cannot be read, a record is malformed
    /// or an `AF` value is not a number.
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let population = Self::from_reader(open_maybe_gzipped(path)?)?;
        debug!(
            path = %path.display(),
            num_variants = population.len(),
            "Loaded population VCF"
        );
        Ok(population)
    }

    /// # Errors
    ///
    /// Returns `ParseError` if the header or a record is malformed.
    pub fn from_reader<R: BufRead>(inner: R) -> Result<Self, ParseError> {
        let (mut reader, header) = read_vcf_header(inner)?;
        let af_number = AfNumber::from_header(&header);
        let mut by_contig: BTreeMap<String, Vec<PopulationVariant>> = BTreeMap::new();
        let mut record = RecordBuf::default();
        let mut record_number = 1;

        while next_record(&mut reader, &header, &mut record, record_number)? {
            let variant = record_to_variant(&record, record_number)?;
            let num_alts = variant.alternate_bases.len();
            let (ref_frequency, mut alt_frequencies) =
                match (af_number, allele_frequencies(&record, record_number)?) {
                    (_, None) => (None, Vec::new()),
                    (AfNumber::PerAllele, Some(values)) => match values.split_first() {
                        Some((first, rest)) => (Some(*first), rest.to_vec()),
                        None => (None, Vec::new()),
                    },
                    (AfNumber::PerAlt, Some(values)) => (None, values),
                };
            if alt_frequencies.len() != num_alts {
                warn!(
                    contig = %variant.contig,
                    position = variant.start + 1,
                    expected = num_alts,
                    found = alt_frequencies.len(),
                    "AF count does not match the number of alternate alleles"
                );
            }
            alt_frequencies.resize(num_alts, 0.0);

            by_contig
                .entry(variant.contig.clone())
                .or_default()
                .push(PopulationVariant {
                    variant,
                    alt_frequencies,
                    ref_frequency,
                });
            record_number += 1;
        }

        for variants in by_contig.values_mut() {
            variants.sort_by_key(|v| (v.variant.start, v.variant.end));
        }

        Ok(Self { by_contig })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_contig.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_contig.is_empty()
    }
}

impl PopulationSource for PopulationVcf {
    fn query(&self, region: &Interval) -> Result<Vec<PopulationVariant>, SourceError> {
        let Some(variants) = self.by_contig.get(&region.contig) else {
            return Ok(Vec::new());
        };
        let last = variants.partition_point(|v| v.variant.start < region.end);
        Ok(variants[..last]
            .iter()
            .filter(|v| v.variant.end > region.start)
            .cloned()
            .collect())
    }
}
