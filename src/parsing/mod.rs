//! Readers for the files a run is configured with.
//!
//! - **Contig lists**: SAM/BAM/CRAM headers, Picard `.dict`, FASTA index
//!   (`.fai`), FASTA and VCF `##contig` lines. Every reader numbers contigs in
//!   file order, which is the order regions are emitted in.
//! - **Reference**: [`fasta::InMemoryReference`]
//! - **Population frequencies**: [`vcf::PopulationVcf`]
//! - **Regions**: BED files via [`bed::parse_bed_file`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use candidate_regions::parsing::parse_contigs;
//! use std::path::Path;
//!
//! let contigs = parse_contigs(Path::new("reference.fa.fai")).unwrap();
//! println!("{} contigs", contigs.len());
//! ```

use std::path::Path;

use crate::core::contig::Contig;
use crate::parsing::sam::ParseError;

pub mod bed;
pub mod dict;
pub mod fai;
pub mod fasta;
pub mod sam;
pub mod vcf;

/// Read the contig list of any supported file, choosing the parser by extension.
///
/// # Errors
///
/// Returns `ParseError::UnsupportedFormat` for unrecognized extensions, or the
/// error of the chosen parser.
pub fn parse_contigs(path: &Path) -> Result<Vec<Contig>, ParseError> {
    let name = path.to_string_lossy().to_lowercase();

    if name.ends_with(".fai") {
        fai::parse_fai_file(path)
    } else if name.ends_with(".dict") {
        dict::parse_dict_file(path)
    } else if name.ends_with(".vcf") || name.ends_with(".vcf.gz") {
        vcf::parse_vcf_file(path)
    } else if fasta::is_fasta_file(path) {
        let fai = path.with_file_name(format!(
            "{}.fai",
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        ));
        if fai.exists() {
            fai::parse_fai_file(&fai)
        } else {
            fasta::parse_fasta_file(path)
        }
    } else {
        sam::parse_file(path)
    }
}
