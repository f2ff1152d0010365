use std::path::{Path, PathBuf};

use clap::Args;

use crate::cli::OutputFormat;
use crate::core::contig::{total_length, Contig};
use crate::parsing::{self, vcf};
use crate::processing::options::{DEFAULT_MIN_COVERAGE_FRACTION, DEFAULT_SAMPLE_NAME};
use crate::regions::ensure_consistent_contigs;
use crate::utils::validation::count_to_f64;

#[derive(Args)]
pub struct ContigsArgs {
    /// Reference contigs (FASTA, FAI or .dict)
    #[arg(long = "ref", required = true)]
    pub reference: PathBuf,

    /// Reads whose header contigs must match the reference (BAM, SAM or CRAM)
    #[arg(long)]
    pub reads: Option<PathBuf>,

    /// Truth VCF whose ##contig lines must match the reference
    #[arg(long)]
    pub truth_variants: Option<PathBuf>,

    /// Contig names to drop from the reference before checking (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_contigs: Vec<String>,

    /// Fraction of the reference span the shared contigs must cover
    #[arg(long, default_value_t = DEFAULT_MIN_COVERAGE_FRACTION)]
    pub min_coverage_fraction: f64,
}

/// Reference contigs and the contigs every input shares.
///
/// Without reads or truth variants the shared contigs are the reference minus
/// the excluded names.
///
/// # Errors
///
/// Returns an error if a file cannot be parsed or the shared contigs cover too
/// little of the reference.
pub fn load_consistent_contigs(
    reference: &Path,
    reads: Option<&Path>,
    truth_variants: Option<&Path>,
    exclude_contigs: &[String],
    min_coverage_fraction: f64,
) -> anyhow::Result<(Vec<Contig>, Vec<Contig>)> {
    let reference_contigs = parsing::parse_contigs(reference)?;
    let read_contigs = match reads {
        Some(path) => parsing::parse_contigs(path)?,
        None => reference_contigs.clone(),
    };
    let truth_contigs = truth_variants.map(vcf::parse_vcf_file).transpose()?;

    let common = ensure_consistent_contigs(
        &reference_contigs,
        &read_contigs,
        truth_contigs.as_deref(),
        exclude_contigs,
        min_coverage_fraction,
    )?;
    Ok((reference_contigs, common))
}

/// Execute contigs subcommand
///
/// # Errors
///
/// Returns an error if an input cannot be parsed or the contigs are inconsistent.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ContigsArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let (reference, common) = load_consistent_contigs(
        &args.reference,
        args.reads.as_deref(),
        args.truth_variants.as_deref(),
        &args.exclude_contigs,
        args.min_coverage_fraction,
    )?;

    let sample = args
        .reads
        .as_deref()
        .map(|reads| parsing::sam::parse_sample_name(reads, DEFAULT_SAMPLE_NAME))
        .transpose()?;

    let reference_span = total_length(&reference);
    let common_span = total_length(&common);
    let coverage = if reference_span == 0 {
        0.0
    } else {
        count_to_f64(common_span) / count_to_f64(reference_span)
    };

    if verbose {
        eprintln!(
            "{} of {} reference contigs are shared by every input",
            common.len(),
            reference.len()
        );
    }

    match format {
        OutputFormat::Text => {
            for contig in &common {
                println!("{}\t{}", contig.name, contig.length);
            }
            println!(
                "\nShared contigs span {common_span} of {reference_span} reference bases ({:.2}%)",
                coverage * 100.0
            );
            if let Some(sample) = &sample {
                println!("Sample: {sample}");
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "reference_contigs": reference.len(),
                "reference_span": reference_span,
                "common_span": common_span,
                "coverage": coverage,
                "common": common,
                "sample": sample,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("name\tlength\tindex");
            for contig in &common {
                println!("{}\t{}\t{}", contig.name, contig.length, contig.index);
            }
        }
    }

    Ok(())
}
