use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::core::types::Variant;
use crate::parsing::fasta::InMemoryReference;
use crate::parsing::vcf::PopulationVcf;
use crate::processing::allele_frequency::find_matching_allele_frequency;

#[derive(Args)]
pub struct AlleleFrequencyArgs {
    /// Reference FASTA (plain or gzipped)
    #[arg(long = "ref", required = true)]
    pub reference: PathBuf,

    /// Population VCF with an AF INFO field
    #[arg(long, required = true)]
    pub population_vcf: PathBuf,

    /// Contig of the variant
    #[arg(long, required = true)]
    pub contig: String,

    /// 1-based position of the variant's first reference base
    #[arg(long, required = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub position: u64,

    /// Reference allele
    #[arg(long, required = true)]
    pub ref_bases: String,

    /// Alternate allele; repeat for multi-allelic variants
    #[arg(long = "alt", required = true)]
    pub alts: Vec<String>,

    /// Extra bases searched for population variants on each side
    #[arg(long, default_value = "0")]
    pub padding: u64,
}

/// Execute allele-frequency subcommand
///
/// # Errors
///
/// Returns an error if an input cannot be read or the variant's reference
/// bases disagree with the reference.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: AlleleFrequencyArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let reference = InMemoryReference::from_path(&args.reference)?;
    let population = PopulationVcf::from_path(&args.population_vcf)?;
    if verbose {
        eprintln!("Loaded {} population variants", population.len());
    }

    let variant = Variant::new(
        args.contig.clone(),
        args.position - 1,
        args.ref_bases.to_ascii_uppercase(),
        args.alts.iter().map(|a| a.to_ascii_uppercase()),
    );
    let frequencies =
        find_matching_allele_frequency(&variant, Some(&population), Some(&reference), args.padding)?;

    // Reference allele first, then alternates in the order given.
    let ordered: Vec<(&str, f64)> = variant
        .alleles()
        .filter_map(|allele| frequencies.get(allele).map(|&f| (allele, f)))
        .collect();

    match format {
        OutputFormat::Text => {
            for (allele, frequency) in &ordered {
                println!("{allele}\t{frequency:.6}");
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "contig": variant.contig,
                "position": args.position,
                "reference_bases": variant.reference_bases,
                "alternate_bases": variant.alternate_bases,
                "allele_frequency": frequencies,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("allele\tfrequency");
            for (allele, frequency) in &ordered {
                println!("{allele}\t{frequency}");
            }
        }
    }

    Ok(())
}
