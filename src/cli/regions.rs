use std::path::PathBuf;

use clap::Args;

use crate::cli::contigs::load_consistent_contigs;
use crate::cli::OutputFormat;
use crate::core::interval::Interval;
use crate::core::types::Variant;
use crate::parsing::vcf::parse_vcf_variants;
use crate::processing::options::{Config, RegionOptions};
use crate::regions::{filter_regions_by_vcf, processing_regions, regions_to_process};

#[derive(Args)]
pub struct RegionsArgs {
    /// Reference contigs (FASTA, FAI or .dict)
    #[arg(long = "ref", required = true)]
    pub reference: PathBuf,

    /// Reads whose header contigs must match the reference (BAM, SAM or CRAM)
    #[arg(long)]
    pub reads: Option<PathBuf>,

    /// Truth VCF whose ##contig lines must match the reference
    #[arg(long)]
    pub truth_variants: Option<PathBuf>,

    /// Regions to call: literals such as chr20:10,000,000-11,000,000 or BED files
    #[arg(long, num_args = 1..)]
    pub regions: Vec<String>,

    /// Regions to skip: literals or BED files
    #[arg(long, num_args = 1..)]
    pub exclude_regions: Vec<String>,

    /// Contig names to drop before the consistency check (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_contigs: Vec<String>,

    /// Fraction of the reference span the shared contigs must cover
    #[arg(long)]
    pub min_coverage_fraction: Option<f64>,

    /// Maximum region size in bases
    #[arg(long)]
    pub partition_size: Option<u64>,

    /// This worker's task id, 0-based
    #[arg(long, allow_negative_numbers = true)]
    pub task: Option<i64>,

    /// Total number of workers
    #[arg(long, allow_negative_numbers = true)]
    pub num_shards: Option<i64>,

    /// Only keep regions where a variant of this VCF starts
    #[arg(long)]
    pub proposed_variants: Option<PathBuf>,

    /// JSON config file; command-line options take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl RegionsArgs {
    /// Config file options (or defaults) overridden by the command line.
    fn region_options(&self) -> anyhow::Result<RegionOptions> {
        let mut options = match &self.config {
            Some(path) => Config::load(path)?.regions,
            None => RegionOptions::default(),
        };

        if !self.regions.is_empty() {
            options.regions.clone_from(&self.regions);
        }
        if !self.exclude_regions.is_empty() {
            options.exclude_regions.clone_from(&self.exclude_regions);
        }
        if !self.exclude_contigs.is_empty() {
            options.exclude_contigs.clone_from(&self.exclude_contigs);
        }
        if let Some(fraction) = self.min_coverage_fraction {
            options.min_coverage_fraction = fraction;
        }
        if let Some(size) = self.partition_size {
            options.partition_size = size;
        }
        if self.task.is_some() || self.num_shards.is_some() {
            options.task_id = self.task;
            options.num_shards = self.num_shards;
        }

        options.validate()?;
        Ok(options)
    }
}

/// Execute regions subcommand
///
/// # Errors
///
/// Returns an error for invalid options, unreadable inputs, inconsistent
/// contigs or an empty calling region set.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: RegionsArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let options = args.region_options()?;

    let (_, contigs) = load_consistent_contigs(
        &args.reference,
        args.reads.as_deref(),
        args.truth_variants.as_deref(),
        &options.exclude_contigs,
        options.min_coverage_fraction,
    )?;

    let calling_regions = processing_regions(&contigs, &options)?;
    let mut regions = regions_to_process(
        &contigs,
        options.partition_size,
        Some(&calling_regions),
        options.shard()?,
    )?;

    if let Some(path) = &args.proposed_variants {
        let positions: Vec<Interval> = parse_vcf_variants(path)?
            .iter()
            .filter_map(Variant::interval)
            .collect();
        let before = regions.len();
        regions = filter_regions_by_vcf(&regions, &positions);
        if verbose {
            eprintln!(
                "Kept {} of {before} regions containing a proposed variant",
                regions.len()
            );
        }
    }

    if verbose {
        let bases: u64 = regions.iter().map(Interval::len).sum();
        eprintln!(
            "{} regions covering {bases} bases on {} contigs",
            regions.len(),
            contigs.len()
        );
    }

    match format {
        OutputFormat::Text => {
            for region in &regions {
                println!("{region}");
            }
        }
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = regions
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "contig": r.contig,
                        "start": r.start,
                        "end": r.end,
                        "region": r.to_literal(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            // BED-style, 0-based half-open
            for region in &regions {
                println!("{}\t{}\t{}", region.contig, region.start, region.end);
            }
        }
    }

    Ok(())
}
