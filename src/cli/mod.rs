//! Command-line interface for candidate-regions.
//!
//! Available commands:
//!
//! - **regions**: the regions one worker processes, after contig checks,
//!   include/exclude arguments, partitioning and sharding
//! - **contigs**: the contig consistency check on its own
//! - **allele-frequency**: population frequencies of a single variant
//!
//! ## Usage
//!
//! ```text
//! # Regions of worker 3 of 16, restricted to chr20
//! candidate-regions regions --ref GRCh38.fa --reads sample.bam \
//!     --regions chr20 --task 3 --num-shards 16
//!
//! # Exclude a BED file of problematic regions, JSON output
//! candidate-regions regions --ref GRCh38.fa.fai --exclude-regions blacklist.bed --format json
//!
//! # Do the reads and the truth set agree with the reference?
//! candidate-regions contigs --ref GRCh38.dict --reads sample.bam --truth-variants truth.vcf.gz
//!
//! # Frequency of a deletion in a population VCF
//! candidate-regions allele-frequency --ref chr20.fa --population-vcf af.vcf.gz \
//!     --contig chr20 --position 60285 --ref-bases ATTCCAG --alt AT
//! ```

use clap::{Parser, Subcommand};

pub mod allele_frequency;
pub mod contigs;
pub mod regions;

#[derive(Parser)]
#[command(name = "candidate-regions")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Plan sharded calling regions and match candidate variants to population frequencies")]
#[command(
    long_about = "candidate-regions decides which parts of a reference genome a variant-calling worker processes.\n\nIt checks that the reference, reads and truth variants describe the same contigs, combines include and exclude regions, splits the result into bounded regions and assigns them to shards. It can also look up population allele frequencies for a candidate variant, matching equivalent indel representations."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the regions a worker processes
    Regions(regions::RegionsArgs),

    /// Check that reference, reads and truth variants share their contigs
    Contigs(contigs::ContigsArgs),

    /// Look up population allele frequencies for a variant
    AlleleFrequency(allele_frequency::AlleleFrequencyArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
