//! # candidate-regions
//!
//! Region planning and candidate generation for a sharded variant-calling
//! pipeline.
//!
//! A reference genome is split into small, deterministic regions so that many
//! workers can process it in parallel and still produce exactly the output of a
//! single worker. Each region is then turned into variant candidates from the
//! aligned reads, with optional pileup examples, truth labels and population
//! allele frequencies.
//!
//! ## Features
//!
//! - **Interval algebra**: union, intersection and difference over half-open
//!   genomic intervals
//! - **Contig checks**: reference, reads and truth variants must share enough of
//!   the genome
//! - **Sharding**: round-robin assignment of regions that is order-equivalent to
//!   a single worker
//! - **Region processing**: reads to allele counts to candidates to examples, with
//!   per-stage timings
//! - **Allele frequencies**: matching candidates to population variants written
//!   in a different but equivalent representation
//!
//! ## Example
//!
//! ```rust
//! use candidate_regions::core::contig::contigs_from_pairs;
//! use candidate_regions::regions::{build_calling_regions, regions_to_process, Shard};
//!
//! let contigs = contigs_from_pairs(&[("chr1", 2500), ("chr2", 1000)]);
//! let calling = build_calling_regions(&contigs, &["chr1"], &["chr1:1-100"]).unwrap();
//!
//! let shard = Shard::new(0, 2).unwrap();
//! let regions = regions_to_process(&contigs, 1000, Some(&calling), Some(shard)).unwrap();
//! for region in &regions {
//!     println!("{region}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: contigs, intervals, interval sets and pipeline records
//! - [`regions`]: calling regions, contig consistency, partitioning and sharding
//! - [`processing`]: the region processor, allele counting and allele frequencies
//! - [`parsing`]: parsers for FASTA, FAI, dict, SAM/BAM/CRAM headers, VCF and BED
//! - [`cli`]: command-line interface implementation

pub mod cli;
pub mod core;
pub mod parsing;
pub mod processing;
pub mod regions;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::contig::Contig;
pub use core::interval::Interval;
pub use core::range_set::IntervalSet;
pub use core::types::*;
pub use processing::{RegionOutput, RegionProcessor};
pub use regions::{build_calling_regions, regions_to_process, Shard};
