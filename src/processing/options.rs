//! Run configuration.
//!
//! Options are plain serde structs with sensible defaults. A JSON config file
//! may set any subset of fields; everything else keeps its default. Options are
//! validated once after loading and then passed around by reference.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parsing::sam::{self, ParseError};
use crate::regions::partition::Shard;
use crate::regions::RegionError;
use crate::utils::validation::{validate_fraction, validate_positive, ValidationError};

/// Default maximum size of one region, in bases
pub const DEFAULT_PARTITION_SIZE: u64 = 1000;

/// Default fraction of the reference span that must be shared by all inputs
pub const DEFAULT_MIN_COVERAGE_FRACTION: f64 = 0.9;

/// Sample name used when neither the config nor the reads name one
pub const DEFAULT_SAMPLE_NAME: &str = "default";

#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Region(#[from] RegionError),
}

/// Whether examples are labeled against a truth set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Calling,
    Training,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlleleCounterOptions {
    /// Reads below this mapping quality are not counted
    pub min_mapping_quality: u8,
    /// Bases below this quality are counted as low quality
    pub min_base_quality: u8,
}

impl Default for AlleleCounterOptions {
    fn default() -> Self {
        Self {
            min_mapping_quality: 10,
            min_base_quality: 10,
        }
    }
}

/// Thresholds of the built-in threshold caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallerOptions {
    pub min_count_snps: u32,
    pub min_fraction_snps: f64,
    pub min_count_indels: u32,
    pub min_fraction_indels: f64,
}

impl Default for CallerOptions {
    fn default() -> Self {
        Self {
            min_count_snps: 2,
            min_fraction_snps: 0.12,
            min_count_indels: 2,
            min_fraction_indels: 0.06,
        }
    }
}

impl CallerOptions {
    /// # Errors
    ///
    /// Returns `ValidationError` if a fraction is outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fraction("min_fraction_snps", self.min_fraction_snps)?;
        validate_fraction("min_fraction_indels", self.min_fraction_indels)?;
        Ok(())
    }
}

/// Options of the per-region processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorOptions {
    pub mode: Mode,

    /// Sample the reads are counted under
    pub sample_name: String,

    pub realigner_enabled: bool,

    /// Emit gVCF records for positions without a candidate
    pub include_gvcfs: bool,

    /// Annotate candidates with population allele frequencies
    pub use_allele_frequency: bool,

    /// Extra bases added on both sides of a population query
    pub allele_frequency_padding: u64,

    pub allele_counter: AlleleCounterOptions,

    pub caller: CallerOptions,

    /// Reads within this many bases of a candidate feed its pileup image
    pub pileup_half_window: u64,

    /// Also hand the pileup creator the reads aligned to each alt haplotype
    pub alt_aligned_pileup: bool,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Calling,
            sample_name: DEFAULT_SAMPLE_NAME.to_string(),
            realigner_enabled: false,
            include_gvcfs: false,
            use_allele_frequency: false,
            allele_frequency_padding: 0,
            allele_counter: AlleleCounterOptions::default(),
            caller: CallerOptions::default(),
            pileup_half_window: 110,
            alt_aligned_pileup: false,
        }
    }
}

impl ProcessorOptions {
    /// # Errors
    ///
    /// Returns `ValidationError` if a threshold is out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.caller.validate()
    }

    /// Bases spanned by one pileup image: the candidate's first base plus
    /// `pileup_half_window` on each side.
    #[must_use]
    pub fn pileup_width(&self) -> u64 {
        2 * self.pileup_half_window + 1
    }

    #[must_use]
    pub fn is_training(&self) -> bool {
        self.mode == Mode::Training
    }

    /// Take the sample name from the read groups of `reads` unless the config
    /// already set one.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the reads header cannot be read.
    pub fn resolve_sample_name(&mut self, reads: &Path) -> Result<(), ParseError> {
        if self.sample_name == DEFAULT_SAMPLE_NAME {
            self.sample_name = sam::parse_sample_name(reads, DEFAULT_SAMPLE_NAME)?;
        }
        Ok(())
    }
}

/// Options that decide which regions a worker processes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionOptions {
    pub partition_size: u64,

    pub task_id: Option<i64>,
    pub num_shards: Option<i64>,

    /// Region literals or BED files to restrict calling to
    pub regions: Vec<String>,

    /// Region literals or BED files to skip
    pub exclude_regions: Vec<String>,

    /// Contig names dropped before the consistency check
    pub exclude_contigs: Vec<String>,

    pub min_coverage_fraction: f64,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            partition_size: DEFAULT_PARTITION_SIZE,
            task_id: None,
            num_shards: None,
            regions: Vec::new(),
            exclude_regions: Vec::new(),
            exclude_contigs: Vec::new(),
            min_coverage_fraction: DEFAULT_MIN_COVERAGE_FRACTION,
        }
    }
}

impl RegionOptions {
    /// # Errors
    ///
    /// Returns `OptionsError` for a zero partition size, a coverage fraction
    /// outside `[0, 1]` or invalid shard arguments.
    pub fn validate(&self) -> Result<(), OptionsError> {
        validate_positive("partition_size", self.partition_size)?;
        validate_fraction("min_coverage_fraction", self.min_coverage_fraction)?;
        self.shard()?;
        Ok(())
    }

    /// The worker's shard, `None` for single-worker mode.
    ///
    /// # Errors
    ///
    /// Returns `RegionError::InvalidShard` for inconsistent arguments.
    pub fn shard(&self) -> Result<Option<Shard>, RegionError> {
        Shard::from_args(self.task_id, self.num_shards)
    }
}

/// A full run configuration as stored in a JSON config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub regions: RegionOptions,
    pub processor: ProcessorOptions,
}

impl Config {
    /// Load from JSON file
    ///
    /// # Errors
    ///
    /// Returns `OptionsError` if the file cannot be read or contains invalid JSON.
    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let file = std::fs::File::open(path).map_err(|source| OptionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|source| OptionsError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// # Errors
    ///
    /// Returns the first validation failure of either section.
    pub fn validate(&self) -> Result<(), OptionsError> {
        self.regions.validate()?;
        self.processor.validate()?;
        Ok(())
    }
}
