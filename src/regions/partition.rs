//! Splitting calling regions into work units and assigning them to shards.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::core::contig::Contig;
use crate::core::interval::Interval;
use crate::core::range_set::IntervalSet;
use crate::regions::RegionError;

/// One worker's slice of the region stream: every piece `i` with
/// `i % num_shards == task_id`. Always holds `task_id < num_shards`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shard {
    task_id: usize,
    num_shards: usize,
}

impl Shard {
    /// # Errors
    ///
    /// Returns `RegionError::InvalidShard` unless `task_id < num_shards`.
    pub fn new(task_id: usize, num_shards: usize) -> Result<Self, RegionError> {
        if task_id >= num_shards {
            return Err(RegionError::InvalidShard {
                task_id: i64::try_from(task_id).ok(),
                num_shards: i64::try_from(num_shards).ok(),
                reason: "task_id must be less than num_shards",
            });
        }
        Ok(Self {
            task_id,
            num_shards,
        })
    }

    #[must_use]
    pub fn task_id(&self) -> usize {
        self.task_id
    }

    #[must_use]
    pub fn num_shards(&self) -> usize {
        self.num_shards
    }

    /// Validate raw task/shard arguments.
    ///
    /// Both must be given or both omitted. `(0, 0)` is accepted as an explicit
    /// request for single-worker mode and yields `None`, as does `(None, None)`.
    ///
    /// # Errors
    ///
    /// Returns `RegionError::InvalidShard` when only one argument is given, when
    /// either is negative, or when `task_id >= num_shards`.
    pub fn from_args(
        task_id: Option<i64>,
        num_shards: Option<i64>,
    ) -> Result<Option<Self>, RegionError> {
        let invalid = |reason| RegionError::InvalidShard {
            task_id,
            num_shards,
            reason,
        };

        match (task_id, num_shards) {
            (None, None) => Ok(None),
            (Some(_), None) | (None, Some(_)) => Err(invalid(
                "task_id and num_shards must both be set or both be unset",
            )),
            (Some(task), Some(shards)) => {
                if task < 0 || shards < 0 {
                    return Err(invalid("task_id and num_shards must be non-negative"));
                }
                if shards == 0 {
                    return if task == 0 {
                        Ok(None)
                    } else {
                        Err(invalid("task_id must be 0 when num_shards is 0"))
                    };
                }
                if task >= shards {
                    return Err(invalid("task_id must be less than num_shards"));
                }
                let task_id = usize::try_from(task).map_err(|_| invalid("task_id is too large"))?;
                let num_shards =
                    usize::try_from(shards).map_err(|_| invalid("num_shards is too large"))?;
                Self::new(task_id, num_shards).map(Some)
            }
        }
    }

    /// Whether the piece at `index` in the global order belongs to this shard.
    #[must_use]
    pub fn owns(&self, index: usize) -> bool {
        index % self.num_shards == self.task_id
    }
}

/// Compute the ordered regions a worker must process.
///
/// Calling regions default to every contig in full. Supplied regions are clipped
/// to the contig extents, so regions on unknown contigs are dropped. Contigs are
/// visited in `index` order (not name order), intervals by start, and each
/// interval is split into pieces of at most `partition_size` bases. With a
/// shard, only the pieces it owns are returned, in the same relative order.
///
/// # Errors
///
/// Returns `RegionError::InvalidPartitionSize` when `partition_size` is zero.
pub fn regions_to_process(
    contigs: &[Contig],
    partition_size: u64,
    calling_regions: Option<&IntervalSet>,
    shard: Option<Shard>,
) -> Result<Vec<Interval>, RegionError> {
    if partition_size == 0 {
        return Err(RegionError::InvalidPartitionSize);
    }

    let genome = IntervalSet::from_contigs(contigs);
    let regions = match calling_regions {
        Some(calling) => calling.intersection(&genome),
        None => genome,
    };

    let mut ordered: Vec<&Contig> = contigs.iter().collect();
    ordered.sort_by_key(|c| c.index);

    let mut seen = HashSet::new();
    let pieces = ordered
        .into_iter()
        .filter(|c| seen.insert(c.name.as_str()))
        .flat_map(|c| regions.partition_contig(&c.name, partition_size));

    let selected: Vec<Interval> = match shard {
        Some(shard) => pieces
            .enumerate()
            .filter(|(i, _)| shard.owns(*i))
            .map(|(_, piece)| piece)
            .collect(),
        None => pieces.collect(),
    };

    debug!(
        num_regions = selected.len(),
        partition_size,
        shard = ?shard,
        "Computed regions to process"
    );

    Ok(selected)
}
