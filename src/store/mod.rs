//! Result store: ranked tables keyed by (species, league), point lookups by
//! (species, league, IV triple).
//!
//! Tables are written as whole units. A reader sees either the previous
//! complete table for a (species, league) or the new one, never a mix.

pub mod manifest;
pub mod memory;
pub mod partition;

use serde::{Deserialize, Serialize};

use crate::engine::iv::IvTriple;
use crate::engine::ranking::{RankedEntry, RankedTable};
use crate::error::StoreError;

pub use manifest::RunManifest;
pub use memory::MemoryStore;
pub use partition::PartitionStore;

/// One stored table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub species_id: u32,
    pub league_code: String,
}

impl PartitionKey {
    pub fn new(species_id: u32, league_code: impl Into<String>) -> Self {
        Self {
            species_id,
            league_code: league_code.into(),
        }
    }

    pub fn of(table: &RankedTable) -> Self {
        Self::new(table.species_id, table.league_code.clone())
    }
}

/// Composite key for a single ranked spread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RankingKey {
    pub species_id: u32,
    pub league_code: String,
    pub iv: IvTriple,
}

impl RankingKey {
    pub fn new(species_id: u32, league_code: impl Into<String>, iv: IvTriple) -> Self {
        Self {
            species_id,
            league_code: league_code.into(),
            iv,
        }
    }

    pub fn partition(&self) -> PartitionKey {
        PartitionKey::new(self.species_id, self.league_code.clone())
    }
}

/// What a point lookup returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankLookup {
    pub rank: u32,
    pub stat_product: f64,
    pub combat_power: u32,
    pub level: f64,
    pub percentage: f64,
}

impl From<&RankedEntry> for RankLookup {
    fn from(entry: &RankedEntry) -> Self {
        Self {
            rank: entry.rank,
            stat_product: entry.stat_product,
            combat_power: entry.combat_power,
            level: entry.level,
            percentage: entry.percentage,
        }
    }
}

/// Storage seam for ranked tables. Implementations are shared across worker
/// threads during a run, so every method takes `&self`.
pub trait RankingStore: Send + Sync {
    /// Replace the whole table for the table's (species, league).
    fn write_table(&self, table: &RankedTable) -> Result<(), StoreError>;

    /// Entries in rank order, or None if no table is stored.
    fn read_table(&self, key: &PartitionKey) -> Result<Option<Vec<RankedEntry>>, StoreError>;

    /// None when the table or the IV triple is absent.
    fn lookup(&self, key: &RankingKey) -> Result<Option<RankLookup>, StoreError>;

    fn partitions(&self) -> Result<Vec<PartitionKey>, StoreError>;

    fn remove_partition(&self, key: &PartitionKey) -> Result<(), StoreError>;

    /// Persist the manifest of a finished run.
    fn record_manifest(&self, manifest: &RunManifest) -> Result<(), StoreError>;

    fn last_manifest(&self) -> Result<Option<RunManifest>, StoreError>;
}

/// Reject tables whose ranks are not exactly 1..=n in order or that repeat an IV triple.
pub(crate) fn check_entries(entries: &[RankedEntry]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let expected = position as u32 + 1;
        if entry.rank != expected {
            return Err(format!(
                "rank {} at position {} (expected {expected})",
                entry.rank, position
            ));
        }
        if !entry.iv().is_valid() {
            return Err(format!("IV triple {} out of range", entry.iv()));
        }
        if !seen.insert(entry.iv()) {
            return Err(format!("IV triple {} appears more than once", entry.iv()));
        }
    }
    Ok(())
}
