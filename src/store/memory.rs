//! In-memory store for tests and embedding.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

use crate::engine::ranking::{RankedEntry, RankedTable};
use crate::error::StoreError;
use crate::store::{
    check_entries, PartitionKey, RankLookup, RankingKey, RankingStore, RunManifest,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<PartitionKey, Vec<RankedEntry>>>,
    /// Species whose writes are refused, to exercise failure handling.
    failing_species: HashSet<u32>,
    manifest: Mutex<Option<RunManifest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write for the given species.
    pub fn with_failing_species(species_ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            failing_species: species_ids.into_iter().collect(),
            manifest: Mutex::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RankingStore for MemoryStore {
    fn write_table(&self, table: &RankedTable) -> Result<(), StoreError> {
        let failure = |reason: String| StoreError::WriteFailure {
            species_id: table.species_id,
            league: table.league_code.clone(),
            reason,
        };
        if self.failing_species.contains(&table.species_id) {
            return Err(failure("writes refused for this species".to_string()));
        }
        check_entries(&table.entries).map_err(failure)?;

        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(PartitionKey::of(table), table.entries.clone());
        Ok(())
    }

    fn read_table(&self, key: &PartitionKey) -> Result<Option<Vec<RankedEntry>>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn lookup(&self, key: &RankingKey) -> Result<Option<RankLookup>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key.partition())
            .and_then(|entries| entries.iter().find(|entry| entry.iv() == key.iv))
            .map(RankLookup::from))
    }

    fn partitions(&self) -> Result<Vec<PartitionKey>, StoreError> {
        let mut keys: Vec<PartitionKey> = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn remove_partition(&self, key: &PartitionKey) -> Result<(), StoreError> {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn record_manifest(&self, manifest: &RunManifest) -> Result<(), StoreError> {
        *self.manifest.lock().unwrap_or_else(PoisonError::into_inner) = Some(manifest.clone());
        Ok(())
    }

    fn last_manifest(&self) -> Result<Option<RunManifest>, StoreError> {
        Ok(self
            .manifest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
