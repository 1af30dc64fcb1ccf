//! File-backed store: one CSV partition per (league, species) at
//! `<root>/<league>/<species_id>.csv`.
//!
//! Partitions are written to a temporary sibling and renamed into place, so a
//! failed or interrupted write leaves the previous partition untouched.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::engine::iv::IvTriple;
use crate::engine::ranking::{RankedEntry, RankedTable};
use crate::error::StoreError;
use crate::store::{
    check_entries, PartitionKey, RankLookup, RankingKey, RankingStore, RunManifest,
};

const PARTITION_EXT: &str = "csv";

type PartitionIndex = HashMap<IvTriple, RankLookup>;

#[derive(Debug)]
pub struct PartitionStore {
    root: PathBuf,
    /// Point-lookup indexes for partitions read or written by this handle.
    cache: RwLock<HashMap<PartitionKey, Arc<PartitionIndex>>>,
}

fn build_index(entries: &[RankedEntry]) -> PartitionIndex {
    entries
        .iter()
        .map(|entry| (entry.iv(), RankLookup::from(entry)))
        .collect()
}

impl PartitionStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::io(&root, source))?;
        Ok(Self {
            root,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Each (league, species) table lives in its own file rather than in one
    /// table keyed by (species, league, IV). A file can be replaced whole by a
    /// rename, which a shared table could only match with transactions. The
    /// cost is one directory per league and one file per species. Callers
    /// address rows through the composite [RankingKey] and never see the split.
    pub fn partition_path(&self, key: &PartitionKey) -> PathBuf {
        self.root
            .join(&key.league_code)
            .join(format!("{}.{PARTITION_EXT}", key.species_id))
    }

    fn write_partition(&self, key: &PartitionKey, entries: &[RankedEntry]) -> Result<(), String> {
        check_entries(entries)?;

        let path = self.partition_path(key);
        let dir = path
            .parent()
            .ok_or_else(|| format!("partition path '{}' has no parent", path.display()))?;
        fs::create_dir_all(dir).map_err(|err| format!("{}: {err}", dir.display()))?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for entry in entries {
            writer.serialize(entry).map_err(|err| err.to_string())?;
        }
        let bytes = writer.into_inner().map_err(|err| err.to_string())?;

        let tmp = path.with_extension(format!("{PARTITION_EXT}.tmp"));
        let result = fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(&bytes)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, &path));
        if let Err(err) = result {
            let _ = fs::remove_file(&tmp);
            return Err(format!("{}: {err}", path.display()));
        }
        Ok(())
    }

    fn load_index(&self, key: &PartitionKey) -> Result<Option<Arc<PartitionIndex>>, StoreError> {
        if let Some(index) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(Some(Arc::clone(index)));
        }

        let Some(entries) = self.read_table(key)? else {
            return Ok(None);
        };
        let index = Arc::new(build_index(&entries));
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), Arc::clone(&index));
        debug!(species_id = key.species_id, league = %key.league_code, "partition index cached");
        Ok(Some(index))
    }
}

impl RankingStore for PartitionStore {
    fn write_table(&self, table: &RankedTable) -> Result<(), StoreError> {
        let key = PartitionKey::of(table);
        self.write_partition(&key, &table.entries)
            .map_err(|reason| StoreError::WriteFailure {
                species_id: table.species_id,
                league: table.league_code.clone(),
                reason,
            })?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(build_index(&table.entries)));
        Ok(())
    }

    fn read_table(&self, key: &PartitionKey) -> Result<Option<Vec<RankedEntry>>, StoreError> {
        let path = self.partition_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let mut reader = csv::Reader::from_path(&path).map_err(|source| StoreError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        let entries = reader
            .deserialize::<RankedEntry>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| StoreError::Csv {
                path: path.display().to_string(),
                source,
            })?;
        check_entries(&entries).map_err(|reason| StoreError::Corrupt {
            path: path.display().to_string(),
            reason,
        })?;
        if let Some(stray) = entries.iter().find(|e| e.species_id != key.species_id) {
            return Err(StoreError::Corrupt {
                path: path.display().to_string(),
                reason: format!("entry for species {} in this partition", stray.species_id),
            });
        }
        Ok(Some(entries))
    }

    fn lookup(&self, key: &RankingKey) -> Result<Option<RankLookup>, StoreError> {
        Ok(self
            .load_index(&key.partition())?
            .and_then(|index| index.get(&key.iv).copied()))
    }

    fn partitions(&self) -> Result<Vec<PartitionKey>, StoreError> {
        let mut keys = Vec::new();
        let leagues = fs::read_dir(&self.root).map_err(|source| StoreError::io(&self.root, source))?;
        for league_dir in leagues {
            let league_dir = league_dir.map_err(|source| StoreError::io(&self.root, source))?;
            let league_path = league_dir.path();
            if !league_path.is_dir() {
                continue;
            }
            let Some(league_code) = league_dir.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let files =
                fs::read_dir(&league_path).map_err(|source| StoreError::io(&league_path, source))?;
            for file in files {
                let file = file.map_err(|source| StoreError::io(&league_path, source))?;
                let path = file.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some(PARTITION_EXT) {
                    continue;
                }
                if let Some(species_id) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<u32>().ok())
                {
                    keys.push(PartitionKey::new(species_id, league_code.clone()));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn remove_partition(&self, key: &PartitionKey) -> Result<(), StoreError> {
        let path = self.partition_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|source| StoreError::io(&path, source))?;
        }
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn record_manifest(&self, manifest: &RunManifest) -> Result<(), StoreError> {
        manifest.write(&self.root)
    }

    fn last_manifest(&self) -> Result<Option<RunManifest>, StoreError> {
        RunManifest::read(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rank: u32, attack: u8, stat_product: f64) -> RankedEntry {
        RankedEntry {
            rank,
            species_id: 7,
            iv_attack: attack,
            iv_defense: 0,
            iv_stamina: 0,
            actual_attack: 10.5,
            actual_defense: 11.25,
            actual_stamina: 12.0,
            stat_product,
            combat_power: 100,
            level: 20.5,
            percentage: 100.0,
        }
    }

    fn table(entries: Vec<RankedEntry>) -> RankedTable {
        RankedTable {
            species_id: 7,
            species_name: "Squirtle".to_string(),
            league_code: "GL".to_string(),
            entries,
            infeasible: Vec::new(),
        }
    }

    #[test]
    fn partition_path_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartitionStore::open(dir.path()).unwrap();
        assert_eq!(
            store.partition_path(&PartitionKey::new(7, "GL")),
            dir.path().join("GL").join("7.csv")
        );
    }

    #[test]
    fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartitionStore::open(dir.path()).unwrap();
        let written = table(vec![entry(1, 3, 12.5), entry(2, 1, 11.0)]);
        store.write_table(&written).unwrap();

        let read = store
            .read_table(&PartitionKey::new(7, "GL"))
            .unwrap()
            .unwrap();
        assert_eq!(read, written.entries);
        assert!(!dir.path().join("GL").join("7.csv.tmp").exists());
    }

    #[test]
    fn rejected_table_leaves_previous_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartitionStore::open(dir.path()).unwrap();
        store.write_table(&table(vec![entry(1, 3, 12.5)])).unwrap();

        let gapped = table(vec![entry(1, 3, 12.5), entry(3, 4, 10.0)]);
        let err = store.write_table(&gapped).unwrap_err();
        assert!(matches!(err, StoreError::WriteFailure { species_id: 7, .. }));

        let read = store
            .read_table(&PartitionKey::new(7, "GL"))
            .unwrap()
            .unwrap();
        assert_eq!(read.len(), 1);
    }
}
