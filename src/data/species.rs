//! Species base stats: one row per species, loaded once per run.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

pub const DEFAULT_SPECIES_PATH: &str = "data/species.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesBaseStats {
    pub species_id: u32,
    pub species_name: String,
    pub base_attack: u32,
    pub base_defense: u32,
    pub base_stamina: u32,
}

/// Raw CSV row. Stats stay optional so a blank cell is reported as missing
/// input rather than failing the whole file.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SpeciesRow {
    pub species_id: u32,
    pub species_name: String,
    pub base_attack: Option<u32>,
    pub base_defense: Option<u32>,
    pub base_stamina: Option<u32>,
}

impl SpeciesRow {
    fn into_stats(self) -> Result<SpeciesBaseStats, String> {
        match (self.base_attack, self.base_defense, self.base_stamina) {
            (Some(base_attack), Some(base_defense), Some(base_stamina)) => Ok(SpeciesBaseStats {
                species_id: self.species_id,
                species_name: self.species_name.trim().to_string(),
                base_attack,
                base_defense,
                base_stamina,
            }),
            _ => Err(self.species_name),
        }
    }
}

/// Lookup key for names: lowercase, whitespace/underscores collapsed.
pub fn normalize_species_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '_' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn read_species_rows<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<SpeciesRow>, DataError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    reader
        .deserialize::<SpeciesRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| DataError::Csv {
            path: source_name.to_string(),
            source,
        })
}

/// Species table plus the names of rows dropped for missing stats.
#[derive(Debug, Clone)]
pub struct SpeciesLoad {
    pub table: SpeciesTable,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesTable {
    species: Vec<SpeciesBaseStats>,
    by_id: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
}

impl SpeciesTable {
    /// Fails on duplicate ids or names.
    pub fn from_species(species: Vec<SpeciesBaseStats>) -> Result<Self, DataError> {
        let mut by_id = HashMap::with_capacity(species.len());
        let mut by_name = HashMap::with_capacity(species.len());

        for (index, entry) in species.iter().enumerate() {
            if by_id.insert(entry.species_id, index).is_some() {
                return Err(DataError::invalid_row(
                    "species table",
                    format!("duplicate species_id {}", entry.species_id),
                ));
            }
            if by_name
                .insert(normalize_species_name(&entry.species_name), index)
                .is_some()
            {
                return Err(DataError::invalid_row(
                    "species table",
                    format!("duplicate species_name '{}'", entry.species_name),
                ));
            }
        }

        Ok(Self {
            species,
            by_id,
            by_name,
        })
    }

    pub fn load_csv(path: &Path) -> Result<SpeciesLoad, DataError> {
        let file = fs::File::open(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_csv_reader(file, &path.display().to_string())
    }

    pub fn from_csv_reader<R: Read>(reader: R, source_name: &str) -> Result<SpeciesLoad, DataError> {
        let mut species = Vec::new();
        let mut missing = Vec::new();
        for row in read_species_rows(reader, source_name)? {
            match row.into_stats() {
                Ok(stats) => species.push(stats),
                Err(name) => missing.push(name),
            }
        }
        Ok(SpeciesLoad {
            table: Self::from_species(species)?,
            missing,
        })
    }

    pub fn get(&self, species_id: u32) -> Option<&SpeciesBaseStats> {
        self.by_id.get(&species_id).map(|&index| &self.species[index])
    }

    pub fn by_name(&self, name: &str) -> Option<&SpeciesBaseStats> {
        self.by_name
            .get(&normalize_species_name(name))
            .map(|&index| &self.species[index])
    }

    /// Accepts a numeric id or a name.
    pub fn resolve(&self, name_or_id: &str) -> Option<&SpeciesBaseStats> {
        match name_or_id.trim().parse::<u32>() {
            Ok(id) => self.get(id),
            Err(_) => self.by_name(name_or_id),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpeciesBaseStats> {
        self.species.iter()
    }

    pub fn as_slice(&self) -> &[SpeciesBaseStats] {
        &self.species
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}
