//! Evolutionary lines. Used to pick which relatives a scanned Pokémon is
//! reported against, and to restrict Little Cup to pre-evolutions.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::species::normalize_species_name;
use crate::error::DataError;

pub const DEFAULT_FAMILIES_PATH: &str = "data/families.csv";

/// One evolution path. Branching families (e.g. Eevee) appear as several lines
/// sharing the same `basic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionLine {
    pub family: String,
    pub basic: String,
    #[serde(default)]
    pub stage2: Option<String>,
    #[serde(default)]
    pub stage3: Option<String>,
}

impl EvolutionLine {
    fn stages(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.basic.as_str())
            .chain(self.stage2.as_deref())
            .chain(self.stage3.as_deref())
            .filter(|name| !name.trim().is_empty())
    }

    /// Stages from `name` onwards, or None if `name` is not on this line.
    fn from_stage(&self, name: &str) -> Option<Vec<String>> {
        let key = normalize_species_name(name);
        let stages: Vec<&str> = self.stages().collect();
        let start = stages
            .iter()
            .position(|stage| normalize_species_name(stage) == key)?;
        Some(stages[start..].iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FamilyTable {
    lines: Vec<EvolutionLine>,
}

impl FamilyTable {
    pub fn from_lines(lines: Vec<EvolutionLine>) -> Self {
        Self { lines }
    }

    /// Load a `family,basic,stage2,stage3` CSV; empty stage cells mean "no stage".
    pub fn load_csv(path: &Path) -> Result<Self, DataError> {
        let file = fs::File::open(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_csv_reader(file, &path.display().to_string())
    }

    pub fn from_csv_reader<R: Read>(reader: R, source_name: &str) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let lines = reader
            .deserialize::<EvolutionLine>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| DataError::Csv {
                path: source_name.to_string(),
                source,
            })?;
        Ok(Self::from_lines(lines))
    }

    pub fn lines(&self) -> &[EvolutionLine] {
        &self.lines
    }

    /// `name` followed by every later stage it can evolve into, across all
    /// lines it appears on, without duplicates. Empty when `name` is unknown.
    pub fn relevant_evolutions(&self, name: &str) -> Vec<String> {
        let mut relevant: Vec<String> = Vec::new();
        for line in &self.lines {
            let Some(stages) = line.from_stage(name) else {
                continue;
            };
            for stage in stages {
                let key = normalize_species_name(&stage);
                if !relevant.iter().any(|seen| normalize_species_name(seen) == key) {
                    relevant.push(stage);
                }
            }
        }
        relevant
    }

    /// True when `name` is the basic stage of a line that evolves further.
    pub fn is_pre_evolution(&self, name: &str) -> bool {
        let key = normalize_species_name(name);
        self.lines.iter().any(|line| {
            normalize_species_name(&line.basic) == key && line.stages().count() > 1
        })
    }

    /// Every name mentioned by any line, for cross-checking against the species table.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().flat_map(EvolutionLine::stages)
    }
}
