//! Startup-loaded static inputs (DataRegistry) shared read-only by every ranking unit.
//! Load once per run and pass by reference or Arc; nothing here is mutated afterwards.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::data::cp_multiplier::CpMultiplierTable;
use crate::data::family::FamilyTable;
use crate::data::species::{SpeciesBaseStats, SpeciesTable};
use crate::engine::league::{Eligibility, LeagueSpec};
use crate::error::DataError;

#[derive(Debug)]
pub struct DataRegistry {
    pub species: SpeciesTable,
    pub cp_multipliers: CpMultiplierTable,
    /// None when no family table was available.
    pub families: Option<FamilyTable>,
    /// Species rows skipped for missing base stats.
    pub missing_species: Vec<String>,
}

impl DataRegistry {
    pub fn new(
        species: SpeciesTable,
        cp_multipliers: CpMultiplierTable,
        families: Option<FamilyTable>,
    ) -> Self {
        Self {
            species,
            cp_multipliers,
            families,
            missing_species: Vec::new(),
        }
    }

    /// Load every input named by `config`. Species and multiplier failures are
    /// errors; a missing family file is tolerated with a warning.
    pub fn load(config: &RunConfig) -> Result<Arc<DataRegistry>, DataError> {
        let species_load = SpeciesTable::load_csv(&config.species_path)?;
        for name in &species_load.missing {
            warn!(species = %name, "base stats missing; species will not be ranked");
        }

        let cp_multipliers = match &config.cp_multiplier_path {
            Some(path) => CpMultiplierTable::load_csv(path)?,
            None => CpMultiplierTable::standard(),
        };

        let families = match config.families_path.as_deref() {
            Some(path) if path.exists() => Some(FamilyTable::load_csv(path)?),
            Some(path) => {
                warn!(path = %path.display(), "family table not found; family features disabled");
                None
            }
            None => None,
        };

        info!(
            species = species_load.table.len(),
            levels = cp_multipliers.len(),
            families = families.as_ref().map(|f| f.lines().len()).unwrap_or(0),
            "static inputs loaded"
        );

        Ok(Arc::new(DataRegistry {
            species: species_load.table,
            cp_multipliers,
            families,
            missing_species: species_load.missing,
        }))
    }

    /// Whether `species` is ranked in `league`. Pre-evolution-only leagues fall
    /// back to every species when no family table is loaded.
    pub fn is_eligible(&self, species: &SpeciesBaseStats, league: &LeagueSpec) -> bool {
        match league.eligibility {
            Eligibility::All => true,
            Eligibility::PreEvolutionOnly => match &self.families {
                Some(families) => families.is_pre_evolution(&species.species_name),
                None => true,
            },
        }
    }

    /// Relatives to report a scanned species against. Without family data, or
    /// for a species outside every line, only the species itself.
    pub fn relevant_evolutions(&self, name: &str) -> Vec<String> {
        let from_families = self
            .families
            .as_ref()
            .map(|families| families.relevant_evolutions(name))
            .unwrap_or_default();
        if from_families.is_empty() {
            vec![name.trim().to_string()]
        } else {
            from_families
        }
    }
}
