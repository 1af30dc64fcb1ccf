//! Ranking report for scanned Pokémon.
//!
//! A scan names a species and its IVs. The report looks up that IV spread for
//! the species and each later stage of its evolutionary line in every league.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::registry::DataRegistry;
use crate::engine::iv::IvTriple;
use crate::engine::league::LeagueSpec;
use crate::error::DataError;
use crate::store::{RankLookup, RankingKey, RankingStore};

pub const NO_RANKING_DATA: &str = "No ranking data found.";

/// One scanned Pokémon, as produced by the screenshot reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Where the scan came from (usually an image file name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub name: String,
    #[serde(default)]
    pub cp: Option<u32>,
    pub iv_attack: u8,
    pub iv_defense: u8,
    pub iv_stamina: u8,
    #[serde(default)]
    pub shadow: bool,
}

impl ScanRecord {
    pub fn iv(&self) -> Option<IvTriple> {
        IvTriple::new(self.iv_attack, self.iv_defense, self.iv_stamina)
    }
}

pub fn load_scans(path: &Path) -> Result<Vec<ScanRecord>, DataError> {
    let raw = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| DataError::Json {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LeagueResult {
    Ranked(RankLookup),
    NotFound,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueRanking {
    pub league_code: String,
    pub league_name: String,
    pub result: LeagueResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionRankings {
    pub species_id: u32,
    pub species_name: String,
    pub leagues: Vec<LeagueRanking>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub scan: ScanRecord,
    pub evolutions: Vec<EvolutionRankings>,
    /// Relatives that are not in the species table.
    pub skipped: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn league_result<S: RankingStore + ?Sized>(store: &S, key: &RankingKey) -> LeagueResult {
    match store.lookup(key) {
        Ok(Some(lookup)) => LeagueResult::Ranked(lookup),
        Ok(None) => LeagueResult::NotFound,
        Err(err) => {
            warn!(
                species_id = key.species_id,
                league = %key.league_code,
                error = %err,
                "ranking lookup failed"
            );
            LeagueResult::Error {
                message: err.to_string(),
            }
        }
    }
}

fn report_scan<S: RankingStore + ?Sized>(
    registry: &DataRegistry,
    leagues: &[LeagueSpec],
    store: &S,
    scan: &ScanRecord,
) -> ScanReport {
    let mut report = ScanReport {
        scan: scan.clone(),
        evolutions: Vec::new(),
        skipped: Vec::new(),
        error: None,
    };
    let Some(iv) = scan.iv() else {
        report.error = Some(format!(
            "IVs {}/{}/{} out of range",
            scan.iv_attack, scan.iv_defense, scan.iv_stamina
        ));
        return report;
    };

    for name in registry.relevant_evolutions(&scan.name) {
        let Some(species) = registry.species.by_name(&name) else {
            debug!(species = %name, "relative not in species table");
            report.skipped.push(name);
            continue;
        };
        let leagues = leagues
            .iter()
            .map(|league| LeagueRanking {
                league_code: league.code.clone(),
                league_name: league.name.clone(),
                result: league_result(
                    store,
                    &RankingKey::new(species.species_id, league.code.clone(), iv),
                ),
            })
            .collect();
        report.evolutions.push(EvolutionRankings {
            species_id: species.species_id,
            species_name: species.species_name.clone(),
            leagues,
        });
    }
    report
}

/// Look up every scan's IVs for each relevant evolution in each league.
pub fn build_report<S: RankingStore + ?Sized>(
    registry: &DataRegistry,
    leagues: &[LeagueSpec],
    store: &S,
    scans: &[ScanRecord],
) -> Vec<ScanReport> {
    scans
        .iter()
        .map(|scan| report_scan(registry, leagues, store, scan))
        .collect()
}

/// Plain-text rendering, one block per scan.
pub fn render_text(reports: &[ScanReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let scan = &report.scan;
        if let Some(source) = &scan.source {
            let _ = writeln!(out, "\nProcessing image: {source}");
            let _ = writeln!(out, "{}", "-".repeat(40));
        }
        let _ = writeln!(out, "Extracted Information for {}:", scan.name);
        match scan.cp {
            Some(cp) => {
                let _ = writeln!(out, "  CP: {cp}");
            }
            None => {
                let _ = writeln!(out, "  CP: unknown");
            }
        }
        let _ = writeln!(
            out,
            "  IVs - Attack: {}, Defense: {}, Stamina: {}",
            scan.iv_attack, scan.iv_defense, scan.iv_stamina
        );
        let status = if scan.shadow { "Shadow" } else { "Normal" };
        let _ = writeln!(out, "  Shadow Status: {status}\n");

        if let Some(error) = &report.error {
            let _ = writeln!(out, "Error: {error}");
        } else if report.evolutions.is_empty() && report.skipped.is_empty() {
            let _ = writeln!(out, "No evolutionary data found for {}.", scan.name);
        }
        for name in &report.skipped {
            let _ = writeln!(out, "Skipping {name} as it was not found in the species table.\n");
        }

        for evolution in &report.evolutions {
            let _ = writeln!(out, "\n--- Rankings for {} ---", evolution.species_name);
            for league in &evolution.leagues {
                let _ = writeln!(out, "--- {} ---", league.league_name);
                match &league.result {
                    LeagueResult::Ranked(lookup) => {
                        let _ = writeln!(out, "  Rank: {}", lookup.rank);
                        let _ = writeln!(out, "  Stat Product (SP): {}", lookup.stat_product);
                        let _ = writeln!(out, "  Combat Power (CP): {}", lookup.combat_power);
                        let _ = writeln!(out, "  Level: {}", lookup.level);
                        let _ = writeln!(out, "  Percentage: {}%", lookup.percentage);
                    }
                    LeagueResult::NotFound => {
                        let _ = writeln!(out, "  {NO_RANKING_DATA}");
                    }
                    LeagueResult::Error { message } => {
                        let _ = writeln!(out, "  Error querying league data: {message}");
                    }
                }
            }
        }
        let _ = writeln!(out, "\n{}", "=".repeat(50));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cp_multiplier::CpMultiplierTable;
    use crate::data::family::{EvolutionLine, FamilyTable};
    use crate::data::species::{SpeciesBaseStats, SpeciesTable};
    use crate::engine::iv::iv_domain_vec;
    use crate::engine::league::LeagueSpec;
    use crate::engine::ranking::rank_species;
    use crate::store::MemoryStore;

    fn species(id: u32, name: &str, stats: (u32, u32, u32)) -> SpeciesBaseStats {
        SpeciesBaseStats {
            species_id: id,
            species_name: name.to_string(),
            base_attack: stats.0,
            base_defense: stats.1,
            base_stamina: stats.2,
        }
    }

    fn registry() -> DataRegistry {
        let species = SpeciesTable::from_species(vec![
            species(183, "Marill", (37, 93, 172)),
            species(184, "Azumarill", (112, 152, 225)),
        ])
        .unwrap();
        let families = FamilyTable::from_lines(vec![EvolutionLine {
            family: "Azurill".to_string(),
            basic: "Azurill".to_string(),
            stage2: Some("Marill".to_string()),
            stage3: Some("Azumarill".to_string()),
        }]);
        DataRegistry::new(species, CpMultiplierTable::standard(), Some(families))
    }

    fn scan(name: &str, iv: (u8, u8, u8)) -> ScanRecord {
        ScanRecord {
            source: Some("shot.png".to_string()),
            name: name.to_string(),
            cp: Some(1200),
            iv_attack: iv.0,
            iv_defense: iv.1,
            iv_stamina: iv.2,
            shadow: false,
        }
    }

    #[test]
    fn reports_each_later_stage_in_each_league() {
        let registry = registry();
        let great = LeagueSpec::great_league();
        let store = MemoryStore::new();
        let azumarill = registry.species.by_name("Azumarill").unwrap();
        let table =
            rank_species(azumarill, &great, &registry.cp_multipliers, &iv_domain_vec()).unwrap();
        store.write_table(&table).unwrap();

        let leagues = vec![great, LeagueSpec::ultra_league()];
        let reports = build_report(&registry, &leagues, &store, &[scan("Azurill", (0, 15, 15))]);
        let report = &reports[0];

        assert_eq!(report.skipped, vec!["Azurill".to_string()]);
        let names: Vec<&str> = report
            .evolutions
            .iter()
            .map(|e| e.species_name.as_str())
            .collect();
        assert_eq!(names, vec!["Marill", "Azumarill"]);

        let azumarill_gl = &report.evolutions[1].leagues[0].result;
        match azumarill_gl {
            LeagueResult::Ranked(lookup) => {
                assert_eq!(lookup.rank, 1);
                assert_eq!(lookup.combat_power, 1499);
            }
            other => panic!("expected ranked result, got {other:?}"),
        }
        assert_eq!(report.evolutions[1].leagues[1].result, LeagueResult::NotFound);

        let text = render_text(&reports);
        assert!(text.contains("--- Rankings for Azumarill ---"));
        assert!(text.contains("  Rank: 1\n"));
        assert!(text.contains(NO_RANKING_DATA));
        assert!(text.contains("Skipping Azurill"));
    }

    #[test]
    fn out_of_range_ivs_are_reported_not_looked_up() {
        let registry = registry();
        let reports = build_report(
            &registry,
            &[LeagueSpec::great_league()],
            &MemoryStore::new(),
            &[scan("Marill", (16, 0, 0))],
        );
        assert!(reports[0].error.is_some());
        assert!(reports[0].evolutions.is_empty());
    }
}
