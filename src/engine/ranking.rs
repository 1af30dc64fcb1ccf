use serde::{Deserialize, Serialize};

use crate::data::cp_multiplier::CpMultiplierTable;
use crate::data::species::SpeciesBaseStats;
use crate::engine::evaluator::{evaluate, Evaluation};
use crate::engine::iv::{IvTriple, IV_DOMAIN_SIZE};
use crate::engine::league::{LeagueSpec, TieBreak};
use crate::error::EvalError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: u32,
    pub species_id: u32,
    pub iv_attack: u8,
    pub iv_defense: u8,
    pub iv_stamina: u8,
    pub actual_attack: f64,
    pub actual_defense: f64,
    pub actual_stamina: f64,
    pub stat_product: f64,
    pub combat_power: u32,
    pub level: f64,
    pub percentage: f64,
}

impl RankedEntry {
    pub fn iv(&self) -> IvTriple {
        IvTriple {
            attack: self.iv_attack,
            defense: self.iv_defense,
            stamina: self.iv_stamina,
        }
    }
}

/// Ranked spreads for one species in one league.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTable {
    pub species_id: u32,
    pub species_name: String,
    pub league_code: String,
    pub entries: Vec<RankedEntry>,
    /// Triples dropped because no level fits the cap.
    pub infeasible: Vec<IvTriple>,
}

impl RankedTable {
    /// Every triple of the IV domain is either ranked or accounted for as infeasible.
    pub fn is_complete(&self) -> bool {
        self.entries.len() + self.infeasible.len() == IV_DOMAIN_SIZE
    }

    pub fn find(&self, iv: IvTriple) -> Option<&RankedEntry> {
        self.entries.iter().find(|entry| entry.iv() == iv)
    }

    pub fn best(&self) -> Option<&RankedEntry> {
        self.entries.first()
    }
}

/// Round to two decimals, ties to even on the exact binary value: 90.625 becomes
/// 90.62 while 1.005 (stored just below the half) becomes 1.0.
fn round_to_hundredths(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Sort evaluations, assign 1-based ranks and percentage of the best stat product.
///
/// Sorting is stable: ties the league's tie-break does not separate keep the
/// order they were passed in. Ranks are positions, so tied spreads still get
/// distinct consecutive ranks.
pub fn assemble(
    species_id: u32,
    evaluations: Vec<(IvTriple, Evaluation)>,
    tie_break: TieBreak,
) -> Vec<RankedEntry> {
    let mut sorted = evaluations;
    sorted.sort_by(|(_, left), (_, right)| {
        right
            .stat_product
            .total_cmp(&left.stat_product)
            .then_with(|| tie_break.compare(left.combat_power, right.combat_power))
    });

    let max_stat_product = sorted
        .first()
        .map(|(_, eval)| eval.stat_product)
        .unwrap_or(0.0);

    sorted
        .into_iter()
        .enumerate()
        .map(|(position, (iv, eval))| {
            // An all-zero table has no meaningful best; every entry shares it.
            let percentage = if max_stat_product > 0.0 {
                round_to_hundredths(eval.stat_product / max_stat_product * 100.0)
            } else {
                100.0
            };
            RankedEntry {
                rank: position as u32 + 1,
                species_id,
                iv_attack: iv.attack,
                iv_defense: iv.defense,
                iv_stamina: iv.stamina,
                actual_attack: eval.actual_attack,
                actual_defense: eval.actual_defense,
                actual_stamina: eval.actual_stamina,
                stat_product: eval.stat_product,
                combat_power: eval.combat_power,
                level: eval.level,
                percentage,
            }
        })
        .collect()
}

/// Evaluate every triple in `domain` for one species and league and rank the results.
///
/// Infeasible triples are collected on the table rather than failing it; a
/// missing fixed level fails the whole unit since no triple could be evaluated.
pub fn rank_species(
    species: &SpeciesBaseStats,
    league: &LeagueSpec,
    table: &CpMultiplierTable,
    domain: &[IvTriple],
) -> Result<RankedTable, EvalError> {
    let mut evaluations = Vec::with_capacity(domain.len());
    let mut infeasible = Vec::new();

    for &iv in domain {
        match evaluate(species, iv, league, table) {
            Ok(eval) => evaluations.push((iv, eval)),
            Err(EvalError::NoFeasibleLevel { .. }) => infeasible.push(iv),
            Err(err) => return Err(err),
        }
    }

    Ok(RankedTable {
        species_id: species.species_id,
        species_name: species.species_name.clone(),
        league_code: league.code.clone(),
        entries: assemble(species.species_id, evaluations, league.tie_break),
        infeasible,
    })
}
