//! League evaluator: best eligible level, CP and stat product for one species,
//! one IV triple and one league.

use serde::{Deserialize, Serialize};

use crate::data::cp_multiplier::CpMultiplierTable;
use crate::data::species::SpeciesBaseStats;
use crate::engine::iv::IvTriple;
use crate::engine::league::{LeagueSpec, LevelRule, StatProductRounding};
use crate::error::EvalError;

/// Base stat plus IV, per stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinedStats {
    pub attack: u32,
    pub defense: u32,
    pub stamina: u32,
}

impl CombinedStats {
    pub fn new(species: &SpeciesBaseStats, iv: IvTriple) -> Self {
        Self {
            attack: species.base_attack + u32::from(iv.attack),
            defense: species.base_defense + u32::from(iv.defense),
            stamina: species.base_stamina + u32::from(iv.stamina),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub level: f64,
    pub combat_power: u32,
    pub actual_attack: f64,
    pub actual_defense: f64,
    /// Whole HP: floored, unlike attack and defense.
    pub actual_stamina: f64,
    pub stat_product: f64,
}

/// floor(atk × √def × √sta × cpm² / 10).
pub fn combat_power(stats: CombinedStats, multiplier: f64) -> u32 {
    let raw = f64::from(stats.attack)
        * f64::from(stats.defense).sqrt()
        * f64::from(stats.stamina).sqrt()
        * multiplier.powi(2)
        / 10.0;
    raw.floor() as u32
}

/// Scale combined stats by `multiplier` and compute the rounded stat product.
pub fn scaled_at_level(
    stats: CombinedStats,
    level: f64,
    multiplier: f64,
    rounding: StatProductRounding,
) -> Evaluation {
    let actual_attack = f64::from(stats.attack) * multiplier;
    let actual_defense = f64::from(stats.defense) * multiplier;
    let actual_stamina = (f64::from(stats.stamina) * multiplier).floor();
    let stat_product = rounding.apply(actual_attack * actual_defense * actual_stamina / 1000.0);

    Evaluation {
        level,
        combat_power: combat_power(stats, multiplier),
        actual_attack,
        actual_defense,
        actual_stamina,
        stat_product,
    }
}

/// Evaluate one IV triple under `league`.
///
/// Capped leagues walk the table from the top level down and take the first
/// level whose CP fits; CP rises with level, so that level also maximises the
/// stat product. Uncapped leagues evaluate directly at their fixed level.
pub fn evaluate(
    species: &SpeciesBaseStats,
    iv: IvTriple,
    league: &LeagueSpec,
    table: &CpMultiplierTable,
) -> Result<Evaluation, EvalError> {
    let stats = CombinedStats::new(species, iv);

    match league.rule {
        LevelRule::Capped { cp_cap } => table
            .descending()
            .find(|entry| combat_power(stats, entry.multiplier) <= cp_cap)
            .map(|entry| scaled_at_level(stats, entry.level, entry.multiplier, league.rounding))
            .ok_or(EvalError::NoFeasibleLevel { cap: cp_cap, iv }),
        LevelRule::Uncapped { fixed_level } => {
            let multiplier = table
                .multiplier(fixed_level)
                .ok_or(EvalError::MissingLevel { level: fixed_level })?;
            Ok(scaled_at_level(stats, fixed_level, multiplier, league.rounding))
        }
    }
}
