//! League rules: CP cap or fixed level, stat product rounding, tie-break and eligibility.
//!
//! The standard catalogue keeps the divergent rounding and tie-break rules of
//! the community tables these rankings are compared against:
//!
//! | code | cap          | rounding       | tie-break    | eligibility       |
//! |------|--------------|----------------|--------------|-------------------|
//! | LC   | 500          | ceil to 0.1    | higher CP    | pre-evolutions    |
//! | GL   | 1500         | floor to 1     | none         | all               |
//! | UL   | 2500         | ceil to 0.1    | higher CP    | all               |
//! | ML   | level 50     | ceil to 0.1    | higher CP    | all               |

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::data::cp_multiplier::CpMultiplierTable;
use crate::error::ConfigError;

/// How the raw stat product (attack × defense × stamina / 1000) is rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatProductRounding {
    /// Round down to a whole number.
    FloorInteger,
    /// Round up to one decimal place.
    CeilTenth,
}

impl StatProductRounding {
    pub fn apply(self, raw: f64) -> f64 {
        match self {
            Self::FloorInteger => raw.floor(),
            Self::CeilTenth => (raw * 10.0).ceil() / 10.0,
        }
    }
}

/// Secondary sort key when two spreads share a stat product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Ties keep IV domain order.
    None,
    /// Higher CP ranks first; remaining ties keep IV domain order.
    CombatPower,
}

impl TieBreak {
    pub fn compare(self, left_cp: u32, right_cp: u32) -> Ordering {
        match self {
            Self::None => Ordering::Equal,
            Self::CombatPower => right_cp.cmp(&left_cp),
        }
    }
}

/// Which species a league is computed for. Enforced by the batch runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    #[default]
    All,
    PreEvolutionOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LevelRule {
    /// Highest level whose CP does not exceed `cp_cap`.
    Capped { cp_cap: u32 },
    /// Always `fixed_level`; CP is not checked.
    Uncapped { fixed_level: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueSpec {
    /// Short code, also used as the store partition directory.
    pub code: String,
    pub name: String,
    pub rule: LevelRule,
    pub rounding: StatProductRounding,
    pub tie_break: TieBreak,
    #[serde(default)]
    pub eligibility: Eligibility,
}

impl LeagueSpec {
    pub fn little_cup() -> Self {
        Self {
            code: "LC".to_string(),
            name: "Little Cup".to_string(),
            rule: LevelRule::Capped { cp_cap: 500 },
            rounding: StatProductRounding::CeilTenth,
            tie_break: TieBreak::CombatPower,
            eligibility: Eligibility::PreEvolutionOnly,
        }
    }

    pub fn great_league() -> Self {
        Self {
            code: "GL".to_string(),
            name: "Great League".to_string(),
            rule: LevelRule::Capped { cp_cap: 1500 },
            rounding: StatProductRounding::FloorInteger,
            tie_break: TieBreak::None,
            eligibility: Eligibility::All,
        }
    }

    pub fn ultra_league() -> Self {
        Self {
            code: "UL".to_string(),
            name: "Ultra League".to_string(),
            rule: LevelRule::Capped { cp_cap: 2500 },
            rounding: StatProductRounding::CeilTenth,
            tie_break: TieBreak::CombatPower,
            eligibility: Eligibility::All,
        }
    }

    pub fn master_league() -> Self {
        Self {
            code: "ML".to_string(),
            name: "Master League".to_string(),
            rule: LevelRule::Uncapped { fixed_level: 50.0 },
            rounding: StatProductRounding::CeilTenth,
            tie_break: TieBreak::CombatPower,
            eligibility: Eligibility::All,
        }
    }

    pub fn cp_cap(&self) -> Option<u32> {
        match self.rule {
            LevelRule::Capped { cp_cap } => Some(cp_cap),
            LevelRule::Uncapped { .. } => None,
        }
    }

    /// Codes become directory names, so only ASCII alphanumerics, `-` and `_` are allowed.
    pub fn validate(&self, table: &CpMultiplierTable) -> Result<(), ConfigError> {
        let code_ok = !self.code.is_empty()
            && self
                .code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !code_ok {
            return Err(ConfigError::Invalid(format!(
                "league code '{}' must be non-empty ASCII alphanumeric",
                self.code
            )));
        }
        if let LevelRule::Uncapped { fixed_level } = self.rule {
            if !table.contains_level(fixed_level) {
                return Err(ConfigError::Invalid(format!(
                    "league {} fixed level {} is not in the CP multiplier table",
                    self.code, fixed_level
                )));
            }
        }
        Ok(())
    }
}

pub fn standard_leagues() -> Vec<LeagueSpec> {
    vec![
        LeagueSpec::little_cup(),
        LeagueSpec::great_league(),
        LeagueSpec::ultra_league(),
        LeagueSpec::master_league(),
    ]
}
