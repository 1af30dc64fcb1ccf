pub mod evaluator;
pub mod iv;
pub mod league;
pub mod ranking;

pub use evaluator::{combat_power, evaluate, scaled_at_level, CombinedStats, Evaluation};
pub use iv::{iv_domain, iv_domain_vec, IvTriple, IV_DOMAIN_SIZE, IV_MAX};
pub use league::{
    standard_leagues, Eligibility, LeagueSpec, LevelRule, StatProductRounding, TieBreak,
};
pub use ranking::{assemble, rank_species, RankedEntry, RankedTable};
