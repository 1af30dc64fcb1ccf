pub mod batch;
pub mod pool;

pub use batch::{
    batch_ranges, plan_units, run_full_recompute, RankingUnit, RunSummary, UnitOutcome,
    UnitStatus,
};
pub use pool::WorkerPool;
