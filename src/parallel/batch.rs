//! Full recompute: every eligible (species, league) unit is ranked in parallel
//! and written to the store as one table.
//!
//! Units share nothing mutable. A unit that fails to evaluate or to persist is
//! recorded in the [RunSummary] and never stops the others.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::data::registry::DataRegistry;
use crate::data::species::SpeciesBaseStats;
use crate::engine::iv::{iv_domain_vec, IvTriple};
use crate::engine::league::{Eligibility, LeagueSpec};
use crate::engine::ranking::{rank_species, RankedTable};
use crate::error::{RunError, StoreError};
use crate::parallel::pool::WorkerPool;
use crate::store::{PartitionKey, RankingStore, RunManifest};

/// Units handed to rayon per progress step.
pub const UNITS_PER_BATCH: usize = 32;

/// A failed store write is retried this many times in total before the unit fails.
pub const STORE_WRITE_ATTEMPTS: usize = 2;

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
///
/// # Example
/// ```
/// # use ivrank::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + if i < remainder { 1 } else { 0 };
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// One (species, league) pair to rank.
#[derive(Debug, Clone, Copy)]
pub struct RankingUnit<'a> {
    pub species: &'a SpeciesBaseStats,
    pub league: &'a LeagueSpec,
}

impl RankingUnit<'_> {
    pub fn key(&self) -> PartitionKey {
        PartitionKey::new(self.species.species_id, self.league.code.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Completed,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub species_id: u32,
    pub species_name: String,
    pub league_code: String,
    pub ranked: usize,
    pub infeasible: usize,
    #[serde(flatten)]
    pub status: UnitStatus,
}

impl UnitOutcome {
    fn failed(unit: &RankingUnit<'_>, reason: String) -> Self {
        Self {
            species_id: unit.species.species_id,
            species_name: unit.species.species_name.clone(),
            league_code: unit.league.code.clone(),
            ranked: 0,
            infeasible: 0,
            status: UnitStatus::Failed { reason },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, UnitStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub units_total: usize,
    pub units_completed: usize,
    pub units_failed: usize,
    pub infeasible_total: usize,
    /// Species excluded before ranking for missing base stats.
    pub skipped_species: Vec<String>,
    /// Partitions removed because no configured unit produces them anymore.
    pub pruned_partitions: usize,
    pub outcomes: Vec<UnitOutcome>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.units_failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_failed())
    }
}

/// Every eligible (species, league) pair, league-major in catalogue order.
pub fn plan_units<'a>(
    registry: &'a DataRegistry,
    leagues: &'a [LeagueSpec],
) -> Vec<RankingUnit<'a>> {
    let mut units = Vec::new();
    for league in leagues {
        if league.eligibility == Eligibility::PreEvolutionOnly && registry.families.is_none() {
            warn!(
                league = %league.code,
                "no family table loaded; ranking every species in a pre-evolution league"
            );
        }
        units.extend(
            registry
                .species
                .iter()
                .filter(|species| registry.is_eligible(species, league))
                .map(|species| RankingUnit { species, league }),
        );
    }
    units
}

fn write_with_retry<S: RankingStore + ?Sized>(
    store: &S,
    table: &RankedTable,
) -> Result<(), StoreError> {
    let mut attempt = 1;
    loop {
        match store.write_table(table) {
            Ok(()) => return Ok(()),
            Err(err) if attempt < STORE_WRITE_ATTEMPTS => {
                warn!(
                    species_id = table.species_id,
                    league = %table.league_code,
                    attempt,
                    error = %err,
                    "store write failed; retrying"
                );
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn run_unit<S: RankingStore + ?Sized>(
    unit: &RankingUnit<'_>,
    registry: &DataRegistry,
    domain: &[IvTriple],
    store: &S,
) -> UnitOutcome {
    let table = match rank_species(unit.species, unit.league, &registry.cp_multipliers, domain) {
        Ok(table) => table,
        Err(err) => {
            warn!(
                species = %unit.species.species_name,
                league = %unit.league.code,
                error = %err,
                "unit evaluation failed"
            );
            return UnitOutcome::failed(unit, err.to_string());
        }
    };
    debug_assert!(table.is_complete());

    if !table.infeasible.is_empty() {
        debug!(
            species = %table.species_name,
            league = %table.league_code,
            infeasible = table.infeasible.len(),
            "IV triples with no level under the cap"
        );
    }

    match write_with_retry(store, &table) {
        Ok(()) => UnitOutcome {
            species_id: table.species_id,
            species_name: table.species_name,
            league_code: table.league_code,
            ranked: table.entries.len(),
            infeasible: table.infeasible.len(),
            status: UnitStatus::Completed,
        },
        Err(err) => {
            warn!(
                species = %unit.species.species_name,
                league = %unit.league.code,
                error = %err,
                "unit not persisted; previous table left in place"
            );
            UnitOutcome::failed(unit, err.to_string())
        }
    }
}

/// Drop partitions for species or leagues no longer in the plan. Failures are
/// logged and leave the partition behind.
fn prune_stale<S: RankingStore + ?Sized>(store: &S, planned: &HashSet<PartitionKey>) -> usize {
    let existing = match store.partitions() {
        Ok(existing) => existing,
        Err(err) => {
            warn!(error = %err, "unable to list stored partitions; skipping prune");
            return 0;
        }
    };
    let mut pruned = 0;
    for key in existing.iter().filter(|key| !planned.contains(*key)) {
        match store.remove_partition(key) {
            Ok(()) => pruned += 1,
            Err(err) => warn!(
                species_id = key.species_id,
                league = %key.league_code,
                error = %err,
                "unable to prune stale partition"
            ),
        }
    }
    pruned
}

/// Rank every eligible species in every league and replace the stored tables.
///
/// Errors when two leagues share a code, when the worker pool cannot be built,
/// or when the run manifest cannot be recorded; unit failures are reported in
/// the returned summary.
pub fn run_full_recompute<S: RankingStore + ?Sized>(
    registry: &DataRegistry,
    leagues: &[LeagueSpec],
    store: &S,
    pool: &WorkerPool,
) -> Result<RunSummary, RunError> {
    let mut codes = HashSet::new();
    if let Some(league) = leagues
        .iter()
        .find(|league| !codes.insert(league.code.to_ascii_uppercase()))
    {
        return Err(RunError::DuplicateLeague(league.code.clone()));
    }

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let units = plan_units(registry, leagues);
    let domain = iv_domain_vec();
    info!(
        %run_id,
        units = units.len(),
        leagues = leagues.len(),
        workers = pool.effective_workers(),
        "full recompute started"
    );

    let batches = batch_ranges(units.len(), units.len().div_ceil(UNITS_PER_BATCH));
    let outcomes = pool.install(|| {
        let mut outcomes = Vec::with_capacity(units.len());
        for (start, end) in batches {
            let batch: Vec<UnitOutcome> = units[start..end]
                .par_iter()
                .map(|unit| run_unit(unit, registry, &domain, store))
                .collect();
            outcomes.extend(batch);
            info!(done = end, total = units.len(), "ranking progress");
        }
        outcomes
    })?;

    let planned: HashSet<PartitionKey> = units.iter().map(RankingUnit::key).collect();
    let pruned_partitions = prune_stale(store, &planned);

    let units_failed = outcomes.iter().filter(|outcome| outcome.is_failed()).count();
    let summary = RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        units_total: units.len(),
        units_completed: outcomes.len() - units_failed,
        units_failed,
        infeasible_total: outcomes.iter().map(|outcome| outcome.infeasible).sum(),
        skipped_species: registry.missing_species.clone(),
        pruned_partitions,
        outcomes,
    };

    store.record_manifest(&RunManifest::from_summary(&summary))?;
    info!(
        %run_id,
        completed = summary.units_completed,
        failed = summary.units_failed,
        infeasible = summary.infeasible_total,
        pruned = summary.pruned_partitions,
        "full recompute finished"
    );
    Ok(summary)
}
