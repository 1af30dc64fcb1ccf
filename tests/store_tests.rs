use std::fs;

use ivrank::data::{
    CpMultiplierTable, DataRegistry, EvolutionLine, FamilyTable, SpeciesBaseStats, SpeciesTable,
};
use ivrank::engine::{iv_domain_vec, rank_species, IvTriple, LeagueSpec, LevelRule};
use ivrank::error::{RunError, StoreError};
use ivrank::parallel::{plan_units, run_full_recompute, UnitStatus, WorkerPool};
use ivrank::store::{MemoryStore, PartitionKey, PartitionStore, RankingKey, RankingStore};

fn species(id: u32, name: &str, attack: u32, defense: u32, stamina: u32) -> SpeciesBaseStats {
    SpeciesBaseStats {
        species_id: id,
        species_name: name.to_string(),
        base_attack: attack,
        base_defense: defense,
        base_stamina: stamina,
    }
}

fn line(basic: &str, stage2: Option<&str>, stage3: Option<&str>) -> EvolutionLine {
    EvolutionLine {
        family: basic.to_string(),
        basic: basic.to_string(),
        stage2: stage2.map(str::to_string),
        stage3: stage3.map(str::to_string),
    }
}

fn sample_registry(with_families: bool) -> DataRegistry {
    let species = SpeciesTable::from_species(vec![
        species(150, "Mewtwo", 300, 182, 214),
        species(183, "Marill", 37, 93, 172),
        species(184, "Azumarill", 112, 152, 225),
        species(298, "Azurill", 36, 71, 137),
    ])
    .unwrap();
    let families = with_families.then(|| {
        FamilyTable::from_lines(vec![
            line("Azurill", Some("Marill"), Some("Azumarill")),
            line("Mewtwo", None, None),
        ])
    });
    DataRegistry::new(species, CpMultiplierTable::standard(), families)
}

fn azumarill_table(league: &LeagueSpec) -> ivrank::engine::RankedTable {
    let registry = sample_registry(true);
    let azumarill = registry.species.get(184).unwrap();
    rank_species(azumarill, league, &registry.cp_multipliers, &iv_domain_vec()).unwrap()
}

#[test]
fn partition_store_serves_point_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let store = PartitionStore::open(dir.path()).unwrap();
    store
        .write_table(&azumarill_table(&LeagueSpec::great_league()))
        .unwrap();

    // A fresh handle has an empty cache and must read the partition from disk.
    let reopened = PartitionStore::open(dir.path()).unwrap();
    let hit = reopened
        .lookup(&RankingKey::new(184, "GL", IvTriple::new(0, 15, 15).unwrap()))
        .unwrap()
        .unwrap();
    assert_eq!(hit.rank, 1);
    assert_eq!(hit.combat_power, 1499);
    assert_eq!(hit.level, 45.5);
    assert_eq!(hit.stat_product, 2451.0);
    assert_eq!(hit.percentage, 100.0);

    let entries = reopened
        .read_table(&PartitionKey::new(184, "GL"))
        .unwrap()
        .unwrap();
    assert_eq!(entries.len(), 4096);

    assert!(reopened
        .lookup(&RankingKey::new(184, "UL", IvTriple::perfect()))
        .unwrap()
        .is_none());
    assert_eq!(reopened.partitions().unwrap(), vec![PartitionKey::new(184, "GL")]);
}

#[test]
fn rewriting_a_partition_replaces_it_whole() {
    let dir = tempfile::tempdir().unwrap();
    let store = PartitionStore::open(dir.path()).unwrap();
    let mut league = LeagueSpec::great_league();
    store.write_table(&azumarill_table(&league)).unwrap();

    league.rule = LevelRule::Capped { cp_cap: 1000 };
    let rewritten = azumarill_table(&league);
    store.write_table(&rewritten).unwrap();

    let stored = store
        .read_table(&PartitionKey::new(184, "GL"))
        .unwrap()
        .unwrap();
    assert_eq!(stored, rewritten.entries);
    assert!(stored.iter().all(|entry| entry.combat_power <= 1000));
}

#[test]
fn corrupt_partition_is_rejected_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let store = PartitionStore::open(dir.path()).unwrap();
    store
        .write_table(&azumarill_table(&LeagueSpec::great_league()))
        .unwrap();

    // Drop the rank 2 row.
    let path = store.partition_path(&PartitionKey::new(184, "GL"));
    let raw = fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = raw.lines().collect();
    lines.remove(2);
    fs::write(&path, lines.join("\n") + "\n").unwrap();

    let reopened = PartitionStore::open(dir.path()).unwrap();
    let err = reopened
        .read_table(&PartitionKey::new(184, "GL"))
        .unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
}

#[test]
fn remove_partition_evicts_cached_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let store = PartitionStore::open(dir.path()).unwrap();
    store
        .write_table(&azumarill_table(&LeagueSpec::great_league()))
        .unwrap();
    let key = RankingKey::new(184, "GL", IvTriple::perfect());
    assert!(store.lookup(&key).unwrap().is_some());

    store.remove_partition(&key.partition()).unwrap();
    assert!(store.lookup(&key).unwrap().is_none());
    assert!(store.partitions().unwrap().is_empty());
}

#[test]
fn little_cup_only_ranks_pre_evolutions() {
    let registry = sample_registry(true);
    let leagues = vec![LeagueSpec::little_cup(), LeagueSpec::great_league()];
    let units = plan_units(&registry, &leagues);

    let little_cup: Vec<&str> = units
        .iter()
        .filter(|unit| unit.league.code == "LC")
        .map(|unit| unit.species.species_name.as_str())
        .collect();
    assert_eq!(little_cup, vec!["Azurill"]);
    assert_eq!(units.len(), 1 + 4);

    let without_families = sample_registry(false);
    assert_eq!(plan_units(&without_families, &leagues).len(), 4 + 4);
}

#[test]
fn recompute_writes_every_unit_and_a_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let store = PartitionStore::open(dir.path()).unwrap();
    let registry = sample_registry(true);
    let leagues = vec![LeagueSpec::little_cup(), LeagueSpec::great_league()];

    let summary =
        run_full_recompute(&registry, &leagues, &store, &WorkerPool::with_workers(2)).unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.units_total, 5);
    assert_eq!(summary.units_completed, 5);
    assert_eq!(summary.infeasible_total, 0);
    assert_eq!(store.partitions().unwrap().len(), 5);

    let manifest = store.last_manifest().unwrap().unwrap();
    assert_eq!(manifest.run_id, summary.run_id);
    assert!(manifest.complete);
    assert!(dir.path().join("manifest.json").exists());

    let hit = store
        .lookup(&RankingKey::new(184, "GL", IvTriple::new(0, 15, 15).unwrap()))
        .unwrap()
        .unwrap();
    assert_eq!(hit.rank, 1);
}

#[test]
fn recompute_prunes_partitions_no_longer_planned() {
    let dir = tempfile::tempdir().unwrap();
    let store = PartitionStore::open(dir.path()).unwrap();
    let registry = sample_registry(true);

    let both = vec![LeagueSpec::little_cup(), LeagueSpec::great_league()];
    run_full_recompute(&registry, &both, &store, &WorkerPool::default()).unwrap();

    let great_only = vec![LeagueSpec::great_league()];
    let summary =
        run_full_recompute(&registry, &great_only, &store, &WorkerPool::default()).unwrap();
    assert_eq!(summary.pruned_partitions, 1);
    assert!(store
        .partitions()
        .unwrap()
        .iter()
        .all(|key| key.league_code == "GL"));
}

#[test]
fn failed_unit_does_not_stop_the_run() {
    let store = MemoryStore::with_failing_species([184]);
    let registry = sample_registry(true);
    let leagues = vec![LeagueSpec::great_league(), LeagueSpec::ultra_league()];

    let summary =
        run_full_recompute(&registry, &leagues, &store, &WorkerPool::with_workers(2)).unwrap();
    assert!(!summary.is_success());
    assert_eq!(summary.units_total, 8);
    assert_eq!(summary.units_failed, 2);
    assert_eq!(summary.units_completed, 6);
    assert_eq!(store.len(), 6);

    for failure in summary.failures() {
        assert_eq!(failure.species_id, 184);
        assert!(matches!(failure.status, UnitStatus::Failed { .. }));
    }
    let manifest = store.last_manifest().unwrap().unwrap();
    assert!(!manifest.complete);
    assert_eq!(manifest.failed_units.len(), 2);
}

#[test]
fn infeasible_triples_are_counted_per_unit() {
    let store = MemoryStore::new();
    let registry = sample_registry(true);
    let mut tiny = LeagueSpec::great_league();
    tiny.code = "TINY".to_string();
    tiny.rule = LevelRule::Capped { cp_cap: 55 };

    let summary = run_full_recompute(&registry, &[tiny], &store, &WorkerPool::default()).unwrap();
    assert!(summary.is_success());
    let mewtwo = summary
        .outcomes
        .iter()
        .find(|outcome| outcome.species_id == 150)
        .unwrap();
    assert!(mewtwo.infeasible > 0);
    assert_eq!(mewtwo.ranked + mewtwo.infeasible, 4096);
    assert_eq!(summary.infeasible_total, mewtwo.infeasible);
}

#[test]
fn recompute_is_idempotent_across_worker_counts() {
    let registry = sample_registry(true);
    let leagues = vec![
        LeagueSpec::little_cup(),
        LeagueSpec::great_league(),
        LeagueSpec::ultra_league(),
        LeagueSpec::master_league(),
    ];

    let serial_dir = tempfile::tempdir().unwrap();
    let serial = PartitionStore::open(serial_dir.path()).unwrap();
    run_full_recompute(&registry, &leagues, &serial, &WorkerPool::with_workers(1)).unwrap();

    let parallel_dir = tempfile::tempdir().unwrap();
    let parallel = PartitionStore::open(parallel_dir.path()).unwrap();
    run_full_recompute(&registry, &leagues, &parallel, &WorkerPool::with_workers(4)).unwrap();

    let keys = serial.partitions().unwrap();
    assert_eq!(keys.len(), 1 + 3 * 4);
    assert_eq!(keys, parallel.partitions().unwrap());
    for key in &keys {
        let left = fs::read(serial.partition_path(key)).unwrap();
        let right = fs::read(parallel.partition_path(key)).unwrap();
        assert!(left == right, "{}/{} differs", key.league_code, key.species_id);
    }

    let azumarill = registry.species.get(184).unwrap();
    for league in &leagues[1..] {
        let first =
            rank_species(azumarill, league, &registry.cp_multipliers, &iv_domain_vec()).unwrap();
        let second =
            rank_species(azumarill, league, &registry.cp_multipliers, &iv_domain_vec()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn recompute_rejects_repeated_league_codes() {
    let store = MemoryStore::new();
    let registry = sample_registry(true);
    let mut lowercase = LeagueSpec::great_league();
    lowercase.code = "gl".to_string();
    let leagues = vec![LeagueSpec::great_league(), lowercase];

    let err = run_full_recompute(&registry, &leagues, &store, &WorkerPool::default()).unwrap_err();
    assert!(matches!(err, RunError::DuplicateLeague(ref code) if code == "gl"));
    assert!(store.is_empty());
    assert!(store.last_manifest().unwrap().is_none());
}
