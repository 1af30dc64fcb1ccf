use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::RunConfig;
use crate::data::registry::DataRegistry;
use crate::data::validate::{
    validate_registry, validate_species_file, ValidationReport, ValidationSeverity,
};
use crate::engine::iv::IvTriple;
use crate::parallel::{run_full_recompute, WorkerPool};
use crate::report::{build_report, load_scans, render_text, LeagueResult};
use crate::store::{PartitionStore, RankingKey, RankingStore};

const USAGE: &str = "usage: ivrank <rank|lookup|report|validate|leagues>";

/// Flags that take a value; everything else starting with `--` is a switch.
const VALUE_FLAGS: [&str; 3] = ["--config", "--league", "--out"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Rank,
    Lookup,
    Report,
    Validate,
    Leagues,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("rank") => Some(Command::Rank),
        Some("lookup") => Some(Command::Lookup),
        Some("report") => Some(Command::Report),
        Some("validate") => Some(Command::Validate),
        Some("leagues") => Some(Command::Leagues),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Rank) => handle_rank(args),
        Some(Command::Lookup) => handle_lookup(args),
        Some(Command::Report) => handle_report(args),
        Some(Command::Validate) => handle_validate(args),
        Some(Command::Leagues) => handle_leagues(args),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

fn handle_rank(args: &[String]) -> i32 {
    let Some((config, registry)) = load_context(args) else {
        return 1;
    };
    let store = match PartitionStore::open(&config.store_dir) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("unable to open store: {err}");
            return 1;
        }
    };

    let pool = WorkerPool::with_workers(config.workers);
    match run_full_recompute(&registry, &config.leagues, &store, &pool) {
        Ok(summary) => {
            if print_json(&summary, "run summary").is_err() {
                return 1;
            }
            if summary.is_success() {
                0
            } else {
                eprintln!("{} unit(s) failed", summary.units_failed);
                1
            }
        }
        Err(err) => {
            eprintln!("recompute failed: {err}");
            1
        }
    }
}

#[derive(Debug, Serialize)]
struct LookupRow {
    species_id: u32,
    species_name: String,
    league_code: String,
    iv: IvTriple,
    /// `status` is `ranked` with the rank fields, or `not_found`.
    #[serde(flatten)]
    result: LeagueResult,
}

fn handle_lookup(args: &[String]) -> i32 {
    let positional = positional_args(args);
    let [species, attack, defense, stamina] = positional.as_slice() else {
        eprintln!("usage: ivrank lookup <species> <atk> <def> <sta> [--league CODE]");
        return 2;
    };
    let Some(iv) = parse_iv(attack, defense, stamina) else {
        eprintln!("IVs must be integers in 0..=15, got {attack}/{defense}/{stamina}");
        return 2;
    };

    let Some((config, registry)) = load_context(args) else {
        return 1;
    };
    let Some(species) = registry.species.resolve(species) else {
        eprintln!("unknown species '{species}'");
        return 1;
    };
    let leagues: Vec<_> = match flag_value(args, "--league") {
        Some(code) => match config.league(code) {
            Some(league) => vec![league],
            None => {
                eprintln!("unknown league '{code}'");
                return 1;
            }
        },
        None => config.leagues.iter().collect(),
    };
    let store = match PartitionStore::open(&config.store_dir) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("unable to open store: {err}");
            return 1;
        }
    };

    let mut rows = Vec::with_capacity(leagues.len());
    for league in leagues {
        let key = RankingKey::new(species.species_id, league.code.clone(), iv);
        match store.lookup(&key) {
            Ok(result) => rows.push(LookupRow {
                species_id: species.species_id,
                species_name: species.species_name.clone(),
                league_code: league.code.clone(),
                iv,
                result: result.map_or(LeagueResult::NotFound, LeagueResult::Ranked),
            }),
            Err(err) => {
                eprintln!("lookup failed for {}: {err}", league.code);
                return 1;
            }
        }
    }

    match print_json(&rows, "lookup result") {
        Ok(()) => 0,
        Err(()) => 1,
    }
}

fn handle_report(args: &[String]) -> i32 {
    let Some(scans_path) = positional_args(args).first().copied() else {
        eprintln!("usage: ivrank report <scans.json> [--out path] [--json]");
        return 2;
    };
    let scans = match load_scans(Path::new(scans_path)) {
        Ok(scans) => scans,
        Err(err) => {
            eprintln!("unable to load scans: {err}");
            return 1;
        }
    };

    let Some((config, registry)) = load_context(args) else {
        return 1;
    };
    let store = match PartitionStore::open(&config.store_dir) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("unable to open store: {err}");
            return 1;
        }
    };

    let reports = build_report(&registry, &config.leagues, &store, &scans);
    let rendered = if has_switch(args, "--json") {
        match serde_json::to_string_pretty(&reports) {
            Ok(payload) => payload,
            Err(err) => {
                eprintln!("failed to serialize report: {err}");
                return 1;
            }
        }
    } else {
        render_text(&reports)
    };

    match flag_value(args, "--out") {
        Some(out) => match fs::write(out, rendered) {
            Ok(()) => {
                println!("report written: {out} ({} scan(s))", reports.len());
                0
            }
            Err(err) => {
                eprintln!("unable to write '{out}': {err}");
                1
            }
        },
        None => {
            println!("{rendered}");
            0
        }
    }
}

fn handle_validate(args: &[String]) -> i32 {
    let explicit = positional_args(args).first().map(PathBuf::from);
    let mut report = ValidationReport::default();

    let species_path = match &explicit {
        Some(path) => path.clone(),
        None => {
            let Some((config, registry)) = load_context(args) else {
                return 1;
            };
            report.extend(validate_registry(&registry, &config.leagues));
            config.species_path
        }
    };

    match validate_species_file(&species_path) {
        Ok(file_report) => report.extend(file_report),
        Err(err) => {
            eprintln!("validation failed: {err}");
            return 1;
        }
    }

    for diagnostic in &report.diagnostics {
        eprintln!("- {diagnostic}");
    }
    if report.has_errors() {
        eprintln!(
            "validation failed: {} issue(s)",
            report.count(ValidationSeverity::Error)
        );
        1
    } else {
        println!("validation passed: {}", species_path.display());
        0
    }
}

fn handle_leagues(args: &[String]) -> i32 {
    let config = match RunConfig::load(flag_value(args, "--config").map(Path::new)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };
    match print_json(&config.leagues, "league catalogue") {
        Ok(()) => 0,
        Err(()) => 1,
    }
}

/// Load config and static inputs, reporting any failure on stderr.
fn load_context(args: &[String]) -> Option<(RunConfig, Arc<DataRegistry>)> {
    let config = match RunConfig::load(flag_value(args, "--config").map(Path::new)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return None;
        }
    };
    let registry = match DataRegistry::load(&config) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("unable to load inputs: {err}");
            return None;
        }
    };
    if let Err(err) = config.validate(&registry.cp_multipliers) {
        eprintln!("{err}");
        return None;
    }
    Some((config, registry))
}

fn print_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<(), ()> {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            Ok(())
        }
        Err(err) => {
            eprintln!("failed to serialize {what}: {err}");
            Err(())
        }
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
        .map(String::as_str)
}

fn has_switch(args: &[String], switch: &str) -> bool {
    args.iter().any(|arg| arg == switch)
}

/// Arguments after the subcommand that are neither flags nor flag values.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut positional = Vec::new();
    let mut rest = args.iter().skip(2);
    while let Some(arg) = rest.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            rest.next();
        } else if !arg.starts_with("--") {
            positional.push(arg.as_str());
        }
    }
    positional
}

fn parse_iv(attack: &str, defense: &str, stamina: &str) -> Option<IvTriple> {
    IvTriple::new(
        attack.parse().ok()?,
        defense.parse().ok()?,
        stamina.parse().ok()?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn positional_args_skip_flag_values() {
        let raw = args(&["ivrank", "lookup", "--league", "GL", "Azumarill", "0", "15", "15", "--json"]);
        assert_eq!(positional_args(&raw), vec!["Azumarill", "0", "15", "15"]);
        assert_eq!(flag_value(&raw, "--league"), Some("GL"));
        assert!(has_switch(&raw, "--json"));
    }

    #[test]
    fn parse_iv_rejects_out_of_range() {
        assert_eq!(parse_iv("0", "15", "15"), IvTriple::new(0, 15, 15));
        assert_eq!(parse_iv("16", "0", "0"), None);
        assert_eq!(parse_iv("x", "0", "0"), None);
    }

    #[test]
    fn lookup_row_marks_missing_rankings() {
        let row = LookupRow {
            species_id: 184,
            species_name: "Azumarill".to_string(),
            league_code: "UL".to_string(),
            iv: IvTriple::perfect(),
            result: LeagueResult::NotFound,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["status"], "not_found");
        assert_eq!(json["league_code"], "UL");
        assert!(json.get("rank").is_none());
    }

    #[test]
    fn unknown_command_is_usage_error() {
        assert_eq!(parse_command(&args(&["ivrank", "serve"])), None);
        assert_eq!(run_with_args(&args(&["ivrank"])), 2);
    }
}
