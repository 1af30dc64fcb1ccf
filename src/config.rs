//! Run configuration: input paths, store location, worker count and league catalogue.
//!
//! Read from YAML (`--config`, `IVRANK_CONFIG`, or `data/ivrank.yaml` when present),
//! then overridden by `IVRANK_SPECIES`, `IVRANK_STORE_DIR` and `IVRANK_WORKERS`.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::cp_multiplier::CpMultiplierTable;
use crate::data::family::DEFAULT_FAMILIES_PATH;
use crate::data::species::DEFAULT_SPECIES_PATH;
use crate::engine::league::{standard_leagues, LeagueSpec};
use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "data/ivrank.yaml";
pub const DEFAULT_STORE_DIR: &str = "rankings";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub species_path: PathBuf,
    /// None uses the built-in standard table.
    pub cp_multiplier_path: Option<PathBuf>,
    /// Optional; a missing file only disables family-based features.
    pub families_path: Option<PathBuf>,
    pub store_dir: PathBuf,
    /// 0 uses every core.
    pub workers: usize,
    pub leagues: Vec<LeagueSpec>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            species_path: PathBuf::from(DEFAULT_SPECIES_PATH),
            cp_multiplier_path: None,
            families_path: Some(PathBuf::from(DEFAULT_FAMILIES_PATH)),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            workers: 0,
            leagues: standard_leagues(),
        }
    }
}

impl RunConfig {
    /// Resolve and load the configuration, then apply environment overrides.
    /// An explicit path must exist; the default path is used only if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = env::var_os("IVRANK_CONFIG").map(PathBuf::from);
        let path = explicit.map(Path::to_path_buf).or(from_env);

        let mut config = match path {
            Some(path) => Self::from_yaml_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_yaml_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw, &path.display().to_string())
    }

    pub fn from_yaml_str(raw: &str, source_name: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml {
            path: source_name.to_string(),
            source,
        })
    }

    /// Apply `IVRANK_*` overrides using `lookup` for variable values.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("IVRANK_SPECIES") {
            self.species_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("IVRANK_STORE_DIR") {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("IVRANK_WORKERS") {
            self.workers = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("IVRANK_WORKERS must be a number, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    /// League codes must be unique and every league must fit the multiplier table.
    pub fn validate(&self, table: &CpMultiplierTable) -> Result<(), ConfigError> {
        if self.leagues.is_empty() {
            return Err(ConfigError::Invalid("no leagues configured".to_string()));
        }
        let mut codes = HashSet::new();
        for league in &self.leagues {
            league.validate(table)?;
            if !codes.insert(league.code.to_ascii_uppercase()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate league code '{}'",
                    league.code
                )));
            }
        }
        Ok(())
    }

    pub fn league(&self, code: &str) -> Option<&LeagueSpec> {
        self.leagues
            .iter()
            .find(|league| league.code.eq_ignore_ascii_case(code))
    }
}
