//! Error taxonomy for static inputs, evaluation, the result store and configuration.

use thiserror::Error;

use crate::engine::iv::IvTriple;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("unable to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("unable to parse json '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid row in {context}: {message}")]
    InvalidRow { context: String, message: String },

    #[error("input missing: {0}")]
    InputMissing(String),
}

impl DataError {
    pub fn invalid_row(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRow {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Why a single IV triple (or a whole species/league unit) could not be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EvalError {
    /// Only the one triple is dropped; the rest of the table is still assembled.
    #[error("no level keeps CP at or under {cap} for IVs {iv}")]
    NoFeasibleLevel { cap: u32, iv: IvTriple },

    #[error("input missing: no CP multiplier for level {level}")]
    MissingLevel { level: f64 },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed partition '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("failed to write {league} table for species {species_id}: {reason}")]
    WriteFailure {
        species_id: u32,
        league: String,
        reason: String,
    },

    #[error("corrupt partition '{path}': {reason}")]
    Corrupt { path: String, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Whole-run failures; per-unit problems are collected in the run summary instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("league code '{0}' is configured more than once")]
    DuplicateLeague(String),
}
