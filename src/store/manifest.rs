use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::parallel::batch::{RunSummary, UnitStatus};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUnit {
    pub species_id: u32,
    pub league_code: String,
    pub reason: String,
}

/// Record of the last full recompute, written next to the partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when every unit was written.
    pub complete: bool,
    pub units_total: usize,
    pub units_completed: usize,
    pub units_failed: usize,
    pub infeasible_total: usize,
    pub failed_units: Vec<FailedUnit>,
}

impl RunManifest {
    pub fn from_summary(summary: &RunSummary) -> Self {
        let failed_units = summary
            .outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                UnitStatus::Failed { reason } => Some(FailedUnit {
                    species_id: outcome.species_id,
                    league_code: outcome.league_code.clone(),
                    reason: reason.clone(),
                }),
                UnitStatus::Completed => None,
            })
            .collect();

        Self {
            run_id: summary.run_id,
            started_at: summary.started_at,
            finished_at: summary.finished_at,
            complete: summary.units_failed == 0,
            units_total: summary.units_total,
            units_completed: summary.units_completed,
            units_failed: summary.units_failed,
            infeasible_total: summary.infeasible_total,
            failed_units,
        }
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    pub fn write(&self, dir: &Path) -> Result<(), StoreError> {
        let path = Self::path_in(dir);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(self)?;

        fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(&json)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, &path))
            .map_err(|source| StoreError::io(&path, source))
    }

    /// None when no run has been recorded in `dir`.
    pub fn read(dir: &Path) -> Result<Option<Self>, StoreError> {
        let path = Self::path_in(dir);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&path).map_err(|source| StoreError::io(&path, source))?;
        Ok(Some(serde_json::from_slice(&raw)?))
    }
}
