//! CP multiplier table: per-level scaling factor applied to base + IV stats.
//!
//! The league evaluator walks this table from the top level down and stops at
//! the first level under the cap, which is only sound while the multiplier
//! rises with level. Every constructor enforces that.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpMultiplierEntry {
    pub level: f64,
    pub multiplier: f64,
}

/// Published multipliers for levels 1.0 through 51.0 in half-level steps.
pub const STANDARD_CP_MULTIPLIERS: [(f64, f64); 101] = [
    (1.0, 0.094),
    (1.5, 0.135137432),
    (2.0, 0.16639787),
    (2.5, 0.192650919),
    (3.0, 0.21573247),
    (3.5, 0.236572661),
    (4.0, 0.25572005),
    (4.5, 0.273530381),
    (5.0, 0.29024988),
    (5.5, 0.306057378),
    (6.0, 0.3210876),
    (6.5, 0.335445036),
    (7.0, 0.34921268),
    (7.5, 0.362457751),
    (8.0, 0.3752356),
    (8.5, 0.387592416),
    (9.0, 0.39956728),
    (9.5, 0.411193551),
    (10.0, 0.4225),
    (10.5, 0.432926409),
    (11.0, 0.44310755),
    (11.5, 0.453059959),
    (12.0, 0.4627984),
    (12.5, 0.472336093),
    (13.0, 0.48168495),
    (13.5, 0.4908558),
    (14.0, 0.49985844),
    (14.5, 0.508701765),
    (15.0, 0.51739395),
    (15.5, 0.525942511),
    (16.0, 0.5343543),
    (16.5, 0.542635738),
    (17.0, 0.5507927),
    (17.5, 0.558830586),
    (18.0, 0.5667545),
    (18.5, 0.574569133),
    (19.0, 0.5822789),
    (19.5, 0.589887907),
    (20.0, 0.5974),
    (20.5, 0.604823665),
    (21.0, 0.6121573),
    (21.5, 0.619404122),
    (22.0, 0.6265671),
    (22.5, 0.633649143),
    (23.0, 0.64065295),
    (23.5, 0.647580967),
    (24.0, 0.65443563),
    (24.5, 0.661219252),
    (25.0, 0.667934),
    (25.5, 0.674581896),
    (26.0, 0.6811649),
    (26.5, 0.687684904),
    (27.0, 0.69414365),
    (27.5, 0.70054287),
    (28.0, 0.7068842),
    (28.5, 0.713169109),
    (29.0, 0.7193991),
    (29.5, 0.725575614),
    (30.0, 0.7317),
    (30.5, 0.734741009),
    (31.0, 0.7377695),
    (31.5, 0.740785594),
    (32.0, 0.74378943),
    (32.5, 0.746781211),
    (33.0, 0.74976104),
    (33.5, 0.752729087),
    (34.0, 0.7556855),
    (34.5, 0.758630368),
    (35.0, 0.76156384),
    (35.5, 0.764486065),
    (36.0, 0.76739717),
    (36.5, 0.770297266),
    (37.0, 0.7731865),
    (37.5, 0.776064962),
    (38.0, 0.77893275),
    (38.5, 0.781790055),
    (39.0, 0.784637),
    (39.5, 0.787473608),
    (40.0, 0.7903),
    (40.5, 0.792803968),
    (41.0, 0.79530001),
    (41.5, 0.797800015),
    (42.0, 0.8003),
    (42.5, 0.802799995),
    (43.0, 0.8053),
    (43.5, 0.8078),
    (44.0, 0.81029999),
    (44.5, 0.812799985),
    (45.0, 0.81529999),
    (45.5, 0.81779999),
    (46.0, 0.82029999),
    (46.5, 0.82279999),
    (47.0, 0.82529999),
    (47.5, 0.82779999),
    (48.0, 0.83029999),
    (48.5, 0.83279999),
    (49.0, 0.83529999),
    (49.5, 0.83779999),
    (50.0, 0.84029999),
    (50.5, 0.84279999),
    (51.0, 0.84529999),
];

/// Doubled level as an integer, so half-levels compare exactly.
pub fn level_key(level: f64) -> i64 {
    (level * 2.0).round() as i64
}

fn is_half_step(level: f64) -> bool {
    level.is_finite() && ((level * 2.0) - (level * 2.0).round()).abs() < 1e-9
}

#[derive(Debug, Clone, PartialEq)]
pub struct CpMultiplierTable {
    /// Ascending by level.
    entries: Vec<CpMultiplierEntry>,
}

impl CpMultiplierTable {
    pub fn standard() -> Self {
        Self {
            entries: STANDARD_CP_MULTIPLIERS
                .iter()
                .map(|&(level, multiplier)| CpMultiplierEntry { level, multiplier })
                .collect(),
        }
    }

    /// Sorts by level and validates shape: half-step levels in [1, 51], no
    /// duplicates, multipliers in (0, 1] and strictly increasing with level.
    pub fn from_entries(mut entries: Vec<CpMultiplierEntry>) -> Result<Self, DataError> {
        const CONTEXT: &str = "cp multiplier table";

        if entries.is_empty() {
            return Err(DataError::InputMissing(
                "cp multiplier table has no rows".to_string(),
            ));
        }

        for entry in &entries {
            if !is_half_step(entry.level) || !(1.0..=51.0).contains(&entry.level) {
                return Err(DataError::invalid_row(
                    CONTEXT,
                    format!("level {} is not a half-step in [1, 51]", entry.level),
                ));
            }
            if !(entry.multiplier > 0.0 && entry.multiplier <= 1.0) {
                return Err(DataError::invalid_row(
                    CONTEXT,
                    format!(
                        "multiplier {} for level {} is outside (0, 1]",
                        entry.multiplier, entry.level
                    ),
                ));
            }
        }

        entries.sort_by(|left, right| left.level.total_cmp(&right.level));

        for pair in entries.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if level_key(lower.level) == level_key(upper.level) {
                return Err(DataError::invalid_row(
                    CONTEXT,
                    format!("duplicate level {}", upper.level),
                ));
            }
            if upper.multiplier <= lower.multiplier {
                return Err(DataError::invalid_row(
                    CONTEXT,
                    format!(
                        "multiplier must increase with level ({} at {} vs {} at {})",
                        lower.multiplier, lower.level, upper.multiplier, upper.level
                    ),
                ));
            }
        }

        Ok(Self { entries })
    }

    /// Load a `level,multiplier` CSV.
    pub fn load_csv(path: &Path) -> Result<Self, DataError> {
        let file = fs::File::open(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_csv_reader(file, &path.display().to_string())
    }

    pub fn from_csv_reader<R: Read>(reader: R, source_name: &str) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let entries = reader
            .deserialize::<CpMultiplierEntry>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| DataError::Csv {
                path: source_name.to_string(),
                source,
            })?;
        Self::from_entries(entries)
    }

    /// Ascending by level.
    pub fn entries(&self) -> &[CpMultiplierEntry] {
        &self.entries
    }

    /// Highest level first; the order the capped-league search walks.
    pub fn descending(&self) -> impl Iterator<Item = &CpMultiplierEntry> {
        self.entries.iter().rev()
    }

    pub fn multiplier(&self, level: f64) -> Option<f64> {
        let key = level_key(level);
        self.entries
            .binary_search_by(|entry| level_key(entry.level).cmp(&key))
            .ok()
            .map(|index| self.entries[index].multiplier)
    }

    pub fn contains_level(&self, level: f64) -> bool {
        is_half_step(level) && self.multiplier(level).is_some()
    }

    pub fn max_level(&self) -> f64 {
        self.entries.last().map(|entry| entry.level).unwrap_or(0.0)
    }

    pub fn min_level(&self) -> f64 {
        self.entries.first().map(|entry| entry.level).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CpMultiplierTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_shape() {
        let table = CpMultiplierTable::standard();
        assert_eq!(table.len(), 101);
        assert_eq!(table.min_level(), 1.0);
        assert_eq!(table.max_level(), 51.0);
        assert_eq!(table.multiplier(50.0), Some(0.84029999));
        assert_eq!(table.multiplier(45.5), Some(0.81779999));
        assert_eq!(table.multiplier(45.25), None);
        assert!(!table.contains_level(51.5));
        // Revalidating the constant must succeed.
        let rebuilt = CpMultiplierTable::from_entries(table.entries().to_vec()).unwrap();
        assert_eq!(rebuilt, table);
    }

    #[test]
    fn descending_starts_at_top_level() {
        let table = CpMultiplierTable::standard();
        let levels: Vec<f64> = table.descending().take(3).map(|e| e.level).collect();
        assert_eq!(levels, vec![51.0, 50.5, 50.0]);
    }

    #[test]
    fn csv_loader_sorts_rows() {
        let csv = "level,multiplier\n2,0.16639787\n1,0.094\n1.5,0.135137432\n";
        let table = CpMultiplierTable::from_csv_reader(csv.as_bytes(), "inline").unwrap();
        let levels: Vec<f64> = table.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn rejects_non_increasing_multiplier() {
        let csv = "level,multiplier\n1,0.5\n1.5,0.4\n";
        let err = CpMultiplierTable::from_csv_reader(csv.as_bytes(), "inline").unwrap_err();
        assert!(err.to_string().contains("must increase"), "{err}");
    }

    #[test]
    fn rejects_duplicates_and_bad_levels() {
        let duplicate = "level,multiplier\n1,0.1\n1.0,0.2\n";
        assert!(CpMultiplierTable::from_csv_reader(duplicate.as_bytes(), "inline").is_err());

        let quarter = "level,multiplier\n1.25,0.1\n";
        assert!(CpMultiplierTable::from_csv_reader(quarter.as_bytes(), "inline").is_err());

        let zero = "level,multiplier\n1,0\n";
        assert!(CpMultiplierTable::from_csv_reader(zero.as_bytes(), "inline").is_err());

        assert!(CpMultiplierTable::from_entries(Vec::new()).is_err());
    }
}
