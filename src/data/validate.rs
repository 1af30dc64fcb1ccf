use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::data::registry::DataRegistry;
use crate::data::species::{normalize_species_name, read_species_rows};
use crate::engine::league::{LeagueSpec, LevelRule};
use crate::error::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }

    pub fn extend(&mut self, other: ValidationReport) {
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Check a species CSV row by row: duplicates and missing stats are errors,
/// zero base stats are warnings. Fails only if the file cannot be read or parsed.
pub fn validate_species_file(path: &Path) -> Result<ValidationReport, DataError> {
    let file = fs::File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let rows = read_species_rows(file, &path.display().to_string())?;

    let mut report = ValidationReport::default();
    let mut seen_ids: HashMap<u32, usize> = HashMap::new();
    let mut seen_names: HashMap<String, usize> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        let context = format!("row[{index}] id={}", row.species_id);

        if let Some(first) = seen_ids.insert(row.species_id, index) {
            report.push(
                ValidationSeverity::Error,
                context.clone(),
                format!("duplicate species_id (first seen at row[{first}])"),
            );
        }

        let name_key = normalize_species_name(&row.species_name);
        if name_key.is_empty() {
            report.push(
                ValidationSeverity::Error,
                context.clone(),
                "missing non-empty 'species_name'",
            );
        } else if let Some(first) = seen_names.insert(name_key, index) {
            report.push(
                ValidationSeverity::Error,
                context.clone(),
                format!(
                    "duplicate species_name '{}' (first seen at row[{first}])",
                    row.species_name
                ),
            );
        }

        let stats = [
            ("base_attack", row.base_attack),
            ("base_defense", row.base_defense),
            ("base_stamina", row.base_stamina),
        ];
        for (field, value) in stats {
            match value {
                None => report.push(
                    ValidationSeverity::Error,
                    format!("{context}.{field}"),
                    "missing value",
                ),
                Some(0) => report.push(
                    ValidationSeverity::Warning,
                    format!("{context}.{field}"),
                    "base stat is zero",
                ),
                Some(_) => {}
            }
        }
    }

    if rows.is_empty() {
        report.push(
            ValidationSeverity::Error,
            path.display().to_string(),
            "species table has no rows",
        );
    }

    Ok(report)
}

/// Cross-check loaded inputs against each other and the league catalogue.
pub fn validate_registry(registry: &DataRegistry, leagues: &[LeagueSpec]) -> ValidationReport {
    let mut report = ValidationReport::default();

    for name in &registry.missing_species {
        report.push(
            ValidationSeverity::Error,
            format!("species '{name}'"),
            "base stats missing; species will not be ranked",
        );
    }

    match &registry.families {
        Some(families) => {
            let mut unknown: Vec<&str> = families
                .all_names()
                .filter(|name| registry.species.by_name(name).is_none())
                .collect();
            unknown.sort_unstable();
            unknown.dedup();
            for name in unknown {
                report.push(
                    ValidationSeverity::Warning,
                    "families",
                    format!("'{name}' is not in the species table"),
                );
            }
        }
        None => report.push(
            ValidationSeverity::Info,
            "families",
            "no family table loaded; pre-evolution leagues rank every species",
        ),
    }

    let table = &registry.cp_multipliers;
    for league in leagues {
        if let LevelRule::Uncapped { fixed_level } = league.rule {
            if !table.contains_level(fixed_level) {
                report.push(
                    ValidationSeverity::Error,
                    format!("league {}", league.code),
                    format!("fixed level {fixed_level} is not in the CP multiplier table"),
                );
            }
        }
    }

    report.push(
        ValidationSeverity::Info,
        "cp multipliers",
        format!(
            "{} levels from {} to {}",
            table.len(),
            table.min_level(),
            table.max_level()
        ),
    );

    report
}
