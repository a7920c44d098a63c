//! Data validation utilities.

use std::path::Path;

use idle_core::prelude::{EngineConfig, GameData};
use serde::Serialize;

use crate::loader::{read_ron, DataLoadError, DataLoadResult, CATALOG_FILE, ENGINE_FILE};

/// Outcome of validating a data directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Building types found.
    pub buildings: usize,
    /// Module templates found across all buildings.
    pub modules: usize,
    /// Prestige bonuses found.
    pub prestige_bonuses: usize,
    /// Every problem found, prefixed with its file.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Whether no problems were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate all RON data files in a directory.
///
/// Unlike the loader, this collects every problem instead of stopping at
/// the first invalid file. Files that fail to read or parse are still
/// hard errors.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed.
pub fn validate_data_directory(path: &Path) -> DataLoadResult<ValidationReport> {
    let mut report = ValidationReport::default();

    let catalog_path = path.join(CATALOG_FILE);
    let data: GameData = read_ron(&catalog_path)?;
    report.buildings = data.buildings.len();
    report.modules = data.buildings.iter().map(|b| b.modules.len()).sum();
    report.prestige_bonuses = data.prestige_bonuses.len();
    report
        .errors
        .extend(data.validate().into_iter().map(|e| format!("{CATALOG_FILE}: {e}")));

    let engine_path = path.join(ENGINE_FILE);
    if engine_path.exists() {
        let config: EngineConfig = read_ron(&engine_path)?;
        report
            .errors
            .extend(config.validate().into_iter().map(|e| format!("{ENGINE_FILE}: {e}")));
    } else {
        tracing::debug!("No {ENGINE_FILE} in {}, defaults apply", path.display());
    }

    for error in &report.errors {
        tracing::warn!("{error}");
    }

    Ok(report)
}

/// Validate a directory and turn problems into an error.
///
/// # Errors
///
/// Returns [`DataLoadError::ValidationError`] listing every problem.
pub fn ensure_valid(path: &Path) -> DataLoadResult<ValidationReport> {
    let report = validate_data_directory(path)?;
    if report.is_valid() {
        Ok(report)
    } else {
        Err(DataLoadError::ValidationError {
            path: path.display().to_string(),
            errors: report.errors,
        })
    }
}
