//! Loading game data from disk.
//!
//! A data directory holds `catalog.ron` (required) and `engine.ron`
//! (optional, defaults apply when absent). All validation happens at load
//! time.

use std::path::Path;

use idle_core::prelude::{BuildingCatalog, EngineConfig, GameData, GameError};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// File name of the building catalog inside a data directory.
pub const CATALOG_FILE: &str = "catalog.ron";

/// File name of the engine tuning inside a data directory.
pub const ENGINE_FILE: &str = "engine.ron";

/// Errors that can occur while loading data or running a tool.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Failed to read file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON file.
    #[error("Failed to parse RON file '{path}': {source}")]
    ParseError {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Data validation failed.
    #[error("Validation failed for '{path}': {errors:?}")]
    ValidationError {
        /// File that failed validation.
        path: String,
        /// List of validation errors.
        errors: Vec<String>,
    },

    /// Engine error.
    #[error(transparent)]
    Engine(#[from] GameError),
}

/// Result type for data loading operations.
pub type DataLoadResult<T> = Result<T, DataLoadError>;

/// Everything loaded from a data directory.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Validated catalog.
    pub catalog: BuildingCatalog,
    /// Engine tuning.
    pub config: EngineConfig,
}

/// Read and parse a RON file without validating it.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_ron<T: DeserializeOwned>(path: &Path) -> DataLoadResult<T> {
    let path_str = path.display().to_string();

    let contents = std::fs::read_to_string(path).map_err(|e| DataLoadError::IoError {
        path: path_str.clone(),
        source: e,
    })?;

    ron::from_str(&contents).map_err(|e| DataLoadError::ParseError {
        path: path_str,
        source: e,
    })
}

/// Load and validate game data from a RON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_game_data(path: &Path) -> DataLoadResult<GameData> {
    let data: GameData = read_ron(path)?;

    let errors = data.validate();
    if !errors.is_empty() {
        return Err(DataLoadError::ValidationError {
            path: path.display().to_string(),
            errors,
        });
    }

    tracing::info!(
        "Loaded {} buildings and {} prestige bonuses from {}",
        data.buildings.len(),
        data.prestige_bonuses.len(),
        path.display()
    );

    Ok(data)
}

/// Load and validate engine tuning, falling back to defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed or
/// validated.
pub fn load_engine_config(path: &Path) -> DataLoadResult<EngineConfig> {
    if !path.exists() {
        tracing::warn!("Engine config not found at {}, using defaults", path.display());
        return Ok(EngineConfig::default());
    }

    let config: EngineConfig = read_ron(path)?;
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(DataLoadError::ValidationError {
            path: path.display().to_string(),
            errors,
        });
    }
    Ok(config)
}

/// Load a whole data directory.
///
/// # Errors
///
/// Returns an error if the catalog is missing or any file fails to load.
pub fn load_data_directory(dir: &Path) -> DataLoadResult<LoadedData> {
    let data = load_game_data(&dir.join(CATALOG_FILE))?;
    let config = load_engine_config(&dir.join(ENGINE_FILE))?;
    let catalog = BuildingCatalog::new(data)?;
    Ok(LoadedData { catalog, config })
}

#[cfg(test)]
mod tests {
    use super::*;
    use idle_test_utils::fixtures::{SAMPLE_CATALOG_RON, SAMPLE_ENGINE_RON};

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CATALOG_FILE, SAMPLE_CATALOG_RON);
        write(dir.path(), ENGINE_FILE, SAMPLE_ENGINE_RON);

        let loaded = load_data_directory(dir.path()).unwrap();
        assert_eq!(loaded.catalog.len(), 4);
        assert_eq!(loaded.config, EngineConfig::default());
    }

    #[test]
    fn test_engine_config_optional() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CATALOG_FILE, SAMPLE_CATALOG_RON);
        let loaded = load_data_directory(dir.path()).unwrap();
        assert_eq!(loaded.config, EngineConfig::default());
    }

    #[test]
    fn test_partial_engine_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ENGINE_FILE, "EngineConfig(starting_gold: 50.0)");
        let config = load_engine_config(&dir.path().join(ENGINE_FILE)).unwrap();
        assert_eq!(config.starting_gold, 50.0);
        assert_eq!(config.offline_cap_secs, 86_400);
    }

    #[test]
    fn test_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_data_directory(dir.path()),
            Err(DataLoadError::IoError { .. })
        ));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CATALOG_FILE, "GameData(buildings: [");
        let err = load_data_directory(dir.path()).unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { .. }));
        assert!(err.to_string().contains(CATALOG_FILE));
    }

    #[test]
    fn test_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            CATALOG_FILE,
            r#"GameData(buildings: [BuildingConfig(id: "hut", base_cost: 10.0, cost_multiplier: 0.5, base_income: 1.0, income_multiplier: 1.1)])"#,
        );
        assert!(matches!(
            load_data_directory(dir.path()),
            Err(DataLoadError::ValidationError { .. })
        ));
    }
}
