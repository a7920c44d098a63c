//! Persisted progression snapshot and the stores that hold it.
//!
//! A snapshot is captured only between steps, so it never observes a
//! building mid-update. The engine never saves on a timer: the session
//! saves explicitly after upgrades, unlocks and prestiges.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingData;
use crate::catalog::BuildingCatalog;
use crate::error::{GameError, Result};
use crate::ledger::PermanentMultipliers;

/// Snapshot format version for compatibility.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to restore a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version.
    pub version: u32,
    /// Gold balance.
    pub gold: f64,
    /// Honor balance.
    pub honor: f64,
    /// Samurai counter.
    pub samurai: u32,
    /// Peasant counter.
    pub peasants: u32,
    /// Per-building state, in catalog order.
    pub buildings: Vec<BuildingData>,
    /// Unix time (seconds) of the last checkpoint. `None` for a new game.
    pub last_checkpoint_time: Option<u64>,
    /// Completed prestiges.
    pub total_prestiges: u32,
    /// See [`PermanentMultipliers::global_income`].
    pub global_income_multiplier: f64,
    /// See [`PermanentMultipliers::building_cost_reduction`].
    pub building_cost_reduction: f64,
    /// See [`PermanentMultipliers::offline_earnings`].
    pub offline_earnings_multiplier: f64,
    /// See [`PermanentMultipliers::troop_training_speed`].
    pub troop_training_speed_multiplier: f64,
    /// See [`PermanentMultipliers::extra_troop_capacity`].
    pub extra_troop_capacity: u32,
    /// See [`PermanentMultipliers::auto_train_speed`].
    pub auto_train_speed_multiplier: f64,
}

impl Snapshot {
    /// Snapshot of a brand new game: every building locked at level 0.
    #[must_use]
    pub fn new_game(catalog: &BuildingCatalog, starting_gold: f64) -> Self {
        let multipliers = PermanentMultipliers::default();
        Self {
            version: SNAPSHOT_VERSION,
            gold: starting_gold,
            honor: 0.0,
            samurai: 0,
            peasants: 0,
            buildings: catalog.buildings().map(BuildingData::new_locked).collect(),
            last_checkpoint_time: None,
            total_prestiges: 0,
            global_income_multiplier: multipliers.global_income,
            building_cost_reduction: multipliers.building_cost_reduction,
            offline_earnings_multiplier: multipliers.offline_earnings,
            troop_training_speed_multiplier: multipliers.troop_training_speed,
            extra_troop_capacity: multipliers.extra_troop_capacity,
            auto_train_speed_multiplier: multipliers.auto_train_speed,
        }
    }

    /// Permanent multipliers stored in this snapshot.
    #[must_use]
    pub const fn multipliers(&self) -> PermanentMultipliers {
        PermanentMultipliers {
            global_income: self.global_income_multiplier,
            building_cost_reduction: self.building_cost_reduction,
            offline_earnings: self.offline_earnings_multiplier,
            troop_training_speed: self.troop_training_speed_multiplier,
            extra_troop_capacity: self.extra_troop_capacity,
            auto_train_speed: self.auto_train_speed_multiplier,
        }
    }

    /// Overwrite the multiplier fields.
    pub fn set_multipliers(&mut self, multipliers: &PermanentMultipliers) {
        self.global_income_multiplier = multipliers.global_income;
        self.building_cost_reduction = multipliers.building_cost_reduction;
        self.offline_earnings_multiplier = multipliers.offline_earnings;
        self.troop_training_speed_multiplier = multipliers.troop_training_speed;
        self.extra_troop_capacity = multipliers.extra_troop_capacity;
        self.auto_train_speed_multiplier = multipliers.auto_train_speed;
    }

    /// Find a building's state.
    #[must_use]
    pub fn building(&self, id: &str) -> Option<&BuildingData> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Persistence(format!("Failed to serialize snapshot: {e}")))
    }

    /// Deserialize from bytes, checking the format version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::Persistence(format!("Failed to deserialize snapshot: {e}")))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    /// Serialize to pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::Persistence(format!("Failed to serialize snapshot: {e}")))
    }

    /// Parse from RON, checking the format version.
    pub fn from_ron(text: &str) -> Result<Self> {
        let snapshot: Self = ron::from_str(text)
            .map_err(|e| GameError::Persistence(format!("Failed to parse snapshot: {e}")))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> Result<()> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(GameError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: self.version,
            })
        }
    }
}

/// Storage collaborator for snapshots.
pub trait Persistence {
    /// Load the stored snapshot. `Ok(None)` means nothing has been saved yet.
    fn load(&mut self) -> Result<Option<Snapshot>>;

    /// Store a snapshot, replacing any previous one.
    fn save(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// In-memory store, mainly for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Option<Snapshot>,
    saves: usize,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with a snapshot.
    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            saves: 0,
        }
    }

    /// Last saved snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Number of successful saves.
    #[must_use]
    pub const fn save_count(&self) -> usize {
        self.saves
    }
}

impl Persistence for MemoryStore {
    fn load(&mut self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.snapshot = Some(snapshot.clone());
        self.saves += 1;
        Ok(())
    }
}

/// On-disk encoding of a [`FileStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// Human-readable RON.
    Ron,
    /// Compact bincode.
    Bincode,
}

impl SaveFormat {
    /// RON for `.ron` files, bincode otherwise.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Self::Ron,
            _ => Self::Bincode,
        }
    }
}

/// Snapshot store backed by a single file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    format: SaveFormat,
}

impl FileStore {
    /// Store at `path`, picking the format from the extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = SaveFormat::from_path(&path);
        Self { path, format }
    }

    /// File backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encoding used by this store.
    #[must_use]
    pub const fn format(&self) -> SaveFormat {
        self.format
    }
}

impl Persistence for FileStore {
    fn load(&mut self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let snapshot = match self.format {
            SaveFormat::Ron => {
                let text = std::fs::read_to_string(&self.path).map_err(|e| {
                    GameError::Persistence(format!("Failed to read save file: {e}"))
                })?;
                Snapshot::from_ron(&text)?
            }
            SaveFormat::Bincode => {
                let bytes = std::fs::read(&self.path).map_err(|e| {
                    GameError::Persistence(format!("Failed to read save file: {e}"))
                })?;
                Snapshot::from_bytes(&bytes)?
            }
        };
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                GameError::Persistence(format!("Failed to create save directory: {e}"))
            })?;
        }
        let bytes = match self.format {
            SaveFormat::Ron => snapshot.to_ron()?.into_bytes(),
            SaveFormat::Bincode => snapshot.to_bytes()?,
        };
        std::fs::write(&self.path, bytes)
            .map_err(|e| GameError::Persistence(format!("Failed to write save file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BuildingConfig, GameData};

    fn catalog() -> BuildingCatalog {
        BuildingCatalog::new(GameData {
            buildings: vec![
                BuildingConfig::new("farm", 10.0, 1.1, 1.0, 1.05).with_unlock_cost(0.0),
                BuildingConfig::new("mine", 500.0, 1.2, 8.0, 1.1).with_unlock_cost(250.0),
            ],
            prestige_bonuses: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_new_game_snapshot() {
        let snapshot = Snapshot::new_game(&catalog(), 1_000.0);
        assert_eq!(snapshot.gold, 1_000.0);
        assert_eq!(snapshot.buildings.len(), 2);
        assert!(snapshot.buildings.iter().all(|b| !b.is_unlocked && b.level == 0));
        assert_eq!(snapshot.building("mine").unwrap().unlock_cost, 250.0);
        assert_eq!(snapshot.last_checkpoint_time, None);
        assert_eq!(snapshot.multipliers(), PermanentMultipliers::default());
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut snapshot = Snapshot::new_game(&catalog(), 1_000.0);
        snapshot.total_prestiges = 3;
        let restored = Snapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_version_mismatch() {
        let mut snapshot = Snapshot::new_game(&catalog(), 1_000.0);
        snapshot.version = SNAPSHOT_VERSION + 1;
        let text = snapshot.to_ron().unwrap();
        assert!(matches!(
            Snapshot::from_ron(&text),
            Err(GameError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SaveFormat::from_path(Path::new("save.ron")), SaveFormat::Ron);
        assert_eq!(SaveFormat::from_path(Path::new("save.bin")), SaveFormat::Bincode);
        assert_eq!(SaveFormat::from_path(Path::new("save")), SaveFormat::Bincode);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["slot.ron", "slot.bin"] {
            let mut store = FileStore::new(dir.path().join("saves").join(name));
            assert!(store.load().unwrap().is_none());

            let mut snapshot = Snapshot::new_game(&catalog(), 42.5);
            snapshot.last_checkpoint_time = Some(1_700_000_000);
            store.save(&snapshot).unwrap();

            assert_eq!(store.load().unwrap(), Some(snapshot));
        }
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slot.ron");
        std::fs::write(&path, "not a snapshot").unwrap();
        let mut store = FileStore::new(path);
        assert!(matches!(store.load(), Err(GameError::Persistence(_))));
    }
}
