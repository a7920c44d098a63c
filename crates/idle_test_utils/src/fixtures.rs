//! Test fixtures and helpers.
//!
//! Pre-built catalogs and sessions for consistent testing. The sample
//! catalog is the shipped `assets/data/catalog.ron`, so every test that
//! uses it also checks that the shipped data still loads.

use idle_core::prelude::*;

/// Unix time every fixture session starts at.
pub const T0: u64 = 1_700_000_000;

/// Shipped game data.
pub const SAMPLE_CATALOG_RON: &str = include_str!("../../../assets/data/catalog.ron");

/// Shipped engine tuning.
pub const SAMPLE_ENGINE_RON: &str = include_str!("../../../assets/data/engine.ron");

/// Parse the shipped catalog.
///
/// # Panics
///
/// Panics if the shipped catalog no longer parses or validates.
#[must_use]
pub fn sample_catalog() -> BuildingCatalog {
    match BuildingCatalog::from_ron_str(SAMPLE_CATALOG_RON, "assets/data/catalog.ron") {
        Ok(catalog) => catalog,
        Err(e) => panic!("Shipped catalog is invalid: {e}"),
    }
}

/// Parse the shipped engine tuning.
///
/// # Panics
///
/// Panics if the shipped tuning no longer parses.
#[must_use]
pub fn sample_config() -> EngineConfig {
    match EngineConfig::from_ron_str(SAMPLE_ENGINE_RON, "assets/data/engine.ron") {
        Ok(config) => config,
        Err(e) => panic!("Shipped engine config is invalid: {e}"),
    }
}

/// Two-building catalog with round numbers, for exact arithmetic.
///
/// - `farm`: cost 100 × 1.15^L, income 10 × 1.1^L, free to unlock,
///   one income module `harvest`.
/// - `workshop`: cost 1000 × 1.2^L, income 50 × 1.1^L, unlock 500,
///   capacity module `crew` (hire 100 × 1.2^n) and speed module `rush`.
///
/// # Panics
///
/// Panics if the hand-built data fails validation.
#[must_use]
pub fn simple_catalog() -> BuildingCatalog {
    let data = GameData {
        buildings: vec![
            BuildingConfig::new("farm", 100.0, 1.15, 10.0, 1.1)
                .with_modules(1, vec![ModuleTemplate::Income(IncomeModule::new("harvest"))]),
            BuildingConfig::new("workshop", 1_000.0, 1.2, 50.0, 1.1)
                .with_unlock_cost(500.0)
                .with_modules(
                    2,
                    vec![
                        ModuleTemplate::Capacity(CapacityModule::new("crew", 2, 1, 100.0, 1.2)),
                        ModuleTemplate::Speed(
                            SpeedModule::new("rush", 1.0, 1.1, 5.0).with_boost(2.0, 30.0),
                        ),
                    ],
                ),
        ],
        prestige_bonuses: vec![
            PrestigeBonus::new("bushido", BonusEffect::IncomeMultiplier, 0.5),
            PrestigeBonus::new("zen", BonusEffect::OfflineEarnings, 1.0),
            PrestigeBonus::new("veteran", BonusEffect::TroopCapacity, 3.0).requiring(2),
        ],
    };
    match BuildingCatalog::new(data) {
        Ok(catalog) => catalog,
        Err(e) => panic!("Simple catalog is invalid: {e}"),
    }
}

/// Start a session on `catalog` with default tuning and an in-memory store.
///
/// # Panics
///
/// Panics if the session cannot start.
#[must_use]
pub fn session_with(catalog: BuildingCatalog, store: MemoryStore, now: u64) -> Session {
    match Session::start(catalog, EngineConfig::default(), Box::new(store), now) {
        Ok(session) => session,
        Err(e) => panic!("Failed to start session: {e}"),
    }
}

/// Fresh session over [`simple_catalog`] at [`T0`].
#[must_use]
pub fn simple_session() -> Session {
    session_with(simple_catalog(), MemoryStore::new(), T0)
}

/// Fresh session over [`sample_catalog`] at [`T0`].
#[must_use]
pub fn sample_session() -> Session {
    session_with(sample_catalog(), MemoryStore::new(), T0)
}

/// [`simple_session`] with `farm` unlocked and upgraded to `farm_level`.
///
/// # Panics
///
/// Panics if the starting gold cannot pay for the upgrades.
#[must_use]
pub fn farming_session(farm_level: u32) -> Session {
    let mut session = simple_session();
    if let Err(e) = session.unlock_building("farm") {
        panic!("Failed to unlock farm: {e}");
    }
    while session.data("farm").map_or(0, |d| d.level) < farm_level {
        if let Err(e) = session.upgrade_building("farm") {
            panic!("Failed to upgrade farm: {e}");
        }
    }
    session
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_data_loads() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.contains("castle"));
        assert_eq!(catalog.bonuses().count(), 6);
        assert_eq!(sample_config(), EngineConfig::default());
    }

    #[test]
    fn test_farming_session() {
        let session = farming_session(3);
        assert_eq!(session.data("farm").unwrap().level, 3);
        // unlock is free; upgrades cost 115 + 132.25
        assert!((session.ledger().gold() - 752.75).abs() < 1e-9);
    }
}
