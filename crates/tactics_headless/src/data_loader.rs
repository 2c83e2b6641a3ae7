//! Content and snapshot loading for the headless runner.
//!
//! The core never touches the filesystem. This module reads opponent
//! catalogs, loot tables and recruit lists from RON files, and persists run
//! snapshots between invocations.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use tactics_core::affinity::Element;
use tactics_core::data::{LootTable, OpponentCatalog, Role, UnitTemplate};
use tactics_core::error::TacticsError;
use tactics_core::run::RunSnapshot;
use tactics_core::stats::{BaseStats, Rank};

/// Opponent catalog file name inside a data directory.
pub const OPPONENTS_FILE: &str = "opponents.ron";
/// Loot table file name inside a data directory.
pub const LOOT_FILE: &str = "loot.ron";
/// Starting recruits file name inside a data directory.
pub const RECRUITS_FILE: &str = "recruits.ron";

/// Errors raised while loading content or snapshots.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File not found.
    #[error("Data file not found: {0}")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("Failed to access data file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse data file: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Content parsed but failed validation in the core.
    #[error(transparent)]
    Invalid(#[from] TacticsError),
    /// Recruit list has nobody in it.
    #[error("Recruit list '{0}' is empty")]
    NoRecruits(String),
}

fn read(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Load and validate an opponent catalog.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<OpponentCatalog, LoadError> {
    let path = path.as_ref();
    let text = read(path)?;
    let catalog = OpponentCatalog::from_ron_str(&path.display().to_string(), &text)?;
    debug!(path = %path.display(), entries = catalog.len(), "Loaded opponent catalog");
    Ok(catalog)
}

/// Load and validate a loot table.
pub fn load_loot_table<P: AsRef<Path>>(path: P) -> Result<LootTable, LoadError> {
    let path = path.as_ref();
    let text = read(path)?;
    let table = LootTable::from_ron_str(&path.display().to_string(), &text)?;
    debug!(path = %path.display(), items = table.items().len(), "Loaded loot table");
    Ok(table)
}

/// Load a non-empty list of unit templates.
pub fn load_recruits<P: AsRef<Path>>(path: P) -> Result<Vec<UnitTemplate>, LoadError> {
    let path = path.as_ref();
    let templates: Vec<UnitTemplate> = ron::from_str(&read(path)?)?;
    if templates.is_empty() {
        return Err(LoadError::NoRecruits(path.display().to_string()));
    }
    Ok(templates)
}

/// Read a run snapshot written by [`save_snapshot`].
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<RunSnapshot, LoadError> {
    let path = path.as_ref();
    let text = read(path)?;
    Ok(RunSnapshot::from_ron_str(&path.display().to_string(), &text)?)
}

/// Write a run snapshot as pretty RON, creating parent directories.
pub fn save_snapshot<P: AsRef<Path>>(path: P, snapshot: &RunSnapshot) -> Result<(), LoadError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, snapshot.to_ron()?)?;
    info!(path = %path.display(), battle = snapshot.battle_index, "Saved run snapshot");
    Ok(())
}

/// Resolve the default data directory.
///
/// Looks in order at:
/// 1. Environment variable `TACTICS_DATA_DIR`
/// 2. `./data/` (repo root)
/// 3. `../../data/` (running from a crate directory)
pub fn default_data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("TACTICS_DATA_DIR") {
        let path = PathBuf::from(dir);
        if path.exists() {
            return Some(path);
        }
    }

    ["data", "../../data"]
        .iter()
        .map(PathBuf::from)
        .find(|path| path.join(OPPONENTS_FILE).exists())
}

/// Starting recruits used when no recruit file is available.
#[must_use]
pub fn builtin_recruits() -> Vec<UnitTemplate> {
    vec![
        UnitTemplate::new(
            "squire",
            "Squire",
            Element::Earth,
            Role::Tank,
            BaseStats::new(95, 16, 12, 10, 0),
        )
        .with_rank(Rank::B),
        UnitTemplate::new(
            "ember_adept",
            "Ember Adept",
            Element::Fire,
            Role::Caster,
            BaseStats::new(65, 15, 5, 12, 36),
        ),
        UnitTemplate::new(
            "tide_cleric",
            "Tide Cleric",
            Element::Water,
            Role::Support,
            BaseStats::new(70, 10, 7, 11, 40),
        ),
    ]
}

/// Everything a run needs from content files.
#[derive(Debug, Clone)]
pub struct GameData {
    /// Opponent catalog.
    pub catalog: OpponentCatalog,
    /// Loot table for item drops.
    pub loot: LootTable,
    /// Templates recruited at the start of a fresh run.
    pub recruits: Vec<UnitTemplate>,
}

impl GameData {
    /// Content compiled into the core.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            catalog: OpponentCatalog::builtin(),
            loot: LootTable::builtin(),
            recruits: builtin_recruits(),
        }
    }

    /// Load from `dir`, falling back to builtin content per missing file.
    ///
    /// A file that exists but fails to parse or validate is an error.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let mut data = Self::builtin();

        let opponents = dir.join(OPPONENTS_FILE);
        if opponents.exists() {
            data.catalog = load_catalog(&opponents)?;
        }
        let loot = dir.join(LOOT_FILE);
        if loot.exists() {
            data.loot = load_loot_table(&loot)?;
        }
        let recruits = dir.join(RECRUITS_FILE);
        if recruits.exists() {
            data.recruits = load_recruits(&recruits)?;
        }

        info!(
            dir = %dir.display(),
            opponents = data.catalog.len(),
            loot_items = data.loot.items().len(),
            recruits = data.recruits.len(),
            "Loaded game data"
        );
        Ok(data)
    }

    /// Load from an explicit directory, else the default one, else builtin.
    pub fn resolve(dir: Option<&Path>) -> Result<Self, LoadError> {
        match dir {
            Some(dir) => Self::load_dir(dir),
            None => match default_data_dir() {
                Some(dir) => Self::load_dir(dir),
                None => {
                    info!("No data directory found, using builtin content");
                    Ok(Self::builtin())
                }
            },
        }
    }
}
