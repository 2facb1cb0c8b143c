use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    billing::MissingDueLabel,
    domain::{CapacityCell, CapacityMap, SharingType},
    errors::{PgError, Result},
    utils::{
        paths::PathResolver,
        persistence::{ensure_dir, load_json, save_json},
    },
};

const DEFAULT_BACKUP_RETENTION: usize = 3;
const DEFAULT_SESSION_RETENTION: usize = 5;
const DEFAULT_AUTO_BACKUP_DAY: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingLayout {
    pub name: String,
    pub rooms: Vec<String>,
}

impl BuildingLayout {
    fn new(name: &str, rooms: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            rooms: rooms.iter().map(|room| room.to_string()).collect(),
        }
    }
}

/// Static property configuration, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub buildings: Vec<BuildingLayout>,
    pub missing_due_label: MissingDueLabel,
    pub backup_retention: usize,
    pub session_retention: usize,
    pub auto_backup_day: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buildings: vec![
                BuildingLayout::new(
                    "Building-1",
                    &["G01", "101", "102", "103", "201", "202", "203", "301", "302", "303", "401"],
                ),
                BuildingLayout::new(
                    "Building-2",
                    &["G02", "104", "105", "106", "204", "205", "206", "304", "305", "306", "402"],
                ),
            ],
            missing_due_label: MissingDueLabel::default(),
            backup_retention: DEFAULT_BACKUP_RETENTION,
            session_retention: DEFAULT_SESSION_RETENTION,
            auto_backup_day: DEFAULT_AUTO_BACKUP_DAY,
            operator: None,
        }
    }
}

impl Config {
    pub fn building_names(&self) -> Vec<&str> {
        self.buildings.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn rooms_for(&self, building: &str) -> Option<&[String]> {
        self.buildings
            .iter()
            .find(|layout| layout.name == building)
            .map(|layout| layout.rooms.as_slice())
    }

    pub fn is_known_room(&self, building: &str, room_no: &str) -> bool {
        self.rooms_for(building)
            .is_some_and(|rooms| rooms.iter().any(|room| room == room_no))
    }

    /// Every configured cell at its sharing type's default bed count.
    pub fn default_capacity_map(&self) -> CapacityMap {
        let mut map = CapacityMap::new();
        for layout in &self.buildings {
            for room in &layout.rooms {
                for sharing_type in SharingType::ALL {
                    let cell = CapacityCell::new(layout.name.as_str(), room.as_str(), sharing_type);
                    map.set(&cell, sharing_type.default_beds());
                }
            }
        }
        map
    }

    pub fn validate(&self) -> Result<()> {
        if self.buildings.is_empty() {
            return Err(PgError::Config("at least one building is required".into()));
        }
        if let Some(empty) = self.buildings.iter().find(|b| b.rooms.is_empty()) {
            return Err(PgError::Config(format!("building `{}` has no rooms", empty.name)));
        }
        if !(1..=28).contains(&self.auto_backup_day) {
            return Err(PgError::Config(format!(
                "auto backup day {} must be between 1 and 28",
                self.auto_backup_day
            )));
        }
        if self.backup_retention == 0 || self.session_retention == 0 {
            return Err(PgError::Config("retention counts must be positive".into()));
        }
        Ok(())
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the stored configuration, or the defaults when none is saved yet.
    pub fn load(&self) -> Result<Config> {
        let config = load_json::<Config>(&self.path)?.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        save_json(config, &self.path)?;
        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_seed_every_cell() {
        let config = Config::default();
        let map = config.default_capacity_map();
        assert_eq!(map.len(), 22 * 3);
        let cell = CapacityCell::new("Building-2", "402", SharingType::Three);
        assert_eq!(map.get(&cell), Some(3));
        assert!(config.is_known_room("Building-1", "G01"));
        assert!(!config.is_known_room("Building-1", "G02"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp = TempDir::new().expect("temp dir");
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).expect("manager");
        assert_eq!(manager.load().expect("defaults").backup_retention, 3);

        let mut config = Config::default();
        config.operator = Some("warden".into());
        config.missing_due_label = MissingDueLabel::Blank;
        manager.save(&config).expect("save");

        let loaded = manager.load().expect("load");
        assert_eq!(loaded.operator.as_deref(), Some("warden"));
        assert_eq!(loaded.missing_due_label, MissingDueLabel::Blank);
    }

    #[test]
    fn invalid_auto_backup_day_is_rejected() {
        let config = Config {
            auto_backup_day: 31,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(PgError::Config(_))));
    }
}
