use std::env;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::dashboard::{RefreshGranularity, SortKey};
use crate::database::SchemaDriftPolicy;

pub const CONFIG_FILE: &str = "stickies-config.toml";
pub const DB_FILE: &str = "notes.db";

/// Where the database file lives when no explicit path is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DbLocation {
    /// `notes.db` in the process working directory.
    #[default]
    WorkingDir,
    /// `resources/notes.db` under the working directory.
    Resources,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub location: DbLocation,
    pub db_path: Option<PathBuf>,
    pub on_schema_drift: SchemaDriftPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub refresh: RefreshGranularity,
    pub default_sort: SortKey,
    pub preview_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub data_dir: PathBuf,
    pub store: StoreConfig,
    pub dashboard: DashboardConfig,
    pub export: ExportConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: DbLocation::WorkingDir,
            db_path: None,
            on_schema_drift: SchemaDriftPolicy::Recreate,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh: RefreshGranularity::Second,
            default_sort: SortKey::Priority,
            preview_chars: 50,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stickies");

        Self {
            store: StoreConfig::default(),
            dashboard: DashboardConfig::default(),
            export: ExportConfig::default(),
            log_level: "info".to_string(),
            data_dir,
        }
    }
}

impl AppConfig {
    /// Load configuration from file or environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(config_content) = std::fs::read_to_string(path) {
            config = toml::from_str(&config_content)
                .map_err(|e| anyhow!("Failed to parse config file: {}", e))?;
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(location) = env::var("STICKIES_DB_LOCATION") {
            self.store.location = match location.trim() {
                "working_dir" => DbLocation::WorkingDir,
                "resources" => DbLocation::Resources,
                other => return Err(anyhow!("Invalid database location: {}", other)),
            };
        }

        if let Ok(db_path) = env::var("STICKIES_DB_PATH") {
            self.store.db_path = Some(PathBuf::from(db_path));
        }

        if let Ok(refresh) = env::var("STICKIES_REFRESH") {
            self.dashboard.refresh = refresh.parse()?;
        }

        if let Ok(export_path) = env::var("STICKIES_EXPORT_PATH") {
            self.export.path = Some(PathBuf::from(export_path));
        }

        if let Ok(log_level) = env::var("STICKIES_LOG_LEVEL") {
            self.log_level = log_level;
        }

        Ok(())
    }

    /// Resolved database file path.
    pub fn db_path(&self) -> PathBuf {
        if let Some(path) = &self.store.db_path {
            return path.clone();
        }
        match self.store.location {
            DbLocation::WorkingDir => PathBuf::from(DB_FILE),
            DbLocation::Resources => Path::new("resources").join(DB_FILE),
        }
    }

    pub fn export_path(&self) -> PathBuf {
        self.export
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("notes.csv"))
    }

    /// Ensure the database's parent directory exists
    pub fn prepare_dirs(&self) -> Result<()> {
        if let Some(parent) = self.db_path().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Save current configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        std::fs::write(path, config_content)
            .map_err(|e| anyhow!("Failed to write config file: {}", e))?;

        Ok(())
    }
}
