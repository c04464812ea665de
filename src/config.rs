use crate::intake::DrinkKind;
use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".DailyDrops";
const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_QUICK_ADD_AMOUNTS: [u32; 3] = [250, 500, 750];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Json,
    Sqlite,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Ok(StorageBackend::Json),
            "sqlite" => Ok(StorageBackend::Sqlite),
            _ => bail!("storage_backend must be json or sqlite"),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            StorageBackend::Json => "json",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub api_port: u16,
    pub quick_add_amounts: Vec<u32>,
    pub default_drink: DrinkKind,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            storage_backend: StorageBackend::Json,
            data_dir: root.join("data"),
            db_path: root.join("db").join("dailydrops.db"),
            api_port: 7891,
            quick_add_amounts: DEFAULT_QUICK_ADD_AMOUNTS.to_vec(),
            default_drink: DrinkKind::Water,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        match self.storage_backend {
            StorageBackend::Json => {
                fs::create_dir_all(&self.data_dir).with_context(|| {
                    format!("Failed to create data directory: {}", self.data_dir.display())
                })?;
            }
            StorageBackend::Sqlite => {
                if let Some(parent) = self.db_path.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create DB directory: {}", parent.display())
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Quick-add slots are 1-based.
    pub fn quick_add_amount(&self, slot: usize) -> Result<u32> {
        slot.checked_sub(1)
            .and_then(|index| self.quick_add_amounts.get(index).copied())
            .with_context(|| {
                format!(
                    "Quick-add slot {slot} is not configured. Available: {}",
                    join_amounts(&self.quick_add_amounts)
                )
            })
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "storage_backend" => {
                self.storage_backend = StorageBackend::parse(value)?;
            }
            "data_dir" => {
                self.data_dir = expand_home(value);
            }
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "quick_add_amounts" => {
                let amounts = value
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| {
                        part.parse::<u32>()
                            .ok()
                            .filter(|amount| *amount > 0)
                            .ok_or_else(|| anyhow!("quick_add_amounts must be positive numbers"))
                    })
                    .collect::<Result<Vec<_>>>()?;

                if amounts.is_empty() {
                    bail!("quick_add_amounts requires at least one amount");
                }
                self.quick_add_amounts = amounts;
            }
            "default_drink" => {
                self.default_drink = value.parse::<DrinkKind>()?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: storage_backend|storage.backend, data_dir|storage.data_dir, db_path|storage.db_path, api_port|api.port, quick_add_amounts|quick_add.amounts, default_drink|drink.default"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "storage_backend" => Some(self.storage_backend.as_str().to_string()),
            "data_dir" => Some(self.data_dir.display().to_string()),
            "db_path" => Some(self.db_path.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "quick_add_amounts" => Some(join_amounts(&self.quick_add_amounts)),
            "default_drink" => Some(self.default_drink.name().to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "storage_backend" | "storage.backend" => "storage_backend",
        "data_dir" | "storage.data_dir" => "data_dir",
        "db_path" | "storage.db_path" => "db_path",
        "api_port" | "api.port" => "api_port",
        "quick_add_amounts" | "quick_add.amounts" => "quick_add_amounts",
        "default_drink" | "drink.default" => "default_drink",
        _ => key,
    }
}

fn join_amounts(amounts: &[u32]) -> String {
    amounts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
