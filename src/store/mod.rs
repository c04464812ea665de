pub mod file;
pub mod queries;
pub mod sqlite;

use crate::config::{Config, StorageBackend};
use crate::intake::WaterIntakeRecord;
use crate::intake::goal::UserProfile;
use crate::intake::manager::ProfileProvider;
use crate::intake::migrate::RawRecord;
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

pub const RECORDS_KEY: &str = "dailyDrops_waterIntakeData";
pub const PROFILE_KEY: &str = "dailyDrops_userProfile";

/// String key-value slot storage. Values are whole serialized blobs.
pub trait KvBackend {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn describe(&self) -> String;
}

pub type SharedBackend = Arc<dyn KvBackend + Send + Sync>;

pub fn open_backend(config: &Config) -> Result<SharedBackend> {
    let backend: SharedBackend = match config.storage_backend {
        StorageBackend::Json => Arc::new(file::FileBackend::open(&config.data_dir)?),
        StorageBackend::Sqlite => Arc::new(sqlite::SqliteBackend::open(&config.db_path)?),
    };

    Ok(backend)
}

/// Load/save of the whole record collection under [`RECORDS_KEY`].
/// Failures are logged and never propagated.
#[derive(Clone)]
pub struct RecordStore {
    backend: SharedBackend,
}

impl RecordStore {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    pub fn load(&self) -> Vec<RawRecord> {
        let content = match self.backend.get(RECORDS_KEY) {
            Ok(Some(content)) => content,
            Ok(None) => return Vec::new(),
            Err(error) => {
                warn!(error = %error, key = RECORDS_KEY, "failed to read intake records");
                return Vec::new();
            }
        };

        let values = match serde_json::from_str::<Vec<Value>>(&content) {
            Ok(values) => values,
            Err(error) => {
                warn!(error = %error, key = RECORDS_KEY, "stored intake records are corrupt, starting empty");
                return Vec::new();
            }
        };

        values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| {
                serde_json::from_value::<RawRecord>(value)
                    .map_err(|error| {
                        warn!(error = %error, index, "dropping unreadable intake record");
                    })
                    .ok()
            })
            .collect()
    }

    pub fn save(&self, records: &[WaterIntakeRecord]) {
        let written = serde_json::to_string(records)
            .context("Failed to serialize intake records")
            .and_then(|content| self.backend.set(RECORDS_KEY, &content));

        if let Err(error) = written {
            error!(error = %error, key = RECORDS_KEY, "failed to persist intake records");
        }
    }
}

#[derive(Clone)]
pub struct ProfileStore {
    backend: SharedBackend,
}

impl ProfileStore {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    pub fn load(&self) -> Option<UserProfile> {
        let content = match self.backend.get(PROFILE_KEY) {
            Ok(content) => content?,
            Err(error) => {
                warn!(error = %error, key = PROFILE_KEY, "failed to read user profile");
                return None;
            }
        };

        serde_json::from_str(&content)
            .map_err(|error| {
                warn!(error = %error, key = PROFILE_KEY, "stored user profile is corrupt, ignoring it");
                error
            })
            .ok()
    }

    pub fn save(&self, profile: &UserProfile) -> Result<()> {
        let content = serde_json::to_string(profile).context("Failed to serialize user profile")?;
        self.backend.set(PROFILE_KEY, &content)
    }

    pub fn clear(&self) -> Result<()> {
        self.backend.remove(PROFILE_KEY)
    }
}

impl ProfileProvider for ProfileStore {
    fn current_profile(&self) -> Option<UserProfile> {
        self.load()
    }
}

#[cfg(test)]
pub mod memory {
    use super::KvBackend;
    use anyhow::{Result, anyhow, bail};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryBackend {
        slots: Mutex<HashMap<String, String>>,
        fail_writes: bool,
    }

    impl MemoryBackend {
        pub fn with_value(key: &str, value: &str) -> Self {
            let backend = Self::default();
            backend
                .set(key, value)
                .expect("seed memory backend");
            backend
        }

        pub fn failing_writes() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }
    }

    impl KvBackend for MemoryBackend {
        fn get(&self, key: &str) -> Result<Option<String>> {
            let slots = self.slots.lock().map_err(|_| anyhow!("memory backend poisoned"))?;
            Ok(slots.get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes {
                bail!("quota exceeded");
            }
            let mut slots = self.slots.lock().map_err(|_| anyhow!("memory backend poisoned"))?;
            slots.insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<()> {
            let mut slots = self.slots.lock().map_err(|_| anyhow!("memory backend poisoned"))?;
            slots.remove(key);
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }
}
