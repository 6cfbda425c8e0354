use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::keys::SettingKey;

/// Local persisted settings. Writes cannot fail from the caller's point of view; an
/// implementation that loses a write logs it instead.
pub trait SettingsStore: Send + Sync {
    fn load(&self, key: SettingKey) -> Option<String>;
    fn save(&self, key: SettingKey, value: &str);
    fn clear(&self, key: SettingKey);
    fn entries(&self) -> BTreeMap<SettingKey, String>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply(values: &mut BTreeMap<SettingKey, String>, key: SettingKey, value: &str) {
    if value.trim().is_empty() {
        values.remove(&key);
    } else {
        values.insert(key, value.to_string());
    }
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<SettingKey, String>>,
}

impl MemorySettingsStore {
    pub fn with_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (SettingKey, String)>,
    {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self, key: SettingKey) -> Option<String> {
        lock(&self.values).get(&key).cloned()
    }

    fn save(&self, key: SettingKey, value: &str) {
        apply(&mut lock(&self.values), key, value);
    }

    fn clear(&self, key: SettingKey) {
        lock(&self.values).remove(&key);
    }

    fn entries(&self) -> BTreeMap<SettingKey, String> {
        lock(&self.values).clone()
    }
}

/// JSON file holding `{ "canonical_name": "value" }`, rewritten on every change.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<SettingKey, String>>,
}

impl FileSettingsStore {
    /// Opens the file if it exists. A missing or unreadable file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => parse_file(&path, &raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "settings file unreadable, starting empty");
                BTreeMap::new()
            }
        };

        debug!(path = %path.display(), entries = values.len(), "settings store opened");
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn persist(&self, values: &BTreeMap<SettingKey, String>) {
        let document: BTreeMap<&str, &str> = values
            .iter()
            .map(|(key, value)| (key.name(), value.as_str()))
            .collect();

        let result = serde_json::to_vec_pretty(&document)
            .map_err(std::io::Error::from)
            .and_then(|bytes| {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&self.path, bytes)
            });

        if let Err(err) = result {
            warn!(path = %self.path.display(), error = %err, "failed to persist settings");
        }
    }
}

fn parse_file(path: &Path, raw: &str) -> BTreeMap<SettingKey, String> {
    let document: BTreeMap<String, String> = match serde_json::from_str(raw) {
        Ok(document) => document,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "settings file is not a string map, ignoring");
            return BTreeMap::new();
        }
    };

    document
        .into_iter()
        .filter_map(|(name, value)| match name.parse::<SettingKey>() {
            Ok(key) if !value.trim().is_empty() => Some((key, value)),
            Ok(_) => None,
            Err(err) => {
                warn!(path = %path.display(), %err, "dropping unknown setting from file");
                None
            }
        })
        .collect()
}

impl SettingsStore for FileSettingsStore {
    fn load(&self, key: SettingKey) -> Option<String> {
        lock(&self.values).get(&key).cloned()
    }

    fn save(&self, key: SettingKey, value: &str) {
        let mut guard = lock(&self.values);
        apply(&mut guard, key, value);
        self.persist(&guard);
    }

    fn clear(&self, key: SettingKey) {
        let mut guard = lock(&self.values);
        if guard.remove(&key).is_some() {
            self.persist(&guard);
        }
    }

    fn entries(&self) -> BTreeMap<SettingKey, String> {
        lock(&self.values).clone()
    }
}
