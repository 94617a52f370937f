use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use polyspell_core::LocaleCode;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const ALTERNATES_KEY: &str = "spellchecker-alternates";

/// Lightweight string key-value storage, in the spirit of a browser's
/// `localStorage`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Keeps all keys in one JSON object file, rewritten atomically on `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(error) => {
                return Err(error).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", self.path.display()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = lock(&self.guard);
        match self.read_all() {
            Ok(mut entries) => entries.remove(key),
            Err(error) => {
                warn!("{error:#}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = lock(&self.guard);
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());

        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        let mut temp_file = NamedTempFile::new_in(parent)?;
        serde_json::to_writer(&mut temp_file, &entries)?;
        temp_file.flush()?;
        temp_file
            .persist(&self.path)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// Remembers which locale actually loaded for a requested hint, so repeat
/// switches skip the fallback chain.
pub struct AlternatesMemo {
    store: Arc<dyn KeyValueStore>,
    entries: Mutex<HashMap<String, LocaleCode>>,
}

impl AlternatesMemo {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = match store.get(ALTERNATES_KEY) {
            None => HashMap::new(),
            Some(raw) => match serde_json::from_str::<HashMap<String, LocaleCode>>(&raw) {
                Ok(entries) => entries,
                Err(error) => {
                    warn!("discarding unreadable alternates memo: {error}");
                    if let Err(error) = store.set(ALTERNATES_KEY, "{}") {
                        warn!("failed to reset alternates memo: {error:#}");
                    }
                    HashMap::new()
                }
            },
        };
        debug!(entries = entries.len(), "loaded alternates memo");

        Self {
            store,
            entries: Mutex::new(entries),
        }
    }

    pub fn get(&self, hint: &str) -> Option<LocaleCode> {
        lock(&self.entries).get(hint).cloned()
    }

    pub fn remember(&self, hint: &str, locale: &LocaleCode) {
        let mut entries = lock(&self.entries);
        if entries.get(hint) == Some(locale) {
            return;
        }
        entries.insert(hint.to_string(), locale.clone());
        self.save(&entries);
    }

    pub fn forget(&self, hint: &str) {
        let mut entries = lock(&self.entries);
        if entries.remove(hint).is_some() {
            self.save(&entries);
        }
    }

    fn save(&self, entries: &HashMap<String, LocaleCode>) {
        let result = serde_json::to_string(entries)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.store.set(ALTERNATES_KEY, &raw));
        if let Err(error) = result {
            warn!("failed to persist alternates memo: {error:#}");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
