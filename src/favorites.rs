use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::channels::Channel;

pub const FAVORITES_KEY: &str = "mrxTvFavorites";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// String-to-string map persisted as one JSON object.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> anyhow::Result<HashMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("corrupt store file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", self.path.display())),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub name: String,
    pub stream: String,
}

impl From<&Favorite> for Channel {
    fn from(fav: &Favorite) -> Self {
        Channel {
            name: fav.name.clone(),
            logo: String::new(),
            stream: fav.stream.clone(),
        }
    }
}

/// Favorites keyed by channel name, stored under [`FAVORITES_KEY`].
///
/// Reads never fail: a missing or corrupt entry is an empty list. Writes
/// replace the whole entry and only log on failure.
pub struct Favorites<S> {
    store: S,
}

impl<S: KeyValueStore> Favorites<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get_favorites(&self) -> Vec<Favorite> {
        let raw = match self.store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!("Error reading favorites: {:#}", e);
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            error!("Error parsing favorites: {}", e);
            Vec::new()
        })
    }

    pub fn save_favorites(&mut self, favorites: &[Favorite]) {
        let result = serde_json::to_string(favorites)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.store.set(FAVORITES_KEY, json));
        if let Err(e) = result {
            error!("Error saving favorites: {:#}", e);
        }
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.get_favorites().iter().any(|f| f.name == name)
    }

    /// Removes the favorite named `name` or appends it. Returns the new list.
    pub fn toggle_favorite(&mut self, name: &str, stream: &str) -> Vec<Favorite> {
        let mut favorites = self.get_favorites();
        match favorites.iter().position(|f| f.name == name) {
            Some(idx) => {
                favorites.remove(idx);
            }
            None => favorites.push(Favorite {
                name: name.to_string(),
                stream: stream.to_string(),
            }),
        }
        self.save_favorites(&favorites);
        favorites
    }
}
