//! Persisted set of ids that have already been notified.
//!
//! On disk the set is a sorted, indented JSON array of strings. The older
//! `{"id": true}` object layout is still accepted when loading.

use log::{debug, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredIds {
    List(Vec<String>),
    Map(BTreeMap<String, bool>),
}

impl From<StoredIds> for BTreeSet<String> {
    fn from(stored: StoredIds) -> Self {
        match stored {
            StoredIds::List(ids) => ids.into_iter().collect(),
            StoredIds::Map(ids) => ids
                .into_iter()
                .filter_map(|(id, sent)| sent.then_some(id))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentIdStore {
    path: PathBuf,
    ids: BTreeSet<String>,
}

impl SentIdStore {
    /// Empty store that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: BTreeSet::new(),
        }
    }

    /// Load the store; a missing or unreadable file yields an empty set
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No sent-id store at {}, starting empty", path.display());
                return Self::new(path);
            }
            Err(e) => {
                warn!("Failed to read sent-id store {}: {}, starting empty", path.display(), e);
                return Self::new(path);
            }
        };

        let ids = match serde_json::from_str::<StoredIds>(&contents) {
            Ok(stored) => stored.into(),
            Err(e) => {
                warn!("Corrupt sent-id store {}: {}, starting empty", path.display(), e);
                BTreeSet::new()
            }
        };

        debug!("Loaded {} sent ids from {}", ids.len(), path.display());
        Self { path, ids }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `true` if the id was not already present
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Overwrite the file with the current set, creating parent directories
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.ids)?;
        fs::write(&self.path, json + "\n")?;

        debug!("Saved {} sent ids to {}", self.ids.len(), self.path.display());
        Ok(())
    }
}
