use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::debug;

use crate::dataset::{self, Dataset};
use crate::error::LoadError;

/// Identity of a source file's contents as seen by the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSignature {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceSignature {
    pub fn of(path: &Path) -> Result<Self, LoadError> {
        let meta = fs::metadata(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    signature: SourceSignature,
    dataset: Arc<Dataset>,
}

/// Parsed datasets keyed by canonical path. An entry stays valid until the file's
/// length or modification time changes.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<Dataset>, LoadError> {
        let key = cache_key(path);
        let signature = match SourceSignature::of(&key) {
            Ok(sig) => sig,
            Err(err) => {
                self.entries.remove(&key);
                return Err(err);
            }
        };

        if let Some(entry) = self.entries.get(&key)
            && entry.signature == signature
        {
            self.hits += 1;
            debug!("dataset cache hit for {}", key.display());
            return Ok(Arc::clone(&entry.dataset));
        }

        self.misses += 1;
        debug!("dataset cache miss for {}", key.display());
        let dataset = Arc::new(dataset::load_path(&key)?);
        self.entries.insert(
            key,
            CacheEntry {
                signature,
                dataset: Arc::clone(&dataset),
            },
        );
        Ok(dataset)
    }

    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(&cache_key(path)).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

fn cache_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
