//! Response cache keyed by SHA-256 of (backend identity, temperature, prompt).
//!
//! Cache I/O is best-effort: a read or write failure is logged and treated
//! as a miss, never as a pipeline error.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Storage seam for cached responses.
pub trait CacheStore: Send + Sync {
    /// The cached response text for `key`, if present and readable.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `entry` under `key`, overwriting any previous value.
    fn set(&self, key: &str, entry: &CacheEntry);
}

/// Hex SHA-256 of `"{identity}:{temperature}:{prompt}"`.
pub fn cache_key(identity: &str, temperature: f32, prompt: &str) -> String {
    let material = format!("{identity}:{temperature:?}:{prompt}");
    format!("{:x}", Sha256::digest(material.as_bytes()))
}

const PROMPT_PREVIEW_CHARS: usize = 200;

/// One cached response plus enough context to eyeball the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The prompt, cut to 200 characters plus `...` when longer.
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub response: String,
}

impl CacheEntry {
    pub fn new(prompt: &str, model: &str, temperature: f32, response: &str) -> Self {
        let prompt = if prompt.chars().count() > PROMPT_PREVIEW_CHARS {
            let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
            format!("{preview}...")
        } else {
            prompt.to_string()
        };
        Self {
            prompt,
            model: model.to_string(),
            temperature,
            response: response.to_string(),
        }
    }
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Cache directory {} unavailable: {}", dir.display(), e);
        }
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn write_entry(&self, key: &str, entry: &CacheEntry) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let body = serde_json::to_vec_pretty(entry).map_err(io::Error::other)?;

        // Temp file in the same directory, then rename: readers never see a
        // half-written entry.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&body)?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    /// Delete every cached entry. Returns how many files were removed.
    pub fn clear(&self) -> io::Result<usize> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        debug!("Cleared {} cache entries from {}", removed, self.dir.display());
        Ok(removed)
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => {
                debug!("Cache hit {}", &key[..key.len().min(12)]);
                Some(entry.response)
            }
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn set(&self, key: &str, entry: &CacheEntry) {
        if let Err(e) = self.write_entry(key, entry) {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }
}
