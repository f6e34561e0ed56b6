use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CACHE_FILE: &str = ".trends_scout_cache.json";

/// Property -> value ids for one entity
pub type Claims = BTreeMap<String, Vec<String>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheData {
    #[serde(default)]
    terms: BTreeMap<String, String>,
    #[serde(default)]
    claims: BTreeMap<String, Claims>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

/// On-disk cache of knowledge-base lookups.
///
/// Loaded once at startup and written back by [`Cache::save`]. A cache dropped with
/// unsaved changes writes itself out.
#[derive(Debug)]
pub struct Cache {
    path: PathBuf,
    data: CacheData,
    dirty: bool,
}

impl Cache {
    /// `$HOME/.trends_scout_cache.json`, or the working directory without a home
    pub fn default_path() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join(CACHE_FILE)
    }

    /// Read the cache at `path`. A missing file is an empty cache; a corrupt one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("Corrupt cache file {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cache file yet");
                CacheData::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        info!(
            path = %path.display(),
            terms = data.terms.len(),
            entities = data.claims.len(),
            labels = data.labels.len(),
            "Loaded lookup cache"
        );
        Ok(Self {
            path,
            data,
            dirty: false,
        })
    }

    /// Cached id for a search term. An empty id records a term with no match.
    pub fn term(&self, term: &str) -> Option<&str> {
        self.data.terms.get(term).map(String::as_str)
    }

    pub fn insert_term(&mut self, term: &str, id: &str) {
        self.data.terms.insert(term.to_string(), id.to_string());
        self.dirty = true;
    }

    pub fn claims(&self, id: &str) -> Option<&Claims> {
        self.data.claims.get(id)
    }

    pub fn insert_claims(&mut self, id: &str, claims: Claims) {
        self.data.claims.insert(id.to_string(), claims);
        self.dirty = true;
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.data.labels.get(id).map(String::as_str)
    }

    pub fn insert_label(&mut self, id: &str, label: &str) {
        self.data.labels.insert(id.to_string(), label.to_string());
        self.dirty = true;
    }

    #[cfg(test)]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the cache if it changed since loading or the last save
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        self.dirty = false;
        info!(path = %self.path.display(), "💾 Saved lookup cache");
        Ok(())
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.save() {
                warn!(error = %e, "Failed to save lookup cache");
            }
        }
    }
}
