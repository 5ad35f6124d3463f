//! Media manifest content store.
//!
//! Media library metadata is exported to a JSON manifest:
//!
//! ```json
//! { "items": [ {
//!     "id": "{3F2504E0-4F89-11D3-9A0C-0305E82C3301}",
//!     "path": "/sitecore/media library/img/photo",
//!     "language": "en",
//!     "versions": [ { "number": 3, "updated": "2013-01-01T00:00:00Z" } ],
//!     "anonymous_read": true,
//!     "tracking": { "ignore": false, "events": ["download"] }
//! } ] }
//! ```

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::content::{CollaboratorError, ContentStore, MediaItem};

/// One version of a media item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestVersion {
    pub number: u32,
    pub updated: DateTime<Utc>,
}

/// Analytics tracking block attached to an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackingInfo {
    pub ignore: bool,
    pub events: Vec<String>,
    pub campaigns: Vec<String>,
    pub profiles: Vec<String>,
}

impl TrackingInfo {
    /// Tracked when not ignored and carrying any event, campaign or profile.
    pub fn is_tracked(&self) -> bool {
        !self.ignore
            && (!self.events.is_empty() || !self.campaigns.is_empty() || !self.profiles.is_empty())
    }
}

/// A media item as exported to the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub id: String,
    pub path: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub versions: Vec<ManifestVersion>,
    #[serde(default = "default_anonymous_read")]
    pub anonymous_read: bool,
    #[serde(default)]
    pub tracking: Option<TrackingInfo>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_anonymous_read() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    items: Vec<ManifestEntry>,
}

/// Concurrent in-memory content store fed from a manifest file.
#[derive(Debug, Default)]
pub struct ManifestContentStore {
    by_path: DashMap<String, Vec<ManifestEntry>>,
    by_id: DashMap<String, ManifestEntry>,
    source: Option<PathBuf>,
}

impl ManifestContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from entries.
    pub fn from_entries(entries: impl IntoIterator<Item = ManifestEntry>) -> Self {
        let store = Self::new();
        store.replace(entries.into_iter().collect());
        store
    }

    /// Load a manifest file; the path is remembered for `reload`.
    pub fn load_from_file(path: &Path) -> Result<Self, CollaboratorError> {
        let manifest = read_manifest(path)?;
        let mut store = Self::from_entries(manifest.items);
        store.source = Some(path.to_path_buf());
        tracing::info!(path = ?path, items = store.len(), "Loaded media manifest");
        Ok(store)
    }

    /// Re-read the manifest file this store was loaded from.
    pub fn reload(&self) -> Result<usize, CollaboratorError> {
        let path = self
            .source
            .as_ref()
            .ok_or_else(|| CollaboratorError::Unavailable("no manifest file configured".into()))?;
        let manifest = read_manifest(path)?;
        self.replace(manifest.items);
        tracing::info!(path = ?path, items = self.len(), "Reloaded media manifest");
        Ok(self.len())
    }

    /// Insert or replace one entry.
    pub fn upsert(&self, entry: ManifestEntry) {
        let key = path_key(&entry.path);
        let mut slot = self.by_path.entry(key).or_default();
        slot.retain(|e| e.id != entry.id || e.language != entry.language);
        slot.push(entry.clone());
        drop(slot);
        self.by_id.insert(entry.id.clone(), entry);
    }

    /// Number of distinct item ids.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Swap in a new entry set. New entries land before stale ones are
    /// removed so concurrent lookups never see an empty store.
    fn replace(&self, entries: Vec<ManifestEntry>) {
        let mut paths = HashSet::new();
        let mut ids = HashSet::new();
        let mut grouped: std::collections::HashMap<String, Vec<ManifestEntry>> = Default::default();

        for entry in entries {
            let key = path_key(&entry.path);
            paths.insert(key.clone());
            ids.insert(entry.id.clone());
            self.by_id.insert(entry.id.clone(), entry.clone());
            grouped.entry(key).or_default().push(entry);
        }
        for (key, group) in grouped {
            self.by_path.insert(key, group);
        }

        self.by_path.retain(|k, _| paths.contains(k));
        self.by_id.retain(|k, _| ids.contains(k));
    }

    fn entry_for(&self, item: &MediaItem) -> Result<ManifestEntry, CollaboratorError> {
        self.by_id
            .get(&item.id)
            .map(|r| r.value().clone())
            .ok_or_else(|| CollaboratorError::Unavailable(format!("unknown item {}", item.id)))
    }
}

impl ContentStore for ManifestContentStore {
    fn resolve_item(
        &self,
        path: &str,
        language: &str,
        version: Option<u32>,
    ) -> Result<Option<MediaItem>, CollaboratorError> {
        let Some(entries) = self.by_path.get(&path_key(path)) else {
            return Ok(None);
        };
        let Some(entry) = entries.iter().find(|e| e.language.eq_ignore_ascii_case(language)) else {
            return Ok(None);
        };

        let selected = match version {
            Some(n) => entry.versions.iter().find(|v| v.number == n),
            None => entry.versions.iter().max_by_key(|v| v.number),
        };

        Ok(selected.map(|v| MediaItem {
            id: entry.id.clone(),
            path: entry.path.clone(),
            language: entry.language.clone(),
            version: v.number,
            updated: v.updated,
        }))
    }

    fn is_publicly_accessible(&self, item: &MediaItem) -> Result<bool, CollaboratorError> {
        Ok(self.entry_for(item)?.anonymous_read)
    }

    fn is_analytics_tracked(&self, item: &MediaItem) -> Result<bool, CollaboratorError> {
        Ok(self
            .entry_for(item)?
            .tracking
            .map(|t| t.is_tracked())
            .unwrap_or(false))
    }
}

fn read_manifest(path: &Path) -> Result<Manifest, CollaboratorError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn path_key(path: &str) -> String {
    path.trim_end_matches('/').to_lowercase()
}
