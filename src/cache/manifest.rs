//! Build manifest for incremental static generation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Manifest file, relative to the site directory
const MANIFEST_FILE: &str = ".blog-cache/manifest.json";

/// What the previous build wrote
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildManifest {
    /// Version of the manifest format
    pub version: u32,
    /// Hash of the rendered HTML, keyed by slug
    pub pages: HashMap<String, u64>,
    /// Hash of the rendered home page
    pub index_hash: u64,
}

impl BuildManifest {
    /// Current manifest format version
    const VERSION: u32 = 1;

    /// Load the manifest from disk, or start an empty one
    pub fn load(base_dir: &Path) -> Self {
        let path = base_dir.join(MANIFEST_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(manifest) = serde_json::from_str::<BuildManifest>(&content) {
                if manifest.version == Self::VERSION {
                    return manifest;
                }
                tracing::info!("Manifest version mismatch, rebuilding everything");
            }
        }
        Self::new()
    }

    /// Save the manifest to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let path = base_dir.join(MANIFEST_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Remove the manifest file
    pub fn clear(base_dir: &Path) -> Result<()> {
        let dir = base_dir.join(".blog-cache");
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            tracing::info!("Deleted: {:?}", dir);
        }
        Ok(())
    }

    /// Compare freshly rendered pages against this manifest
    pub fn diff(&self, rendered: &HashMap<String, u64>) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (slug, hash) in rendered {
            match self.pages.get(slug) {
                Some(old) if old == hash => changes.unchanged.push(slug.clone()),
                _ => changes.changed.push(slug.clone()),
            }
        }
        for slug in self.pages.keys() {
            if !rendered.contains_key(slug) {
                changes.deleted.push(slug.clone());
            }
        }

        changes.changed.sort();
        changes.unchanged.sort();
        changes.deleted.sort();
        changes
    }
}

/// Slugs grouped by what the next build must do with them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    /// Get summary of changes for logging
    pub fn summary(&self) -> String {
        if self.changed.is_empty() && self.deleted.is_empty() {
            return "no changes".to_string();
        }
        let mut parts = Vec::new();
        if !self.changed.is_empty() {
            parts.push(format!("{} pages written", self.changed.len()));
        }
        if !self.deleted.is_empty() {
            parts.push(format!("{} pages removed", self.deleted.len()));
        }
        if !self.unchanged.is_empty() {
            parts.push(format!("{} unchanged", self.unchanged.len()));
        }
        parts.join(", ")
    }
}

/// Calculate a hash for rendered content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}
