//! Cache module
//!
//! [`PageCache`] keeps rendered post pages in memory for the server and
//! decides when a page is due for regeneration. [`BuildManifest`] records
//! what the last static build wrote so the next one can skip unchanged
//! pages and remove pages of deleted posts.

mod manifest;

pub use manifest::{hash_content, BuildManifest, ChangeSet};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A rendered page and when it was produced
#[derive(Debug, Clone)]
struct CachedPage {
    html: Arc<str>,
    generated_at: Instant,
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Younger than the revalidation window
    Fresh(Arc<str>),
    /// Older than the window; still served, but due for regeneration
    Stale(Arc<str>),
    /// Never generated (or evicted)
    Miss,
}

/// Rendered pages keyed by slug, with per-slug regeneration claims
pub struct PageCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedPage>>,
    in_flight: Mutex<HashSet<String>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Lookup {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(page) if page.generated_at.elapsed() < self.ttl => {
                Lookup::Fresh(page.html.clone())
            }
            Some(page) => Lookup::Stale(page.html.clone()),
            None => Lookup::Miss,
        }
    }

    pub async fn insert(&self, key: &str, html: String) -> Arc<str> {
        let html: Arc<str> = Arc::from(html);
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CachedPage {
                html: html.clone(),
                generated_at: Instant::now(),
            },
        );
        html
    }

    pub async fn remove(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Claim the regeneration of `key`. `false` if one is already running.
    pub fn try_begin_revalidation(&self, key: &str) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.insert(key.to_string())
    }

    pub fn end_revalidation(&self, key: &str) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(key);
    }
}
