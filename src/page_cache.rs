use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "fc25_crawler";
const CACHE_FILE: &str = "ratings_cache.json";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CacheStore {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    fetched_at: u64,
}

/// Key→payload store for raw page bodies, persisted as one versioned JSON
/// file. A store that cannot be read, parsed, or matched on version loads
/// as empty, so cache damage only ever costs a refetch.
pub struct PageCache {
    path: Option<PathBuf>,
    store: Mutex<CacheStore>,
}

/// Canonical cache key for a page request. Keys are the query string the
/// request would carry, so a key identifies exactly one upstream response.
pub fn page_key(locale: &str, limit: u64, offset: u64) -> String {
    format!("locale={locale}&limit={limit}&offset={offset}")
}

impl PageCache {
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(CACHE_FILE);
        let store = load_store(&path);
        Self {
            path: Some(path),
            store: Mutex::new(store),
        }
    }

    /// A cache that never hits and never writes. Used when no cache
    /// directory can be resolved.
    pub fn disabled() -> Self {
        Self {
            path: None,
            store: Mutex::new(CacheStore::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let store = self.store.lock().expect("page cache lock poisoned");
        store.entries.get(key).map(|entry| entry.body.clone())
    }

    pub fn put(&self, key: &str, body: &str) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let mut store = self.store.lock().expect("page cache lock poisoned");
        store.version = CACHE_VERSION;
        store.entries.insert(
            key.to_string(),
            CacheEntry {
                body: body.to_string(),
                fetched_at: unix_now(),
            },
        );
        // Cache persistence failures degrade to a refetch on the next run.
        let _ = save_store(path, &store);
    }
}

fn load_store(path: &Path) -> CacheStore {
    let Ok(raw) = fs::read_to_string(path) else {
        return CacheStore::default();
    };
    let store = serde_json::from_str::<CacheStore>(&raw).unwrap_or_default();
    if store.version != CACHE_VERSION {
        return CacheStore::default();
    }
    store
}

fn save_store(path: &Path, store: &CacheStore) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let json = serde_json::to_string(store).context("serialize page cache")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).context("write page cache")?;
    fs::rename(&tmp, path).context("swap page cache")?;
    Ok(())
}

pub fn default_cache_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
