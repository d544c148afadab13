//! Model update checks, throttled through a small JSON cache.
//!
//! The cache lives at `<store>/.model_cache.json`:
//!
//! ```json
//! { "update_check_tts_models/en/ljspeech/vits": { "timestamp": 1700000000.0, "updates_available": false } }
//! ```
//!
//! A model is checked at most once per hour unless forced.  Entries older
//! than seven days are dropped by [`UpdateChecker::cleanup_cache`].  Cache
//! I/O problems are logged and otherwise ignored.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ModelStore;

pub const CACHE_FILE_NAME: &str = ".model_cache.json";

const CHECK_INTERVAL: Duration = Duration::from_secs(3600);
const CACHE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 3600);

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn cache_key(model_name: &str) -> String {
    format!("update_check_{model_name}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote side
// ─────────────────────────────────────────────────────────────────────────────

/// Source of upstream model metadata.
pub trait RemoteCatalog {
    /// Publication time of the newest upstream version, if known.
    fn last_modified(&self, model_name: &str) -> Result<Option<SystemTime>>;
}

/// Catalog used when no upstream metadata source is reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineCatalog;

impl RemoteCatalog for OfflineCatalog {
    fn last_modified(&self, _model_name: &str) -> Result<Option<SystemTime>> {
        Ok(None)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache entries
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub timestamp: f64,
    pub updates_available: bool,
}

/// Raw cache contents.  Kept as JSON values so foreign keys survive a
/// load/save cycle untouched.
pub type Cache = BTreeMap<String, Value>;

// ─────────────────────────────────────────────────────────────────────────────
// UpdateChecker
// ─────────────────────────────────────────────────────────────────────────────

pub struct UpdateChecker<'a> {
    store: &'a ModelStore,
    cache_file: PathBuf,
}

impl<'a> UpdateChecker<'a> {
    pub fn new(store: &'a ModelStore) -> Self {
        Self {
            store,
            cache_file: store.root().join(CACHE_FILE_NAME),
        }
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn load_cache(&self) -> Cache {
        if !self.cache_file.exists() {
            return Cache::new();
        }
        let parsed: Result<Cache> = fs::read(&self.cache_file)
            .context("read failed")
            .and_then(|bytes| serde_json::from_slice(&bytes).context("invalid JSON"));
        match parsed {
            Ok(cache) => cache,
            Err(e) => {
                log::warn!("Failed to load cache {}: {e:#}", self.cache_file.display());
                Cache::new()
            }
        }
    }

    pub fn save_cache(&self, cache: &Cache) {
        let result = (|| -> Result<()> {
            if let Some(parent) = self.cache_file.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.cache_file, serde_json::to_vec_pretty(cache)?)?;
            Ok(())
        })();
        if let Err(e) = result {
            log::warn!("Failed to save cache {}: {e:#}", self.cache_file.display());
        }
    }

    /// Whether a newer version of `model_name` is available upstream.
    ///
    /// Models that are not downloaded yet report `false` and are not cached.
    pub fn check_for_updates(
        &self,
        model_name: &str,
        catalog: &dyn RemoteCatalog,
        force: bool,
    ) -> bool {
        let mut cache = self.load_cache();
        let key = cache_key(model_name);

        if !force {
            let recent = cache
                .get(&key)
                .and_then(|v| serde_json::from_value::<CheckRecord>(v.clone()).ok())
                .filter(|r| now_secs() - r.timestamp < CHECK_INTERVAL.as_secs_f64());
            if let Some(record) = recent {
                log::info!("Recently checked for updates, skipping");
                return record.updates_available;
            }
        }

        let Some(local) = self.store.local_model(model_name) else {
            log::info!("Model {model_name} not found locally");
            return false;
        };

        let updates_available = match catalog.last_modified(model_name) {
            Ok(Some(remote)) => {
                let newer = local.last_modified.map_or(true, |l| remote > l);
                if newer {
                    log::info!("Updates available for {model_name}");
                } else {
                    log::info!("Model {model_name} is up to date");
                }
                newer
            }
            Ok(None) => {
                log::info!("Could not check for updates (offline or no upstream metadata)");
                false
            }
            Err(e) => {
                log::warn!("Failed to check remote model info: {e:#}");
                false
            }
        };

        let record = CheckRecord { timestamp: now_secs(), updates_available };
        if let Ok(v) = serde_json::to_value(record) {
            cache.insert(key, v);
        }
        self.save_cache(&cache);

        updates_available
    }

    /// Drop entries whose `timestamp` is older than seven days.
    /// Returns how many were removed.
    pub fn cleanup_cache(&self) -> usize {
        if !self.cache_file.exists() {
            return 0;
        }
        let mut cache = self.load_cache();
        let cutoff = now_secs() - CACHE_MAX_AGE.as_secs_f64();
        let before = cache.len();

        cache.retain(|_, v| {
            v.get("timestamp")
                .and_then(Value::as_f64)
                .map_or(true, |ts| ts >= cutoff)
        });

        let removed = before - cache.len();
        self.save_cache(&cache);
        log::info!("Cleaned up {removed} old cache entries");
        removed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
