//! On-disk cache backed by the `sled` embedded database.

use super::{Cache, CacheHit, Entry};
use crate::signal::RawData;
use crate::{Error, Result};
use chrono::Utc;
use sled::Db;
use std::path::Path;

/// Persistent cache; values are JSON-encoded entries with their store time.
#[derive(Clone)]
pub struct SledCache {
    db: Db,
}

impl SledCache {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| Error::CacheError(format!("mkdir error: {e}")))?;
        let db = sled::open(dir).map_err(|e| Error::CacheError(format!("sled open error: {e}")))?;
        Ok(Self { db })
    }

    /// Open under the configured directory, or the platform cache dir.
    pub fn open_default(configured: Option<&Path>) -> Result<Self> {
        match configured {
            | Some(dir) => Self::open(dir),
            | None => {
                let dir = crate::utils::app_cache_dir().map_err(|e| Error::CacheError(e.to_string()))?;
                Self::open(dir.join("responses"))
            }
        }
    }

    fn read(&self, key: &str) -> Result<Option<Entry>> {
        let Some(val) = self
            .db
            .get(key.as_bytes())
            .map_err(|e| Error::CacheError(format!("sled get error: {e}")))?
        else {
            return Ok(None);
        };
        let entry = serde_json::from_slice(&val)
            .map_err(|e| Error::CacheError(format!("cache decode error: {e}")))?;
        Ok(Some(entry))
    }

    fn write(&self, key: &str, value: &RawData) -> Result<()> {
        let entry = Entry { stored_at: Utc::now(), data: value.clone() };
        let bytes = serde_json::to_vec(&entry)?;
        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| Error::CacheError(format!("sled write error: {e}")))?;
        self.db.flush().map_err(|e| Error::CacheError(format!("sled flush error: {e}")))?;
        Ok(())
    }
}

impl Cache for SledCache {
    fn get(&self, key: &str) -> Option<CacheHit> {
        match self.read(key) {
            | Ok(entry) => entry.map(|e| e.into_hit(Utc::now())),
            | Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }

    fn put(&self, key: &str, value: &RawData) {
        if let Err(e) = self.write(key, value) {
            log::warn!("{}", e);
        }
    }
}
