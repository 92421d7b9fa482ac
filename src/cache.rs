use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use crate::item::ContentItem;

pub const DEFAULT_TTL_SECS: i64 = 300;

/// Source of "now" for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Vec<ContentItem>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.fetched_at)
    }
}

#[derive(Debug, Clone)]
pub struct IssueCache {
    ttl: TimeDelta,
    entries: BTreeMap<String, CacheEntry>,
}

impl Default for IssueCache {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(DEFAULT_TTL_SECS))
    }
}

impl IssueCache {
    pub fn new(ttl: TimeDelta) -> Self {
        Self { ttl, entries: BTreeMap::new() }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Fresh entry for `key`, or `None` when absent or `now - fetched_at >= ttl`.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|e| e.age(now) < self.ttl)
    }

    pub fn put(&mut self, key: &str, data: Vec<ContentItem>, now: DateTime<Utc>) {
        self.entries
            .insert(key.to_string(), CacheEntry { data, fetched_at: now });
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
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

    pub fn entries(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Load entries persisted by [`IssueCache::save`]. A missing file is an
    /// empty cache; an unreadable one is discarded with a warning.
    pub fn load(path: &Path, ttl: TimeDelta) -> io::Result<Self> {
        let mut cache = Self::new(ttl);
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(cache),
            Err(e) => return Err(e),
        };
        match serde_json::from_str::<BTreeMap<String, CacheEntry>>(&raw) {
            Ok(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "loaded cache");
                cache.entries = entries;
            }
            Err(err) => warn!(path = %path.display(), %err, "ignoring corrupt cache file"),
        }
        Ok(cache)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn items() -> Vec<ContentItem> {
        vec![ContentItem::new(1, "a", "b", &["note"], t0())]
    }

    #[test]
    fn test_entry_valid_strictly_before_ttl() {
        let mut cache = IssueCache::new(TimeDelta::seconds(300));
        cache.put("k", items(), t0());
        assert!(cache.get("k", t0() + TimeDelta::seconds(299)).is_some());
        assert!(cache.get("k", t0() + TimeDelta::seconds(300)).is_none());
        assert!(cache.get("other", t0()).is_none());
    }

    #[test]
    fn test_put_replaces_entry() {
        let mut cache = IssueCache::default();
        cache.put("k", items(), t0());
        cache.put("k", Vec::new(), t0() + TimeDelta::seconds(10));
        let entry = cache.get("k", t0() + TimeDelta::seconds(20)).unwrap();
        assert!(entry.data.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let mut cache = IssueCache::default();
        cache.put("a", items(), t0());
        cache.put("b", items(), t0());
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("cache.json");
        let mut cache = IssueCache::default();
        cache.put("k", items(), t0());
        cache.save(&path).unwrap();

        let loaded = IssueCache::load(&path, TimeDelta::seconds(60)).unwrap();
        assert_eq!(loaded.ttl(), TimeDelta::seconds(60));
        let entry = loaded.get("k", t0()).unwrap();
        assert_eq!(entry.data[0].title, "a");
    }

    #[test]
    fn test_load_missing_or_corrupt_is_empty() {
        let temp = TempDir::new().unwrap();
        let missing = IssueCache::load(&temp.path().join("none.json"), TimeDelta::seconds(1)).unwrap();
        assert!(missing.is_empty());

        let path = temp.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let corrupt = IssueCache::load(&path, TimeDelta::seconds(1)).unwrap();
        assert!(corrupt.is_empty());
    }
}
