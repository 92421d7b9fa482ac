use chrono::TimeDelta;
use std::error::Error;
use std::path::PathBuf;

use crate::cache::DEFAULT_TTL_SECS;
use crate::fetch::RepoRef;

pub const DEFAULT_OWNER: &str = "p0kks";
pub const DEFAULT_REPO: &str = "p0kks.me";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_WEB_BASE: &str = "https://github.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dir: PathBuf,
    pub repo: RepoRef,
    pub cache_ttl: TimeDelta,
    /// `FOLIO_TOKEN`; takes precedence over the stored token.
    pub env_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; unset and empty values use defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dir = match var("FOLIO_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = var("HOME").ok_or("HOME not set; set FOLIO_DIR explicitly")?;
                PathBuf::from(home).join(".folio")
            }
        };

        let cache_ttl = match var("FOLIO_CACHE_TTL") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|s| *s >= 0)
                .and_then(TimeDelta::try_seconds)
                .ok_or_else(|| {
                    format!("FOLIO_CACHE_TTL must be a non-negative number of seconds, got {raw:?}")
                })?,
            None => TimeDelta::seconds(DEFAULT_TTL_SECS),
        };

        let repo = RepoRef {
            api_base: var("FOLIO_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            web_base: var("FOLIO_WEB_BASE").unwrap_or_else(|| DEFAULT_WEB_BASE.to_string()),
            owner: var("FOLIO_OWNER").unwrap_or_else(|| DEFAULT_OWNER.to_string()),
            name: var("FOLIO_REPO").unwrap_or_else(|| DEFAULT_REPO.to_string()),
        };

        Ok(Self {
            dir,
            repo,
            cache_ttl,
            env_token: var("FOLIO_TOKEN").map(|t| t.trim().to_string()),
        })
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.join("cache.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join("settings")
    }

    pub fn site_path(&self) -> PathBuf {
        self.dir.join("site").join("index.html")
    }
}
