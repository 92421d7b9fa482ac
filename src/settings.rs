use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TOKEN_KEY: &str = "github_token";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Read the store at `path`; a missing file is an empty store.
    pub fn load(path: &Path) -> io::Result<Self> {
        let mut values = BTreeMap::new();
        match fs::read_to_string(path) {
            Ok(raw) => {
                for line in raw.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    match line.split_once('=') {
                        Some((key, value)) => {
                            values.insert(key.trim().to_string(), value.trim().to_string());
                        }
                        None => debug!(path = %path.display(), line, "skipping malformed settings line"),
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Ok(Self { path: path.to_path_buf(), values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.trim().to_string());
        self.save()
    }

    pub fn remove(&mut self, key: &str) -> io::Result<bool> {
        let removed = self.values.remove(key).is_some();
        self.save()?;
        Ok(removed)
    }

    fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body: String = self
            .values
            .iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect();
        fs::write(&self.path, body)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove_persist() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings");
        let mut settings = Settings::load(&path).unwrap();
        assert_eq!(settings.get(TOKEN_KEY), None);

        settings.set(TOKEN_KEY, " ghp_abc ").unwrap();
        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded.get(TOKEN_KEY), Some("ghp_abc"));

        let mut reloaded = reloaded;
        assert!(reloaded.remove(TOKEN_KEY).unwrap());
        assert!(!reloaded.remove(TOKEN_KEY).unwrap());
        assert_eq!(Settings::load(&path).unwrap().get(TOKEN_KEY), None);
    }

    #[test]
    fn test_load_skips_comments_and_junk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings");
        fs::write(&path, "# comment\n\nno equals sign\ntheme = dark\n").unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.get("theme"), Some("dark"));
        assert_eq!(settings.get("no equals sign"), None);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("ghp_1234567890"), "**********7890");
        assert_eq!(mask_secret("abc"), "***");
    }
}
