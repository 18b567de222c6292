use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::debug;

use super::IdentityError;

/// Minimal string key/value persistence, the local equivalent of browser
/// local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), IdentityError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk. Other keys in the file are preserved on write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Map<String, Value>, IdentityError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(IdentityError::Corrupt(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(IdentityError::Corrupt(format!("{}: {}", self.path.display(), e))),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError> {
        let map = self.read_all()?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), IdentityError> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let serialized = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| IdentityError::Corrupt(e.to_string()))?;

        // Write then rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Persisted key {} to {}", key, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let mut store = FileStore::new(&path);
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert!(path.exists());
        assert_eq!(FileStore::new(&path).get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_file_store_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let mut store = FileStore::new(&path);
        store.set("convo_user_id", "user_1").unwrap();

        assert_eq!(store.get("theme").unwrap(), Some("dark".to_string()));
        assert_eq!(store.get("convo_user_id").unwrap(), Some("user_1".to_string()));
    }

    #[test]
    fn test_file_store_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get("k"), Err(IdentityError::Corrupt(_))));
    }
}
