//! services/api/src/adapters/json_store.rs
//!
//! File-backed `KeyValueStore`: every key is one `<dir>/<key>.json` file.
//! Reads and writes block, so handlers reach it through `AppState::with_stores`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mind_brain_core::ports::{KeyValueStore, PortError, PortResult};
use tracing::info;

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens the store, creating `dir` when it does not exist yet.
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Using JSON file storage");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PortResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(PortError::Unexpected(format!("Invalid storage key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }

    /// Writes through a temporary file so readers never see a half-written blob.
    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(|e| PortError::Unexpected(e.to_string()))?;
        fs::rename(&staging, &path).map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("todos-data").unwrap(), None);
    }

    #[test]
    fn values_land_in_one_file_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.set("thoughts-data", "[]").unwrap();
        store.set("thoughts-data", r#"[{"id":"1","content":"x"}]"#).unwrap();

        let on_disk = fs::read_to_string(dir.path().join("thoughts-data.json")).unwrap();
        assert_eq!(on_disk, r#"[{"id":"1","content":"x"}]"#);
        assert_eq!(store.get("thoughts-data").unwrap().as_deref(), Some(on_disk.as_str()));
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.set("../escape", "[]").is_err());
    }
}
