use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::ClientError;

/// Persistent string key-value store backing the session.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// JSON object on disk, rewritten on every change.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// With `recover`, an unreadable file counts as empty and the flag is set.
    fn load(&self, recover: bool) -> Result<(BTreeMap<String, String>, bool), ClientError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((BTreeMap::new(), false)),
            Err(e) => return Err(store_err("read", &self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok((BTreeMap::new(), false));
        }
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok((entries, false)),
            Err(e) if recover => {
                warn!(path = %self.path.display(), error = %e, "session file corrupt, resetting");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(store_err("parse", &self.path, e)),
        }
    }

    /// Writes a sibling temp file, then renames it over the store.
    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| store_err("create dir", dir, e))?;
            }
        }
        let body =
            serde_json::to_string_pretty(entries).map_err(|e| store_err("encode", &self.path, e))?;
        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, body.as_bytes()).map_err(|e| store_err("write", &tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| store_err("replace", &self.path, e))?;
        debug!(path = %self.path.display(), keys = entries.len(), "session store saved");
        Ok(())
    }

    fn with_entries<T>(
        &self,
        recover: bool,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> (T, bool),
    ) -> Result<T, ClientError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| ClientError::Store("store lock poisoned".into()))?;
        let (mut entries, reset) = self.load(recover)?;
        let (out, dirty) = f(&mut entries);
        if dirty || reset {
            self.save(&entries)?;
        }
        Ok(out)
    }
}

/// Token material: owner read/write only.
fn write_private(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut opts = std::fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(body)?;
    file.sync_all()
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.with_entries(false, |e| (e.get(key).cloned(), false))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.with_entries(true, |e| {
            e.insert(key.to_string(), value.to_string());
            ((), true)
        })
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        // A damaged file is reset here, not reported.
        self.with_entries(true, |e| {
            let removed = e.remove(key).is_some();
            ((), removed)
        })
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ClientError::Store("store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ClientError::Store("store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ClientError::Store("store lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}

fn store_err(op: &str, path: &Path, e: impl std::fmt::Display) -> ClientError {
    ClientError::Store(format!("{} {}: {}", op, path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::new(&path);
        assert_eq!(store.get("cc_token").unwrap(), None);
        store.set("cc_token", "T1").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("cc_token").unwrap().as_deref(), Some("T1"));

        reopened.remove("cc_token").unwrap();
        assert_eq!(store.get("cc_token").unwrap(), None);
    }

    #[test]
    fn file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileStore::new(&path).get("cc_token").unwrap_err();
        assert!(matches!(err, ClientError::Store(_)));
    }

    #[test]
    fn corrupt_file_can_still_be_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"cc_token":"T1","cc_us"#).unwrap();

        let store = FileStore::new(&path);
        store.remove("cc_token").unwrap();
        store.remove("cc_user").unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let entries: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert!(entries.is_empty());
        assert_eq!(store.get("cc_token").unwrap(), None);
        assert!(!dir.path().join("session.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileStore::new(&path).set("cc_token", "T1").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_store_set_and_remove() {
        let store = MemoryStore::default();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
