//! Persistent key-value store for the draft, history and template records
//!
//! Records are JSON documents keyed by a short name. Reads are tolerant: a
//! missing key yields the type's default, and an unreadable payload is moved
//! aside as `<key>.json.corrupt` before the default is returned.
//!
//! # Error Handling
//!
//! Writes are best-effort. `Store::save` logs and swallows failures so a full
//! disk or a permissions problem never interrupts editing. Callers that need
//! the error (tests, export) use the backend directly.

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DRAFT_KEY: &str = "promptDraft";
pub const HISTORY_KEY: &str = "promptHistory";
pub const TEMPLATES_KEY: &str = "promptTemplates";

const STORE_LOCK_TIMEOUT_SECS: u64 = 5;
const STORE_LOCK_RETRY_MS: u64 = 50;

/// Raw string storage addressed by key
pub trait KvBackend: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    /// Keep an unreadable payload around for inspection, then drop the key
    fn quarantine(&self, key: &str, raw: &str);
}

/// One `<key>.json` file per record inside a directory
pub struct FileBackend {
    dir: PathBuf,
}

struct StoreLock {
    file: std::fs::File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn ensure_dir(&self) -> anyhow::Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700));
            }
        }
        Ok(())
    }

    fn lock(&self) -> anyhow::Result<StoreLock> {
        self.ensure_dir()?;
        let lock_path = self.dir.join(".lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let start = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => break,
                Err(err) => {
                    if err.kind() != ErrorKind::WouldBlock {
                        return Err(err.into());
                    }
                    if start.elapsed() >= Duration::from_secs(STORE_LOCK_TIMEOUT_SECS) {
                        return Err(anyhow::anyhow!(
                            "Timed out waiting for store lock ({}s)",
                            STORE_LOCK_TIMEOUT_SECS
                        ));
                    }
                    std::thread::sleep(Duration::from_millis(STORE_LOCK_RETRY_MS));
                }
            }
        }
        Ok(StoreLock { file })
    }
}

impl KvBackend for FileBackend {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let _lock = self.lock()?;
        write_atomic(&self.path_for(key), value)
    }

    fn quarantine(&self, key: &str, raw: &str) {
        let path = self.path_for(key);
        let corrupt_path = path.with_extension("json.corrupt");
        if fs::rename(&path, &corrupt_path).is_err() {
            let _ = fs::write(&corrupt_path, raw);
        }
    }
}

/// In-process backend for tests and benchmarks
#[derive(Default, Clone)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quarantined: Arc<Mutex<Vec<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys that were moved aside because their payload could not be decoded
    pub fn quarantined(&self) -> Vec<String> {
        self.quarantined
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn quarantine(&self, key: &str, _raw: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
        if let Ok(mut quarantined) = self.quarantined.lock() {
            quarantined.push(key.to_string());
        }
    }
}

/// Typed JSON access over a backend
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KvBackend>,
}

impl Store {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    pub fn open_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::new(dir)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Load a record, falling back to `T::default()` when it is missing or unreadable
    pub fn load<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read stored record");
                return T::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    key,
                    error = %err,
                    "stored record is corrupted; a backup was kept and defaults were loaded"
                );
                self.backend.quarantine(key, &raw);
                T::default()
            }
        }
    }

    /// Persist a record, overwriting whatever was there. Failures are logged only.
    pub fn save<T>(&self, key: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        let content = match serde_json::to_string(value) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to serialize record");
                return;
            }
        };
        if let Err(err) = self.backend.set(key, &content) {
            tracing::warn!(key, error = %err, "failed to persist record");
        }
    }
}

/// Write through a temp file and rename so readers never see a torn record
pub(crate) fn write_atomic(path: &Path, content: &str) -> anyhow::Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(&tmp_path, perms);
    }

    #[cfg(windows)]
    {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Record {
        items: Vec<String>,
    }

    #[test]
    fn test_missing_key_loads_default() {
        let tmp = TempDir::new().unwrap();
        let store = Store::open_dir(tmp.path());
        let loaded: Record = store.load(HISTORY_KEY);
        assert_eq!(loaded, Record::default());
    }

    #[test]
    fn test_save_then_load_from_disk() {
        let tmp = TempDir::new().unwrap();
        let store = Store::open_dir(tmp.path());
        let record = Record {
            items: vec!["a".into(), "b".into()],
        };
        store.save(TEMPLATES_KEY, &record);

        assert!(tmp.path().join("promptTemplates.json").exists());
        let reopened = Store::open_dir(tmp.path());
        let loaded: Record = reopened.load(TEMPLATES_KEY);
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_corrupted_record_is_preserved_and_defaults_returned() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("promptHistory.json"), "{ not json").unwrap();

        let store = Store::open_dir(tmp.path());
        let loaded: Vec<String> = store.load(HISTORY_KEY);
        assert!(loaded.is_empty());

        let backup = tmp.path().join("promptHistory.json.corrupt");
        assert_eq!(fs::read_to_string(backup).unwrap(), "{ not json");
        assert!(!tmp.path().join("promptHistory.json").exists());
    }

    #[test]
    fn test_wrong_shape_counts_as_corruption() {
        let backend = MemoryBackend::new();
        backend.set(DRAFT_KEY, "[1, 2, 3]").unwrap();
        let store = Store::new(Arc::new(backend.clone()));

        let loaded: Record = store.load(DRAFT_KEY);
        assert_eq!(loaded, Record::default());
        assert_eq!(backend.quarantined(), vec![DRAFT_KEY.to_string()]);
    }

    #[test]
    fn test_save_into_unwritable_location_does_not_panic() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let store = Store::open_dir(blocker.join("nested"));
        store.save(DRAFT_KEY, &Record::default());
        let loaded: Record = store.load(DRAFT_KEY);
        assert_eq!(loaded, Record::default());
    }
}
