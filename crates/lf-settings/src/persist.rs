//! The on-disk settings document and how it is written.
//!
//! Documents are replaced atomically: the new content goes to a temporary
//! file in the destination directory, is synced, then renamed over the old
//! file. Writers in this process serialize per destination path.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};

use chrono::{DateTime, Utc};
use lf_core::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current document format.
pub const FORMAT_VERSION: u32 = 1;

/// `{ "format_version": 1, "saved_at": ..., "settings": { group: { name: leaf } } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDocument {
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub settings: BTreeMap<String, BTreeMap<String, Value>>,
}

impl SettingsDocument {
    pub fn new(settings: BTreeMap<String, BTreeMap<String, Value>>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            saved_at: Some(Utc::now()),
            settings,
        }
    }
}

/// Read and parse a document. A missing file is `Ok(None)`.
pub fn read_document(path: &Path) -> Result<Option<SettingsDocument>> {
    let Some(contents) = read_optional(path)? else {
        return Ok(None);
    };
    let doc: SettingsDocument = serde_json::from_str(&contents)
        .map_err(|e| Error::Persistence(format!("{} is not a settings document: {e}", path.display())))?;
    if doc.format_version > FORMAT_VERSION {
        return Err(Error::Persistence(format!(
            "{} uses format version {}, newer than {FORMAT_VERSION}",
            path.display(),
            doc.format_version
        )));
    }
    Ok(Some(doc))
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| Error::Persistence(format!("failed to serialize {}: {e}", path.display())))?;
    atomic_write(path, &json)
}

/// Read a file to a string; `Ok(None)` if it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::from_io(path, e)),
    }
}

/// Write `data` to a temporary sibling of `path`, then rename it into place.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| Error::from_io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::from_io(dir, e))?;
    tmp.write_all(data).map_err(|e| Error::from_io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::from_io(path, e))?;
    tmp.persist(path).map_err(|e| Error::from_io(path, e.error))?;

    tracing::debug!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

type LockMap = HashMap<PathBuf, Weak<Mutex<()>>>;

fn locks() -> &'static Mutex<LockMap> {
    static LOCKS: OnceLock<Mutex<LockMap>> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lock_key(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// The lock guarding reads and read-modify-write cycles on `path`.
///
/// Entries live only while some caller holds the returned `Arc`.
pub fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    let mut locks = locks().lock();
    locks.retain(|_, lock| lock.strong_count() > 0);
    let key = lock_key(path);
    if let Some(lock) = locks.get(&key).and_then(Weak::upgrade) {
        return lock;
    }
    let lock = Arc::new(Mutex::new(()));
    locks.insert(key, Arc::downgrade(&lock));
    lock
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_document(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn corrupt_and_future_documents_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_document(&path), Err(Error::Persistence(_))));

        std::fs::write(&path, r#"{"format_version": 99, "settings": {}}"#).unwrap();
        assert!(matches!(read_document(&path), Err(Error::Persistence(_))));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");

        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn document_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = BTreeMap::new();
        settings.insert(
            "main".to_string(),
            BTreeMap::from([("max_depth".to_string(), json!({"type": "int", "value": 4}))]),
        );
        write_json(&path, &SettingsDocument::new(settings)).unwrap();

        let doc = read_document(&path).unwrap().unwrap();
        assert_eq!(doc.format_version, FORMAT_VERSION);
        assert!(doc.saved_at.is_some());
        assert_eq!(doc.settings["main"]["max_depth"]["value"], 4);
    }

    #[test]
    fn same_path_shares_a_lock() {
        let dir = tempfile::tempdir().unwrap();
        let a = path_lock(&dir.path().join("s.json"));
        let b = path_lock(&dir.path().join("s.json"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn released_locks_are_forgotten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.json");
        drop(path_lock(&path));
        let _other = path_lock(&dir.path().join("other.json"));
        assert!(!locks().lock().contains_key(&path));
    }
}
