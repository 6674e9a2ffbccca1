//! Best-effort key/value persistence for session state.
//!
//! Two keys are used: [`LOGS_KEY`] holds the record collection and
//! [`AUTOSAVE_KEY`] holds the autosave slot. Values are versioned JSON
//! envelopes; the backend treats them as opaque text.

use crate::record::{PartialDraft, ServiceLogRecord};
use crate::store::LogStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

pub const LOGS_KEY: &str = "logs";
pub const AUTOSAVE_KEY: &str = "autoSave";
pub const STATE_VERSION: u32 = 1;

/// Errors from persistence backends and envelope decoding.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted state: {0}")]
    Corrupt(String),

    #[error("unsupported state version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Local persistence backend.
///
/// `load` returns `Ok(None)` when nothing was stored under `key`.
pub trait StateStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Io(format!("memory storage poisoned: {e}")))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Io(format!("memory storage poisoned: {e}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key under a data directory. Writes go through a
/// temporary file and a rename so a crash never leaves a half-written value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl StateStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(format!("{}: {e}", path.display()))),
        };
        validate_state_bytes(&path, &bytes)?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        write_atomically(&path, value)
    }
}

fn write_atomically(path: &Path, value: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| StorageError::Io(format!("{}: {e}", parent.display())))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), StorageError> {
        let file = File::create(&tmp_path)
            .map_err(|e| StorageError::Io(format!("{}: {e}", tmp_path.display())))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(value.as_bytes())
            .map_err(|e| StorageError::Io(format!("{}: {e}", tmp_path.display())))?;
        let file = writer
            .into_inner()
            .map_err(|e| StorageError::Io(format!("{}: {e}", tmp_path.display())))?;
        file.sync_all()
            .map_err(|e| StorageError::Io(format!("{}: {e}", tmp_path.display())))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StorageError::Io(format!(
            "{} -> {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn validate_state_bytes(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if bytes.contains(&0) {
        return Err(StorageError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogsEnvelope {
    version: u32,
    logs: Vec<ServiceLogRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutoSaveEnvelope {
    version: u32,
    #[serde(default)]
    auto_save: Option<PartialDraft>,
}

fn check_version(found: u32) -> Result<(), StorageError> {
    if found != STATE_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found,
            expected: STATE_VERSION,
        });
    }
    Ok(())
}

pub fn encode_logs(logs: &[ServiceLogRecord]) -> Result<String, StorageError> {
    let envelope = LogsEnvelope {
        version: STATE_VERSION,
        logs: logs.to_vec(),
    };
    serde_json::to_string(&envelope).map_err(|e| StorageError::Serialize(e.to_string()))
}

pub fn decode_logs(raw: &str) -> Result<LogStore, StorageError> {
    let envelope: LogsEnvelope =
        serde_json::from_str(raw).map_err(|e| StorageError::Parse(e.to_string()))?;
    check_version(envelope.version)?;
    Ok(LogStore::from_records(envelope.logs))
}

pub fn encode_autosave(slot: Option<&PartialDraft>) -> Result<String, StorageError> {
    let envelope = AutoSaveEnvelope {
        version: STATE_VERSION,
        auto_save: slot.cloned(),
    };
    serde_json::to_string(&envelope).map_err(|e| StorageError::Serialize(e.to_string()))
}

pub fn decode_autosave(raw: &str) -> Result<Option<PartialDraft>, StorageError> {
    let envelope: AutoSaveEnvelope =
        serde_json::from_str(raw).map_err(|e| StorageError::Parse(e.to_string()))?;
    check_version(envelope.version)?;
    Ok(envelope.auto_save)
}

/// Load the record collection. Absent state is an empty store.
pub fn load_logs(storage: &dyn StateStorage) -> Result<LogStore, StorageError> {
    match storage.load(LOGS_KEY)? {
        Some(raw) => decode_logs(&raw),
        None => Ok(LogStore::new()),
    }
}

pub fn save_logs(storage: &dyn StateStorage, store: &LogStore) -> Result<(), StorageError> {
    storage.save(LOGS_KEY, &encode_logs(store.logs())?)
}

/// Load the autosave slot. Absent state is an empty slot.
pub fn load_autosave(storage: &dyn StateStorage) -> Result<Option<PartialDraft>, StorageError> {
    match storage.load(AUTOSAVE_KEY)? {
        Some(raw) => decode_autosave(&raw),
        None => Ok(None),
    }
}

pub fn save_autosave(
    storage: &dyn StateStorage,
    slot: Option<&PartialDraft>,
) -> Result<(), StorageError> {
    storage.save(AUTOSAVE_KEY, &encode_autosave(slot)?)
}
