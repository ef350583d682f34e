mod document;
pub mod migrations;
mod store;

pub use document::StatsDocument;
pub use store::StatsStore;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::PersistenceError;

/// File name of the stats document inside [`data_dir`].
pub const DATA_FILE: &str = "calmio_data.json";

const CORRUPT_SUFFIX: &str = ".corrupt";

/// Returns the data directory, creating it if needed.
///
/// `CALMIO_DATA_DIR` overrides everything. Otherwise `~/.config/calmio/`,
/// or `~/.config/calmio-dev/` when `CALMIO_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("CALMIO_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CALMIO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("calmio-dev")
            } else {
                base_dir.join("calmio")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Backing store for the stats document.
///
/// Implementations move raw JSON; decoding and migration happen in
/// [`StatsStore`].
pub trait Persistence: Send {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Value>, PersistenceError>;

    fn save(&self, document: &Value) -> Result<(), PersistenceError>;

    /// Copy an unreadable document aside so the next `save` does not lose it.
    fn preserve_unreadable(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Pretty-printed JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `calmio_data.json` in [`data_dir`].
    pub fn open_default() -> std::io::Result<Self> {
        Ok(Self::new(data_dir()?.join(DATA_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`Persistence::preserve_unreadable`] copies a bad file:
    /// `calmio_data.json.corrupt` next to the original.
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(CORRUPT_SUFFIX);
        PathBuf::from(name)
    }
}

impl Persistence for JsonFilePersistence {
    fn load(&self) -> Result<Option<Value>, PersistenceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| PersistenceError::Corrupt {
                source_name: self.path.display().to_string(),
                message: e.to_string(),
            })
    }

    fn save(&self, document: &Value) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(document)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    fn preserve_unreadable(&self) -> Result<(), PersistenceError> {
        match std::fs::copy(&self.path, self.corrupt_path()) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory document. Clones share the same slot, so a test can keep one
/// handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    slot: Arc<Mutex<Option<Value>>>,
    preserved: Arc<Mutex<Option<Value>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Value) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(document))),
            preserved: Arc::default(),
        }
    }

    /// Last saved document.
    pub fn snapshot(&self) -> Option<Value> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Document set aside by the last `preserve_unreadable`.
    pub fn preserved(&self) -> Option<Value> {
        self.preserved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> Result<Option<Value>, PersistenceError> {
        Ok(self.snapshot())
    }

    fn save(&self, document: &Value) -> Result<(), PersistenceError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(document.clone());
        Ok(())
    }

    fn preserve_unreadable(&self) -> Result<(), PersistenceError> {
        *self.preserved.lock().unwrap_or_else(|e| e.into_inner()) = self.snapshot();
        Ok(())
    }
}
