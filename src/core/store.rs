// src/core/store.rs

//! Persistence of launcher records (settings, engines and projects).
//!
//! Stores are shared handles: every method takes `&self` and implementations
//! serialize their own access.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors raised while reading or writing a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the store file failed.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The store file is corrupt.
    #[error("Failed to decode store from binary format: {0}")]
    BincodeDecode(#[from] bincode::error::DecodeError),
    /// The records could not be encoded.
    #[error("Failed to encode store to binary format: {0}")]
    BincodeEncode(#[from] bincode::error::EncodeError),
}

/// Result type of [`Store`] operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The three kinds of records a store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSet {
    /// [`ConfigRecord`]s.
    Config,
    /// [`EngineRecord`]s.
    Engine,
    /// [`ProjectRecord`]s.
    Project,
}

/// A named launcher setting.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    /// Setting name; the key.
    pub name: String,
    /// Raw value.
    pub value: String,
}

/// A registered engine, keyed by its display name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineRecord {
    /// Display name; the key.
    pub name: String,
    /// Absolute path of the executable.
    pub location: PathBuf,
    /// At most one engine carries this flag.
    pub is_default: bool,
}

/// A registered project, keyed by its directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    /// Absolute project directory; the key.
    pub location: PathBuf,
    /// Name of the engine the project opens with, if bound.
    pub engine_ref: Option<String>,
}

/// Any stored record, tagged with its set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A setting.
    Config(ConfigRecord),
    /// An engine.
    Engine(EngineRecord),
    /// A project.
    Project(ProjectRecord),
}

impl Record {
    /// Set the record belongs to.
    pub fn set(&self) -> RecordSet {
        match self {
            Self::Config(_) => RecordSet::Config,
            Self::Engine(_) => RecordSet::Engine,
            Self::Project(_) => RecordSet::Project,
        }
    }

    /// Primary key of the record within its set.
    pub fn key(&self) -> String {
        match self {
            Self::Config(record) => record.name.clone(),
            Self::Engine(record) => record.name.clone(),
            Self::Project(record) => project_key(&record.location),
        }
    }
}

/// Key under which a project directory is stored.
pub fn project_key(location: &Path) -> String {
    location.to_string_lossy().into_owned()
}

/// Keyed access to launcher records.
pub trait Store: Send + Sync {
    /// Whether `key` is present in `set`.
    fn exists(&self, set: RecordSet, key: &str) -> StoreResult<bool>;
    /// The record stored under `key`, if any.
    fn get(&self, set: RecordSet, key: &str) -> StoreResult<Option<Record>>;
    /// All records of a set, ordered by key.
    fn list(&self, set: RecordSet) -> StoreResult<Vec<Record>>;
    /// Adds a record. Returns `false` (and changes nothing) if the key is taken.
    fn insert(&self, record: Record) -> StoreResult<bool>;
    /// Replaces a record. Returns `false` if no record has that key.
    fn update(&self, record: Record) -> StoreResult<bool>;
    /// Removes a record. Returns `false` if no record has that key.
    fn delete(&self, set: RecordSet, key: &str) -> StoreResult<bool>;
}

/// The tables behind both store implementations.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
struct StoreData {
    config: BTreeMap<String, Record>,
    engines: BTreeMap<String, Record>,
    projects: BTreeMap<String, Record>,
}

impl StoreData {
    fn table(&self, set: RecordSet) -> &BTreeMap<String, Record> {
        match set {
            RecordSet::Config => &self.config,
            RecordSet::Engine => &self.engines,
            RecordSet::Project => &self.projects,
        }
    }

    fn table_mut(&mut self, set: RecordSet) -> &mut BTreeMap<String, Record> {
        match set {
            RecordSet::Config => &mut self.config,
            RecordSet::Engine => &mut self.engines,
            RecordSet::Project => &mut self.projects,
        }
    }

    fn insert(&mut self, record: Record) -> bool {
        let table = self.table_mut(record.set());
        let key = record.key();
        if table.contains_key(&key) {
            return false;
        }
        table.insert(key, record);
        true
    }

    fn update(&mut self, record: Record) -> bool {
        let key = record.key();
        match self.table_mut(record.set()).get_mut(&key) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    fn delete(&mut self, set: RecordSet, key: &str) -> bool {
        self.table_mut(set).remove(key).is_some()
    }
}

/// In-memory store. Nothing outlives the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn exists(&self, set: RecordSet, key: &str) -> StoreResult<bool> {
        Ok(self.lock().table(set).contains_key(key))
    }

    fn get(&self, set: RecordSet, key: &str) -> StoreResult<Option<Record>> {
        Ok(self.lock().table(set).get(key).cloned())
    }

    fn list(&self, set: RecordSet) -> StoreResult<Vec<Record>> {
        Ok(self.lock().table(set).values().cloned().collect())
    }

    fn insert(&self, record: Record) -> StoreResult<bool> {
        Ok(self.lock().insert(record))
    }

    fn update(&self, record: Record) -> StoreResult<bool> {
        Ok(self.lock().update(record))
    }

    fn delete(&self, set: RecordSet, key: &str) -> StoreResult<bool> {
        Ok(self.lock().delete(set, key))
    }
}

/// Store persisted to a single `bincode` file, rewritten after every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store; the file is
    /// created on the first mutation.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let data = match fs::read(path) {
            Ok(bytes) => {
                let (data, _len): (StoreData, usize) =
                    bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
                data
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No store at {}, starting empty", path.display());
                StoreData::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            data: Mutex::new(data),
        })
    }

    /// File the store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, data: &StoreData) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serde::encode_to_vec(data, bincode::config::standard())?;
        fs::write(&self.path, bytes)?;
        log::trace!("Store written to {}", self.path.display());
        Ok(())
    }

    /// Applies `change` and writes the store back if it reports a modification.
    fn mutate(&self, change: impl FnOnce(&mut StoreData) -> bool) -> StoreResult<bool> {
        let mut data = self.lock();
        let changed = change(&mut data);
        if changed {
            self.persist(&data)?;
        }
        Ok(changed)
    }
}

impl Store for FileStore {
    fn exists(&self, set: RecordSet, key: &str) -> StoreResult<bool> {
        Ok(self.lock().table(set).contains_key(key))
    }

    fn get(&self, set: RecordSet, key: &str) -> StoreResult<Option<Record>> {
        Ok(self.lock().table(set).get(key).cloned())
    }

    fn list(&self, set: RecordSet) -> StoreResult<Vec<Record>> {
        Ok(self.lock().table(set).values().cloned().collect())
    }

    fn insert(&self, record: Record) -> StoreResult<bool> {
        self.mutate(|data| data.insert(record))
    }

    fn update(&self, record: Record) -> StoreResult<bool> {
        self.mutate(|data| data.update(record))
    }

    fn delete(&self, set: RecordSet, key: &str) -> StoreResult<bool> {
        self.mutate(|data| data.delete(set, key))
    }
}
