//! Persistent store for named, polymorphic memory records.
//!
//! The whole collection lives in a single JSON document:
//!
//! ```json
//! {"items": [{"type": "text", "name": "greeting", "text": "hi"}, ...]}
//! ```
//!
//! Every mutating operation rewrites the full document. Loading decodes each
//! item through a [`RecordRegistry`], so the store never needs to know which
//! record kinds exist.
//!
//! # Example
//!
//! ```
//! use memories_store::memory::TextMemory;
//! use memories_store::store::RecordStore;
//! use std::sync::Arc;
//!
//! let mut store = RecordStore::ephemeral().unwrap();
//! store.add("greeting", Arc::new(TextMemory::new("greeting", "hi"))).unwrap();
//!
//! let record = store.get("greeting").unwrap();
//! assert_eq!(record.kind(), "text");
//! assert!(store.get("missing").unwrap_err().is_not_found());
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{BackendType, StoreConfig, WriteMode, EPHEMERAL_PATH};
use crate::error::{DecodeError, EncodeError, StoreError, StoreResult};
use crate::fs::{Filesystem, MemoryFilesystem, OsFilesystem, DIR_PERM, FILE_PERM};
use crate::record::{default_registry, Record, RecordRegistry};

/// Mapping from record name to record.
pub type Records = HashMap<String, Arc<dyn Record>>;

/// On-disk envelope.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default, deserialize_with = "null_as_empty")]
    items: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A named collection of records persisted as one JSON document.
///
/// # Thread Safety
///
/// The store does no locking of its own. Mutating operations take
/// `&mut self`; wrap the store in a `Mutex` to share it between threads.
///
/// # Consistency
///
/// After a successful mutation the file holds exactly the in-memory mapping.
/// When a save fails, the mutation stays applied in memory and the error is
/// returned; the file keeps its previous content (or, in
/// [`WriteMode::Direct`], whatever the failed write left behind).
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    items: Records,
    fs: Arc<dyn Filesystem>,
    registry: Arc<RecordRegistry>,
    write_mode: WriteMode,
}

impl RecordStore {
    /// Open a durable store at `path` on the operating system filesystem.
    pub fn new(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::builder().path(path).build()
    }

    /// Open a store on a fresh in-memory filesystem.
    pub fn ephemeral() -> StoreResult<Self> {
        Self::builder()
            .path(EPHEMERAL_PATH)
            .filesystem(Arc::new(MemoryFilesystem::new()))
            .build()
    }

    /// Open a store with an injected filesystem and registry
    ///
    /// # Arguments
    /// * `path` - Location of the backing document on `fs`
    /// * `fs` - Filesystem the document is read from and written to
    /// * `registry` - Decoders for every record kind the document may contain
    ///
    /// # Returns
    /// * `StoreResult<Self>` - The loaded store, or the error that stopped the initial load
    pub fn open(
        path: impl Into<PathBuf>,
        fs: Arc<dyn Filesystem>,
        registry: Arc<RecordRegistry>,
    ) -> StoreResult<Self> {
        Self::builder()
            .path(path)
            .filesystem(fs)
            .registry(registry)
            .build()
    }

    /// Open a store as described by `config`.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        config.validate().map_err(|e| StoreError::Configuration {
            path: config.path.clone(),
            reason: e.to_string(),
        })?;

        let fs: Arc<dyn Filesystem> = match config.backend {
            BackendType::LocalFileSystem => Arc::new(OsFilesystem::new()),
            BackendType::InMemory => Arc::new(MemoryFilesystem::new()),
        };
        Self::builder()
            .path(config.path.clone())
            .filesystem(fs)
            .write_mode(config.write_mode)
            .build()
    }

    /// Start configuring a store
    ///
    /// # Returns
    /// * `StoreBuilder` - A builder with the OS filesystem, the default registry
    ///   and direct writes preselected
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How saves replace the backing file.
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Shared handle to the backing filesystem.
    ///
    /// Reopening a store over the same handle sees everything saved so far,
    /// which is how an ephemeral store is "restarted".
    pub fn filesystem(&self) -> Arc<dyn Filesystem> {
        Arc::clone(&self.fs)
    }

    /// Registry used to decode fragments on load.
    pub fn registry(&self) -> Arc<RecordRegistry> {
        Arc::clone(&self.registry)
    }

    /// Insert or replace `record` under `name`, then save.
    ///
    /// If the save fails the record stays in memory.
    pub fn add(&mut self, name: impl Into<String>, record: Arc<dyn Record>) -> StoreResult<()> {
        let name = name.into();
        if name != record.name() {
            debug!(
                "Storing memory {} under different key {}",
                record.name(),
                name
            );
        }
        self.items.insert(name, record);
        self.save()
    }

    /// Remove `name` if present, then save. Removing an absent name is not an error.
    pub fn remove(&mut self, name: &str) -> StoreResult<()> {
        if self.items.remove(name).is_none() {
            debug!("Removing unknown memory {}", name);
        }
        self.save()
    }

    /// Look up a record by name.
    pub fn get(&self, name: &str) -> StoreResult<Arc<dyn Record>> {
        self.items
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Borrow the live mapping.
    ///
    /// The view cannot outlive a later mutation of the store; clone it (or
    /// the `Arc`s inside) to keep a snapshot.
    pub fn get_all(&self) -> &Records {
        &self.items
    }

    /// Drop every record, then save.
    pub fn remove_all(&mut self) -> StoreResult<()> {
        self.items = HashMap::new();
        self.save()
    }

    /// Check whether a record is stored under a name
    ///
    /// # Arguments
    /// * `name` - The key the record was added under
    ///
    /// # Returns
    /// * `bool` - `true` if the key is present in memory
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Number of records held in memory.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the in-memory mapping with the content of the backing file.
    ///
    /// On failure the current mapping is left untouched.
    pub fn load(&mut self) -> StoreResult<()> {
        let info = match self.fs.stat(&self.path) {
            Ok(info) => info,
            Err(e) if e.is_not_found() => {
                debug!("No store file at {}, starting empty", self.path.display());
                self.items = HashMap::new();
                return Ok(());
            }
            Err(e) => return Err(StoreError::io("Failed to stat store file", e)),
        };

        if info.is_dir {
            return Err(StoreError::Configuration {
                path: self.path.clone(),
                reason: "configured path is a directory".to_string(),
            });
        }

        let data = self
            .fs
            .read_file(&self.path)
            .map_err(|e| StoreError::io("Failed to read store file", e))?;

        let document: Document = serde_json::from_slice(&data).map_err(|e| {
            StoreError::decode("Failed to unmarshal store file", DecodeError::Envelope(e))
        })?;

        let mut items = Records::with_capacity(document.items.len());
        for (index, fragment) in document.items.into_iter().enumerate() {
            let record = self.registry.decode_value(fragment).map_err(|source| {
                StoreError::decode(
                    "Failed to unmarshal memory",
                    DecodeError::Fragment { index, source },
                )
            })?;
            let name = record.name().to_string();
            if items.insert(name.clone(), record).is_some() {
                warn!(
                    "Duplicate memory {} in {}, keeping the later one",
                    name,
                    self.path.display()
                );
            }
        }

        debug!("Loaded {} memories from {}", items.len(), self.path.display());
        self.items = items;
        Ok(())
    }

    /// Write the full mapping to the backing file.
    pub fn save(&self) -> StoreResult<()> {
        if let Some(dir) = self.path.parent() {
            self.fs
                .mkdir_all(dir, DIR_PERM)
                .map_err(|e| StoreError::io("Failed to create store directory", e))?;
        }

        let mut names: Vec<&String> = self.items.keys().collect();
        names.sort();

        let mut document = Document {
            items: Vec::with_capacity(names.len()),
        };
        for key in names {
            let record = &self.items[key];
            let fragment = record.encode().map_err(|source| {
                StoreError::encode(
                    "Failed to marshal memory",
                    EncodeError::Record {
                        name: record.name().to_string(),
                        key: key.clone(),
                        source,
                    },
                )
            })?;
            document.items.push(fragment);
        }

        let data = serde_json::to_vec(&document).map_err(|e| {
            StoreError::encode("Failed to marshal store file", EncodeError::Envelope(e))
        })?;

        match self.write_mode {
            WriteMode::Direct => self
                .fs
                .write_file(&self.path, &data, FILE_PERM)
                .map_err(|e| StoreError::io("Failed to write store file", e))?,
            WriteMode::Atomic => self.write_atomically(&data)?,
        }

        debug!(
            "Saved {} memories to {}",
            document.items.len(),
            self.path.display()
        );
        Ok(())
    }

    fn write_atomically(&self, data: &[u8]) -> StoreResult<()> {
        let temp_path = temp_path_for(&self.path);
        self.fs
            .write_file(&temp_path, data, FILE_PERM)
            .map_err(|e| StoreError::io("Failed to write temporary store file", e))?;
        self.fs
            .rename(&temp_path, &self.path)
            .map_err(|e| StoreError::io("Failed to replace store file", e))
    }
}

/// Sibling temporary path used by atomic writes: `<file>.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

/// Builder for [`RecordStore`].
///
/// Defaults to the OS filesystem, the default registry, direct writes and
/// `memories.json` in the working directory.
#[derive(Debug, Default)]
pub struct StoreBuilder {
    path: Option<PathBuf>,
    fs: Option<Arc<dyn Filesystem>>,
    registry: Option<Arc<RecordRegistry>>,
    write_mode: WriteMode,
}

impl StoreBuilder {
    /// Set the backing document path
    ///
    /// # Arguments
    /// * `path` - File to load from and save to; its parent is created on save
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Use `fs` instead of the OS filesystem.
    pub fn filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn registry(mut self, registry: Arc<RecordRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Create the store and load the backing file.
    pub fn build(self) -> StoreResult<RecordStore> {
        let mut store = RecordStore {
            path: self
                .path
                .unwrap_or_else(|| StoreConfig::default().path),
            items: HashMap::new(),
            fs: self.fs.unwrap_or_else(|| Arc::new(OsFilesystem::new())),
            registry: self.registry.unwrap_or_else(default_registry),
            write_mode: self.write_mode,
        };
        store.load()?;
        info!(
            "Opened memory store at {} with {} memories",
            store.path.display(),
            store.items.len()
        );
        Ok(store)
    }
}
