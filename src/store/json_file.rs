use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tempfile::NamedTempFile;

use super::{Collection, Document, StoreError};

/// Hands out one [`JsonCollection`] per file in a data directory.
///
/// Asking for the same collection twice returns the same handle, so every
/// caller in the process shares that file's lock.
pub struct JsonFileStore {
    data_dir: PathBuf,
    lock_timeout: Duration,
    collections: Mutex<HashMap<String, Arc<JsonCollection>>>,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock_timeout,
            collections: Mutex::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Open `<data_dir>/<name>.json`, creating it if needed.
    pub fn collection(
        &self,
        name: &str,
        primary_key: &str,
    ) -> Result<Arc<JsonCollection>, StoreError> {
        let mut collections = self.collections.lock();
        if let Some(existing) = collections.get(name) {
            if existing.primary_key != primary_key {
                return Err(StoreError::KeyMismatch {
                    collection: name.to_owned(),
                    existing: existing.primary_key.clone(),
                    requested: primary_key.to_owned(),
                });
            }
            return Ok(Arc::clone(existing));
        }
        let path = self.data_dir.join(format!("{name}.json"));
        let collection = Arc::new(JsonCollection::open(path, primary_key, self.lock_timeout)?);
        collections.insert(name.to_owned(), Arc::clone(&collection));
        Ok(collection)
    }
}

/// A collection stored as one pretty-printed JSON array.
pub struct JsonCollection {
    name: String,
    primary_key: String,
    path: PathBuf,
    lock: Mutex<()>,
    lock_timeout: Duration,
}

impl JsonCollection {
    pub fn open(
        path: impl Into<PathBuf>,
        primary_key: impl Into<String>,
        lock_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let collection = Self {
            name,
            primary_key: primary_key.into(),
            path,
            lock: Mutex::new(()),
            lock_timeout,
        };

        fs::create_dir_all(collection.dir()).map_err(|e| collection.io(e))?;
        if !collection.path.exists() {
            debug!("Creating empty collection at {}", collection.path.display());
            collection.save(&[])?;
        }
        Ok(collection)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn io(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            collection: self.name.clone(),
            source,
        }
    }

    fn corrupt(&self, detail: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            collection: self.name.clone(),
            detail: detail.into(),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.lock
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| StoreError::LockTimeout {
                collection: self.name.clone(),
                waited: self.lock_timeout,
            })
    }

    fn load(&self) -> Result<Vec<Document>, StoreError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| self.io(e))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let value: Value = serde_json::from_str(&raw).map_err(|e| self.corrupt(e.to_string()))?;
        let Value::Array(items) = value else {
            return Err(self.corrupt("top level is not an array"));
        };
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(document) => Ok(document),
                _ => Err(self.corrupt(format!("entry {index} is not an object"))),
            })
            .collect()
    }

    fn save(&self, documents: &[Document]) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        documents.serialize(&mut serializer)?;
        buf.push(b'\n');

        let mut file = NamedTempFile::new_in(self.dir()).map_err(|e| self.io(e))?;
        file.write_all(&buf).map_err(|e| self.io(e))?;
        file.as_file().sync_all().map_err(|e| self.io(e))?;
        file.persist(&self.path).map_err(|e| self.io(e.error))?;
        Ok(())
    }

    /// Run `f` over the loaded documents under the lock, rewriting the file
    /// when `f` reports a change.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Vec<Document>) -> Result<(R, bool), StoreError>,
    ) -> Result<R, StoreError> {
        let _guard = self.guard()?;
        let mut documents = self.load()?;
        let (result, changed) = f(&mut documents)?;
        if changed {
            self.save(&documents)?;
            debug!(
                "Rewrote collection {} with {} documents",
                self.name,
                documents.len()
            );
        }
        Ok(result)
    }
}

impl Collection for JsonCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn list_all(&self) -> Result<Vec<Document>, StoreError> {
        let _guard = self.guard()?;
        self.load()
    }

    fn find(&self, key_field: &str, key_value: &str) -> Result<Option<Document>, StoreError> {
        let _guard = self.guard()?;
        let documents = self.load()?;
        Ok(super::find_in(&documents, key_field, key_value).cloned())
    }

    fn append(&self, document: Document, unique_on: &[&str]) -> Result<(), StoreError> {
        self.mutate(|documents| {
            super::append_to(documents, document, unique_on)?;
            Ok(((), true))
        })
    }

    fn replace(
        &self,
        key_field: &str,
        key_value: &str,
        updated: Document,
        unique_on: &[&str],
    ) -> Result<Option<Document>, StoreError> {
        self.mutate(|documents| {
            let merged = super::replace_in(documents, key_field, key_value, updated, unique_on)?;
            let changed = merged.is_some();
            Ok((merged, changed))
        })
    }

    fn remove(&self, key_field: &str, key_value: &str) -> Result<Option<Document>, StoreError> {
        self.mutate(|documents| {
            let removed = super::remove_from(documents, key_field, key_value);
            let changed = removed.is_some();
            Ok((removed, changed))
        })
    }
}
