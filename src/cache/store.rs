//! Durable storage for the cache document
//!
//! The whole cache lives in one JSON object mapping key strings to result
//! values. Writes go to a temporary file in the same directory which is then
//! atomically renamed over the document, so a reader never observes a
//! partially written file.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;

use super::CacheError;

/// In-memory form of the cache document
pub type Entries = BTreeMap<String, Value>;

/// Reads and writes the cache document as a single JSON object
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// Location of the cache document
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store for the document at `path`
    ///
    /// Nothing is touched on disk until [`load`](Self::load) or
    /// [`save`](Self::save) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the cache document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole document
    ///
    /// # Returns
    /// * `Ok(entries)` with an empty mapping if the document does not exist
    /// * `Err(CacheError::MalformedStore)` if the document is not a JSON object
    /// * `Err(CacheError::Persistence)` if the document cannot be read
    pub fn load(&self) -> Result<Entries, CacheError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No cache document yet");
                return Ok(Entries::new());
            }
            Err(source) => {
                return Err(CacheError::Persistence {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| CacheError::MalformedStore {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the whole document with `entries`
    ///
    /// Creates the parent directory if needed. The document is either fully
    /// replaced or left untouched.
    pub fn save(&self, entries: &Entries) -> Result<(), CacheError> {
        self.write_atomically(entries)
            .map_err(|source| CacheError::Persistence {
                path: self.path.clone(),
                source,
            })
    }

    /// Deletes the document, returning whether one existed
    pub fn clear(&self) -> Result<bool, CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Persistence {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_atomically(&self, entries: &Entries) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut temp_file = NamedTempFile::new_in(&dir)?;
        temp_file.write_all(&json)?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (JsonFileStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = JsonFileStore::new(temp_dir.path().join("cache.json"));
        (store, temp_dir)
    }

    #[test]
    fn test_load_missing_document_is_empty() {
        let (store, _temp_dir) = create_test_store();

        let entries = store.load().expect("Missing document should not be an error");

        assert!(entries.is_empty());
    }

    #[test]
    fn test_save_then_load_returns_entries() {
        let (store, _temp_dir) = create_test_store();
        let mut entries = Entries::new();
        entries.insert(
            "get_state_data(48,){}".to_string(),
            json!({"name": "Texas", "population": 29000000}),
        );
        entries.insert("get_toptier_code('NASA',){}".to_string(), json!("080"));

        store.save(&entries).expect("Save should succeed");
        let loaded = store.load().expect("Load should succeed");

        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_document_is_a_single_json_object() {
        let (store, _temp_dir) = create_test_store();
        let mut entries = Entries::new();
        entries.insert("op(1,){}".to_string(), json!([1, 2, 3]));

        store.save(&entries).expect("Save should succeed");

        let content = fs::read_to_string(store.path()).expect("Should read file");
        let value: Value = serde_json::from_str(&content).expect("Document should be JSON");
        assert_eq!(value, json!({"op(1,){}": [1, 2, 3]}));
    }

    #[test]
    fn test_load_invalid_json_is_malformed() {
        let (store, _temp_dir) = create_test_store();
        fs::write(store.path(), "{not json").unwrap();

        let err = store.load().unwrap_err();

        assert!(matches!(err, CacheError::MalformedStore { .. }));
    }

    #[test]
    fn test_load_non_object_is_malformed() {
        let (store, _temp_dir) = create_test_store();
        fs::write(store.path(), "[1, 2, 3]").unwrap();

        let err = store.load().unwrap_err();

        assert!(matches!(err, CacheError::MalformedStore { .. }));
    }

    #[test]
    fn test_load_python_nan_is_malformed() {
        let (store, _temp_dir) = create_test_store();
        // json.dump writes non-finite floats as bare NaN/Infinity
        fs::write(store.path(), r#"{"a(1,){}": 1.5, "b(2,){}": NaN}"#).unwrap();

        let err = store.load().unwrap_err();

        assert!(matches!(err, CacheError::MalformedStore { .. }));
    }

    #[test]
    fn test_save_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("dir").join("cache.json");
        let store = JsonFileStore::new(&nested);

        store.save(&Entries::new()).expect("Save should succeed");

        assert!(nested.exists(), "Document should be created");
    }

    #[test]
    fn test_save_replaces_existing_document() {
        let (store, temp_dir) = create_test_store();
        let mut first = Entries::new();
        first.insert("a(){}".to_string(), json!(1));
        let mut second = Entries::new();
        second.insert("b(){}".to_string(), json!(2));

        store.save(&first).unwrap();
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), second);
        // No temporary files left behind
        let files: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let (_store, temp_dir) = create_test_store();
        // A regular file where the parent directory should be
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store_under_file = JsonFileStore::new(blocker.join("cache.json"));

        let err = store_under_file.save(&Entries::new()).unwrap_err();

        assert!(matches!(err, CacheError::Persistence { .. }));
    }

    #[test]
    fn test_clear_removes_document() {
        let (store, _temp_dir) = create_test_store();
        store.save(&Entries::new()).unwrap();

        assert!(store.clear().unwrap());
        assert!(!store.path().exists());
        assert!(!store.clear().unwrap());
    }
}
