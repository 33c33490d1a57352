//! Structure directory access.
//!
//! Templates live in a flat directory as `<pdb_id>.<extension>`. Documents are
//! read through a small LRU cache keyed by file id, since the same entry is
//! often hit by several search results in a row.
use crate::error::IoError;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const DEFAULT_CACHE_CAPACITY: usize = 16;

#[derive(Debug)]
pub struct DocumentCache {
    capacity: usize,
    // most recently used at the front
    entries: VecDeque<(String, Rc<str>)>,
}

impl DocumentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<Rc<str>> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(position)?;
        let value = Rc::clone(&entry.1);
        self.entries.push_front(entry);
        Some(value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Rc<str>) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push_front((key, value));
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[derive(Debug)]
pub struct StructureStore {
    dir: PathBuf,
    extension: String,
    cache: RefCell<DocumentCache>,
}

impl StructureStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self::with_capacity(dir, extension, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(
        dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        capacity: usize,
    ) -> Self {
        let extension: String = extension.into();
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
            cache: RefCell::new(DocumentCache::new(capacity)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn path_for(&self, file_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", file_id, self.extension))
    }

    /// Whether the directory holds at least one file with the configured extension.
    pub fn has_documents(&self) -> Result<bool, IoError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| IoError::Read {
            path: self.dir.clone(),
            source,
        })?;
        Ok(entries.filter_map(Result::ok).any(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.to_string_lossy() == self.extension)
        }))
    }

    pub fn read(&self, file_id: &str) -> Result<Rc<str>, IoError> {
        if let Some(document) = self.cache.borrow_mut().get(file_id) {
            return Ok(document);
        }
        let path = self.path_for(file_id);
        let document: Rc<str> = fs::read_to_string(&path)
            .map_err(|source| IoError::Read { path, source })?
            .into();
        self.cache
            .borrow_mut()
            .insert(file_id, Rc::clone(&document));
        Ok(document)
    }

    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferritin_test_data::TestFile;

    #[test]
    fn test_lru_eviction() {
        let mut cache = DocumentCache::new(2);
        cache.insert("a", Rc::from("A"));
        cache.insert("b", Rc::from("B"));
        // touch a so b becomes the oldest
        assert_eq!(cache.get("a").as_deref(), Some("A"));
        cache.insert("c", Rc::from("C"));
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_store_read() {
        let dir = tempfile::tempdir().unwrap();
        TestFile::template_01().write_to_dir(dir.path()).unwrap();
        let store = StructureStore::new(dir.path(), ".pdb");

        assert!(store.has_documents().unwrap());
        let document = store.read("1tst").unwrap();
        assert!(document.starts_with("HEADER"));
        assert_eq!(store.cached(), 1);
        store.read("1tst").unwrap();
        assert_eq!(store.cached(), 1);

        assert!(matches!(store.read("9zzz"), Err(IoError::Read { .. })));
    }

    #[test]
    fn test_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = StructureStore::new(dir.path(), "cif");
        assert!(!store.has_documents().unwrap());
        let missing = StructureStore::new(dir.path().join("nope"), "cif");
        assert!(missing.has_documents().is_err());
    }
}
