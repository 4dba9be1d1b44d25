//! Durable mirror of the deck in a single key-value slot.

use anyhow::{Context, Result};
use std::path::PathBuf;
#[cfg(test)]
use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::model::Slide;
use crate::snapshot;

/// Storage key for the current schema. Bumping the version abandons older
/// entries: they are ignored, not migrated or deleted.
pub const STORAGE_KEY: &str = "deckhand_slides_v2_full_list";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        std::fs::write(&tmp, value)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// In-memory store. Clones share the same map.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

#[cfg(test)]
impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Save capability handed to the deck store.
pub trait SaveDeck {
    fn save(&mut self, slides: &[Slide]) -> Result<()>;
}

pub struct DeckPersistence<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> DeckPersistence<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    pub fn with_key(store: S, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    /// Read the stored deck.
    ///
    /// Returns `None` when nothing is stored under the current key, or when the
    /// stored value is unusable; the latter is logged and never surfaced.
    pub fn load(&self) -> Option<Vec<Slide>> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read stored deck: {e:#}");
                return None;
            }
        };
        match serde_json::from_str::<Vec<Slide>>(&raw) {
            Ok(slides) => match snapshot::validate_deck(slides) {
                Ok(slides) => {
                    log::debug!("Loaded {} slides from {}", slides.len(), self.key);
                    Some(slides)
                }
                Err(e) => {
                    log::warn!("Stored deck under {} is unusable ({e}), using defaults", self.key);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to parse stored deck under {}: {e}", self.key);
                None
            }
        }
    }
}

impl<S: KeyValueStore> SaveDeck for DeckPersistence<S> {
    fn save(&mut self, slides: &[Slide]) -> Result<()> {
        let json = serde_json::to_string(slides)?;
        self.store.set(&self.key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    #[test]
    fn test_missing_key_loads_none() {
        let persistence = DeckPersistence::new(MemoryKeyValueStore::default());
        assert!(persistence.load().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryKeyValueStore::default();
        let mut persistence = DeckPersistence::new(store.clone());
        let deck = defaults::builtin_deck();
        persistence.save(&deck).unwrap();
        assert!(store.get(STORAGE_KEY).unwrap().is_some());
        assert_eq!(persistence.load(), Some(deck));
    }

    #[test]
    fn test_corrupt_blob_falls_back() {
        let mut store = MemoryKeyValueStore::default();
        store.set(STORAGE_KEY, "{not json").unwrap();
        let persistence = DeckPersistence::new(store);
        assert!(persistence.load().is_none());
    }

    #[test]
    fn test_duplicate_ids_fall_back() {
        let mut deck = defaults::builtin_deck();
        deck[1].id = deck[0].id;
        let mut store = MemoryKeyValueStore::default();
        store
            .set(STORAGE_KEY, &serde_json::to_string(&deck).unwrap())
            .unwrap();
        assert!(DeckPersistence::new(store).load().is_none());
    }

    #[test]
    fn test_max_id_falls_back() {
        let mut deck = defaults::builtin_deck();
        deck[0].id = u32::MAX;
        let mut store = MemoryKeyValueStore::default();
        store
            .set(STORAGE_KEY, &serde_json::to_string(&deck).unwrap())
            .unwrap();
        assert!(DeckPersistence::new(store).load().is_none());
    }

    #[test]
    fn test_empty_array_falls_back() {
        let mut store = MemoryKeyValueStore::default();
        store.set(STORAGE_KEY, "[]").unwrap();
        assert!(DeckPersistence::new(store).load().is_none());
    }

    #[test]
    fn test_old_schema_key_ignored() {
        let mut store = MemoryKeyValueStore::default();
        let deck = serde_json::to_string(&defaults::builtin_deck()).unwrap();
        store.set("deckhand_slides_v1_full_list", &deck).unwrap();
        assert!(DeckPersistence::new(store).load().is_none());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileKeyValueStore::new(dir.path().join("storage"));
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "[1]").unwrap();
        store.set("k", "[2]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[2]"));
        assert!(dir.path().join("storage/k.json").exists());
        assert!(!dir.path().join("storage/.k.json.tmp").exists());
    }
}
