pub mod chat;
pub mod completion;
pub mod config;
pub mod deck;
pub mod generate;
pub mod transfer;

use anyhow::Result;

use crate::config::Config;
use crate::persist::{DeckPersistence, FileKeyValueStore};
use crate::store::DeckStore;

/// Open the persisted deck from the configured storage directory.
pub fn open_store(config: &Config) -> Result<DeckStore> {
    let dir = config.storage_dir()?;
    log::debug!("Opening deck storage in {}", dir.display());
    Ok(DeckStore::open(DeckPersistence::new(FileKeyValueStore::new(dir))))
}
