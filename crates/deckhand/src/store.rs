use anyhow::Result;

use crate::deck::{self, Action, DeckState};
use crate::model::Slide;
use crate::persist::{DeckPersistence, KeyValueStore, SaveDeck};
use crate::snapshot::{self, Import, ImportError};

/// Outcome of a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSummary {
    Deck { slides: usize },
    Overrides { matched: usize },
}

/// The live deck plus the capability to persist it.
///
/// Every change to the slide collection is written through the saver as one
/// full rewrite. Navigation-only changes are not persisted.
pub struct DeckStore {
    state: DeckState,
    saver: Box<dyn SaveDeck>,
}

impl DeckStore {
    pub fn new(state: DeckState, saver: Box<dyn SaveDeck>) -> Self {
        Self { state, saver }
    }

    /// Rehydrate from persistence, falling back to the built-in deck.
    pub fn open<S: KeyValueStore + 'static>(persistence: DeckPersistence<S>) -> Self {
        let state = match persistence.load() {
            Some(slides) => DeckState::new(slides),
            None => DeckState::builtin(),
        };
        Self::new(state, Box::new(persistence))
    }

    pub fn state(&self) -> &DeckState {
        &self.state
    }

    pub fn slides(&self) -> &[Slide] {
        &self.state.slides
    }

    pub fn current(&self) -> usize {
        self.state.current
    }

    pub fn dispatch(&mut self, action: Action) {
        let next = deck::reduce(&self.state, action);
        let changed = next.slides != self.state.slides;
        self.state = next;
        if changed {
            self.persist();
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.saver.save(&self.state.slides) {
            log::warn!("Failed to save deck: {e:#}");
        }
    }

    /// Full-project export of the current deck.
    pub fn export_snapshot(&self) -> Result<String> {
        Ok(snapshot::export_deck(&self.state.slides)?)
    }

    /// Legacy image-override export of the current deck.
    pub fn export_overrides(&self) -> Result<String> {
        Ok(snapshot::export_overrides(&self.state.slides)?)
    }

    /// Import a snapshot. On failure the deck is left exactly as it was.
    pub fn import_snapshot(&mut self, raw: &str) -> Result<ImportSummary, ImportError> {
        match snapshot::parse_import(raw)? {
            Import::Deck(slides) => {
                let count = slides.len();
                self.dispatch(Action::Replace(slides));
                log::info!("Imported {count} slides");
                Ok(ImportSummary::Deck { slides: count })
            }
            Import::Overrides(overrides) => {
                let matched = self
                    .state
                    .slides
                    .iter()
                    .filter(|s| overrides.iter().any(|o| o.id == s.id))
                    .count();
                let merged = snapshot::apply_overrides(&self.state.slides, &overrides);
                self.dispatch(Action::Replace(merged));
                log::info!("Applied {matched} image overrides");
                Ok(ImportSummary::Overrides { matched })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KindTag, SlidePatch};
    use crate::persist::{MemoryKeyValueStore, STORAGE_KEY};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct CountingSaver {
        saves: Rc<RefCell<Vec<usize>>>,
    }

    impl SaveDeck for CountingSaver {
        fn save(&mut self, slides: &[Slide]) -> Result<()> {
            self.saves.borrow_mut().push(slides.len());
            Ok(())
        }
    }

    struct FailingSaver;

    impl SaveDeck for FailingSaver {
        fn save(&mut self, _slides: &[Slide]) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn counting_store() -> (DeckStore, Rc<RefCell<Vec<usize>>>) {
        let saver = CountingSaver::default();
        let saves = saver.saves.clone();
        (DeckStore::new(DeckState::builtin(), Box::new(saver)), saves)
    }

    #[test]
    fn test_mutation_saves_full_deck() {
        let (mut store, saves) = counting_store();
        let before = store.slides().len();
        store.dispatch(Action::Add(KindTag::Content));
        assert_eq!(*saves.borrow(), vec![before + 1]);
    }

    #[test]
    fn test_navigation_does_not_save() {
        let (mut store, saves) = counting_store();
        store.dispatch(Action::Next);
        store.dispatch(Action::JumpTo(3));
        assert_eq!(store.current(), 2);
        assert!(saves.borrow().is_empty());
    }

    #[test]
    fn test_noop_mutation_does_not_save() {
        let (mut store, saves) = counting_store();
        store.dispatch(Action::Delete(9999));
        assert!(saves.borrow().is_empty());
    }

    #[test]
    fn test_save_failure_is_not_fatal() {
        let mut store = DeckStore::new(DeckState::builtin(), Box::new(FailingSaver));
        store.dispatch(Action::Add(KindTag::Cover));
        assert_eq!(store.current(), store.slides().len() - 1);
    }

    #[test]
    fn test_open_rehydrates_persisted_deck() {
        let kv = MemoryKeyValueStore::default();
        let mut store = DeckStore::open(DeckPersistence::new(kv.clone()));
        let id = store.slides()[0].id;
        store.dispatch(Action::Update(
            id,
            SlidePatch {
                title: Some("Persisted".to_string()),
                ..SlidePatch::default()
            },
        ));
        assert!(kv.get(STORAGE_KEY).unwrap().is_some());

        let reopened = DeckStore::open(DeckPersistence::new(kv));
        assert_eq!(reopened.slides()[0].title, "Persisted");
        assert_eq!(reopened.current(), 0);
    }

    #[test]
    fn test_failed_import_leaves_deck_untouched() {
        let (mut store, saves) = counting_store();
        let before = store.state().clone();
        assert!(store.import_snapshot(r#"{"not":"an array"}"#).is_err());
        assert!(store.import_snapshot("[]").is_err());
        assert_eq!(store.state(), &before);
        assert!(saves.borrow().is_empty());
    }

    #[test]
    fn test_import_replaces_deck() {
        let (mut store, _) = counting_store();
        store.dispatch(Action::Add(KindTag::Content));
        let exported = store.export_snapshot().unwrap();

        let (mut other, saves) = counting_store();
        let summary = other.import_snapshot(&exported).unwrap();
        assert_eq!(
            summary,
            ImportSummary::Deck {
                slides: store.slides().len()
            }
        );
        assert_eq!(other.slides(), store.slides());
        assert_eq!(saves.borrow().len(), 1);
    }

    #[test]
    fn test_import_legacy_overrides_merges_images() {
        let (mut store, _) = counting_store();
        let id = store.slides()[1].id;
        let raw = format!(
            r#"[{{"id":{id},"imageUrl":"https://example.com/legacy.jpg","generatedImageUrl":"data:image/png;base64,AA"}},{{"id":4242}}]"#
        );
        let summary = store.import_snapshot(&raw).unwrap();
        assert_eq!(summary, ImportSummary::Overrides { matched: 1 });
        let slide = &store.slides()[1];
        assert_eq!(slide.image_url, "https://example.com/legacy.jpg");
        assert_eq!(slide.display_image(), "data:image/png;base64,AA");
    }
}
