//! The slide collection and its reducer.
//!
//! Every deck operation is a pure `(state, action) -> state` step so the state
//! machine can be exercised without a UI or storage.

use crate::defaults;
use crate::model::{KindTag, Slide, SlidePatch};
use crate::navigation;

#[derive(Debug, Clone, PartialEq)]
pub struct DeckState {
    pub slides: Vec<Slide>,
    /// Navigation index, always in `[0, slides.len())`.
    pub current: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Add(KindTag),
    Duplicate(u32),
    Delete(u32),
    Move(u32, Direction),
    Update(u32, SlidePatch),
    Reset(u32),
    /// Destructive; callers must confirm with the user first.
    ResetAll,
    /// Replace the whole deck (import or rehydrate). Ignored when empty.
    Replace(Vec<Slide>),
    Next,
    Prev,
    /// 1-based slide number.
    JumpTo(usize),
    /// 0-based index.
    GoTo(usize),
}

impl DeckState {
    pub fn new(slides: Vec<Slide>) -> Self {
        let slides = if slides.is_empty() {
            defaults::builtin_deck()
        } else {
            slides
        };
        Self { slides, current: 0 }
    }

    pub fn builtin() -> Self {
        Self::new(defaults::builtin_deck())
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.slides.get(self.current)
    }

    pub fn position(&self, id: u32) -> Option<usize> {
        self.slides.iter().position(|s| s.id == id)
    }

    /// Next free id: one past the largest existing id. `None` once the id
    /// space is used up.
    pub fn next_id(&self) -> Option<u32> {
        match self.slides.iter().map(|s| s.id).max() {
            Some(max) => max.checked_add(1),
            None => Some(0),
        }
    }

    fn clamp_current(&mut self) {
        self.current = self.current.min(self.slides.len().saturating_sub(1));
    }
}

/// Apply `action` to `state`, returning the next state.
pub fn reduce(state: &DeckState, action: Action) -> DeckState {
    let mut next = state.clone();
    match action {
        Action::Add(kind) => {
            let Some(id) = next.next_id() else {
                log::warn!("No free slide id left; not adding a slide");
                return next;
            };
            let slide = defaults::new_slide(kind, id);
            next.slides.push(slide);
            next.current = next.slides.len() - 1;
        }
        Action::Duplicate(id) => {
            let Some(pos) = next.position(id) else {
                return next;
            };
            let Some(new_id) = next.next_id() else {
                log::warn!("No free slide id left; not duplicating slide {id}");
                return next;
            };
            let mut copy = next.slides[pos].clone();
            copy.id = new_id;
            copy.title.push_str(" (Copy)");
            next.slides.insert(pos + 1, copy);
            next.current = pos + 1;
        }
        Action::Delete(id) => {
            if next.slides.len() <= 1 {
                return next;
            }
            let Some(pos) = next.position(id) else {
                return next;
            };
            next.slides.remove(pos);
            if pos <= next.current {
                next.current = next.current.saturating_sub(1);
            }
            next.clamp_current();
        }
        Action::Move(id, direction) => {
            let Some(pos) = next.position(id) else {
                return next;
            };
            let target = match direction {
                Direction::Up if pos > 0 => pos - 1,
                Direction::Down if pos + 1 < next.slides.len() => pos + 1,
                _ => return next,
            };
            next.slides.swap(pos, target);
            if next.current == pos {
                next.current = target;
            } else if next.current == target {
                next.current = pos;
            }
        }
        Action::Update(id, patch) => {
            if let Some(slide) = next.slides.iter_mut().find(|s| s.id == id) {
                slide.apply_patch(patch);
            }
        }
        Action::Reset(id) => {
            let Some(template) = defaults::template_for(id) else {
                return next;
            };
            if let Some(slide) = next.slides.iter_mut().find(|s| s.id == id) {
                *slide = template;
            }
        }
        Action::ResetAll => {
            next.slides = defaults::builtin_deck();
            next.current = 0;
        }
        Action::Replace(slides) => {
            if slides.is_empty() {
                return next;
            }
            next.slides = slides;
            next.clamp_current();
        }
        Action::Next => {
            next.current = navigation::next_index(next.current, next.slides.len());
        }
        Action::Prev => {
            next.current = navigation::prev_index(next.current);
        }
        Action::JumpTo(n) => {
            if let Some(index) = navigation::jump_index(n, next.slides.len()) {
                next.current = index;
            }
        }
        Action::GoTo(index) => {
            if index < next.slides.len() {
                next.current = index;
            }
        }
    }
    next
}

/// Slide-manager filter: positions whose title contains `query`
/// (case-insensitive) or whose 1-based slide number equals it.
pub fn search(slides: &[Slide], query: &str) -> Vec<usize> {
    let query = query.trim();
    if query.is_empty() {
        return (0..slides.len()).collect();
    }
    let needle = query.to_lowercase();
    slides
        .iter()
        .enumerate()
        .filter(|(index, slide)| {
            slide.title.to_lowercase().contains(&needle) || (index + 1).to_string() == query
        })
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SectionContent, SlideKind};

    fn slide(id: u32, title: &str) -> Slide {
        Slide {
            id,
            kind: SlideKind::Content {
                sections: Vec::new(),
            },
            title: title.to_string(),
            image_url: format!("https://example.com/{id}.jpg"),
            generated_image_url: None,
        }
    }

    fn deck(ids: &[u32]) -> DeckState {
        DeckState {
            slides: ids.iter().map(|&id| slide(id, &format!("Slide {id}"))).collect(),
            current: 0,
        }
    }

    fn ids(state: &DeckState) -> Vec<u32> {
        state.slides.iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_add_appends_with_fresh_id() {
        let state = deck(&[0, 5, 2]);
        let next = reduce(&state, Action::Add(KindTag::Content));
        assert_eq!(next.slide_count(), 4);
        assert_eq!(next.slides[3].id, 6);
        assert_eq!(next.current, 3);
        assert!(matches!(
            next.slides[3].sections()[0].content,
            SectionContent::Text { .. }
        ));
    }

    #[test]
    fn test_add_cover() {
        let next = reduce(&deck(&[0]), Action::Add(KindTag::Cover));
        assert_eq!(next.slides[1].kind_tag(), KindTag::Cover);
    }

    #[test]
    fn test_delete_single_slide_is_noop() {
        let state = deck(&[4]);
        let next = reduce(&state, Action::Delete(4));
        assert_eq!(next, state);
    }

    #[test]
    fn test_delete_last_clamps_current() {
        let mut state = deck(&[0, 1, 2]);
        state.current = 2;
        let next = reduce(&state, Action::Delete(2));
        assert_eq!(ids(&next), vec![0, 1]);
        assert_eq!(next.current, 1);
    }

    #[test]
    fn test_delete_before_current_shifts_back() {
        let mut state = deck(&[0, 1, 2, 3]);
        state.current = 2;
        let next = reduce(&state, Action::Delete(0));
        assert_eq!(next.current, 1);
        assert_eq!(next.slides[next.current].id, 2);
    }

    #[test]
    fn test_delete_after_current_keeps_index() {
        let mut state = deck(&[0, 1, 2, 3]);
        state.current = 1;
        let next = reduce(&state, Action::Delete(3));
        assert_eq!(next.current, 1);
    }

    #[test]
    fn test_delete_first_at_zero_floors() {
        let state = deck(&[0, 1]);
        let next = reduce(&state, Action::Delete(0));
        assert_eq!(ids(&next), vec![1]);
        assert_eq!(next.current, 0);
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let state = deck(&[0, 1]);
        assert_eq!(reduce(&state, Action::Delete(9)), state);
    }

    #[test]
    fn test_duplicate_inserts_after_source() {
        let state = deck(&[0, 1, 2]);
        let next = reduce(&state, Action::Duplicate(1));
        assert_eq!(ids(&next), vec![0, 1, 3, 2]);
        assert_eq!(next.slides[2].title, "Slide 1 (Copy)");
        assert_eq!(next.slides[2].image_url, next.slides[1].image_url);
        assert_eq!(next.slides[2].kind, next.slides[1].kind);
        assert_eq!(next.current, 2);
    }

    #[test]
    fn test_duplicate_unknown_id_is_noop() {
        let state = deck(&[0, 1]);
        assert_eq!(reduce(&state, Action::Duplicate(42)), state);
    }

    #[test]
    fn test_move_swaps_neighbours() {
        let state = deck(&[0, 1, 2]);
        let next = reduce(&state, Action::Move(1, Direction::Down));
        assert_eq!(ids(&next), vec![0, 2, 1]);
        let next = reduce(&next, Action::Move(1, Direction::Up));
        assert_eq!(ids(&next), vec![0, 1, 2]);
    }

    #[test]
    fn test_move_at_boundary_is_noop() {
        let state = deck(&[0, 1, 2]);
        assert_eq!(reduce(&state, Action::Move(0, Direction::Up)), state);
        assert_eq!(reduce(&state, Action::Move(2, Direction::Down)), state);
    }

    #[test]
    fn test_move_preserves_id_multiset() {
        let state = deck(&[7, 3, 9, 1]);
        for id in [7, 3, 9, 1] {
            for direction in [Direction::Up, Direction::Down] {
                let next = reduce(&state, Action::Move(id, direction));
                let mut before = ids(&state);
                let mut after = ids(&next);
                before.sort();
                after.sort();
                assert_eq!(before, after);
                assert_eq!(next.slide_count(), state.slide_count());
            }
        }
    }

    #[test]
    fn test_move_remaps_current() {
        let mut state = deck(&[0, 1, 2]);
        state.current = 1;
        // The moved slide is current: follow it.
        let next = reduce(&state, Action::Move(1, Direction::Up));
        assert_eq!(next.current, 0);
        assert_eq!(next.slides[next.current].id, 1);
        // The displaced neighbour is current: follow it too.
        let next = reduce(&state, Action::Move(0, Direction::Down));
        assert_eq!(next.current, 0);
        assert_eq!(next.slides[next.current].id, 1);
    }

    #[test]
    fn test_update_merges_fields() {
        let state = deck(&[0, 1]);
        let patch = SlidePatch {
            title: Some("Renamed".to_string()),
            ..SlidePatch::default()
        };
        let next = reduce(&state, Action::Update(1, patch));
        assert_eq!(next.slides[1].title, "Renamed");
        assert_eq!(next.slides[0], state.slides[0]);
        assert_eq!(next.slides[1].image_url, state.slides[1].image_url);
    }

    #[test]
    fn test_reset_restores_template() {
        let state = DeckState::builtin();
        let original = state.slides[0].clone();
        let edited = reduce(
            &state,
            Action::Update(
                original.id,
                SlidePatch {
                    title: Some("Changed".to_string()),
                    ..SlidePatch::default()
                },
            ),
        );
        assert_ne!(edited.slides[0], original);
        let reset = reduce(&edited, Action::Reset(original.id));
        assert_eq!(reset.slides[0], original);
    }

    #[test]
    fn test_reset_without_template_is_noop() {
        let state = deck(&[500]);
        assert_eq!(reduce(&state, Action::Reset(500)), state);
    }

    #[test]
    fn test_reset_all() {
        let mut state = deck(&[100, 101]);
        state.current = 1;
        let next = reduce(&state, Action::ResetAll);
        assert_eq!(next.slides, defaults::builtin_deck());
        assert_eq!(next.current, 0);
    }

    #[test]
    fn test_replace_clamps_and_ignores_empty() {
        let mut state = deck(&[0, 1, 2]);
        state.current = 2;
        let next = reduce(&state, Action::Replace(vec![slide(9, "Only")]));
        assert_eq!(ids(&next), vec![9]);
        assert_eq!(next.current, 0);
        assert_eq!(reduce(&state, Action::Replace(Vec::new())), state);
    }

    #[test]
    fn test_navigation_actions() {
        let state = deck(&[0, 1, 2]);
        let next = reduce(&state, Action::Prev);
        assert_eq!(next.current, 0);
        let next = reduce(&reduce(&next, Action::Next), Action::Next);
        assert_eq!(next.current, 2);
        let next = reduce(&next, Action::Next);
        assert_eq!(next.current, 2);
    }

    #[test]
    fn test_jump_to() {
        let state = deck(&[0, 1, 2]);
        assert_eq!(reduce(&state, Action::JumpTo(3)).current, 2);
        assert_eq!(reduce(&state, Action::JumpTo(0)).current, 0);
        let mut at_one = state.clone();
        at_one.current = 1;
        assert_eq!(reduce(&at_one, Action::JumpTo(4)).current, 1);
        assert_eq!(reduce(&at_one, Action::JumpTo(0)).current, 1);
    }

    #[test]
    fn test_go_to_out_of_range_ignored() {
        let state = deck(&[0, 1]);
        assert_eq!(reduce(&state, Action::GoTo(1)).current, 1);
        assert_eq!(reduce(&state, Action::GoTo(5)).current, 0);
    }

    #[test]
    fn test_next_id_starts_at_zero_domain() {
        assert_eq!(deck(&[0]).next_id(), Some(1));
        assert_eq!(deck(&[3, 1]).next_id(), Some(4));
        assert_eq!(deck(&[u32::MAX]).next_id(), None);
    }

    #[test]
    fn test_add_and_duplicate_at_max_id_are_noops() {
        let state = deck(&[u32::MAX, 0]);
        assert_eq!(reduce(&state, Action::Add(KindTag::Content)), state);
        assert_eq!(reduce(&state, Action::Duplicate(0)), state);
    }

    #[test]
    fn test_search_by_title_and_number() {
        let slides = vec![slide(0, "Intro"), slide(1, "Case Study"), slide(2, "Outro")];
        assert_eq!(search(&slides, "case"), vec![1]);
        assert_eq!(search(&slides, "3"), vec![2]);
        assert_eq!(search(&slides, "  "), vec![0, 1, 2]);
        assert!(search(&slides, "missing").is_empty());
    }
}
