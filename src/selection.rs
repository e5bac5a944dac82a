//! Which sticker is active for deletion.

use log::debug;

use crate::gesture::GestureRecognizer;
use crate::transform::{StickerBoard, StickerId};

#[derive(Debug, Default)]
pub struct Selection {
    selected: Option<StickerId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<StickerId> {
        self.selected
    }

    pub fn is_selected(&self, id: StickerId) -> bool {
        self.selected == Some(id)
    }

    /// Select one sticker (replacing the previous one) or clear with `None`.
    pub fn select(&mut self, id: Option<StickerId>) {
        if self.selected != id {
            debug!("selection: {:?} -> {:?}", self.selected, id);
        }
        self.selected = id;
    }

    /// Remove the selected sticker. No-op when nothing is selected.
    pub fn delete_selected(
        &mut self,
        board: &mut StickerBoard,
        gestures: &mut GestureRecognizer,
    ) -> Option<StickerId> {
        let id = self.selected.take()?;
        gestures.forget(id);
        board.remove(id).then_some(id)
    }

    /// Remove every sticker. Returns how many were removed.
    pub fn clear_all(
        &mut self,
        board: &mut StickerBoard,
        gestures: &mut GestureRecognizer,
    ) -> usize {
        self.selected = None;
        gestures.reset();
        board.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContactId, Point, StageSize};

    #[test]
    fn selecting_replaces_previous() {
        let mut board = StickerBoard::new();
        let a = board.add("A");
        let b = board.add("B");
        let mut sel = Selection::new();
        sel.select(Some(a));
        sel.select(Some(b));
        assert!(sel.is_selected(b));
        assert!(!sel.is_selected(a));
        sel.select(None);
        assert_eq!(sel.selected(), None);
    }

    #[test]
    fn delete_removes_selected_and_clears() {
        let mut board = StickerBoard::new();
        let mut gestures = GestureRecognizer::new();
        let a = board.add("A");
        let b = board.add("B");
        let mut sel = Selection::new();
        sel.select(Some(a));

        let stage = StageSize::new(1080.0, 1920.0);
        let point = Point::new(540.0, 960.0);
        assert!(gestures.on_contact_start(&board, stage, a, ContactId(1), point));

        assert_eq!(sel.delete_selected(&mut board, &mut gestures), Some(a));
        assert_eq!(sel.selected(), None);
        assert!(board.get(a).is_none());
        assert!(board.get(b).is_some());
        assert_eq!(gestures.owner(ContactId(1)), None);
    }

    #[test]
    fn delete_without_selection_is_noop() {
        let mut board = StickerBoard::new();
        let mut gestures = GestureRecognizer::new();
        board.add("A");
        let mut sel = Selection::new();
        assert_eq!(sel.delete_selected(&mut board, &mut gestures), None);
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn clear_all_on_empty_board_is_noop() {
        let mut board = StickerBoard::new();
        let mut gestures = GestureRecognizer::new();
        let mut sel = Selection::new();
        assert_eq!(sel.clear_all(&mut board, &mut gestures), 0);
        assert_eq!(sel.selected(), None);

        let a = board.add("A");
        board.add("B");
        sel.select(Some(a));
        assert_eq!(sel.clear_all(&mut board, &mut gestures), 2);
        assert!(board.is_empty());
        assert_eq!(sel.selected(), None);
    }
}
