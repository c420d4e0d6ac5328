use log::trace;

use crate::moves::Move;

/// Recorded moves of one game plus a cursor at the move that produced the current position.
///
/// `cursor` is `None` before the first move. Recording a move while the cursor is not on the last entry throws away
/// everything after the cursor first.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    moves: Vec<Move>,
    cursor: Option<usize>,
}

impl Timeline {
    pub fn new() -> Timeline {
        Timeline::default()
    }

    pub fn record_move(&mut self, r#move: Move) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        if keep < self.moves.len() {
            trace!("discarding {} recorded moves after the cursor", self.moves.len() - keep);
            self.moves.truncate(keep);
        }

        self.moves.push(r#move);
        self.cursor = Some(self.moves.len() - 1);
    }

    pub fn undo(&mut self) -> Option<Move> {
        let cursor = self.cursor?;
        let r#move = self.moves[cursor];
        self.cursor = cursor.checked_sub(1);
        Some(r#move)
    }

    pub fn redo(&mut self) -> Option<Move> {
        let next = self.cursor.map_or(0, |c| c + 1);
        let r#move = *self.moves.get(next)?;
        self.cursor = Some(next);
        Some(r#move)
    }

    pub fn reset_to_start(&mut self) {
        self.cursor = None;
    }

    pub fn go_to_end(&mut self) {
        self.cursor = self.moves.len().checked_sub(1);
    }

    pub fn clear(&mut self) {
        self.moves.clear();
        self.cursor = None;
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.moves.len()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The move that produced the current position
    pub fn current(&self) -> Option<&Move> {
        self.moves.get(self.cursor?)
    }

    /// Every recorded move, including ones after the cursor
    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.moves.iter()
    }
}
