use std::collections::VecDeque;

use crate::piece::{Piece, PieceId};

/// Pieces taken by one color, most recent capture first. Membership is by piece id, never by square.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedSet {
    pieces: VecDeque<Piece>,
}

impl CapturedSet {
    pub fn push_front(&mut self, piece: Piece) {
        self.pieces.push_front(piece);
    }

    /// Removes the piece with this id wherever it sits. Returns it if it was present.
    pub fn remove(&mut self, id: PieceId) -> Option<Piece> {
        let index = self.pieces.iter().position(|p| p.id == id)?;
        self.pieces.remove(index)
    }

    pub fn contains(&self, id: PieceId) -> bool {
        self.pieces.iter().any(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn clear(&mut self) {
        self.pieces.clear();
    }
}
