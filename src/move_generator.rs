use std::ops::Deref;

use log::trace;
use tinyvec::ArrayVec;

use crate::{
    board::{Board, KING_START_COL, KINGSIDE_ROOK_COL, QUEENSIDE_ROOK_COL},
    piece::{Color, Piece, PieceId, PieceKind},
    position::Position,
};

/// A queen in the middle of an empty board reaches 27 squares, a king at most 10 with castling
pub const MAX_DESTINATIONS: usize = 32;

pub type Destinations = ArrayVec<[Position; MAX_DESTINATIONS]>;

impl Board {
    /// Full legality test for `color` moving the piece on `from` to `to`, including not leaving its own king in check.
    pub fn is_legal_move(&mut self, from: Position, to: Position, color: Color) -> bool {
        if !from.is_on_board() || !to.is_on_board() || from == to {
            return false;
        }

        let Some(piece) = self.piece_at(from).copied() else {
            return false;
        };
        if piece.color != color {
            return false;
        }
        if let Some(target) = self.piece_at(to) {
            if target.color == color || target.kind == PieceKind::King {
                return false;
            }
        }

        let shape_ok = match piece.kind {
            PieceKind::Pawn => self.is_pawn_move(&piece, to),
            PieceKind::Knight => is_knight_offset(from, to),
            PieceKind::Bishop => is_diagonal(from, to) && self.is_path_clear(from, to),
            PieceKind::Rook => is_straight(from, to) && self.is_path_clear(from, to),
            PieceKind::Queen => (is_straight(from, to) || is_diagonal(from, to)) && self.is_path_clear(from, to),
            PieceKind::King => is_adjacent(from, to) || self.can_castle(&piece, to),
        };

        shape_ok && !self.would_expose_check(from, to, color)
    }

    fn is_pawn_move(&self, pawn: &Piece, to: Position) -> bool {
        let from = pawn.position;
        let direction = pawn.color.pawn_direction();
        let row_diff = to.row() as i8 - from.row() as i8;
        let col_diff = to.col() as i8 - from.col() as i8;
        let target = self.piece_at(to);

        if col_diff == 0 {
            if target.is_some() {
                return false;
            }
            if row_diff == direction {
                return true;
            }
            if row_diff == 2 * direction && from.row() == pawn.color.pawn_start_row() {
                return from.offset(direction, 0).is_some_and(|middle| self.piece_at(middle).is_none());
            }
            return false;
        }

        if col_diff.abs() != 1 || row_diff != direction {
            return false;
        }

        match target {
            Some(target) => target.color != pawn.color,
            None => self.is_en_passant_capture(pawn, to),
        }
    }

    /// Diagonal pawn step onto the en passant target with the opposing pawn that just advanced sitting behind it.
    fn is_en_passant_capture(&self, pawn: &Piece, to: Position) -> bool {
        if self.en_passant_target != Some(to) {
            return false;
        }

        let victim_square = Position::new(pawn.position.row(), to.col());
        matches!(
            self.piece_at(victim_square),
            Some(victim) if victim.kind == PieceKind::Pawn && victim.color != pawn.color
        )
    }

    fn can_castle(&self, king: &Piece, to: Position) -> bool {
        let from = king.position;
        if king.has_moved || from.row() != to.row() || (to.col() as i8 - from.col() as i8).abs() != 2 {
            return false;
        }
        if from != Position::new(king.color.home_row(), KING_START_COL) {
            return false;
        }

        let kingside = to.col() > from.col();
        let rook_col = if kingside { KINGSIDE_ROOK_COL } else { QUEENSIDE_ROOK_COL };
        let rook_square = Position::new(from.row(), rook_col);
        match self.piece_at(rook_square) {
            Some(rook) if rook.kind == PieceKind::Rook && rook.color == king.color && !rook.has_moved => {}
            _ => return false,
        }

        let (low, high) = if kingside { (from.col(), rook_col) } else { (rook_col, from.col()) };
        if (low + 1..high).any(|col| self.piece_at(Position::new(from.row(), col)).is_some()) {
            return false;
        }

        let opponent = king.color.opposite();
        let step: i8 = if kingside { 1 } else { -1 };
        let transit = Position::new(from.row(), (from.col() as i8 + step) as u8);
        !self.is_square_attacked(from, opponent)
            && !self.is_square_attacked(transit, opponent)
            && !self.is_square_attacked(to, opponent)
    }

    /// Every square strictly between `from` and `to` is empty. Only meaningful for straight or diagonal lines.
    fn is_path_clear(&self, from: Position, to: Position) -> bool {
        let row_step = (to.row() as i8 - from.row() as i8).signum();
        let col_step = (to.col() as i8 - from.col() as i8).signum();

        let mut current = from.offset(row_step, col_step);
        while let Some(pos) = current {
            if pos == to {
                return true;
            }
            if self.piece_at(pos).is_some() {
                return false;
            }
            current = pos.offset(row_step, col_step);
        }

        false
    }

    /// Whether `piece` could capture on `target` if an enemy stood there, ignoring the safety of its own king.
    fn attacks(&self, piece: &Piece, target: Position) -> bool {
        let from = piece.position;
        if from == target {
            return false;
        }

        match piece.kind {
            PieceKind::Pawn => {
                target.row() as i8 - from.row() as i8 == piece.color.pawn_direction()
                    && (target.col() as i8 - from.col() as i8).abs() == 1
            }
            PieceKind::Knight => is_knight_offset(from, target),
            PieceKind::Bishop => is_diagonal(from, target) && self.is_path_clear(from, target),
            PieceKind::Rook => is_straight(from, target) && self.is_path_clear(from, target),
            PieceKind::Queen => {
                (is_straight(from, target) || is_diagonal(from, target)) && self.is_path_clear(from, target)
            }
            PieceKind::King => is_adjacent(from, target),
        }
    }

    /// True if any active piece of `by_color` attacks `pos`.
    pub fn is_square_attacked(&self, pos: Position, by_color: Color) -> bool {
        self.active_pieces(by_color).any(|piece| self.attacks(piece, pos))
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        self.is_square_attacked(self.king(color).position, color.opposite())
    }

    /// Plays `from`-`to` on the live board, tests whether `color`'s king is attacked, and puts everything back.
    pub fn would_expose_check(&mut self, from: Position, to: Position, color: Color) -> bool {
        let Some(simulation) = SimulatedMove::begin(self, from, to) else {
            return false;
        };

        let in_check = simulation.is_in_check(color);
        trace!("simulated {from}-{to} for {color}: in check afterwards {in_check}");
        in_check
    }

    /// Exhaustive scan of every active piece of `color` against all 64 squares.
    pub fn has_any_legal_move(&mut self, color: Color) -> bool {
        let ids: Vec<PieceId> = self.active_ids(color).iter().copied().collect();
        for id in ids {
            let from = self.piece(id).position;
            for to in Position::all() {
                if self.is_legal_move(from, to, color) {
                    return true;
                }
            }
        }

        false
    }

    pub fn is_checkmate(&mut self, color: Color) -> bool {
        self.is_in_check(color) && !self.has_any_legal_move(color)
    }

    pub fn is_stalemate(&mut self, color: Color) -> bool {
        !self.is_in_check(color) && !self.has_any_legal_move(color)
    }

    /// Squares the piece on `from` may legally move to, for whichever color owns it.
    pub fn legal_destinations(&mut self, from: Position) -> Destinations {
        let mut destinations = Destinations::new();
        let Some(color) = self.piece_at(from).map(|p| p.color) else {
            return destinations;
        };

        for to in Position::all() {
            if self.is_legal_move(from, to, color) {
                destinations.push(to);
            }
        }

        destinations
    }

    /// Every legal `(from, to)` pair for `color`, in piece id order then square order.
    pub fn legal_moves(&mut self, color: Color) -> Vec<(Position, Position)> {
        let ids: Vec<PieceId> = self.active_ids(color).iter().copied().collect();
        let mut moves = Vec::new();
        for id in ids {
            let from = self.piece(id).position;
            for to in Position::all() {
                if self.is_legal_move(from, to, color) {
                    moves.push((from, to));
                }
            }
        }

        moves
    }
}

/// A move played directly on a board for the duration of a borrow. Dropping it restores the board exactly.
///
/// Only the mover's square, the captured piece (including an en passant victim) and the active set of the captured
/// piece's color are touched. Castling rooks and promotions are not simulated since neither changes whether the
/// mover's own king ends up attacked.
struct SimulatedMove<'a> {
    board: &'a mut Board,
    mover: PieceId,
    from: Position,
    to: Position,
    captured: Option<(PieceId, Color, Position)>,
}

impl<'a> SimulatedMove<'a> {
    fn begin(board: &'a mut Board, from: Position, to: Position) -> Option<SimulatedMove<'a>> {
        let mover = *board.piece_at(from)?;

        let captured = match board.piece_at(to) {
            Some(target) => Some((target.id, target.color, to)),
            None if mover.kind == PieceKind::Pawn && from.col() != to.col() && board.en_passant_target == Some(to) => {
                let victim_square = Position::new(from.row(), to.col());
                board.piece_at(victim_square).map(|victim| (victim.id, victim.color, victim_square))
            }
            None => None,
        };

        if let Some((id, color, square)) = captured {
            board.set_square(square, None);
            board.active[color.index()].remove(&id);
        }
        board.set_square(from, None);
        board.set_square(to, Some(mover.id));
        board.arena.get_mut(mover.id).position = to;

        Some(SimulatedMove {
            board,
            mover: mover.id,
            from,
            to,
            captured,
        })
    }
}

impl Deref for SimulatedMove<'_> {
    type Target = Board;

    fn deref(&self) -> &Self::Target {
        &*self.board
    }
}

impl Drop for SimulatedMove<'_> {
    fn drop(&mut self) {
        self.board.set_square(self.to, None);
        self.board.set_square(self.from, Some(self.mover));
        self.board.arena.get_mut(self.mover).position = self.from;

        if let Some((id, color, square)) = self.captured {
            self.board.set_square(square, Some(id));
            self.board.active[color.index()].insert(id);
        }
    }
}

#[inline]
fn is_knight_offset(from: Position, to: Position) -> bool {
    let row = (to.row() as i8 - from.row() as i8).abs();
    let col = (to.col() as i8 - from.col() as i8).abs();
    (row == 2 && col == 1) || (row == 1 && col == 2)
}

#[inline]
fn is_straight(from: Position, to: Position) -> bool {
    from != to && (from.row() == to.row() || from.col() == to.col())
}

#[inline]
fn is_diagonal(from: Position, to: Position) -> bool {
    from != to && (to.row() as i8 - from.row() as i8).abs() == (to.col() as i8 - from.col() as i8).abs()
}

#[inline]
fn is_adjacent(from: Position, to: Position) -> bool {
    from != to && (to.row() as i8 - from.row() as i8).abs() <= 1 && (to.col() as i8 - from.col() as i8).abs() <= 1
}
