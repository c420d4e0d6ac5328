use std::fmt::Display;

use log::{error, trace};

use crate::{
    board::{Board, KINGSIDE_ROOK_COL, QUEENSIDE_ROOK_COL},
    piece::{Piece, PieceId, PieceKind},
    position::Position,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CastlingRook {
    pub from: Position,
    pub to: Position,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub kind: PieceKind,
    /// The entity that replaced the pawn
    pub piece: PieceId,
}

/// Everything needed to undo or replay one ply. Only [`Board::apply_move`] creates these.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Move {
    from: Position,
    to: Position,
    piece: Piece,
    captured: Option<Piece>,
    first_move: bool,
    castling: Option<CastlingRook>,
    en_passant: bool,
    promotion: Option<Promotion>,
    previous_en_passant_target: Option<Position>,
}

impl Move {
    pub fn from(&self) -> Position {
        self.from
    }

    pub fn to(&self) -> Position {
        self.to
    }

    /// The moving piece as it was before the move
    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    pub fn captured(&self) -> Option<&Piece> {
        self.captured.as_ref()
    }

    pub fn is_first_move(&self) -> bool {
        self.first_move
    }

    pub fn castling(&self) -> Option<&CastlingRook> {
        self.castling.as_ref()
    }

    pub fn is_en_passant(&self) -> bool {
        self.en_passant
    }

    pub fn promotion(&self) -> Option<&Promotion> {
        self.promotion.as_ref()
    }

    /// Where the captured piece stood. For en passant that is beside the origin, not the destination.
    pub fn captured_square(&self) -> Position {
        if self.en_passant {
            Position::new(self.from.row(), self.to.col())
        } else {
            self.to
        }
    }

    /// En passant target left behind by this move, only set by a pawn's two-square advance
    pub fn resulting_en_passant_target(&self) -> Option<Position> {
        let row_diff = self.to.row() as i8 - self.from.row() as i8;
        if self.piece.kind == PieceKind::Pawn && row_diff.abs() == 2 {
            Some(Position::new(
                (self.from.row() + self.to.row()) / 2,
                self.from.col(),
            ))
        } else {
            None
        }
    }

    /// Coordinate notation such as `e2-e4`, `Ng1xf3`, `e7-e8=Q`, `O-O` or `O-O-O`.
    pub fn notation(&self) -> String {
        if self.castling.is_some() {
            return if self.to.col() > self.from.col() {
                String::from("O-O")
            } else {
                String::from("O-O-O")
            };
        }

        let mut result = String::new();
        if self.piece.kind != PieceKind::Pawn {
            result.push(self.piece.kind.letter());
        }

        result.push_str(&self.from.to_notation());
        result.push(if self.captured.is_some() { 'x' } else { '-' });
        result.push_str(&self.to.to_notation());

        if let Some(promotion) = self.promotion {
            result.push('=');
            result.push(promotion.kind.letter());
        }

        result
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.notation())
    }
}

impl Board {
    /// Plays a move that already passed [`Board::is_legal_move`] and returns its record.
    pub fn apply_move(&mut self, from: Position, to: Position) -> Move {
        let Some(piece) = self.piece_at(from).copied() else {
            error!("apply_move: no piece on {from} to move to {to}. {self:?}");
            panic!("apply_move called without a piece on the origin square");
        };

        let mut captured = self.piece_at(to).copied();
        let mut en_passant = false;
        if piece.kind == PieceKind::Pawn
            && captured.is_none()
            && from.col() != to.col()
            && self.en_passant_target == Some(to)
        {
            let victim_square = Position::new(from.row(), to.col());
            captured = self.piece_at(victim_square).copied();
            self.set_square(victim_square, None);
            en_passant = true;
        }

        let mut castling = None;
        if piece.kind == PieceKind::King && (to.col() as i8 - from.col() as i8).abs() == 2 {
            let kingside = to.col() > from.col();
            let rook = CastlingRook {
                from: Position::new(from.row(), if kingside { KINGSIDE_ROOK_COL } else { QUEENSIDE_ROOK_COL }),
                to: Position::new(from.row(), if kingside { 5 } else { 3 }),
            };
            self.relocate(rook.from, rook.to);
            castling = Some(rook);
        }

        if let Some(captured) = captured {
            self.active[captured.color.index()].remove(&captured.id);
        }

        self.relocate(from, to);

        let mut promotion = None;
        if piece.kind == PieceKind::Pawn && to.row() == piece.color.promotion_row() {
            let queen = self.arena.spawn(PieceKind::Queen, piece.color, to);
            self.arena.get_mut(queen).has_moved = true;
            self.set_square(to, Some(queen));
            self.active[piece.color.index()].remove(&piece.id);
            self.active[piece.color.index()].insert(queen);
            promotion = Some(Promotion {
                kind: PieceKind::Queen,
                piece: queen,
            });
        }

        let r#move = Move {
            from,
            to,
            piece,
            captured,
            first_move: !piece.has_moved,
            castling,
            en_passant,
            promotion,
            previous_en_passant_target: self.en_passant_target,
        };
        self.en_passant_target = r#move.resulting_en_passant_target();

        trace!("applied {}", r#move);
        debug_assert!(self.is_consistent());
        r#move
    }

    /// Exact inverse of [`Board::apply_move`] for the most recently applied move.
    pub fn undo_move(&mut self, r#move: &Move) {
        let color = r#move.piece.color;
        let mover = r#move.piece.id;

        if let Some(promotion) = r#move.promotion {
            self.active[color.index()].remove(&promotion.piece);
            self.active[color.index()].insert(mover);
            self.arena.release(promotion.piece);
        }

        self.set_square(r#move.to, None);
        self.set_square(r#move.from, Some(mover));
        let piece = self.arena.get_mut(mover);
        piece.position = r#move.from;
        if r#move.first_move {
            piece.has_moved = false;
        }

        if let Some(captured) = r#move.captured {
            let square = r#move.captured_square();
            self.set_square(square, Some(captured.id));
            self.arena.get_mut(captured.id).position = square;
            self.active[captured.color.index()].insert(captured.id);
        }

        if let Some(rook) = r#move.castling {
            self.relocate(rook.to, rook.from);
            let rook_id = self.rook_id(rook.from);
            self.arena.get_mut(rook_id).has_moved = false;
        }

        self.en_passant_target = r#move.previous_en_passant_target;

        trace!("undid {}", r#move);
        debug_assert!(self.is_consistent());
    }

    /// Replays a recorded move's effects without checking legality again.
    pub fn redo_move(&mut self, r#move: &Move) {
        let color = r#move.piece.color;

        if r#move.en_passant {
            self.set_square(r#move.captured_square(), None);
        }

        if let Some(captured) = r#move.captured {
            self.active[captured.color.index()].remove(&captured.id);
        }

        self.relocate(r#move.from, r#move.to);

        if let Some(rook) = r#move.castling {
            self.relocate(rook.from, rook.to);
        }

        if let Some(promotion) = r#move.promotion {
            self.arena.restore(Piece {
                id: promotion.piece,
                kind: promotion.kind,
                color,
                position: r#move.to,
                has_moved: true,
            });
            self.set_square(r#move.to, Some(promotion.piece));
            self.active[color.index()].remove(&r#move.piece.id);
            self.active[color.index()].insert(promotion.piece);
        }

        self.en_passant_target = r#move.resulting_en_passant_target();

        trace!("redid {}", r#move);
        debug_assert!(self.is_consistent());
    }

    /// Moves whatever stands on `from` to the empty or captured square `to` and marks it as moved.
    fn relocate(&mut self, from: Position, to: Position) {
        let Some(id) = self.piece_id_at(from) else {
            error!("relocate: no piece on {from} to move to {to}. {self:?}");
            panic!("relocate called on an empty square");
        };

        self.set_square(from, None);
        self.set_square(to, Some(id));
        let piece = self.arena.get_mut(id);
        piece.position = to;
        piece.has_moved = true;
    }

    fn rook_id(&self, pos: Position) -> PieceId {
        match self.piece_id_at(pos) {
            Some(id) => id,
            None => {
                error!("rook_id: expected the castling rook on {pos}. {self:?}");
                panic!("castling rook missing");
            }
        }
    }
}

#[cfg(test)]
mod moves_tests {
    use crate::{
        board::Board,
        piece::{Color, PieceKind},
        position::Position,
    };

    fn sq(s: &str) -> Position {
        Position::from_notation(s).unwrap()
    }

    fn play(board: &mut Board, from: &str, to: &str, color: Color) -> super::Move {
        assert!(board.is_legal_move(sq(from), sq(to), color), "{from}-{to} should be legal for {color}");
        board.apply_move(sq(from), sq(to))
    }

    #[test]
    pub fn double_advance_sets_en_passant_target() {
        let mut board = Board::new();
        let m = play(&mut board, "e2", "e4", Color::White);
        assert_eq!(board.en_passant_target(), Some(sq("e3")));
        assert!(m.is_first_move());
        assert_eq!(m.notation(), "e2-e4");

        play(&mut board, "g8", "f6", Color::Black);
        assert_eq!(board.en_passant_target(), None);
    }

    #[test]
    pub fn en_passant_only_on_the_next_ply() {
        let mut board = Board::from_fen("4k3/3p4/8/4P3/8/8/8/4K3 b - - 0 1").unwrap();
        play(&mut board, "d7", "d5", Color::Black);
        assert!(board.is_legal_move(sq("e5"), sq("d6"), Color::White));

        let mut later = board.clone();
        play(&mut later, "e1", "f1", Color::White);
        play(&mut later, "e8", "f8", Color::Black);
        assert!(!later.is_legal_move(sq("e5"), sq("d6"), Color::White));

        let m = play(&mut board, "e5", "d6", Color::White);
        assert!(m.is_en_passant());
        assert_eq!(m.captured_square(), sq("d5"));
        assert_eq!(m.captured().map(|p| p.kind), Some(PieceKind::Pawn));
        assert!(board.piece_at(sq("d5")).is_none());
        assert_eq!(board.active_ids(Color::Black).len(), 1);
        assert_eq!(m.notation(), "e5xd6");
    }

    #[test]
    pub fn en_passant_undo_and_redo() {
        let mut board = Board::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let before = board.clone();
        let m = play(&mut board, "e5", "d6", Color::White);
        let after = board.clone();

        board.undo_move(&m);
        assert_eq!(board, before);
        assert_eq!(board.en_passant_target(), Some(sq("d6")));

        board.redo_move(&m);
        assert_eq!(board, after);
    }

    #[test]
    pub fn castling_moves_the_rook_and_undoes_cleanly() {
        let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let before = board.clone();

        let m = play(&mut board, "e1", "g1", Color::White);
        assert_eq!(m.notation(), "O-O");
        let rook = board.piece_at(sq("f1")).unwrap();
        assert_eq!(rook.kind, PieceKind::Rook);
        assert!(rook.has_moved);
        assert!(board.piece_at(sq("h1")).is_none());
        let after = board.clone();

        board.undo_move(&m);
        assert_eq!(board, before);
        assert!(!board.piece_at(sq("h1")).unwrap().has_moved);

        board.redo_move(&m);
        assert_eq!(board, after);

        let m = play(&mut board, "e8", "c8", Color::Black);
        assert_eq!(m.notation(), "O-O-O");
        assert_eq!(board.piece_at(sq("d8")).map(|p| p.kind), Some(PieceKind::Rook));
    }

    #[test]
    pub fn castling_fails_when_king_has_moved() {
        let mut board = Board::from_fen("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        play(&mut board, "e1", "f1", Color::White);
        play(&mut board, "e8", "d8", Color::Black);
        play(&mut board, "f1", "e1", Color::White);
        play(&mut board, "d8", "e8", Color::Black);
        assert!(!board.is_legal_move(sq("e1"), sq("g1"), Color::White));
        assert!(!board.is_legal_move(sq("e1"), sq("c1"), Color::White));
    }

    #[test]
    pub fn castling_fails_when_rook_has_moved() {
        let mut board = Board::from_fen("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        play(&mut board, "h1", "h2", Color::White);
        play(&mut board, "e8", "d8", Color::Black);
        play(&mut board, "h2", "h1", Color::White);
        play(&mut board, "d8", "e8", Color::Black);
        assert!(!board.is_legal_move(sq("e1"), sq("g1"), Color::White));
        assert!(board.is_legal_move(sq("e1"), sq("c1"), Color::White));
    }

    #[test]
    pub fn castling_fails_when_a_square_between_is_occupied() {
        let mut board = Board::from_fen("4k3/8/8/8/8/8/8/RN2K1NR w KQ - 0 1").unwrap();
        assert!(!board.is_legal_move(sq("e1"), sq("g1"), Color::White));
        // b1 is not crossed by the king but still has to be empty
        assert!(!board.is_legal_move(sq("e1"), sq("c1"), Color::White));
    }

    #[test]
    pub fn castling_fails_when_king_start_is_attacked() {
        let mut board = Board::from_fen("4r1k1/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        assert!(!board.is_legal_move(sq("e1"), sq("g1"), Color::White));
        assert!(!board.is_legal_move(sq("e1"), sq("c1"), Color::White));
    }

    #[test]
    pub fn castling_fails_when_transit_is_attacked() {
        let mut board = Board::from_fen("5rk1/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        assert!(!board.is_legal_move(sq("e1"), sq("g1"), Color::White));
        assert!(board.is_legal_move(sq("e1"), sq("c1"), Color::White));
    }

    #[test]
    pub fn castling_fails_when_destination_is_attacked() {
        let mut board = Board::from_fen("2r3k1/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        assert!(!board.is_legal_move(sq("e1"), sq("c1"), Color::White));
        assert!(board.is_legal_move(sq("e1"), sq("g1"), Color::White));
    }

    #[test]
    pub fn castling_allowed_when_only_rook_side_square_is_attacked() {
        // b1 is attacked but the king never crosses it
        let mut board = Board::from_fen("1r4k1/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        assert!(board.is_legal_move(sq("e1"), sq("c1"), Color::White));
    }

    #[test]
    pub fn promotion_replaces_pawn_and_undo_restores_the_same_pawn() {
        let mut board = Board::from_fen("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let pawn = *board.piece_at(sq("a7")).unwrap();
        let before = board.clone();

        let m = play(&mut board, "a7", "a8", Color::White);
        let queen = *board.piece_at(sq("a8")).unwrap();
        assert_eq!(queen.kind, PieceKind::Queen);
        assert_ne!(queen.id, pawn.id);
        assert!(board.active_ids(Color::White).contains(&queen.id));
        assert!(!board.active_ids(Color::White).contains(&pawn.id));
        assert_eq!(m.notation(), "a7-a8=Q");
        let after = board.clone();

        board.undo_move(&m);
        assert_eq!(*board.piece_at(sq("a7")).unwrap(), pawn);
        assert_eq!(board, before);

        board.redo_move(&m);
        assert_eq!(board, after);
        assert_eq!(board.piece_at(sq("a8")).unwrap().id, queen.id);
    }

    #[test]
    pub fn capturing_promotion_round_trip() {
        let mut board = Board::from_fen("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let before = board.clone();
        let m = play(&mut board, "a7", "b8", Color::White);
        assert_eq!(m.notation(), "a7xb8=Q");
        assert_eq!(m.captured().map(|p| p.kind), Some(PieceKind::Rook));
        assert_eq!(board.active_ids(Color::Black).len(), 1);

        board.undo_move(&m);
        assert_eq!(board, before);
    }

    #[test]
    pub fn first_move_flag_is_restored_only_for_first_moves() {
        let mut board = Board::new();
        let first = play(&mut board, "g1", "f3", Color::White);
        play(&mut board, "g8", "f6", Color::Black);
        let second = play(&mut board, "f3", "g1", Color::White);
        assert!(first.is_first_move());
        assert!(!second.is_first_move());

        board.undo_move(&second);
        assert!(board.piece_at(sq("f3")).unwrap().has_moved);
    }
}
