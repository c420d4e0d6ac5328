use std::{collections::BTreeSet, fmt::Debug};

use crate::{
    piece::{Color, Piece, PieceArena, PieceId, PieceKind},
    position::{BOARD_SIZE, Position},
};

pub static STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

pub const KING_START_COL: u8 = 4;
pub const KINGSIDE_ROOK_COL: u8 = 7;
pub const QUEENSIDE_ROOK_COL: u8 = 0;

/// One chess position. The grid and the two active sets always hold exactly the same pieces.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    squares: [[Option<PieceId>; BOARD_SIZE as usize]; BOARD_SIZE as usize],
    pub(crate) arena: PieceArena,
    pub(crate) active: [BTreeSet<PieceId>; 2],
    kings: [PieceId; 2],
    pub(crate) en_passant_target: Option<Position>,
}

impl Board {
    /// The standard starting position. Pieces get ids rank by rank from a1, so every new board agrees on them.
    pub fn new() -> Board {
        match build_starting_position() {
            Ok(board) => board,
            Err(msg) => unreachable!("starting position is always valid: {msg}"),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Board, String> {
        parse_fen(fen).map(|(board, _)| board)
    }

    /// Square a pawn may capture onto en passant on this ply only
    #[inline]
    pub fn en_passant_target(&self) -> Option<Position> {
        self.en_passant_target
    }

    #[inline]
    pub fn piece_id_at(&self, pos: Position) -> Option<PieceId> {
        if !pos.is_on_board() {
            return None;
        }
        self.squares[pos.row() as usize][pos.col() as usize]
    }

    #[inline]
    pub fn piece_at(&self, pos: Position) -> Option<&Piece> {
        self.piece_id_at(pos).map(|id| self.arena.get(id))
    }

    #[inline]
    pub fn piece(&self, id: PieceId) -> &Piece {
        self.arena.get(id)
    }

    #[inline]
    pub(crate) fn set_square(&mut self, pos: Position, id: Option<PieceId>) {
        self.squares[pos.row() as usize][pos.col() as usize] = id;
    }

    pub fn king(&self, color: Color) -> &Piece {
        self.arena.get(self.kings[color.index()])
    }

    /// Pieces of `color` still on the board, in creation order
    pub fn active_pieces(&self, color: Color) -> impl Iterator<Item = &Piece> {
        self.active[color.index()].iter().map(|id| self.arena.get(*id))
    }

    pub fn active_ids(&self, color: Color) -> &BTreeSet<PieceId> {
        &self.active[color.index()]
    }

    /// Checks that the grid and the active sets describe the same pieces.
    pub fn is_consistent(&self) -> bool {
        let mut on_grid = 0;
        for pos in Position::all() {
            if let Some(id) = self.piece_id_at(pos) {
                on_grid += 1;
                let piece = self.arena.get(id);
                if piece.position != pos || !self.active[piece.color.index()].contains(&id) {
                    return false;
                }
            }
        }

        on_grid == self.active[0].len() + self.active[1].len()
            && self.kings.iter().all(|id| self.active[self.arena.get(*id).color.index()].contains(id))
    }

    pub fn to_fen(&self, side_to_move: Color) -> String {
        let mut placement = String::new();
        for row in (0..BOARD_SIZE).rev() {
            let mut empty = 0;
            for col in 0..BOARD_SIZE {
                match self.piece_at(Position::new(row, col)) {
                    Some(piece) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.symbol());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if row > 0 {
                placement.push('/');
            }
        }

        let side = match side_to_move {
            Color::White => "w",
            Color::Black => "b",
        };

        let mut castling = String::new();
        for color in [Color::White, Color::Black] {
            for (rook_col, letter) in [(KINGSIDE_ROOK_COL, 'K'), (QUEENSIDE_ROOK_COL, 'Q')] {
                if self.castling_pieces_unmoved(color, rook_col) {
                    castling.push(match color {
                        Color::White => letter,
                        Color::Black => letter.to_ascii_lowercase(),
                    });
                }
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }

        let ep = match self.en_passant_target {
            Some(pos) => pos.to_notation(),
            None => String::from("-"),
        };

        format!("{placement} {side} {castling} {ep}")
    }

    fn castling_pieces_unmoved(&self, color: Color, rook_col: u8) -> bool {
        let home = color.home_row();
        let king = self.king(color);
        if king.has_moved || king.position != Position::new(home, KING_START_COL) {
            return false;
        }

        matches!(
            self.piece_at(Position::new(home, rook_col)),
            Some(rook) if rook.kind == PieceKind::Rook && rook.color == color && !rook.has_moved
        )
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

#[derive(Default)]
struct BoardBuilder {
    squares: [[Option<PieceId>; BOARD_SIZE as usize]; BOARD_SIZE as usize],
    arena: PieceArena,
    active: [BTreeSet<PieceId>; 2],
    kings: [Option<PieceId>; 2],
}

impl BoardBuilder {
    fn place(&mut self, kind: PieceKind, color: Color, pos: Position, has_moved: bool) -> Result<(), String> {
        if kind == PieceKind::King && self.kings[color.index()].is_some() {
            return Err(format!("Found a second {color} king on {pos}"));
        }

        let id = self.arena.spawn(kind, color, pos);
        self.arena.get_mut(id).has_moved = has_moved;
        self.squares[pos.row() as usize][pos.col() as usize] = Some(id);
        self.active[color.index()].insert(id);
        if kind == PieceKind::King {
            self.kings[color.index()] = Some(id);
        }

        Ok(())
    }

    fn finish(self, en_passant_target: Option<Position>) -> Result<Board, String> {
        let (Some(white_king), Some(black_king)) = (self.kings[0], self.kings[1]) else {
            return Err(String::from("Expected exactly one king of each color"));
        };

        Ok(Board {
            squares: self.squares,
            arena: self.arena,
            active: self.active,
            kings: [white_king, black_king],
            en_passant_target,
        })
    }
}

fn build_starting_position() -> Result<Board, String> {
    let mut builder = BoardBuilder::default();
    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE {
            let (kind, color) = match row {
                0 => (BACK_RANK[col as usize], Color::White),
                1 => (PieceKind::Pawn, Color::White),
                6 => (PieceKind::Pawn, Color::Black),
                7 => (BACK_RANK[col as usize], Color::Black),
                _ => continue,
            };
            builder.place(kind, color, Position::new(row, col), false)?;
        }
    }

    builder.finish(None)
}

/// Reads a FEN record into a board and the side to move.
///
/// The halfmove clock and fullmove number may be omitted; when present they are validated and then dropped. Kings
/// and rooks count as unmoved only when the castling field still allows them to castle, and pawns count as unmoved
/// only on their starting rank.
pub fn parse_fen(fen: &str) -> Result<(Board, Color), String> {
    if !fen.is_ascii() {
        return Err(String::from("Expected FEN to only contain ASCII characters"));
    }

    let fen_pieces: Vec<&str> = fen.split_ascii_whitespace().collect();
    if fen_pieces.len() != 4 && fen_pieces.len() != 6 {
        return Err(format!(
            "Expected FEN to have 4 or 6 space-delimited parts but it had {}",
            fen_pieces.len()
        ));
    }

    let side_to_move = match fen_pieces[1] {
        "w" => Color::White,
        "b" => Color::Black,
        other => return Err(format!("Encountered unexpected Side to move value '{other}'")),
    };

    let mut rights = [[false; 2]; 2];
    if fen_pieces[2] != "-" {
        for c in fen_pieces[2].chars() {
            match c {
                'K' => rights[0][0] = true,
                'Q' => rights[0][1] = true,
                'k' => rights[1][0] = true,
                'q' => rights[1][1] = true,
                _ => {
                    return Err(format!(
                        "Encountered unexpected character {c} while processing castling rights"
                    ));
                }
            }
        }
    }

    let ranks: Vec<&str> = fen_pieces[0].split('/').collect();
    if ranks.len() != BOARD_SIZE as usize {
        return Err(format!("Expected 8 ranks in piece placement but found {}", ranks.len()));
    }

    let mut builder = BoardBuilder::default();
    // Rank 1 first so ids come out in the same order as Board::new
    for (rank_index, rank) in ranks.iter().rev().enumerate() {
        let row = rank_index as u8;
        let mut col: u8 = 0;
        for c in rank.chars() {
            match c {
                '1'..='8' => {
                    col += c as u8 - b'0';
                    if col > BOARD_SIZE {
                        return Err(format!("Rank {} of piece placement has more than 8 files", row + 1));
                    }
                }
                _ => {
                    let Some(kind) = PieceKind::from_letter(c) else {
                        return Err(format!(
                            "Encountered unexpected character {c} while processing piece placement"
                        ));
                    };
                    if col >= BOARD_SIZE {
                        return Err(format!("Rank {} of piece placement has more than 8 files", row + 1));
                    }

                    let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
                    let pos = Position::new(row, col);
                    let has_moved = match kind {
                        PieceKind::Pawn => {
                            if row == color.promotion_row() || row == color.home_row() {
                                return Err(format!("Found a {color} pawn on its back rank at {pos}"));
                            }
                            row != color.pawn_start_row()
                        }
                        PieceKind::King => {
                            let rights = rights[color.index()];
                            !((rights[0] || rights[1]) && pos == Position::new(color.home_row(), KING_START_COL))
                        }
                        PieceKind::Rook => {
                            let rights = rights[color.index()];
                            let home = color.home_row();
                            !((rights[0] && pos == Position::new(home, KINGSIDE_ROOK_COL))
                                || (rights[1] && pos == Position::new(home, QUEENSIDE_ROOK_COL)))
                        }
                        _ => false,
                    };
                    builder.place(kind, color, pos, has_moved)?;
                    col += 1;
                }
            }
        }

        if col != BOARD_SIZE {
            return Err(format!("Rank {} of piece placement covers {col} files instead of 8", row + 1));
        }
    }

    let en_passant_target = if fen_pieces[3] == "-" {
        None
    } else {
        let pos = Position::from_notation(fen_pieces[3])?;
        if pos.row() != 2 && pos.row() != 5 {
            return Err(format!(
                "Expected en passant target square to be on rank 3 or 6 but it was '{}'",
                fen_pieces[3]
            ));
        }
        Some(pos)
    };

    if fen_pieces.len() == 6 {
        if let Err(e) = fen_pieces[4].parse::<u16>() {
            return Err(format!(
                "Encountered error while parsing halfmove counter value '{}' as u16: {e}",
                fen_pieces[4]
            ));
        }
        if let Err(e) = fen_pieces[5].parse::<u16>() {
            return Err(format!(
                "Encountered error while parsing fullmove counter value '{}' as u16: {e}",
                fen_pieces[5]
            ));
        }
    }

    let board = builder.finish(en_passant_target)?;
    if board.is_in_check(side_to_move.opposite()) {
        return Err(format!(
            "{} is in check but it is {side_to_move}'s turn to move",
            side_to_move.opposite()
        ));
    }

    Ok((board, side_to_move))
}

impl Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("squares", &"See end value")
            .field("white_active", &self.active[0].len())
            .field("black_active", &self.active[1].len())
            .field("en_passant_target", &self.en_passant_target)
            .finish()?;

        // Ranks reversed so it prints with a1 in the bottom left like viewing the board as white
        let pretty_squares = (0..BOARD_SIZE)
            .rev()
            .map(|row| {
                (0..BOARD_SIZE)
                    .map(|col| self.piece_at(Position::new(row, col)).map_or('.', |p| p.symbol()).to_string())
                    .collect::<Vec<String>>()
                    .join(" ")
            })
            .collect::<Vec<String>>()
            .join("\n");

        writeln!(f, "\nsquares: \n{pretty_squares}")
    }
}

#[cfg(test)]
mod board_tests {
    use super::{Board, STARTING_FEN, parse_fen};
    use crate::{
        piece::{Color, PieceKind},
        position::Position,
    };

    #[test]
    pub fn starting_position_layout() {
        let board = Board::new();
        assert!(board.is_consistent());
        assert_eq!(board.active_ids(Color::White).len(), 16);
        assert_eq!(board.active_ids(Color::Black).len(), 16);
        assert_eq!(board.king(Color::White).position, Position::from_notation("e1").unwrap());
        assert_eq!(board.king(Color::Black).position, Position::from_notation("e8").unwrap());

        let d8 = board.piece_at(Position::from_notation("d8").unwrap()).unwrap();
        assert_eq!((d8.kind, d8.color), (PieceKind::Queen, Color::Black));
        assert!(board.piece_at(Position::from_notation("e4").unwrap()).is_none());
        assert_eq!(board.en_passant_target(), None);
    }

    #[test]
    pub fn starting_fen_round_trips_and_matches_new() {
        let (from_fen, side) = parse_fen(STARTING_FEN).unwrap();
        assert_eq!(side, Color::White);
        assert_eq!(from_fen.to_fen(side), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -");
        assert_eq!(from_fen, Board::new());
    }

    #[test]
    pub fn fen_castling_rights_become_moved_flags() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1").unwrap();
        let at = |s: &str| board.piece_at(Position::from_notation(s).unwrap()).unwrap();
        assert!(!at("e1").has_moved);
        assert!(!at("h1").has_moved);
        assert!(at("a1").has_moved);
        assert!(!at("e8").has_moved);
        assert!(at("h8").has_moved);
        assert!(!at("a8").has_moved);
        assert_eq!(board.to_fen(Color::White), "r3k2r/8/8/8/8/8/8/R3K2R w Kq -");
    }

    #[test]
    pub fn fen_en_passant_target_is_read() {
        let (board, side) =
            parse_fen("rnbqkbnr/pppp1ppp/8/8/4Pp2/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 3").unwrap();
        assert_eq!(side, Color::Black);
        assert_eq!(board.en_passant_target(), Some(Position::from_notation("e3").unwrap()));
    }

    #[test]
    pub fn invalid_fens_are_rejected() {
        for fen in [
            "",
            "8/8/8/8/8/8/8/8 w - -",
            "4k3/8/8/8/8/8/8/4K2K w - -",
            "4k3/8/8/8/8/8/8/4K3 x - -",
            "4k3/8/8/8/8/8/8/4K3 w X -",
            "4k3/8/8/8/8/8/8 w - -",
            "4k3/9/8/8/8/8/8/4K3 w - -",
            "4k3/8/8/8/8/8/8/4K3 w - e4",
            "4k3/8/8/8/8/8/8/4K3 w - - x 1",
            "P3k3/8/8/8/8/8/8/4K3 w - -",
            "4k3/8/8/8/8/8/8/4K3 w -",
            "4k3/8/8/8/8/8/8/4K35 w - -",
            "4k3/8/8/8/8/8/8/4K44 w - -",
        ] {
            assert!(parse_fen(fen).is_err(), "'{fen}' should not parse");
        }
    }

    #[test]
    pub fn overlong_rank_of_digits_is_rejected() {
        // 32 eights add up past u8::MAX
        let fen = format!("{}/8/8/8/8/8/8/4K2k w - -", "8".repeat(32));
        assert!(parse_fen(&fen).is_err());
        assert!(parse_fen("88/8/8/8/8/8/8/4K2k w - -").is_err());
    }

    #[test]
    pub fn side_not_to_move_in_check_is_rejected() {
        // White to move could simply take the black king
        assert!(parse_fen("4k3/8/8/8/8/8/8/4R1K1 w - -").is_err());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4R1K1 w - - 0 1").is_err());

        // The side to move may be in check
        let (board, side) = parse_fen("4k3/8/8/8/8/8/8/4R1K1 b - -").unwrap();
        assert_eq!(side, Color::Black);
        assert!(board.is_in_check(Color::Black));
    }
}
