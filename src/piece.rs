use std::fmt::Display;

use log::error;

use crate::position::Position;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row delta of a forward pawn step
    #[inline]
    pub const fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    #[inline]
    pub const fn pawn_start_row(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    #[inline]
    pub const fn home_row(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// The opponent's back rank
    #[inline]
    pub const fn promotion_row(self) -> u8 {
        self.opposite().home_row()
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceKind {
    pub const fn letter(self) -> char {
        match self {
            PieceKind::King => 'K',
            PieceKind::Queen => 'Q',
            PieceKind::Rook => 'R',
            PieceKind::Bishop => 'B',
            PieceKind::Knight => 'N',
            PieceKind::Pawn => 'P',
        }
    }

    pub fn from_letter(letter: char) -> Option<PieceKind> {
        match letter.to_ascii_uppercase() {
            'K' => Some(PieceKind::King),
            'Q' => Some(PieceKind::Queen),
            'R' => Some(PieceKind::Rook),
            'B' => Some(PieceKind::Bishop),
            'N' => Some(PieceKind::Knight),
            'P' => Some(PieceKind::Pawn),
            _ => None,
        }
    }
}

/// Identity of a piece entity, unique within one board's lifetime.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PieceId(u16);

impl PieceId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Piece {
    pub id: PieceId,
    pub kind: PieceKind,
    pub color: Color,
    pub position: Position,
    pub has_moved: bool,
}

impl Piece {
    /// FEN style letter, uppercase for white
    pub fn symbol(&self) -> char {
        match self.color {
            Color::White => self.kind.letter(),
            Color::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }

    pub fn view(&self) -> PieceView {
        PieceView {
            kind: self.kind,
            color: self.color,
        }
    }
}

/// What a collaborator may know about a piece: no identity, no location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PieceView {
    pub kind: PieceKind,
    pub color: Color,
}

impl PieceView {
    pub fn symbol(&self) -> char {
        match self.color {
            Color::White => self.kind.letter(),
            Color::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }
}

/// Owns every piece entity a board has created and hands out their ids.
///
/// Ids are the index into `pieces`, so they are dense and assigned in creation order. Only the most recently
/// created piece may be released, which is what undoing a promotion needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PieceArena {
    pieces: Vec<Piece>,
}

impl PieceArena {
    pub fn spawn(&mut self, kind: PieceKind, color: Color, position: Position) -> PieceId {
        let id = PieceId(self.pieces.len() as u16);
        self.pieces.push(Piece {
            id,
            kind,
            color,
            position,
            has_moved: false,
        });
        id
    }

    pub fn release(&mut self, id: PieceId) {
        if id.index() + 1 != self.pieces.len() {
            error!(
                "PieceArena release: {id:?} is not the last created piece, {} pieces exist",
                self.pieces.len()
            );
            panic!("PieceArena release called out of order");
        }

        self.pieces.pop();
    }

    /// Puts back the most recently released piece, keeping its original id.
    pub fn restore(&mut self, piece: Piece) {
        let len = self.pieces.len();
        if piece.id.index() != len {
            error!("PieceArena restore: {:?} is not the next id, {len} pieces exist", piece.id);
            panic!("PieceArena restore called out of order");
        }

        self.pieces.push(piece);
    }

    #[inline]
    pub fn get(&self, id: PieceId) -> &Piece {
        &self.pieces[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: PieceId) -> &mut Piece {
        &mut self.pieces[id.index()]
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}
