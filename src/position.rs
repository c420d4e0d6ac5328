use std::fmt::{Debug, Display};

pub const BOARD_SIZE: u8 = 8;

/// A square on the board. Row 0 is rank 1 and col 0 is file a, so a1 is (0, 0) and h8 is (7, 7).
#[derive(PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    row: u8,
    col: u8,
}

impl Position {
    #[inline]
    pub const fn new(row: u8, col: u8) -> Position {
        debug_assert!(row < BOARD_SIZE && col < BOARD_SIZE);
        Position { row, col }
    }

    /// Parses exactly one file letter `a`-`h` followed by one rank digit `1`-`8`.
    pub fn from_notation(notation: &str) -> Result<Position, String> {
        let bytes = notation.as_bytes();
        if bytes.len() != 2 {
            return Err(format!(
                "Expected square notation to be 2 characters long but it was {}. Value: '{notation}'",
                notation.chars().count()
            ));
        }

        let col = match bytes[0] {
            b'a'..=b'h' => bytes[0] - b'a',
            _ => {
                return Err(format!(
                    "Encountered unexpected file '{}' in square notation '{notation}'",
                    bytes[0] as char
                ));
            }
        };

        let row = match bytes[1] {
            b'1'..=b'8' => bytes[1] - b'1',
            _ => {
                return Err(format!(
                    "Encountered unexpected rank '{}' in square notation '{notation}'",
                    bytes[1] as char
                ));
            }
        };

        Ok(Position { row, col })
    }

    pub fn to_notation(&self) -> String {
        format!("{}{}", (b'a' + self.col) as char, (b'1' + self.row) as char)
    }

    #[inline]
    pub const fn row(&self) -> u8 {
        self.row
    }

    #[inline]
    pub const fn col(&self) -> u8 {
        self.col
    }

    #[inline]
    pub const fn is_on_board(&self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }

    /// Square reached by moving `row_delta` ranks and `col_delta` files, if it is still on the board.
    #[inline]
    pub fn offset(&self, row_delta: i8, col_delta: i8) -> Option<Position> {
        let row = self.row as i8 + row_delta;
        let col = self.col as i8 + col_delta;
        if (0..BOARD_SIZE as i8).contains(&row) && (0..BOARD_SIZE as i8).contains(&col) {
            Some(Position::new(row as u8, col as u8))
        } else {
            None
        }
    }

    /// All 64 squares, a1 first and h8 last.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Position::new(row, col)))
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_notation())
    }
}

impl Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_notation())
    }
}
