use std::fmt::Display;

use crate::{
    piece::{Color, PieceView},
    position::BOARD_SIZE,
};

/// Everything a caller may know about a game after any state changing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    /// Indexed `[row][col]`, row 0 is rank 1
    pub grid: [[Option<PieceView>; BOARD_SIZE as usize]; BOARD_SIZE as usize],
    pub active_color: Color,
    pub game_over: bool,
    pub result: Option<String>,
    /// Whether the side to move is in check
    pub in_check: bool,
    pub replaying: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub move_count: usize,
    pub move_history: String,
    /// Indexed by the capturing color, most recent capture first
    pub captured: [Vec<PieceView>; 2],
}

impl GameSnapshot {
    pub fn captured_by(&self, color: Color) -> &[PieceView] {
        &self.captured[color.index()]
    }
}

impl Display for GameSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in (0..BOARD_SIZE as usize).rev() {
            write!(f, "{} ", row + 1)?;
            let line = self.grid[row]
                .iter()
                .map(|square| square.map_or('.', |p| p.symbol()).to_string())
                .collect::<Vec<String>>()
                .join(" ");
            writeln!(f, "{line}")?;
        }
        writeln!(f, "  a b c d e f g h")?;

        match &self.result {
            Some(result) => writeln!(f, "{result}")?,
            None if self.in_check => writeln!(f, "{} to move, in check", self.active_color)?,
            None => writeln!(f, "{} to move", self.active_color)?,
        }
        if self.replaying {
            writeln!(f, "Replaying")?;
        }

        for color in [Color::White, Color::Black] {
            let captured = self.captured_by(color);
            if !captured.is_empty() {
                let symbols: String = captured.iter().map(|p| p.symbol()).collect();
                writeln!(f, "{color} captured: {symbols}")?;
            }
        }

        write!(f, "Moves ({}): {}", self.move_count, self.move_history)
    }
}
