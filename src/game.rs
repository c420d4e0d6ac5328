use std::fmt::Display;

use log::{debug, error, info};
use rand::{Rng, seq::SliceRandom};

use crate::{
    board::{Board, parse_fen},
    captured_set::CapturedSet,
    move_generator::Destinations,
    moves::Move,
    piece::Color,
    position::{BOARD_SIZE, Position},
    snapshot::GameSnapshot,
    timeline::Timeline,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameResult {
    Checkmate { winner: Color },
    Stalemate,
}

impl Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameResult::Checkmate { winner } => write!(f, "{winner} wins by checkmate!"),
            GameResult::Stalemate => write!(f, "Draw by stalemate!"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameState {
    Active,
    /// No new moves, but undo is still allowed and resumes the game
    GameOver(GameResult),
    /// Stepping through recorded moves from the start. No new moves, no undo or redo.
    Replaying,
}

/// One game: the board, whose turn it is, the move history and what each side has captured.
///
/// All mutation goes through here. Every rejected request returns `false` and leaves the game untouched.
pub struct GameController {
    initial_board: Board,
    initial_turn: Color,
    board: Board,
    turn: Color,
    timeline: Timeline,
    /// Indexed by the capturing color
    captured: [CapturedSet; 2],
    state: GameState,
}

impl GameController {
    pub fn new() -> GameController {
        GameController::with_position(Board::new(), Color::White)
    }

    pub fn from_fen(fen: &str) -> Result<GameController, String> {
        let (board, turn) = parse_fen(fen)?;
        Ok(GameController::with_position(board, turn))
    }

    fn with_position(board: Board, turn: Color) -> GameController {
        let mut game = GameController {
            initial_board: board.clone(),
            initial_turn: turn,
            board,
            turn,
            timeline: Timeline::new(),
            captured: Default::default(),
            state: GameState::Active,
        };
        game.update_status();
        game
    }

    pub fn make_move(&mut self, from: &str, to: &str) -> bool {
        let from = match Position::from_notation(from) {
            Ok(pos) => pos,
            Err(msg) => {
                debug!("Rejected move: {msg}");
                return false;
            }
        };
        let to = match Position::from_notation(to) {
            Ok(pos) => pos,
            Err(msg) => {
                debug!("Rejected move: {msg}");
                return false;
            }
        };

        self.make_move_at(from, to)
    }

    pub fn make_move_at(&mut self, from: Position, to: Position) -> bool {
        if self.state != GameState::Active {
            debug!("Rejected move {from}-{to} while {:?}", self.state);
            return false;
        }
        if !self.board.is_legal_move(from, to, self.turn) {
            debug!("Rejected illegal move {from}-{to} for {}", self.turn);
            return false;
        }

        let r#move = self.board.apply_move(from, to);
        self.timeline.record_move(r#move);
        self.advance(&r#move);
        self.update_status();
        true
    }

    pub fn undo(&mut self) -> bool {
        if self.state == GameState::Replaying {
            debug!("Rejected undo while replaying");
            return false;
        }
        let Some(r#move) = self.timeline.undo() else {
            return false;
        };

        self.board.undo_move(&r#move);
        if let Some(captured) = r#move.captured() {
            self.captured[r#move.piece().color.index()].remove(captured.id);
        }
        self.turn = self.turn.opposite();
        self.state = GameState::Active;
        debug!("Undid {}", r#move);
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.state == GameState::Replaying {
            debug!("Rejected redo while replaying");
            return false;
        }
        let Some(r#move) = self.timeline.redo() else {
            return false;
        };

        self.board.redo_move(&r#move);
        self.advance(&r#move);
        self.update_status();
        debug!("Redid {}", r#move);
        true
    }

    /// Rewinds to the starting position, keeping every recorded move for [`GameController::replay_step`].
    pub fn start_replay(&mut self) {
        self.board = self.initial_board.clone();
        self.turn = self.initial_turn;
        for set in &mut self.captured {
            set.clear();
        }
        self.timeline.reset_to_start();
        self.state = GameState::Replaying;
        info!("Replaying {} recorded moves", self.timeline.len());
    }

    /// Plays the next recorded move. Returns false and leaves replay mode once none remain.
    pub fn replay_step(&mut self) -> bool {
        if self.state != GameState::Replaying {
            return false;
        }

        match self.timeline.redo() {
            Some(r#move) => {
                self.board.redo_move(&r#move);
                self.advance(&r#move);
                true
            }
            None => {
                self.state = GameState::Active;
                self.update_status();
                false
            }
        }
    }

    pub fn end_replay(&mut self) {
        while self.replay_step() {}

        if self.state == GameState::Replaying {
            self.state = GameState::Active;
        }
        self.update_status();
    }

    /// Back to the starting position with the history thrown away.
    pub fn reset_game(&mut self) {
        self.timeline.clear();
        self.board = self.initial_board.clone();
        self.turn = self.initial_turn;
        for set in &mut self.captured {
            set.clear();
        }
        self.state = GameState::Active;
        self.update_status();
        info!("Game reset");
    }

    pub fn can_undo(&self) -> bool {
        self.state != GameState::Replaying && self.timeline.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.state != GameState::Replaying && self.timeline.can_redo()
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn captured_by(&self, color: Color) -> &CapturedSet {
        &self.captured[color.index()]
    }

    pub fn fen(&self) -> String {
        self.board.to_fen(self.turn)
    }

    /// Where the side to move may send the piece on `square`. Empty unless the game is active.
    pub fn legal_destinations(&mut self, square: &str) -> Result<Destinations, String> {
        let from = Position::from_notation(square)?;
        let owned_by_turn = self.board.piece_at(from).is_some_and(|p| p.color == self.turn);
        if self.state != GameState::Active || !owned_by_turn {
            return Ok(Destinations::new());
        }

        Ok(self.board.legal_destinations(from))
    }

    /// Every legal move for the side to move, empty unless the game is active.
    pub fn legal_moves(&mut self) -> Vec<(Position, Position)> {
        if self.state != GameState::Active {
            return Vec::new();
        }
        self.board.legal_moves(self.turn)
    }

    /// Plays up to `plies` random legal moves and returns how many were played. Stops early when the game ends.
    pub fn play_random_moves<R: Rng>(&mut self, plies: u32, rng: &mut R) -> u32 {
        let mut played = 0;
        while played < plies {
            let moves = self.legal_moves();
            let Some((from, to)) = moves.choose(rng).copied() else {
                break;
            };
            if !self.make_move_at(from, to) {
                error!("Random move {from}-{to} was generated as legal but rejected. {:?}", self.board);
                break;
            }
            played += 1;
        }

        played
    }

    /// Numbered move pairs such as `1. e2-e4 e7-e5 2. Ng1-f3`, covering every recorded move.
    pub fn move_history_string(&self) -> String {
        let offset = match self.initial_turn {
            Color::White => 0,
            Color::Black => 1,
        };

        let mut parts = Vec::with_capacity(self.timeline.len() * 2);
        for (i, r#move) in self.timeline.iter().enumerate() {
            let ply = i + offset;
            let number = ply / 2 + 1;
            if ply % 2 == 0 {
                parts.push(format!("{number}."));
            } else if i == 0 {
                parts.push(format!("{number}..."));
            }
            parts.push(r#move.notation());
        }

        parts.join(" ")
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut grid = [[None; BOARD_SIZE as usize]; BOARD_SIZE as usize];
        for pos in Position::all() {
            grid[pos.row() as usize][pos.col() as usize] = self.board.piece_at(pos).map(|p| p.view());
        }

        let (game_over, result) = match self.state {
            GameState::GameOver(result) => (true, Some(result.to_string())),
            _ => (false, None),
        };

        GameSnapshot {
            grid,
            active_color: self.turn,
            game_over,
            result,
            in_check: self.board.is_in_check(self.turn),
            replaying: self.state == GameState::Replaying,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            move_count: self.timeline.len(),
            move_history: self.move_history_string(),
            captured: [Color::White, Color::Black]
                .map(|color| self.captured[color.index()].iter().map(|p| p.view()).collect()),
        }
    }

    /// Bookkeeping shared by new moves, redo and replay once the board has the move on it.
    fn advance(&mut self, r#move: &Move) {
        if let Some(captured) = r#move.captured() {
            self.captured[r#move.piece().color.index()].push_front(*captured);
        }
        self.turn = self.turn.opposite();
    }

    fn update_status(&mut self) {
        if self.state == GameState::Replaying {
            return;
        }

        self.state = if self.board.has_any_legal_move(self.turn) {
            GameState::Active
        } else if self.board.is_in_check(self.turn) {
            GameState::GameOver(GameResult::Checkmate {
                winner: self.turn.opposite(),
            })
        } else {
            GameState::GameOver(GameResult::Stalemate)
        };

        if let GameState::GameOver(result) = self.state {
            info!("Game over: {result}");
        }
    }
}

impl Default for GameController {
    fn default() -> Self {
        GameController::new()
    }
}

impl Display for GameController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.snapshot())
    }
}
