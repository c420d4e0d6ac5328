use std::sync::LazyLock;

use log::{debug, error};
use num_format::{Locale, ToFormattedString};
use regex::Regex;

use crate::game::{GameController, GameState};

/// Deeper than this takes minutes with a full legality scan per candidate
pub const MAX_PERFT_DEPTH: u8 = 5;

static MOVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^move\s+(\S+)\s+(\S+)$").unwrap());
static SHORTHAND_MOVE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-h][1-8])([a-h][1-8])$").unwrap());
static REPLAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^replay\s+(start|next|end)$").unwrap());
static MOVES_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^moves\s+(\S+)$").unwrap());
static PERFT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^perft\s+(\d+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move { from: String, to: String },
    Undo,
    Redo,
    ReplayStart,
    ReplayNext,
    ReplayEnd,
    Reset,
    Moves(String),
    Show,
    History,
    Fen,
    Perft(u8),
    Quit,
}

/// Reads one command line. Blank lines and lines starting with `#` give `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let command = match line {
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "reset" => Command::Reset,
        "show" => Command::Show,
        "history" => Command::History,
        "fen" => Command::Fen,
        "quit" | "exit" => Command::Quit,
        _ => {
            if let Some(caps) = MOVE_PATTERN.captures(line).or_else(|| SHORTHAND_MOVE_PATTERN.captures(line)) {
                Command::Move {
                    from: caps[1].to_string(),
                    to: caps[2].to_string(),
                }
            } else if let Some(caps) = REPLAY_PATTERN.captures(line) {
                match &caps[1] {
                    "start" => Command::ReplayStart,
                    "next" => Command::ReplayNext,
                    _ => Command::ReplayEnd,
                }
            } else if let Some(caps) = MOVES_PATTERN.captures(line) {
                Command::Moves(caps[1].to_string())
            } else if let Some(caps) = PERFT_PATTERN.captures(line) {
                let depth = match caps[1].parse::<u8>() {
                    Ok(d) if (1..=MAX_PERFT_DEPTH).contains(&d) => d,
                    _ => {
                        return Err(format!(
                            "Expected perft depth between 1 and {MAX_PERFT_DEPTH} but it was '{}'",
                            &caps[1]
                        ));
                    }
                };
                Command::Perft(depth)
            } else {
                return Err(format!("Unknown command '{line}'"));
            }
        }
    };

    Ok(Some(command))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Output(String),
    Quit,
}

/// Drives one game from text commands, the way a terminal or a script would.
#[derive(Default)]
pub struct CommandInterface {
    game: GameController,
}

impl CommandInterface {
    pub fn new(game: GameController) -> CommandInterface {
        CommandInterface { game }
    }

    pub fn game(&self) -> &GameController {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameController {
        &mut self.game
    }

    pub fn process_command(&mut self, cmd: &str) -> CommandOutcome {
        debug!("Received cmd string '{cmd}'");
        let command = match parse_command(cmd) {
            Ok(Some(command)) => command,
            Ok(None) => return CommandOutcome::Output(String::new()),
            Err(msg) => {
                error!("Failed to parse command. Error message: {msg}");
                return CommandOutcome::Output(format!("Error: {msg}"));
            }
        };

        let output = match command {
            Command::Move { from, to } => {
                if self.game.make_move(&from, &to) {
                    self.describe_last_move()
                } else {
                    match self.game.state() {
                        GameState::Active => format!("Illegal move {from}-{to}"),
                        GameState::GameOver(result) => format!("The game is over: {result}"),
                        GameState::Replaying => String::from("Cannot move while replaying"),
                    }
                }
            }
            Command::Undo => {
                let undone = self.game.timeline().current().map(|m| m.to_string());
                if self.game.undo() {
                    format!("Undid {}", undone.unwrap_or_default())
                } else if self.game.state() == GameState::Replaying {
                    String::from("Cannot undo while replaying")
                } else {
                    String::from("Nothing to undo")
                }
            }
            Command::Redo => {
                if self.game.redo() {
                    format!("Redid {}", self.describe_last_move())
                } else if self.game.state() == GameState::Replaying {
                    String::from("Cannot redo while replaying")
                } else {
                    String::from("Nothing to redo")
                }
            }
            Command::ReplayStart => {
                self.game.start_replay();
                format!("Replaying {} moves from the start", self.game.timeline().len())
            }
            Command::ReplayNext => {
                if self.game.state() != GameState::Replaying {
                    String::from("Not replaying")
                } else if self.game.replay_step() {
                    format!("Replayed {}", self.describe_last_move())
                } else {
                    String::from("Replay finished")
                }
            }
            Command::ReplayEnd => {
                self.game.end_replay();
                String::from("Replay finished")
            }
            Command::Reset => {
                self.game.reset_game();
                String::from("Game reset")
            }
            Command::Moves(square) => match self.game.legal_destinations(&square) {
                Ok(destinations) if destinations.is_empty() => format!("No legal moves from {square}"),
                Ok(destinations) => destinations
                    .iter()
                    .map(|pos| pos.to_notation())
                    .collect::<Vec<String>>()
                    .join(" "),
                Err(msg) => {
                    error!("Failed to parse square for moves command. Error message: {msg}");
                    format!("Error: {msg}")
                }
            },
            Command::Show => self.game.snapshot().to_string(),
            Command::History => {
                let history = self.game.move_history_string();
                if history.is_empty() { String::from("No moves yet") } else { history }
            }
            Command::Fen => self.game.fen(),
            Command::Perft(depth) => {
                let mut board = self.game.board().clone();
                let stats = board.start_perft(self.game.turn(), depth);
                format!(
                    "Nodes: {}, captures: {}, en passant: {}, castles: {}, promotions: {}, checks: {}",
                    stats.nodes.to_formatted_string(&Locale::en),
                    stats.captures.to_formatted_string(&Locale::en),
                    stats.eps,
                    stats.castles,
                    stats.promotions,
                    stats.checks.to_formatted_string(&Locale::en)
                )
            }
            Command::Quit => return CommandOutcome::Quit,
        };

        CommandOutcome::Output(output)
    }

    fn describe_last_move(&self) -> String {
        let Some(r#move) = self.game.timeline().current() else {
            return String::new();
        };

        match self.game.state() {
            GameState::GameOver(result) => format!("{}\n{result}", r#move),
            _ if self.game.board().is_in_check(self.game.turn()) => {
                format!("{}\n{} is in check", r#move, self.game.turn())
            }
            _ => r#move.to_string(),
        }
    }
}

#[cfg(test)]
mod commands_tests {
    use super::{Command, CommandInterface, CommandOutcome, parse_command};

    fn output(interface: &mut CommandInterface, cmd: &str) -> String {
        match interface.process_command(cmd) {
            CommandOutcome::Output(s) => s,
            CommandOutcome::Quit => panic!("'{cmd}' should not quit"),
        }
    }

    #[test]
    pub fn parses_every_command() {
        let mv = |from: &str, to: &str| Command::Move {
            from: from.to_string(),
            to: to.to_string(),
        };
        assert_eq!(parse_command("move e2 e4"), Ok(Some(mv("e2", "e4"))));
        assert_eq!(parse_command("  move   g1  f3 "), Ok(Some(mv("g1", "f3"))));
        assert_eq!(parse_command("e7e5"), Ok(Some(mv("e7", "e5"))));
        assert_eq!(parse_command("undo"), Ok(Some(Command::Undo)));
        assert_eq!(parse_command("redo"), Ok(Some(Command::Redo)));
        assert_eq!(parse_command("replay start"), Ok(Some(Command::ReplayStart)));
        assert_eq!(parse_command("replay next"), Ok(Some(Command::ReplayNext)));
        assert_eq!(parse_command("replay end"), Ok(Some(Command::ReplayEnd)));
        assert_eq!(parse_command("reset"), Ok(Some(Command::Reset)));
        assert_eq!(parse_command("moves b1"), Ok(Some(Command::Moves(String::from("b1")))));
        assert_eq!(parse_command("show"), Ok(Some(Command::Show)));
        assert_eq!(parse_command("history"), Ok(Some(Command::History)));
        assert_eq!(parse_command("fen"), Ok(Some(Command::Fen)));
        assert_eq!(parse_command("perft 3"), Ok(Some(Command::Perft(3))));
        assert_eq!(parse_command("quit"), Ok(Some(Command::Quit)));
        assert_eq!(parse_command(""), Ok(None));
        assert_eq!(parse_command("# a comment"), Ok(None));
    }

    #[test]
    pub fn rejects_malformed_commands() {
        for bad in ["mov e2 e4", "move e2", "e2e9", "replay back", "perft 0", "perft 99", "perft x", "undo now"] {
            assert!(parse_command(bad).is_err(), "'{bad}' should not parse");
        }
    }

    #[test]
    pub fn malformed_commands_leave_the_game_alone() {
        let mut interface = CommandInterface::default();
        let before = interface.game().snapshot();
        assert!(output(&mut interface, "jump e2 e4").starts_with("Error"));
        assert!(output(&mut interface, "move e2 e9").starts_with("Illegal move"));
        assert!(output(&mut interface, "moves z1").starts_with("Error"));
        assert_eq!(interface.game().snapshot(), before);
    }

    #[test]
    pub fn plays_a_scripted_game() {
        let mut interface = CommandInterface::default();
        assert_eq!(output(&mut interface, "f2f3"), "f2-f3");
        assert_eq!(output(&mut interface, "move e7 e5"), "e7-e5");
        assert_eq!(output(&mut interface, "moves g1"), "h3");
        assert_eq!(output(&mut interface, "g2g4"), "g2-g4");
        assert_eq!(output(&mut interface, "d8h4"), "Qd8-h4\nBlack wins by checkmate!");
        assert_eq!(output(&mut interface, "a2a3"), "The game is over: Black wins by checkmate!");
        assert_eq!(output(&mut interface, "history"), "1. f2-f3 e7-e5 2. g2-g4 Qd8-h4");

        assert_eq!(output(&mut interface, "undo"), "Undid Qd8-h4");
        assert_eq!(output(&mut interface, "redo"), "Redid Qd8-h4\nBlack wins by checkmate!");

        assert_eq!(output(&mut interface, "replay start"), "Replaying 4 moves from the start");
        assert_eq!(output(&mut interface, "undo"), "Cannot undo while replaying");
        assert_eq!(output(&mut interface, "replay next"), "Replayed f2-f3");
        assert_eq!(output(&mut interface, "replay end"), "Replay finished");
        assert!(output(&mut interface, "show").contains("Black wins by checkmate!"));

        assert_eq!(output(&mut interface, "reset"), "Game reset");
        assert_eq!(output(&mut interface, "history"), "No moves yet");
        assert_eq!(output(&mut interface, "undo"), "Nothing to undo");
        assert_eq!(output(&mut interface, "fen"), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -");
        assert_eq!(interface.process_command("quit"), CommandOutcome::Quit);
    }

    #[test]
    pub fn reports_check_and_perft() {
        let mut interface = CommandInterface::default();
        for cmd in ["e2e4", "f7f6", "d2d4", "g7g5"] {
            output(&mut interface, cmd);
        }
        assert_eq!(output(&mut interface, "d1h5"), "Qd1-h5\nWhite wins by checkmate!");

        let mut interface = CommandInterface::default();
        for cmd in ["e2e4", "f7f5"] {
            output(&mut interface, cmd);
        }
        assert_eq!(output(&mut interface, "d1h5"), "Qd1-h5\nBlack is in check");
        assert!(output(&mut interface, "perft 1").starts_with("Nodes: "));
    }
}
