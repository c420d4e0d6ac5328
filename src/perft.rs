use std::time::Instant;

use log::info;
use num_format::{Locale, ToFormattedString};

use crate::{board::Board, piece::Color};

impl Board {
    /// Counts the leaves of the legal move tree `depth` plies deep with `color` to move.
    pub fn start_perft(&mut self, color: Color, depth: u8) -> PerftStats {
        let mut stats = PerftStats::default();
        let before = self.clone();

        let start_time = Instant::now();
        do_perft(depth, color, self, &mut stats);
        let elapsed = start_time.elapsed();

        let nps = stats.nodes as f64 / elapsed.as_secs_f64();
        info!(
            "depth {depth} in {elapsed:#?}. Nodes: {}. Nodes per second: {}",
            stats.nodes.to_formatted_string(&Locale::en),
            (nps as u64).to_formatted_string(&Locale::en)
        );
        info!("{:?}", stats);
        debug_assert!(*self == before);

        stats
    }
}

/// Counters for the last ply of a perft run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerftStats {
    pub nodes: u64,
    pub captures: u64,
    pub eps: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
}

// Code referenced from https://www.chessprogramming.org/Perft
fn do_perft(draft: u8, color: Color, board: &mut Board, stats: &mut PerftStats) {
    if draft == 0 {
        stats.nodes += 1;
        return;
    }

    for (from, to) in board.legal_moves(color) {
        let r#move = board.apply_move(from, to);

        if draft == 1 {
            if r#move.captured().is_some() {
                stats.captures += 1;
            }
            if r#move.is_en_passant() {
                stats.eps += 1;
            }
            if r#move.castling().is_some() {
                stats.castles += 1;
            }
            if r#move.promotion().is_some() {
                stats.promotions += 1;
            }
            if board.is_in_check(color.opposite()) {
                stats.checks += 1;
            }
        }

        do_perft(draft - 1, color.opposite(), board, stats);
        board.undo_move(&r#move);
    }
}

#[cfg(test)]
mod perft_tests {
    use crate::{
        board::{Board, parse_fen},
        piece::Color,
    };

    fn perft(fen: &str, depth: u8) -> super::PerftStats {
        let (mut board, color) = parse_fen(fen).unwrap();
        board.start_perft(color, depth)
    }

    #[test]
    pub fn starting_position() {
        let mut board = Board::new();
        let expected = [20, 400, 8902];
        for (depth, nodes) in expected.into_iter().enumerate() {
            let stats = board.start_perft(Color::White, depth as u8 + 1);
            assert_eq!(stats.nodes, nodes);
        }

        let stats = board.start_perft(Color::White, 3);
        assert_eq!(stats.captures, 34);
        assert_eq!(stats.checks, 12);
        assert_eq!(board, Board::new());
    }

    #[test]
    pub fn kiwipete() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -";
        let stats = perft(fen, 1);
        assert_eq!(stats.nodes, 48);
        assert_eq!(stats.captures, 8);
        assert_eq!(stats.castles, 2);

        let stats = perft(fen, 2);
        assert_eq!(stats.nodes, 2039);
        assert_eq!(stats.captures, 351);
        assert_eq!(stats.eps, 1);
        assert_eq!(stats.castles, 91);
        assert_eq!(stats.checks, 3);
    }

    #[test]
    pub fn rook_and_pawn_endgame() {
        let fen = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -";
        let expected = [14, 191, 2812, 43238];
        for (depth, nodes) in expected.into_iter().enumerate() {
            assert_eq!(perft(fen, depth as u8 + 1).nodes, nodes);
        }

        let stats = perft(fen, 3);
        assert_eq!(stats.eps, 2);
        assert_eq!(stats.checks, 267);
    }
}
