pub mod board;
pub mod captured_set;
pub mod commands;
pub mod game;
pub mod move_generator;
pub mod moves;
pub mod perft;
pub mod piece;
pub mod position;
pub mod snapshot;
pub mod timeline;
