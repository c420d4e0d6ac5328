use std::{
    fs,
    io::{self, BufRead},
    path::PathBuf,
    process::exit,
    time::SystemTime,
};

use clap::Parser;
use fox_chess_timeline::{
    commands::{CommandInterface, CommandOutcome},
    game::GameController,
};
use log::{LevelFilter, error, info};
use rand::{SeedableRng, rngs::StdRng};

#[derive(Parser, Debug)]
#[command(version, about = "Chess rules engine with undo, redo and replay", long_about = None)]
struct Args {
    /// Start from this position instead of the standard one
    #[arg(long)]
    fen: Option<String>,

    /// Read commands from this file instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,

    /// Play this many random legal plies before reading commands
    #[arg(long, default_value_t = 0)]
    random_moves: u32,

    /// Seed for --random-moves
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    /// Also write log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = setup_logger(args.log_level, args.log_file.as_ref()) {
        eprintln!("Failed to set up logging: {e}");
        exit(1);
    }
    log_panics::init();

    let game = match &args.fen {
        Some(fen) => match GameController::from_fen(fen) {
            Ok(game) => game,
            Err(msg) => {
                error!("Failed to parse FEN from arguments. Error message: {msg}. FEN: {fen}");
                exit(1);
            }
        },
        None => GameController::new(),
    };

    let mut interface = CommandInterface::new(game);
    if args.random_moves > 0 {
        play_random_moves(&mut interface, args.random_moves, args.seed);
    }

    let lines: Box<dyn Iterator<Item = io::Result<String>>> = match &args.script {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => Box::new(contents.lines().map(|l| Ok(l.to_string())).collect::<Vec<_>>().into_iter()),
            Err(e) => {
                error!("Failed to read script file {}: {e}", path.display());
                exit(1);
            }
        },
        None => Box::new(io::stdin().lock().lines()),
    };

    for line in lines {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read command: {e}");
                break;
            }
        };

        match interface.process_command(&line) {
            CommandOutcome::Output(output) if output.is_empty() => {}
            CommandOutcome::Output(output) => println!("{output}"),
            CommandOutcome::Quit => break,
        }
    }
}

fn play_random_moves(interface: &mut CommandInterface, plies: u32, seed: Option<u64>) {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let game = interface.game_mut();
    let played = game.play_random_moves(plies, &mut rng);
    info!("Played {played} random plies: {}", game.move_history_string());
}

fn setup_logger(level: LevelFilter, log_file: Option<&PathBuf>) -> Result<(), String> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr());

    if let Some(path) = log_file {
        let file = fern::log_file(path).map_err(|e| format!("could not open {}: {e}", path.display()))?;
        dispatch = dispatch.chain(file);
    }

    dispatch.apply().map_err(|e| e.to_string())
}
