use std::error::Error;
use std::io::{self, Read, Write};
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::{Duration, Instant};

use amazons::position::{Board, Move};
use amazons::search::{self, Decision, MctsSetting};
use board_game_traits::{Color, GameResult};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;


fn main() -> Result<(), Box<dyn Error>> {
    let matches = cli().get_matches();
    setup_logging(&matches)?;

    let settings = settings_from_matches(&matches);

    match matches.subcommand() {
        Some(("analyze", sub_matches)) => {
            let color = parse_color(sub_matches)?;
            analyze_from_stdin(color, settings)
        }
        Some(("aimatch", sub_matches)) => {
            let games = *sub_matches.get_one::<u64>("games").unwrap();
            aimatch(games, settings);
            Ok(())
        }
        Some(("perft", sub_matches)) => {
            let depth = *sub_matches.get_one::<u16>("depth").unwrap();
            perft(&mut Board::start_position(), depth);
            Ok(())
        }
        _ => unreachable!("A subcommand is required"),
    }
}

fn cli() -> Command {
    Command::new("amazons")
        .about("Monte Carlo Tree Search engine for the Game of the Amazons")
        .version("0.1")
        .subcommand_required(true)
        .arg(
            Arg::new("timeBudget")
                .long("time-budget-ms")
                .env("AMAZONS_TIME_BUDGET_MS")
                .value_name("MS")
                .help("Thinking time per move, in milliseconds")
                .num_args(1)
                .default_value("29000")
                .value_parser(clap::value_parser!(u64))
                .global(true),
        )
        .arg(
            Arg::new("exploration")
                .long("exploration")
                .env("AMAZONS_EXPLORATION")
                .value_name("C")
                .help("Exploration constant of the UCT formula")
                .num_args(1)
                .default_value("1.41")
                .value_parser(parse_exploration_constant)
                .global(true),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .env("AMAZONS_SEED")
                .help("Seed for the search's random number generator")
                .num_args(1)
                .value_parser(clap::value_parser!(u64))
                .global(true),
        )
        .arg(
            Arg::new("logfile")
                .short('l')
                .long("logfile")
                .env("AMAZONS_LOGFILE")
                .value_name("amazons.log")
                .help("Name of debug logfile")
                .num_args(1)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log more to stderr. Repeat for debug output")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("analyze")
                .about("Read a game state from stdin and choose a move for the given color")
                .arg(
                    Arg::new("color")
                        .long("color")
                        .help("Color to move")
                        .num_args(1)
                        .required(true)
                        .value_parser(["black", "white"]),
                ),
        )
        .subcommand(
            Command::new("aimatch")
                .about("Watch the engine play against a random mover")
                .arg(
                    Arg::new("games")
                        .long("games")
                        .help("Number of games. The engine alternates colors")
                        .num_args(1)
                        .default_value("2")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("perft")
                .about("Count move sequences from the start position")
                .arg(
                    Arg::new("depth")
                        .long("depth")
                        .num_args(1)
                        .default_value("2")
                        .value_parser(clap::value_parser!(u16)),
                ),
        )
}

fn setup_logging(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let stderr_level = match matches.get_count("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };

    let log_dispatcher = fern::Dispatch::new().format(|out, message, record| {
        out.finish(format_args!(
            "{}[{}][{}] {}",
            chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
            record.target(),
            record.level(),
            message
        ))
    });

    if let Some(log_file) = matches.get_one::<String>("logfile") {
        log_dispatcher
            .chain(
                fern::Dispatch::new()
                    .level(log::LevelFilter::Debug)
                    .chain(fern::log_file(log_file)?),
            )
            .chain(
                fern::Dispatch::new()
                    .level(stderr_level)
                    .chain(io::stderr()),
            )
            .apply()?
    } else {
        log_dispatcher
            .level(stderr_level)
            .chain(io::stderr())
            .apply()?
    }
    Ok(())
}

fn settings_from_matches(matches: &ArgMatches) -> MctsSetting {
    let mut settings = MctsSetting::default();
    if let Some(time_budget) = matches.get_one::<u64>("timeBudget") {
        settings = settings.add_time_budget(Duration::from_millis(*time_budget));
    }
    if let Some(exploration) = matches.get_one::<f32>("exploration") {
        settings = settings.add_exploration_constant(*exploration);
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        settings = settings.add_seed(*seed);
    }
    settings
}

/// Accepts any finite, non-negative exploration constant.
fn parse_exploration_constant(input: &str) -> Result<f32, String> {
    let value: f32 = input
        .parse()
        .map_err(|err| format!("\"{}\" is not a number: {}", input, err))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("{} must be finite and non-negative", value))
    }
}

fn parse_color(matches: &ArgMatches) -> Result<Color, Box<dyn Error>> {
    match matches.get_one::<String>("color").map(String::as_str) {
        Some("black") => Ok(Color::Black),
        Some("white") => Ok(Color::White),
        other => Err(format!("Invalid color {:?}", other).into()),
    }
}

/// Parse a game-state payload: integers separated by whitespace or commas,
/// optionally wrapped in square brackets.
pub fn parse_payload(input: &str) -> Result<Vec<i32>, ParseIntError> {
    input
        .split(|ch: char| ch.is_whitespace() || ch == ',' || ch == '[' || ch == ']')
        .filter(|word| !word.is_empty())
        .map(i32::from_str)
        .collect()
}

fn analyze_from_stdin(color: Color, settings: MctsSetting) -> Result<(), Box<dyn Error>> {
    println!("Enter a game state of 100 or 121 cells, then press enter followed by CTRL+D");
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let payload = parse_payload(&input)?;
    let board = Board::from_server_state(&payload)?;
    println!("{}", board);

    match analyze(&board, color, settings) {
        Some(mv) => {
            println!("Best move: {}", mv);
            let coords = mv.to_coords().map(|coord| coord.to_string());
            println!("{}", coords.join(" "));
        }
        None => println!("no move"),
    }
    Ok(())
}

fn analyze(board: &Board, color: Color, settings: MctsSetting) -> Option<Move> {
    println!("Searching for {:.1}s", settings.time_budget().as_secs_f32());
    let start_time = Instant::now();
    let tree = match search::decide(board, color, settings) {
        Decision::NoMove => return None,
        Decision::Forced(mv) => {
            println!("Only one legal move");
            return Some(mv);
        }
        Decision::Searched(tree) => tree,
    };
    println!(
        "{} iterations, {} nodes, {:.2}% mean reward, {:.2}s",
        tree.visits(),
        tree.node_count(),
        tree.mean_reward() * 100.0,
        start_time.elapsed().as_secs_f32()
    );

    let mut children = tree.root_children();
    children.sort_by_key(|(_, visits, _)| std::cmp::Reverse(*visits));
    for (mv, visits, mean_reward) in children.iter().take(5) {
        println!("{:14} {:6} visits, {:.2}%", mv.to_string(), visits, mean_reward * 100.0);
    }
    println!(
        "Pv: {}",
        tree.pv()
            .map(|mv| mv.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );
    tree.best_move()
}

/// Play `games` games between the engine and a uniformly random mover,
/// with the engine playing Black in the even-numbered games.
fn aimatch(games: u64, settings: MctsSetting) {
    let mut rng = match settings.seed() {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let mut engine_wins = 0;

    for game in 0..games {
        let engine_color = if game % 2 == 0 { Color::Black } else { Color::White };
        println!("Game {}: engine plays {}", game + 1, engine_color);

        let result = play_game(engine_color, settings, &mut rng);
        let engine_won = matches!(
            (result, engine_color),
            (GameResult::BlackWin, Color::Black) | (GameResult::WhiteWin, Color::White)
        );
        if engine_won {
            engine_wins += 1;
        }
        println!("Result: {:?}", result);
        info!("Game {} finished: {:?}", game + 1, result);
    }
    println!("Engine won {} of {} games", engine_wins, games);
}

fn play_game(engine_color: Color, settings: MctsSetting, rng: &mut SmallRng) -> GameResult {
    let mut board = Board::start_position();
    let mut side_to_move = Color::Black;
    let mut ply = 0;

    loop {
        if let Some(result) = board.game_result(side_to_move) {
            println!("\n{}", board);
            return result;
        }
        let mv = if side_to_move == engine_color {
            search::choose_move(&board, side_to_move, settings)
        } else {
            search::random_move(&board, side_to_move, rng)
        };
        // `game_result` guarantees a legal move exists
        let Some(mv) = mv else {
            unreachable!("No move found for {}\n{}", side_to_move, board)
        };

        if let Err(err) = board.apply_opponent_move(mv, side_to_move) {
            warn!("Rejected move {}: {}", mv, err);
            println!("\n{}", board);
            return match side_to_move {
                Color::Black => GameResult::WhiteWin,
                Color::White => GameResult::BlackWin,
            };
        }

        if ply % 2 == 0 {
            print!("{}. {:14}", ply / 2 + 1, mv.to_string());
        } else {
            println!("{}", mv);
        }
        io::stdout().flush().ok();
        side_to_move = !side_to_move;
        ply += 1;
    }
}

fn perft(board: &mut Board, max_depth: u16) {
    for depth in 0..=max_depth {
        let start_time = Instant::now();
        let result = board.perft(Color::Black, depth);
        println!(
            "{}: {}, {:.2}s, {:.1} Mnps",
            depth,
            result,
            start_time.elapsed().as_secs_f32(),
            result as f32 / start_time.elapsed().as_micros().max(1) as f32
        );
    }
}
