//! Headless frame loop: drives a [`SessionController`] at a fixed rate and
//! turns stdin lines into session intents.

use std::str::FromStr;
use std::time::{Duration, Instant};

use chess::{
    format_colored_piece, format_file, format_rank, format_uci_move, parse_color, parse_piece,
    parse_square,
};
use cozy_chess::{Color, File, Move, Piece, Rank, Square};
use engine::uci::parse_uci_move;
use session::{
    CommitRecord, FrameReport, GameSettings, GameStatus, SessionController, SessionError,
    SessionSnapshot,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Longest time control accepted from the command line or `start`.
pub const MAX_MINUTES: u64 = 180;

const HELP: &str = "\
commands:
  <move>            play a move in UCI notation (e2e4, e1g1, e7e8q)
  click <square>    select a piece or a destination
  promote <q|r|b|n> finish a pending promotion
  cancel            take back a pending promotion
  start [side] [minutes]
                    start a new game (after the current one ended or was stopped)
  stop              pause the current game
  board             show the position and clocks
  eval              show the latest engine analysis
  quit              leave";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Move(Move),
    Click(Square),
    Promote(Piece),
    Cancel,
    Start {
        side: Option<Color>,
        minutes: Option<u64>,
    },
    Stop,
    Board,
    Eval,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Empty input")]
    Empty,
    #[error("Unknown command: {0} (try 'help')")]
    Unknown(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion piece: {0}")]
    InvalidPiece(String),
    #[error("Invalid start option: {0}")]
    InvalidStart(String),
}

impl FromStr for Input {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let command = parts.next().ok_or(InputError::Empty)?.to_lowercase();
        let arg = parts.next();

        match (command.as_str(), arg) {
            ("quit" | "exit" | "q", _) => Ok(Self::Quit),
            ("help" | "?", _) => Ok(Self::Help),
            ("board", _) => Ok(Self::Board),
            ("eval", _) => Ok(Self::Eval),
            ("stop", _) => Ok(Self::Stop),
            ("cancel", _) => Ok(Self::Cancel),
            ("click", Some(sq)) => parse_square(sq)
                .map(Self::Click)
                .ok_or_else(|| InputError::InvalidSquare(sq.to_string())),
            ("promote", Some(p)) => {
                let mut chars = p.chars();
                match (chars.next().and_then(parse_piece), chars.next()) {
                    (Some(piece), None) => Ok(Self::Promote(piece)),
                    _ => Err(InputError::InvalidPiece(p.to_string())),
                }
            }
            ("start", _) => {
                let mut side = None;
                let mut minutes = None;
                for opt in arg.into_iter().chain(parts) {
                    if let Some(color) = parse_color(opt) {
                        side = Some(color);
                    } else if let Ok(m) = opt.parse::<u64>() {
                        if !(1..=MAX_MINUTES).contains(&m) {
                            return Err(InputError::InvalidStart(opt.to_string()));
                        }
                        minutes = Some(m);
                    } else {
                        return Err(InputError::InvalidStart(opt.to_string()));
                    }
                }
                Ok(Self::Start { side, minutes })
            }
            (word, None) => parse_uci_move(word)
                .map(Self::Move)
                .map_err(|_| InputError::Unknown(word.to_string())),
            (word, Some(_)) => Err(InputError::Unknown(word.to_string())),
        }
    }
}

/// Run the session until the user quits, stdin closes after the game ends,
/// or Ctrl-C. Shuts the session down before returning.
pub async fn run(
    mut controller: SessionController,
    settings: GameSettings,
    fps: u32,
) -> anyhow::Result<()> {
    controller.start_game(settings.clone())?;
    print_board(&controller.snapshot());

    let (tx, mut rx) = mpsc::channel(16);
    tokio::spawn(read_input(tx));

    let frame = Duration::from_secs(1) / fps.max(1);
    let mut interval = tokio::time::interval(frame);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut input_open = true;
    let mut last_frame = Instant::now();
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let report = controller.tick_at(now - last_frame, now);
                last_frame = now;
                print_frame(&controller, &report);

                if !input_open && controller.snapshot().status != GameStatus::Playing {
                    break;
                }
            }
            line = rx.recv(), if input_open => {
                let Some(line) = line else {
                    tracing::debug!("stdin closed");
                    input_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Input>() {
                    Ok(Input::Quit) => break,
                    Ok(input) => {
                        if let Err(e) = handle(&mut controller, input, &settings) {
                            println!("{}", e);
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}

fn handle(
    controller: &mut SessionController,
    input: Input,
    settings: &GameSettings,
) -> Result<(), SessionError> {
    match input {
        Input::Move(mv) => controller.attempt_move(mv)?,
        Input::Click(square) => {
            let outcome = controller.click(square)?;
            tracing::debug!("Click {} -> {:?}", square, outcome);
        }
        Input::Promote(piece) => {
            if let Some(record) = controller.choose_promotion(piece)? {
                print_commit(&record);
                print_board(&controller.snapshot());
            }
        }
        Input::Cancel => controller.cancel_promotion()?,
        Input::Start { side, minutes } => {
            let mut next = settings.clone();
            if let Some(side) = side {
                next.human_side = side;
            }
            if let Some(minutes) = minutes {
                next.time_control = Duration::from_secs(minutes * 60);
            }
            controller.start_game(next)?;
            print_board(&controller.snapshot());
        }
        Input::Stop => {
            if !controller.stop_game() {
                return Err(SessionError::NotPlaying);
            }
            println!("Game stopped");
        }
        Input::Board => print_board(&controller.snapshot()),
        Input::Eval => print_eval(controller),
        Input::Help => println!("{}", HELP),
        Input::Quit => {}
    }
    Ok(())
}

async fn read_input(tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
}

fn print_frame(controller: &SessionController, report: &FrameReport) {
    if let Some(record) = &report.committed {
        print_commit(record);
        print_board(&controller.snapshot());
    }
    if let Some(loser) = report.flagged {
        println!("{}", GameStatus::timeout_of(loser));
    }
    if report.search_started.is_some() {
        println!("Engine thinking...");
    }
}

fn print_commit(record: &CommitRecord) {
    let who = match record.mover {
        Color::White => "White",
        Color::Black => "Black",
    };
    let check = if record.gives_check { "+" } else { "" };
    println!("{} plays {}{}", who, format_uci_move(record.mv), check);
    if let Some(msg) = record.status.message() {
        println!("{}", msg);
    }
}

fn print_board(snapshot: &SessionSnapshot) {
    print!("{}", render_board(snapshot));
    println!(
        "White {}  Black {}  ({} to move)",
        snapshot.clock_text(Color::White),
        snapshot.clock_text(Color::Black),
        if snapshot.side_to_move == Color::White {
            "white"
        } else {
            "black"
        }
    );
    if snapshot.promotion_choices().is_some() {
        println!("Choose a promotion: promote q|r|b|n, or cancel");
    }
}

fn print_eval(controller: &SessionController) {
    let telemetry = controller.telemetry();
    let human = controller.snapshot().human_side;
    match telemetry.evaluation_for(human) {
        Some(score) => println!(
            "eval {} depth {} nodes {}",
            score,
            telemetry.depth.map_or("-".to_string(), |d| d.to_string()),
            telemetry.nodes.map_or("-".to_string(), |n| n.to_string()),
        ),
        None => println!("No analysis yet"),
    }
}

/// Text board from the human's side, rank labels on the left.
fn render_board(snapshot: &SessionSnapshot) -> String {
    let board = &snapshot.position;
    let mut ranks: Vec<Rank> = Rank::ALL.to_vec();
    let mut files: Vec<File> = File::ALL.to_vec();
    if snapshot.board_flipped() {
        files.reverse();
    } else {
        ranks.reverse();
    }

    let mut out = String::new();
    for rank in &ranks {
        out.push(format_rank(*rank));
        out.push(' ');
        for file in &files {
            let square = Square::new(*file, *rank);
            let c = match (board.piece_on(square), board.color_on(square)) {
                (Some(piece), Some(color)) => format_colored_piece(piece, color),
                _ => '.',
            };
            out.push(c);
            out.push(' ');
        }
        out.push('\n');
    }
    out.push_str("  ");
    for file in &files {
        out.push(format_file(*file));
        out.push(' ');
    }
    out.push('\n');
    out
}
