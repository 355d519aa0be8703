use crate::{EngineInfo, Score};
use chess::{parse_piece, parse_square};
use cozy_chess::{Move, Piece};

/// Incoming message from UCI engine
#[derive(Debug, Clone)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `mv` is `None` for `bestmove (none)` (no legal move in the position).
    BestMove {
        mv: Option<Move>,
        ponder: Option<Move>,
    },
    Info(EngineInfo),
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, crate::UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"bestmove") => {
            let Some(&mv_token) = tokens.get(1) else {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            };
            let mv = match mv_token {
                "(none)" | "0000" => None,
                s => Some(parse_uci_move(s)?),
            };
            let ponder = match (tokens.get(2), tokens.get(3)) {
                (Some(&"ponder"), Some(s)) => parse_uci_move(s).ok(),
                _ => None,
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(crate::UciError::UnknownMessage(line.to_string())),
    }
}

/// Parse the fields of an `info` line. Unknown fields are skipped and
/// malformed values leave the field unset.
fn parse_info_line(tokens: &[&str]) -> EngineInfo {
    fn value<T: std::str::FromStr>(tokens: &mut Tokens<'_, '_>) -> Option<T> {
        tokens.next().and_then(|s| s.parse().ok())
    }

    let mut info = EngineInfo::default();
    let mut tokens = tokens.iter().copied().peekable();

    while let Some(field) = tokens.next() {
        match field {
            "depth" => info.depth = value(&mut tokens),
            "seldepth" => info.seldepth = value(&mut tokens),
            "time" => info.time_ms = value(&mut tokens),
            "nodes" => info.nodes = value(&mut tokens),
            "nps" => info.nps = value(&mut tokens),
            "multipv" => info.multipv = value(&mut tokens),
            "hashfull" => info.hashfull = value(&mut tokens),
            "currmove" => {
                info.currmove = tokens.next().and_then(|s| parse_uci_move(s).ok());
            }
            "score" => {
                info.score = match tokens.next() {
                    Some("cp") => value(&mut tokens).map(Score::Centipawns),
                    Some("mate") => value(&mut tokens).map(Score::Mate),
                    _ => None,
                };
                tokens.next_if(|t| matches!(*t, "lowerbound" | "upperbound"));
            }
            "pv" => {
                while let Some(token) = tokens.next_if(|t| !is_keyword(t)) {
                    if let Ok(mv) = parse_uci_move(token) {
                        info.pv.push(mv);
                    }
                }
            }
            // Free text runs to the end of the line
            "string" => break,
            _ => {}
        }
    }

    info
}

type Tokens<'a, 'b> = std::iter::Peekable<std::iter::Copied<std::slice::Iter<'a, &'b str>>>;

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "time"
            | "nodes"
            | "score"
            | "pv"
            | "multipv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "nps"
            | "tbhits"
            | "cpuload"
            | "string"
    )
}

/// Parse UCI move format (e2e4, e7e8q)
pub fn parse_uci_move(s: &str) -> Result<Move, crate::UciError> {
    let invalid = || crate::UciError::InvalidMove(s.to_string());
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(invalid());
    }

    let from = parse_square(&s[0..2]).ok_or_else(invalid)?;
    let to = parse_square(&s[2..4]).ok_or_else(invalid)?;
    let promotion = match s[4..].chars().next() {
        Some(c) => match parse_piece(c) {
            Some(piece @ (Piece::Queen | Piece::Rook | Piece::Bishop | Piece::Knight)) => {
                Some(piece)
            }
            _ => return Err(invalid()),
        },
        None => None,
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}
