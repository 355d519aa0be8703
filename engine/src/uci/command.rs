use crate::{EngineCommand, GoParams};
use chess::format_uci_move;

/// Thinking time sent when the caller gives none.
const DEFAULT_MOVETIME_MS: u64 = 1000;

/// Render a command as a newline-terminated UCI line.
pub fn format_command(cmd: &EngineCommand) -> String {
    let mut line = match cmd {
        EngineCommand::Uci => "uci".to_string(),
        EngineCommand::IsReady => "isready".to_string(),
        EngineCommand::SetPosition { fen, moves } => {
            let mut position_cmd = format!("position fen {}", fen);
            if !moves.is_empty() {
                position_cmd.push_str(" moves");
                for mv in moves {
                    position_cmd.push(' ');
                    position_cmd.push_str(&format_uci_move(*mv));
                }
            }
            position_cmd
        }
        EngineCommand::SetOption { name, value } => match value {
            Some(val) => format!("setoption name {} value {}", name, val),
            None => format!("setoption name {}", name),
        },
        EngineCommand::Go(params) => format_go(params),
        EngineCommand::Stop => "stop".to_string(),
        EngineCommand::Quit => "quit".to_string(),
    };
    line.push('\n');
    line
}

fn format_go(params: &GoParams) -> String {
    let mut go_cmd = "go".to_string();
    if let Some(wtime) = params.wtime {
        go_cmd.push_str(&format!(" wtime {}", wtime));
    }
    if let Some(btime) = params.btime {
        go_cmd.push_str(&format!(" btime {}", btime));
    }
    if let Some(movestogo) = params.movestogo {
        go_cmd.push_str(&format!(" movestogo {}", movestogo));
    }
    let movetime = params.movetime.unwrap_or(DEFAULT_MOVETIME_MS);
    go_cmd.push_str(&format!(" movetime {}", movetime));
    go_cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::{File, Move, Rank, Square};

    #[test]
    fn test_format_position_with_moves() {
        let cmd = EngineCommand::SetPosition {
            fen: "8/8/8/8/8/8/8/K6k w - - 0 1".to_string(),
            moves: vec![Move {
                from: Square::new(File::A, Rank::First),
                to: Square::new(File::A, Rank::Second),
                promotion: None,
            }],
        };
        assert_eq!(
            format_command(&cmd),
            "position fen 8/8/8/8/8/8/8/K6k w - - 0 1 moves a1a2\n"
        );
    }

    #[test]
    fn test_format_go_with_clocks() {
        let cmd = EngineCommand::Go(GoParams {
            movetime: Some(800),
            wtime: Some(60_000),
            btime: Some(59_000),
            movestogo: Some(30),
            ..Default::default()
        });
        assert_eq!(
            format_command(&cmd),
            "go wtime 60000 btime 59000 movestogo 30 movetime 800\n"
        );
    }

    #[test]
    fn test_format_go_defaults_to_one_second() {
        assert_eq!(
            format_command(&EngineCommand::Go(GoParams::default())),
            "go movetime 1000\n"
        );
    }

    #[test]
    fn test_format_setoption() {
        let cmd = EngineCommand::SetOption {
            name: "Threads".to_string(),
            value: Some("4".to_string()),
        };
        assert_eq!(format_command(&cmd), "setoption name Threads value 4\n");
    }
}
