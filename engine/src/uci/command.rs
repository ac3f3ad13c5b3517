use chess::StartPosition;

/// Default search budget when no option is given.
pub const DEFAULT_MOVETIME_MS: u64 = 1000;

/// Parameters for the "go" command.
///
/// The options are mutually exclusive in priority order: `infinite`, then `movetime`, then
/// `depth`. With none set the search runs for [`DEFAULT_MOVETIME_MS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub infinite: bool,
    /// Move time in milliseconds
    pub movetime: Option<u64>,
    pub depth: Option<u32>,
}

impl GoParams {
    pub fn movetime(ms: u64) -> Self {
        Self {
            movetime: Some(ms),
            ..Default::default()
        }
    }

    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Default::default()
        }
    }

    pub fn infinite() -> Self {
        Self {
            infinite: true,
            ..Default::default()
        }
    }
}

/// Commands sent to a UCI engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    SetOption {
        name: String,
        value: Option<String>,
    },
    /// Full move list since `start`, never a diff.
    Position {
        start: StartPosition,
        moves: Vec<String>,
    },
    Go(GoParams),
    Stop,
    Quit,
    Raw(String),
}

impl UciCommand {
    /// Wire text without the trailing newline.
    pub fn to_line(&self) -> String {
        match self {
            Self::Uci => "uci".to_string(),
            Self::IsReady => "isready".to_string(),
            Self::SetOption { name, value } => match value {
                Some(value) => format!("setoption name {} value {}", name, value),
                None => format!("setoption name {}", name),
            },
            Self::Position { start, moves } => {
                let mut cmd = match start {
                    StartPosition::Standard => "position startpos".to_string(),
                    StartPosition::Fen(fen) => format!("position fen {}", fen),
                };
                if !moves.is_empty() {
                    cmd.push_str(" moves ");
                    cmd.push_str(&moves.join(" "));
                }
                cmd
            }
            Self::Go(params) => {
                if params.infinite {
                    "go infinite".to_string()
                } else if let Some(movetime) = params.movetime {
                    format!("go movetime {}", movetime)
                } else if let Some(depth) = params.depth {
                    format!("go depth {}", depth)
                } else {
                    format!("go movetime {}", DEFAULT_MOVETIME_MS)
                }
            }
            Self::Stop => "stop".to_string(),
            Self::Quit => "quit".to_string(),
            Self::Raw(text) => text.trim_end().to_string(),
        }
    }
}

impl std::fmt::Display for UciCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_startpos() {
        let cmd = UciCommand::Position {
            start: StartPosition::Standard,
            moves: vec![],
        };
        assert_eq!(cmd.to_line(), "position startpos");

        let cmd = UciCommand::Position {
            start: StartPosition::Standard,
            moves: vec!["e2e4".into(), "e7e5".into()],
        };
        assert_eq!(cmd.to_line(), "position startpos moves e2e4 e7e5");
    }

    #[test]
    fn test_position_from_fen() {
        let fen = "8/8/8/8/8/8/8/K6k w - - 0 1";
        let cmd = UciCommand::Position {
            start: StartPosition::Fen(fen.into()),
            moves: vec!["a1a2".into()],
        };
        assert_eq!(cmd.to_line(), format!("position fen {} moves a1a2", fen));
    }

    #[test]
    fn test_go_priority() {
        let all = GoParams {
            infinite: true,
            movetime: Some(500),
            depth: Some(8),
        };
        assert_eq!(UciCommand::Go(all).to_line(), "go infinite");

        let timed = GoParams {
            movetime: Some(500),
            depth: Some(8),
            ..Default::default()
        };
        assert_eq!(UciCommand::Go(timed).to_line(), "go movetime 500");
        assert_eq!(UciCommand::Go(GoParams::depth(8)).to_line(), "go depth 8");
        assert_eq!(
            UciCommand::Go(GoParams::default()).to_line(),
            "go movetime 1000"
        );
    }

    #[test]
    fn test_setoption_and_raw() {
        let cmd = UciCommand::SetOption {
            name: "Skill Level".into(),
            value: Some("5".into()),
        };
        assert_eq!(cmd.to_string(), "setoption name Skill Level value 5");
        assert_eq!(UciCommand::Raw("d\n".into()).to_line(), "d");
    }
}
