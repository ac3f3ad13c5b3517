use arbiter::{Navigation, Participant};
use chess::PlayerSide;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Connect,
    Disconnect,
    Move(String),
    NewGame,
    LoadFen(String),
    Navigate(Navigation),
    Bind(PlayerSide, Participant),
    AutoPlay(bool),
    Stop,
    Raw { identity: String, text: String },
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Invalid move index: {0}")]
    BadIndex(String),
    #[error("Unknown command: {0} (try 'help')")]
    Unknown(String),
}

pub const HELP: &str = "\
Commands:
  connect | disconnect          open or close the bot host channel
  <move>                        play a move, e.g. e2e4 or e7e8q
  new | fen <FEN>               start a new game
  prev | next | start | live    browse history
  goto <i>                      view the position after move i (-1 = start)
  white <human|engine>          bind white
  black <human|engine>          bind black
  auto on|off                   toggle auto-play
  stop                          make the searching engine move now
  raw <engine> <command>        send a UCI command
  show                          print the game
  quit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Input>, InputError> {
    let line = line.trim();
    let Some((cmd, rest)) = split_word(line) else {
        return Ok(None);
    };

    let input = match cmd {
        "connect" => Input::Connect,
        "disconnect" => Input::Disconnect,
        "new" => Input::NewGame,
        "fen" if !rest.is_empty() => Input::LoadFen(rest.to_string()),
        "fen" => return Err(InputError::Usage("fen <FEN>")),
        "prev" => Input::Navigate(Navigation::Prev),
        "next" => Input::Navigate(Navigation::Next),
        "start" => Input::Navigate(Navigation::Start),
        "live" => Input::Navigate(Navigation::Live),
        "goto" => {
            let index = rest
                .parse()
                .map_err(|_| InputError::BadIndex(rest.to_string()))?;
            Input::Navigate(Navigation::Move(index))
        }
        "white" | "black" => {
            let side = if cmd == "white" {
                PlayerSide::White
            } else {
                PlayerSide::Black
            };
            let participant = rest
                .parse()
                .map_err(|_| InputError::Usage("white|black <human|engine>"))?;
            Input::Bind(side, participant)
        }
        "auto" => match rest {
            "on" => Input::AutoPlay(true),
            "off" => Input::AutoPlay(false),
            _ => return Err(InputError::Usage("auto on|off")),
        },
        "stop" => Input::Stop,
        "raw" => match split_word(rest) {
            Some((identity, text)) if !text.is_empty() => Input::Raw {
                identity: identity.to_string(),
                text: text.to_string(),
            },
            _ => return Err(InputError::Usage("raw <engine> <command>")),
        },
        "show" => Input::Show,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        token if chess::parse_move_token(token).is_ok() && rest.is_empty() => {
            Input::Move(token.to_string())
        }
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(Some(input))
}

fn split_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((s, "")),
    }
}
