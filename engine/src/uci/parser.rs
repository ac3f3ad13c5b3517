use chess::{encode_mate, SearchInfo};

use super::UciError;

/// Incoming message from a UCI engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `mv` is `None` when the engine reports it has no legal move.
    BestMove {
        mv: Option<String>,
        ponder: Option<String>,
    },
    Info(SearchInfo),
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"bestmove") => {
            let Some(&mv) = tokens.get(1) else {
                return Err(UciError::MalformedMessage(line.to_string()));
            };
            let ponder = match (tokens.get(2), tokens.get(3)) {
                (Some(&"ponder"), Some(&p)) => move_or_sentinel(p),
                _ => None,
            };
            Ok(UciMessage::BestMove {
                mv: move_or_sentinel(mv),
                ponder,
            })
        }

        Some(&"info") => parse_search_info(line)
            .map(UciMessage::Info)
            .ok_or_else(|| UciError::NoDepth(line.to_string())),

        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

/// "(none)" and "0000" both mean no legal move.
fn move_or_sentinel(token: &str) -> Option<String> {
    match token {
        "(none)" | "0000" => None,
        mv => Some(mv.to_string()),
    }
}

/// Parse an `info` line into a search result.
///
/// Returns `None` for anything that is not search progress with a positive depth. Fields the
/// line does not mention stay at zero. `pv` swallows the rest of the line.
pub fn parse_search_info(line: &str) -> Option<SearchInfo> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("info") {
        return None;
    }

    let mut info = SearchInfo::default();
    while let Some(token) = tokens.next() {
        match token {
            "depth" => info.depth = next_number(&mut tokens).unwrap_or(0),
            "nodes" => info.nodes = next_number(&mut tokens).unwrap_or(0),
            "time" => info.time_ms = next_number(&mut tokens).unwrap_or(0),
            "score" => match tokens.next() {
                Some("cp") => {
                    if let Some(cp) = next_number(&mut tokens) {
                        info.score = cp;
                    }
                }
                Some("mate") => {
                    if let Some(n) = next_number(&mut tokens) {
                        info.score = encode_mate(n);
                    }
                }
                _ => {}
            },
            "pv" => {
                info.pv = tokens.by_ref().map(str::to_string).collect();
                break;
            }
            // Free text runs to the end of the line.
            "string" => break,
            _ => {}
        }
    }

    info.is_meaningful().then_some(info)
}

fn next_number<'a, T: std::str::FromStr>(tokens: &mut impl Iterator<Item = &'a str>) -> Option<T> {
    tokens.next().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::MATE_SCORE;

    #[test]
    fn test_parse_full_info_line() {
        let info =
            parse_search_info("info depth 20 score cp 35 nodes 1000 time 500 pv e2e4 e7e5").unwrap();
        assert_eq!(
            info,
            SearchInfo {
                depth: 20,
                score: 35,
                nodes: 1000,
                time_ms: 500,
                pv: vec!["e2e4".into(), "e7e5".into()],
            }
        );
    }

    #[test]
    fn test_mate_scores_dominate_centipawns() {
        let winning = parse_search_info("info depth 5 score mate 3 nodes 10 pv h5f7").unwrap();
        let losing = parse_search_info("info depth 5 score mate -2").unwrap();
        assert!(winning.score > 10_000);
        assert!(losing.score < -10_000);

        let quicker = parse_search_info("info depth 5 score mate 1").unwrap();
        assert!(quicker.score > winning.score);
        assert_eq!(quicker.score, MATE_SCORE - 1);
        assert_eq!(losing.score, -MATE_SCORE + 2);
    }

    #[test]
    fn test_pv_consumes_rest_of_line() {
        let info = parse_search_info("info depth 3 pv e2e4 depth 9 nodes 5").unwrap();
        assert_eq!(info.depth, 3);
        assert_eq!(info.nodes, 0);
        assert_eq!(info.pv, vec!["e2e4", "depth", "9", "nodes", "5"]);
    }

    #[test]
    fn test_lines_without_depth_are_ignored() {
        assert_eq!(parse_search_info("info string NNUE evaluation enabled"), None);
        assert_eq!(parse_search_info("info nodes 100 score cp 12"), None);
        assert_eq!(parse_search_info("info depth 0 score cp 12"), None);
        assert_eq!(parse_search_info("info depth abc"), None);
        assert_eq!(parse_search_info("bestmove e2e4"), None);
        assert_eq!(parse_search_info(""), None);
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let info =
            parse_search_info("info depth 12 seldepth 18 multipv 1 score cp -40 nps 900 time 7")
                .unwrap();
        assert_eq!(info.depth, 12);
        assert_eq!(info.score, -40);
        assert_eq!(info.time_ms, 7);
        assert!(info.pv.is_empty());
    }

    #[test]
    fn test_parse_bestmove() {
        assert_eq!(
            parse_uci_message("bestmove e2e4 ponder e7e5").unwrap(),
            UciMessage::BestMove {
                mv: Some("e2e4".into()),
                ponder: Some("e7e5".into()),
            }
        );
        assert_eq!(
            parse_uci_message("bestmove (none)").unwrap(),
            UciMessage::BestMove {
                mv: None,
                ponder: None
            }
        );
        assert_eq!(
            parse_uci_message("bestmove 0000").unwrap(),
            UciMessage::BestMove {
                mv: None,
                ponder: None
            }
        );
        assert!(matches!(
            parse_uci_message("bestmove"),
            Err(UciError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_parse_handshake_messages() {
        assert_eq!(parse_uci_message("uciok").unwrap(), UciMessage::UciOk);
        assert_eq!(parse_uci_message("  readyok \r").unwrap(), UciMessage::ReadyOk);
        assert_eq!(
            parse_uci_message("id name Stockfish 16").unwrap(),
            UciMessage::Id {
                name: "name".into(),
                value: "Stockfish 16".into()
            }
        );
        assert!(matches!(
            parse_uci_message("option name Hash type spin"),
            Err(UciError::UnknownMessage(_))
        ));
        assert!(matches!(
            parse_uci_message("info string hello"),
            Err(UciError::NoDepth(_))
        ));
    }
}
