//! Wire messages exchanged with the bot host: one JSON object per line, discriminated by `type`.

use serde::{Deserialize, Serialize};

/// Messages the client sends to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    List,
    Connect {
        identity: String,
    },
    Disconnect {
        identity: String,
    },
    UciCommand {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<String>,
    },
}

/// Messages the host sends to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Identities {
        identities: Vec<String>,
    },
    Connected {
        identity: String,
    },
    Disconnected {
        identity: String,
    },
    Error {
        message: String,
    },
    EngineLine {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<String>,
    },
}

/// Encode a message as a single JSON line (no trailing newline).
pub fn encode<T: Serialize>(msg: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

pub fn decode<'a, T: Deserialize<'a>>(line: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_format() {
        assert_eq!(encode(&ClientMessage::List).unwrap(), r#"{"type":"list"}"#);
        assert_eq!(
            encode(&ClientMessage::Connect {
                identity: "stockfish".into()
            })
            .unwrap(),
            r#"{"type":"connect","identity":"stockfish"}"#
        );
        assert_eq!(
            encode(&ClientMessage::UciCommand {
                text: "isready".into(),
                identity: None
            })
            .unwrap(),
            r#"{"type":"uci-command","text":"isready"}"#
        );
    }

    #[test]
    fn test_server_message_decoding() {
        let msg: ServerMessage =
            decode(r#"{"type":"engine-line","text":"uciok","identity":"sf"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::EngineLine {
                text: "uciok".into(),
                identity: Some("sf".into())
            }
        );

        let msg: ServerMessage = decode(r#"{"type":"engine-line","text":"readyok"}"#).unwrap();
        assert!(matches!(msg, ServerMessage::EngineLine { identity: None, .. }));

        let msg: ServerMessage =
            decode(r#"{"type":"identities","identities":["a","b"]}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Identities {
                identities: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn test_malformed_messages_fail() {
        assert!(decode::<ServerMessage>("not json").is_err());
        assert!(decode::<ServerMessage>(r#"{"type":"teleport"}"#).is_err());
        assert!(decode::<ServerMessage>(r#"{"type":"connected"}"#).is_err());
    }
}
