//! Events decoded from the answer stream

use crate::chat::Source;
use serde::Deserialize;
use serde_json::Value;

/// One decoded server event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Next piece of the answer text
    Token(String),
    /// Citations for the answer
    Sources(Vec<Source>),
    /// Answer complete
    Done,
    /// Backend-declared or transport failure
    Error(String),
    /// Well-formed frame with a `type` this client does not know
    Unrecognized,
}

/// Raw `{type, content}` payload carried in each SSE `data` field
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Value,
}

impl StreamEvent {
    /// Decode one frame payload.
    ///
    /// Returns `None` for malformed payloads; those frames are dropped by the
    /// caller without ending the stream.
    #[must_use]
    pub fn decode(data: &str) -> Option<Self> {
        let wire: WireEvent = serde_json::from_str(data).ok()?;

        let event = match wire.kind.as_str() {
            "token" => match wire.content {
                Value::String(text) => StreamEvent::Token(text),
                _ => return None,
            },
            "sources" => match wire.content {
                Value::Null => StreamEvent::Sources(Vec::new()),
                content => StreamEvent::Sources(serde_json::from_value(content).ok()?),
            },
            "done" => StreamEvent::Done,
            "error" => StreamEvent::Error(match wire.content {
                Value::String(message) => message,
                Value::Null => "Stream error".to_string(),
                other => other.to_string(),
            }),
            _ => StreamEvent::Unrecognized,
        };
        Some(event)
    }

    /// `Done` or `Error`: nothing follows in the same session
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_token() {
        assert_eq!(
            StreamEvent::decode(r#"{"type":"token","content":"Deploy"}"#),
            Some(StreamEvent::Token("Deploy".to_string()))
        );
    }

    #[test]
    fn test_decode_sources() {
        let event = StreamEvent::decode(
            r#"{"type":"sources","content":[{"file":"runbooks/deploy.md","snippet":"Run the pipeline"}]}"#,
        );
        assert_eq!(
            event,
            Some(StreamEvent::Sources(vec![Source {
                file: "runbooks/deploy.md".to_string(),
                snippet: "Run the pipeline".to_string(),
            }]))
        );
    }

    #[test]
    fn test_decode_done_with_and_without_content() {
        assert_eq!(StreamEvent::decode(r#"{"type":"done"}"#), Some(StreamEvent::Done));
        assert_eq!(
            StreamEvent::decode(r#"{"type":"done","content":null}"#),
            Some(StreamEvent::Done)
        );
    }

    #[test]
    fn test_decode_error() {
        assert_eq!(
            StreamEvent::decode(r#"{"type":"error","content":"boom"}"#),
            Some(StreamEvent::Error("boom".to_string()))
        );
        assert!(matches!(
            StreamEvent::decode(r#"{"type":"error"}"#),
            Some(StreamEvent::Error(_))
        ));
    }

    #[test]
    fn test_unknown_type_is_unrecognized() {
        assert_eq!(
            StreamEvent::decode(r#"{"type":"usage","content":{"tokens":12}}"#),
            Some(StreamEvent::Unrecognized)
        );
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        assert_eq!(StreamEvent::decode("not json"), None);
        assert_eq!(StreamEvent::decode(r#"{"content":"no type"}"#), None);
        assert_eq!(StreamEvent::decode(r#"{"type":"token","content":42}"#), None);
        assert_eq!(StreamEvent::decode(r#"{"type":"sources","content":"x"}"#), None);
        assert_eq!(StreamEvent::decode(""), None);
    }

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::Error(String::new()).is_terminal());
        assert!(!StreamEvent::Token(String::new()).is_terminal());
        assert!(!StreamEvent::Unrecognized.is_terminal());
    }
}
