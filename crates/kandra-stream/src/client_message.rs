use serde::Deserialize;

/// What a client may send over the duplex stream. Anything else (malformed
/// JSON, an unrecognized `type`) is ignored rather than closing the
/// connection — the stream is otherwise entirely server-to-client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    Ping,
    Close,
}

#[derive(Deserialize)]
struct RawClientMessage {
    #[serde(rename = "type")]
    kind: String,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Option<Self> {
        let raw: RawClientMessage = serde_json::from_str(text).ok()?;
        match raw.kind.as_str() {
            "ping" => Some(ClientMessage::Ping),
            "close" => Some(ClientMessage::Close),
            _ => None,
        }
    }
}
