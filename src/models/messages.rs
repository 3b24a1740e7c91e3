use serde::{Deserialize, Serialize};

/// Messages received from a client session.
///
/// Payloads are JSON objects tagged with a `type` field. Unknown fields are
/// ignored so older or richer clients keep working; a missing `content` is
/// handled downstream as a no-op.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// A full-document edit from the client.
    #[serde(rename = "message")]
    Edit {
        #[serde(default)]
        content: Option<String>,
    },
    /// Application-level liveness probe.
    #[serde(rename = "ping")]
    Ping,
}

/// Messages sent to a client session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// The full current document text, pushed on resync and on broadcast.
    #[serde(rename = "content")]
    Content { content: String },
    /// A persistence or validation failure, delivered to the sender only.
    #[serde(rename = "error")]
    Error { message: String },
    /// Reply to a `ping`.
    #[serde(rename = "pong")]
    Pong { date: String },
}
