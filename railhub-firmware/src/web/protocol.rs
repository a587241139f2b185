// WebSocket-Protokoll-Definitionen
// Definiert die JSON-Nachrichten für Client ↔ Server Kommunikation
//
// Client → Server: {"type":"control","pin":4,"active":true,"brightness":80}
// Server → Client: Status-Snapshot ("type":"status"), "ack" oder "error"
//
// Die REST-Routen (POST /api/...) nutzen dieselbe Struktur, der Typ
// ergibt sich dort aus dem Pfad.

use serde::Serialize;

pub use railhub_core::{ClientRequest, MessageType};

/// Server → Client Antworten auf ein Kommando
/// Der Status selbst kommt separat als Snapshot über den StatusChannel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum WsServerMessage {
    #[serde(rename = "ack")]
    Ack,
    #[serde(rename = "error")]
    Error { message: &'static str },
}
