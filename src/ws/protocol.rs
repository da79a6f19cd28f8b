//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::{InputKeys, PlayerId};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Latest key state; `keys` may be absent or null
    Input {
        #[serde(default)]
        keys: Option<InputKeys>,
    },
}

/// Messages sent from server to client.
///
/// The room state is flattened into the message so the entity collections
/// sit next to `type` at the top level.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg<'a, S> {
    /// Sent exactly once, when the session joins
    Init {
        id: PlayerId,
        room: &'a str,
        #[serde(flatten)]
        state: &'a S,
    },

    /// Sent after every broadcast tick
    GameState {
        #[serde(flatten)]
        state: &'a S,
    },
}

/// Decode an inbound frame into input flags.
/// Returns `None` for anything that is not a well-formed input message.
pub fn decode_input(raw: &[u8]) -> Option<InputKeys> {
    match serde_json::from_slice::<ClientMsg>(raw).ok()? {
        ClientMsg::Input { keys } => Some(keys.unwrap_or_default()),
    }
}
