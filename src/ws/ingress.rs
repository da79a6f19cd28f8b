//! Inbound message handling
//!
//! Input is sampled, not queued: each decoded message overwrites the
//! session's slot and the tick loop only sees whatever is there when it
//! advances. A press that is released again before the next tick is lost.

use tracing::trace;

use crate::game::Session;
use crate::ws::protocol::decode_input;

/// Apply one inbound frame to the session's input slot.
///
/// Undecodable frames are dropped and the previous input stays in force.
/// Returns whether the slot was updated.
pub fn apply_frame(session: &Session, raw: &[u8]) -> bool {
    match decode_input(raw) {
        Some(keys) => {
            session.set_input(keys);
            true
        }
        None => {
            trace!(session_id = session.id(), bytes = raw.len(), "Dropped malformed message");
            false
        }
    }
}
