//! Room: the communication channel for one kanban board.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HandshakeError;

/// Identifies one collaboration room.
///
/// Derived from a board identifier as `board_{id}`; no two boards share a
/// room. All connection tracking and presence bookkeeping is keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Derive the room identifier for a board.
    ///
    /// Board identifiers are restricted to word characters (ASCII letters,
    /// digits, underscore), matching the connection route pattern.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::InvalidBoardId`] when the identifier is
    /// empty or contains any other character.
    pub fn for_board(board_id: &str) -> Result<Self, HandshakeError> {
        let valid = !board_id.is_empty()
            && board_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(HandshakeError::InvalidBoardId(board_id.to_string()));
        }
        Ok(Self(format!("board_{board_id}")))
    }

    /// The room key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
