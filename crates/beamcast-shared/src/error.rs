use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable admission-failure codes carried in `room-error` frames.
///
/// The code is the canonical signal; the display string is a human-readable
/// message suitable for the client UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomErrorCode {
    #[error("Room not found.")]
    RoomNotFound,

    #[error("Incorrect room key.")]
    InvalidKey,

    #[error("Room already has a broadcaster and a viewer.")]
    RoomFull,

    #[error("Room limit reached, try again later.")]
    MaxRooms,

    #[error("Already in a room, leave it first.")]
    AlreadyInRoom,
}
