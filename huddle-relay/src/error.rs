use huddle_core::utils::{CODE_ROOM_CLOSED, CODE_ROOM_FULL, CODE_UNKNOWN_USER};
use thiserror::Error;

pub const CODE_BAD_REQUEST: &str = "bad_request";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("room is full ({0} participants)")]
    RoomFull(usize),

    #[error("room is closed")]
    RoomClosed,

    #[error("user {0} is not a member of this room")]
    UnknownMember(String),

    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl RelayError {
    /// Machine-readable code carried in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::RoomFull(_) => CODE_ROOM_FULL,
            RelayError::RoomClosed => CODE_ROOM_CLOSED,
            RelayError::UnknownMember(_) => CODE_UNKNOWN_USER,
            RelayError::BadRequest(_) => CODE_BAD_REQUEST,
        }
    }
}
