//! Error taxonomy (spec.md §7): the surface of error kinds the core
//! reports to clients, logs, or counts in metrics. This is a *surface*,
//! not an exception hierarchy — most call sites convert into one of
//! these kinds at the boundary where a user-facing response is built,
//! the same way the teacher's `session/router.rs` handlers convert
//! internal failures into a response code rather than propagating a
//! raw error type to the wire.

use thiserror::Error;

/// One of the named error surfaces a lobby/matchmaking operation can
/// report back to a client, in a `LobbySessionFailure` message or an
/// HTTP admin response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LobbyErrorCode {
    #[error("bad request")]
    BadRequest,
    #[error("internal error")]
    InternalError,
    #[error("server does not exist")]
    ServerDoesNotExist,
    #[error("server is full")]
    ServerIsFull,
    #[error("server is locked")]
    ServerIsLocked,
    #[error("server find failed")]
    ServerFindFailed,
    #[error("no available servers")]
    NoAvailableServers,
    #[error("missing entitlement")]
    MissingEntitlement,
    #[error("kicked from lobby group")]
    KickedFromLobbyGroup,
    #[error("suspended")]
    Suspended,
    #[error("matchmaking timeout")]
    MatchmakingTimeout,
    #[error("matchmaking unknown error")]
    MatchmakingUnknownError,
    #[error("match not found")]
    MatchNotFound,
    #[error("match terminating")]
    MatchTerminating,
    #[error("unassigned lobby")]
    UnassignedLobby,
    #[error("duplicate join")]
    DuplicateJoin,
    #[error("feature mismatch")]
    FeatureMismatch,
    #[error("failed to acquire lock")]
    FailedToAcquireLock,
    #[error("unauthorized")]
    Unauthorized,
}

impl LobbyErrorCode {
    /// The wire-stable numeric code carried in `LobbySessionFailure`'s
    /// `error_code` field. Values are assigned once and never reused.
    pub fn wire_code(self) -> u16 {
        match self {
            LobbyErrorCode::BadRequest => 1,
            LobbyErrorCode::InternalError => 2,
            LobbyErrorCode::ServerDoesNotExist => 3,
            LobbyErrorCode::ServerIsFull => 4,
            LobbyErrorCode::ServerIsLocked => 5,
            LobbyErrorCode::ServerFindFailed => 6,
            LobbyErrorCode::NoAvailableServers => 7,
            LobbyErrorCode::MissingEntitlement => 8,
            LobbyErrorCode::KickedFromLobbyGroup => 9,
            LobbyErrorCode::Suspended => 10,
            LobbyErrorCode::MatchmakingTimeout => 11,
            LobbyErrorCode::MatchmakingUnknownError => 12,
            LobbyErrorCode::MatchNotFound => 13,
            LobbyErrorCode::MatchTerminating => 14,
            LobbyErrorCode::UnassignedLobby => 15,
            LobbyErrorCode::DuplicateJoin => 16,
            LobbyErrorCode::FeatureMismatch => 17,
            LobbyErrorCode::FailedToAcquireLock => 18,
            LobbyErrorCode::Unauthorized => 19,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wire_codes_are_distinct() {
        let all = [
            LobbyErrorCode::BadRequest,
            LobbyErrorCode::InternalError,
            LobbyErrorCode::ServerDoesNotExist,
            LobbyErrorCode::ServerIsFull,
            LobbyErrorCode::ServerIsLocked,
            LobbyErrorCode::ServerFindFailed,
            LobbyErrorCode::NoAvailableServers,
            LobbyErrorCode::MissingEntitlement,
            LobbyErrorCode::KickedFromLobbyGroup,
            LobbyErrorCode::Suspended,
            LobbyErrorCode::MatchmakingTimeout,
            LobbyErrorCode::MatchmakingUnknownError,
            LobbyErrorCode::MatchNotFound,
            LobbyErrorCode::MatchTerminating,
            LobbyErrorCode::UnassignedLobby,
            LobbyErrorCode::DuplicateJoin,
            LobbyErrorCode::FeatureMismatch,
            LobbyErrorCode::FailedToAcquireLock,
            LobbyErrorCode::Unauthorized,
        ];
        let mut codes: Vec<u16> = all.iter().map(|e| e.wire_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
