//! The tagged message union and its symbol-keyed wire dispatch table
//! (spec.md §4.1, §6, component C1).
//!
//! Every [`Message`] variant corresponds to one catalogue entry: a type
//! [`Symbol`] hashed from its wire name, plus an encode/decode pair
//! implemented on the variant's own struct in [`super::variants`]. This
//! module just aggregates those pairs into one enum and one lookup table,
//! the same shape as the teacher's component/command dispatch in
//! `session/router.rs`, but keyed by a single flat symbol rather than a
//! (component, command) pair.

use super::stream::{Reader, Writer};
use super::variants::config_doc::{ConfigRequest, ConfigSuccess, DocumentRequest, DocumentSuccess};
use super::variants::game_server::{
    BroadcasterSessionEnded, BroadcasterSessionStarted, GameServerEntrantRejected,
    GameServerJoinAttempt, GameServerPlayerRemoved, GameServerRegistrationFailure,
    GameServerRegistrationRequest, GameServerRegistrationSuccess, GameServerSessionStart,
};
use super::variants::legacy::{
    EchoToolsEntrantRejectV1, EchoToolsEntrantRemovedV1, EchoToolsLobbyEntrantNewV1,
    EchoToolsLobbySessionStartV1, EchoToolsLobbyStatusV1, EchoToolsSessionEndedV1,
    EchoToolsSessionLockV1, EchoToolsSessionUnlockV1, LegacyLobbySessionSuccess,
};
use super::variants::lobby_client::{
    LobbyCreateSessionRequest, LobbyFindSessionRequest, LobbyJoinSessionRequest,
    LobbyMatchmakerStatusRequest, LobbyPendingSessionCancel, LobbyPingResponse,
    LobbyPlayerSessionsRequest,
};
use super::variants::lobby_service::{
    LobbyMatchmakerStatus, LobbyPingRequest, LobbySessionFailure, LobbySessionSuccess,
    LobbyStatusNotify,
};
use super::variants::login::{LoginFailure, LoginRequest, LoginSuccess};
use super::variants::observability::RemoteLogSet;
use super::variants::profile::{
    LoggedInUserProfileFailure, LoggedInUserProfileRequest, LoggedInUserProfileSuccess,
    OtherUserProfileRequest, UpdateClientProfile,
};
use super::CodecError;
use crate::identity::{to_symbol, Symbol};

/// The full set of messages carried over the wire, tagged by the
/// catalogue name each variant is hashed from.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    LoginRequest(LoginRequest),
    LoginSuccess(LoginSuccess),
    LoginFailure(LoginFailure),

    LoggedInUserProfileRequest(LoggedInUserProfileRequest),
    LoggedInUserProfileSuccess(LoggedInUserProfileSuccess),
    LoggedInUserProfileFailure(LoggedInUserProfileFailure),
    UpdateClientProfile(UpdateClientProfile),
    OtherUserProfileRequest(OtherUserProfileRequest),

    ConfigRequest(ConfigRequest),
    ConfigSuccess(ConfigSuccess),
    DocumentRequest(DocumentRequest),
    DocumentSuccess(DocumentSuccess),

    LobbyFindSessionRequest(LobbyFindSessionRequest),
    LobbyCreateSessionRequest(LobbyCreateSessionRequest),
    LobbyJoinSessionRequest(LobbyJoinSessionRequest),
    LobbyPlayerSessionsRequest(LobbyPlayerSessionsRequest),
    LobbyMatchmakerStatusRequest(LobbyMatchmakerStatusRequest),
    LobbyPingResponse(LobbyPingResponse),
    LobbyPendingSessionCancel(LobbyPendingSessionCancel),

    LobbySessionSuccess(LobbySessionSuccess),
    LobbySessionFailure(LobbySessionFailure),
    LobbyStatusNotify(LobbyStatusNotify),
    LobbyMatchmakerStatus(LobbyMatchmakerStatus),
    LobbyPingRequest(LobbyPingRequest),

    GameServerRegistrationRequest(GameServerRegistrationRequest),
    GameServerRegistrationSuccess(GameServerRegistrationSuccess),
    GameServerRegistrationFailure(GameServerRegistrationFailure),
    GameServerSessionStart(GameServerSessionStart),
    BroadcasterSessionStarted(BroadcasterSessionStarted),
    BroadcasterSessionEnded(BroadcasterSessionEnded),
    GameServerJoinAttempt(GameServerJoinAttempt),
    GameServerEntrantRejected(GameServerEntrantRejected),
    GameServerPlayerRemoved(GameServerPlayerRemoved),

    RemoteLogSet(RemoteLogSet),

    LegacyLobbySessionSuccess(LegacyLobbySessionSuccess),
    EchoToolsLobbySessionStartV1(EchoToolsLobbySessionStartV1),
    EchoToolsLobbyEntrantNewV1(EchoToolsLobbyEntrantNewV1),
    EchoToolsSessionEndedV1(EchoToolsSessionEndedV1),
    EchoToolsSessionLockV1(EchoToolsSessionLockV1),
    EchoToolsSessionUnlockV1(EchoToolsSessionUnlockV1),
    EchoToolsEntrantRejectV1(EchoToolsEntrantRejectV1),
    EchoToolsEntrantRemovedV1(EchoToolsEntrantRemovedV1),
    EchoToolsLobbyStatusV1(EchoToolsLobbyStatusV1),
}

/// Declares one catalogue entry: the wire name each entry is hashed from
/// (via [`to_symbol`]), the `Message` variant it constructs on decode,
/// and how to encode it back. Keeping this as a macro-generated match
/// pair (rather than two hand-maintained tables) keeps the symbol name
/// and the variant shape from drifting apart.
macro_rules! catalogue {
    ($(($name:literal, $variant:ident)),+ $(,)?) => {
        impl Message {
            /// The wire type symbol this message is framed under, hashed
            /// from its catalogue name (spec.md §4.1/§4.2).
            pub fn type_symbol(&self) -> Symbol {
                match self {
                    $(Message::$variant(_) => to_symbol($name),)+
                }
            }
        }

        /// Decodes a payload given its wire type symbol. Returns `None`
        /// when the symbol matches no catalogue entry, which
        /// [`super::parse_packet`] treats as a designated-ignore drop.
        pub fn decode_message(type_symbol: Symbol, payload: &[u8]) -> Option<Result<Message, CodecError>> {
            $(
                if type_symbol == to_symbol($name) {
                    let mut reader = Reader::new(payload);
                    return Some($variant::decode(&mut reader).map(Message::$variant));
                }
            )+
            None
        }
    };
}

catalogue! {
    ("Login.Request", LoginRequest),
    ("Login.Success", LoginSuccess),
    ("Login.Failure", LoginFailure),

    ("Profile.LoggedInUserProfileRequest", LoggedInUserProfileRequest),
    ("Profile.LoggedInUserProfileSuccess", LoggedInUserProfileSuccess),
    ("Profile.LoggedInUserProfileFailure", LoggedInUserProfileFailure),
    ("Profile.UpdateClientProfile", UpdateClientProfile),
    ("Profile.OtherUserProfileRequest", OtherUserProfileRequest),

    ("Config.Request", ConfigRequest),
    ("Config.Success", ConfigSuccess),
    ("Document.Request", DocumentRequest),
    ("Document.Success", DocumentSuccess),

    ("Lobby.FindSessionRequest", LobbyFindSessionRequest),
    ("Lobby.CreateSessionRequest", LobbyCreateSessionRequest),
    ("Lobby.JoinSessionRequest", LobbyJoinSessionRequest),
    ("Lobby.PlayerSessionsRequest", LobbyPlayerSessionsRequest),
    ("Lobby.MatchmakerStatusRequest", LobbyMatchmakerStatusRequest),
    ("Lobby.PingResponse", LobbyPingResponse),
    ("Lobby.PendingSessionCancel", LobbyPendingSessionCancel),

    ("Lobby.SessionSuccess", LobbySessionSuccess),
    ("Lobby.SessionFailure", LobbySessionFailure),
    ("Lobby.StatusNotify", LobbyStatusNotify),
    ("Lobby.MatchmakerStatus", LobbyMatchmakerStatus),
    ("Lobby.PingRequest", LobbyPingRequest),

    ("GameServer.RegistrationRequest", GameServerRegistrationRequest),
    ("GameServer.RegistrationSuccess", GameServerRegistrationSuccess),
    ("GameServer.RegistrationFailure", GameServerRegistrationFailure),
    ("GameServer.SessionStart", GameServerSessionStart),
    ("Broadcaster.SessionStarted", BroadcasterSessionStarted),
    ("Broadcaster.SessionEnded", BroadcasterSessionEnded),
    ("GameServer.JoinAttempt", GameServerJoinAttempt),
    ("GameServer.EntrantRejected", GameServerEntrantRejected),
    ("GameServer.PlayerRemoved", GameServerPlayerRemoved),

    ("RemoteLog.Set", RemoteLogSet),

    ("Legacy.LobbySessionSuccess", LegacyLobbySessionSuccess),
    ("EchoToolsLobbySessionStartV1", EchoToolsLobbySessionStartV1),
    ("EchoToolsLobbyEntrantNewV1", EchoToolsLobbyEntrantNewV1),
    ("EchoToolsSessionEndedV1", EchoToolsSessionEndedV1),
    ("EchoToolsSessionLockV1", EchoToolsSessionLockV1),
    ("EchoToolsSessionUnlockV1", EchoToolsSessionUnlockV1),
    ("EchoToolsEntrantRejectV1", EchoToolsEntrantRejectV1),
    ("EchoToolsEntrantRemovedV1", EchoToolsEntrantRemovedV1),
    ("EchoToolsLobbyStatusV1", EchoToolsLobbyStatusV1),
}

/// Encodes a message's payload (not including the frame header) into `w`.
pub fn encode_message(message: &Message, w: &mut Writer) -> Result<(), CodecError> {
    match message {
        Message::LoginRequest(m) => Ok(m.encode(w)),
        Message::LoginSuccess(m) => Ok(m.encode(w)),
        Message::LoginFailure(m) => Ok(m.encode(w)),

        Message::LoggedInUserProfileRequest(m) => Ok(m.encode(w)),
        Message::LoggedInUserProfileSuccess(m) => m.encode(w),
        Message::LoggedInUserProfileFailure(m) => Ok(m.encode(w)),
        Message::UpdateClientProfile(m) => m.encode(w),
        Message::OtherUserProfileRequest(m) => Ok(m.encode(w)),

        Message::ConfigRequest(m) => Ok(m.encode(w)),
        Message::ConfigSuccess(m) => m.encode(w),
        Message::DocumentRequest(m) => Ok(m.encode(w)),
        Message::DocumentSuccess(m) => Ok(m.encode(w)),

        Message::LobbyFindSessionRequest(m) => m.encode(w),
        Message::LobbyCreateSessionRequest(m) => m.encode(w),
        Message::LobbyJoinSessionRequest(m) => m.encode(w),
        Message::LobbyPlayerSessionsRequest(m) => Ok(m.encode(w)),
        Message::LobbyMatchmakerStatusRequest(m) => Ok(m.encode(w)),
        Message::LobbyPingResponse(m) => Ok(m.encode(w)),
        Message::LobbyPendingSessionCancel(m) => Ok(m.encode(w)),

        Message::LobbySessionSuccess(m) => Ok(m.encode(w)),
        Message::LobbySessionFailure(m) => Ok(m.encode(w)),
        Message::LobbyStatusNotify(m) => Ok(m.encode(w)),
        Message::LobbyMatchmakerStatus(m) => Ok(m.encode(w)),
        Message::LobbyPingRequest(m) => Ok(m.encode(w)),

        Message::GameServerRegistrationRequest(m) => Ok(m.encode(w)),
        Message::GameServerRegistrationSuccess(m) => Ok(m.encode(w)),
        Message::GameServerRegistrationFailure(m) => Ok(m.encode(w)),
        Message::GameServerSessionStart(m) => Ok(m.encode(w)),
        Message::BroadcasterSessionStarted(m) => Ok(m.encode(w)),
        Message::BroadcasterSessionEnded(m) => Ok(m.encode(w)),
        Message::GameServerJoinAttempt(m) => Ok(m.encode(w)),
        Message::GameServerEntrantRejected(m) => Ok(m.encode(w)),
        Message::GameServerPlayerRemoved(m) => Ok(m.encode(w)),

        Message::RemoteLogSet(m) => Ok(m.encode(w)),

        Message::LegacyLobbySessionSuccess(m) => Ok(m.encode(w)),
        Message::EchoToolsLobbySessionStartV1(m) => Ok(m.encode(w)),
        Message::EchoToolsLobbyEntrantNewV1(m) => Ok(m.encode(w)),
        Message::EchoToolsSessionEndedV1(m) => Ok(m.encode(w)),
        Message::EchoToolsSessionLockV1(m) => Ok(m.encode(w)),
        Message::EchoToolsSessionUnlockV1(m) => Ok(m.encode(w)),
        Message::EchoToolsEntrantRejectV1(m) => Ok(m.encode(w)),
        Message::EchoToolsEntrantRemovedV1(m) => Ok(m.encode(w)),
        Message::EchoToolsLobbyStatusV1(m) => Ok(m.encode(w)),
    }
}
