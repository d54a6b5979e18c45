//! Pipeline dispatcher (spec.md §4.11, component C11): the single
//! point every inbound decoded message passes through before it
//! reaches a handler — legacy rewriting, authentication enforcement,
//! and identifying-variant cross-checks.
//!
//! Grounded in the teacher's `session/router.rs` idea of a thin,
//! stateless gate in front of the real handlers: this module makes no
//! routing decisions of its own beyond classifying a variant's
//! authentication requirement and, where relevant, the field pair it
//! must cross-check.

pub mod legacy;

use uuid::Uuid;

use crate::codec::Message;
use crate::registry::GameServerRegistry;
use crate::session::Session;

/// Coarse routing category a handler loop switches on (spec.md §4.11
/// step 2). Each category maps to one of the components that actually
/// implements the behaviour: C7 (finder), C8 (builder), C9 (join), or a
/// handful of directly-answered bookkeeping variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Profile,
    ConfigOrDocument,
    LobbyClient,
    LobbyService,
    GameServer,
    Observability,
}

/// Classifies a decoded message into its routing category.
pub fn route_for(message: &Message) -> Route {
    match message {
        Message::LoginRequest(_) | Message::LoginSuccess(_) | Message::LoginFailure(_) => Route::Login,

        Message::LoggedInUserProfileRequest(_)
        | Message::LoggedInUserProfileSuccess(_)
        | Message::LoggedInUserProfileFailure(_)
        | Message::UpdateClientProfile(_)
        | Message::OtherUserProfileRequest(_) => Route::Profile,

        Message::ConfigRequest(_) | Message::ConfigSuccess(_) | Message::DocumentRequest(_) | Message::DocumentSuccess(_) => {
            Route::ConfigOrDocument
        }

        Message::LobbyFindSessionRequest(_)
        | Message::LobbyCreateSessionRequest(_)
        | Message::LobbyJoinSessionRequest(_)
        | Message::LobbyPlayerSessionsRequest(_)
        | Message::LobbyMatchmakerStatusRequest(_)
        | Message::LobbyPingResponse(_)
        | Message::LobbyPendingSessionCancel(_) => Route::LobbyClient,

        Message::LobbySessionSuccess(_)
        | Message::LobbySessionFailure(_)
        | Message::LobbyStatusNotify(_)
        | Message::LobbyMatchmakerStatus(_)
        | Message::LobbyPingRequest(_)
        | Message::LegacyLobbySessionSuccess(_)
        | Message::EchoToolsLobbySessionStartV1(_)
        | Message::EchoToolsLobbyEntrantNewV1(_)
        | Message::EchoToolsSessionEndedV1(_)
        | Message::EchoToolsSessionLockV1(_)
        | Message::EchoToolsSessionUnlockV1(_)
        | Message::EchoToolsEntrantRejectV1(_)
        | Message::EchoToolsEntrantRemovedV1(_)
        | Message::EchoToolsLobbyStatusV1(_) => Route::LobbyService,

        Message::GameServerRegistrationRequest(_)
        | Message::GameServerRegistrationSuccess(_)
        | Message::GameServerRegistrationFailure(_)
        | Message::GameServerSessionStart(_)
        | Message::BroadcasterSessionStarted(_)
        | Message::BroadcasterSessionEnded(_)
        | Message::GameServerJoinAttempt(_)
        | Message::GameServerEntrantRejected(_)
        | Message::GameServerPlayerRemoved(_) => Route::GameServer,

        Message::RemoteLogSet(_) => Route::Observability,
    }
}

/// True if `message` may arrive on an unauthenticated session (spec.md
/// §4.11 step 3: "config, login, remote-log, IAP, game-server
/// registration"). This catalogue has no distinct IAP variant; the rule
/// is otherwise applied as written.
pub fn is_authentication_exempt(message: &Message) -> bool {
    matches!(
        message,
        Message::LoginRequest(_)
            | Message::ConfigRequest(_)
            | Message::DocumentRequest(_)
            | Message::RemoteLogSet(_)
            | Message::GameServerRegistrationRequest(_)
    )
}

/// The `loginSessionID` an identifying variant carries, if any, for the
/// step-4 cross-check. Only variants that name a login session in their
/// own payload participate; everything else is exempt from this check.
pub fn identifying_login_session(message: &Message) -> Option<Uuid> {
    match message {
        Message::LobbyJoinSessionRequest(req) => Some(req.login_session),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    AuthenticationRequired,
    LoginSessionMismatch,
}

/// One pass through the pipeline dispatcher (spec.md §4.11 steps 1-4).
/// Returns the (possibly rewritten) message ready for routing, or the
/// reason the connection should be rejected/terminated.
pub fn dispatch_inbound(
    message: Message,
    session: &Session,
    registry: &GameServerRegistry,
) -> Result<Message, DispatchError> {
    let message = legacy::rewrite(message, session, registry);

    if !is_authentication_exempt(&message) && !session.is_authenticated() {
        return Err(DispatchError::AuthenticationRequired);
    }

    if let Some(claimed_login_session) = identifying_login_session(&message) {
        let stored = session.params().login_session_id;
        if stored.is_some_and(|s| s != claimed_login_session) {
            return Err(DispatchError::LoginSessionMismatch);
        }
    }

    Ok(message)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::variants::lobby_client::LobbyJoinSessionRequest;
    use crate::codec::variants::login::LoginRequest;
    use std::net::{IpAddr, Ipv4Addr};

    fn session() -> Session {
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        Session::new(Uuid::new_v4(), IpAddr::V4(Ipv4Addr::LOCALHOST), tx)
    }

    #[test]
    fn test_login_request_is_exempt_from_authentication() {
        let registry = GameServerRegistry::new();
        let session = session();
        let message = Message::LoginRequest(LoginRequest {
            xpid: "OVR-1".into(),
            login_blob: vec![],
        });
        assert!(dispatch_inbound(message, &session, &registry).is_ok());
    }

    #[test]
    fn test_unauthenticated_session_rejected_for_non_exempt_variant() {
        let registry = GameServerRegistry::new();
        let session = session();
        let message = Message::LobbyJoinSessionRequest(LobbyJoinSessionRequest {
            lobby_id: Uuid::new_v4(),
            version_lock: 0,
            platform: "OVR".into(),
            login_session: Uuid::new_v4(),
            flags: 0,
            session_settings: serde_json::Value::Null,
            entrants: vec![],
        });
        assert_eq!(
            dispatch_inbound(message, &session, &registry),
            Err(DispatchError::AuthenticationRequired)
        );
    }

    #[test]
    fn test_login_session_mismatch_terminates() {
        let registry = GameServerRegistry::new();
        let session = session();
        session.bind_account(crate::identity::AccountId::new(
            crate::identity::Platform::Steam,
            crate::identity::account_id::UserType::Standard,
            1,
        ));
        let stored = Uuid::new_v4();
        session.update_params(|p| p.login_session_id = Some(stored));

        let message = Message::LobbyJoinSessionRequest(LobbyJoinSessionRequest {
            lobby_id: Uuid::new_v4(),
            version_lock: 0,
            platform: "OVR".into(),
            login_session: Uuid::new_v4(),
            flags: 0,
            session_settings: serde_json::Value::Null,
            entrants: vec![],
        });

        assert_eq!(
            dispatch_inbound(message, &session, &registry),
            Err(DispatchError::LoginSessionMismatch)
        );
    }
}
