//! Legacy-message rewriting (spec.md §4.11 step 1): maps the one
//! pre-V1 shape this catalogue still accepts onto its V1 canonical
//! equivalent before routing.

use crate::codec::variants::legacy::EchoToolsLobbySessionStartV1;
use crate::codec::Message;
use crate::registry::GameServerRegistry;
use crate::session::Session;

/// Rewrites `Message::LegacyLobbySessionSuccess` into
/// `Message::EchoToolsLobbySessionStartV1`, filling the missing
/// `lobby_session_id` from the session's bound game-server record.
/// Every other variant passes through unchanged.
pub fn rewrite(message: Message, session: &Session, registry: &GameServerRegistry) -> Message {
    let Message::LegacyLobbySessionSuccess(legacy) = message else {
        return message;
    };

    let lobby_session_id = registry
        .get(session.session_id)
        .map(|record| record.bound_match_id)
        .unwrap_or(session.session_id);

    Message::EchoToolsLobbySessionStartV1(EchoToolsLobbySessionStartV1 {
        match_id: legacy.match_id,
        lobby_session_id,
        port: legacy.port,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::variants::legacy::LegacyLobbySessionSuccess;
    use std::net::{IpAddr, Ipv4Addr};
    use uuid::Uuid;

    #[test]
    fn test_rewrite_passes_non_legacy_messages_through() {
        let registry = GameServerRegistry::new();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let session = Session::new(Uuid::new_v4(), IpAddr::V4(Ipv4Addr::LOCALHOST), tx);
        let message = Message::LoginRequest(crate::codec::variants::login::LoginRequest {
            xpid: "OVR-1".into(),
            login_blob: vec![],
        });
        let rewritten = rewrite(message.clone(), &session, &registry);
        assert_eq!(rewritten, message);
    }

    #[test]
    fn test_rewrite_fills_lobby_session_id_from_own_session_when_unregistered() {
        let registry = GameServerRegistry::new();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let session_id = Uuid::new_v4();
        let session = Session::new(session_id, IpAddr::V4(Ipv4Addr::LOCALHOST), tx);
        let message = Message::LegacyLobbySessionSuccess(LegacyLobbySessionSuccess {
            match_id: Uuid::new_v4(),
            port: 7777,
        });
        let rewritten = rewrite(message, &session, &registry);
        match rewritten {
            Message::EchoToolsLobbySessionStartV1(v1) => {
                assert_eq!(v1.lobby_session_id, session_id);
                assert_eq!(v1.port, 7777);
            }
            other => panic!("unexpected rewrite result: {other:?}"),
        }
    }
}
