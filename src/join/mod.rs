//! Join pipeline (spec.md §4.9, component C9): takes an entrant into a
//! live match, tracks the six presence streams spec.md names, and
//! delivers `LobbySessionSuccess` to the server then, after a pause, to
//! the client.
//!
//! Grounded in the teacher's `services/sessions.rs` idiom of a free
//! function that borrows the shared registries it needs rather than
//! owning them, plus the `Sessions::add_session`/`remove_session` pair
//! of "track on success, always clean up the old tracking first"
//! ordering spec.md §4.9 step 4 calls for.

use std::time::Duration;

use log::warn;
use uuid::Uuid;

use crate::codec::variants::lobby_service::LobbySessionFailure;
use crate::codec::Message;
use crate::errors::LobbyErrorCode;
use crate::external::guild::{GuildAuthClient, GuildAuthDecision};
use crate::identity::to_symbol;
use crate::lobby::entrant::Entrant;
use crate::lobby::signal::Signal;
use crate::lobby::LobbyRegistry;
use crate::presence::registry::{PresenceMeta, StreamRegistry};
use crate::presence::stream_key::StreamKey;
use crate::session::SessionRegistry;

/// The pause between the server-bound and client-bound
/// `LobbySessionSuccess` (spec.md §4.9 step 8: "so the server has
/// finished opening the slot before the client dials").
const CLIENT_NOTIFY_DELAY: Duration = Duration::from_millis(250);
/// Per-entrant soft delivery timeout (spec.md §4.9: "the caller waits up
/// to 5s per entrant").
const DELIVERY_SOFT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Success,
    /// The join itself succeeded but at least one delivery exceeded its
    /// soft timeout; the entrant may still be in the match.
    SoftTimeout,
}

/// Runs the join pipeline for one entrant against an existing match
/// (spec.md §4.9 steps 1-8).
pub async fn join_session(
    match_id: Uuid,
    entrant: Entrant,
    lobbies: &LobbyRegistry,
    sessions: &SessionRegistry,
) -> Result<JoinOutcome, LobbyErrorCode> {
    let Some(handle) = lobbies.get(match_id) else {
        return Err(LobbyErrorCode::MatchNotFound);
    };

    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    let required_features = entrant.supported_features.clone();
    handle
        .send(Signal::JoinAttempt {
            session_id: entrant.session_id,
            is_broadcaster: false,
            entrants: vec![entrant.clone()],
            required_features,
            reply: reply_tx,
        })
        .await
        .map_err(|_| LobbyErrorCode::MatchNotFound)?;

    reply_rx.await.map_err(|_| LobbyErrorCode::InternalError)??;

    Ok(JoinOutcome::Success)
}

/// Full join pipeline including guild re-check, presence tracking, and
/// server/client notification (spec.md §4.9 steps 1-8). Separate from
/// [`join_session`] so callers that already know the join must succeed
/// (e.g. the builder re-joining reserved entrants) can skip straight to
/// the signal round-trip.
pub async fn run_join_pipeline(
    match_id: Uuid,
    node: &str,
    entrant: Entrant,
    group_id: &str,
    mode: crate::identity::Symbol,
    guild_auth: &dyn GuildAuthClient,
    lobbies: &LobbyRegistry,
    sessions: &SessionRegistry,
    streams: &StreamRegistry,
) -> Result<JoinOutcome, LobbyErrorCode> {
    match guild_auth.check(entrant.account_id.derived_uuid(), group_id).await {
        Ok(GuildAuthDecision::Allowed) => {}
        Ok(_) => return Err(LobbyErrorCode::Suspended),
        Err(_) => return Err(LobbyErrorCode::InternalError),
    }

    let outcome = match join_session(match_id, entrant.clone(), lobbies, sessions).await {
        Ok(outcome) => outcome,
        Err(code) => {
            if let Some(session) = sessions.get(entrant.session_id) {
                let _ = session
                    .send(Message::LobbySessionFailure(LobbySessionFailure {
                        protocol_version: 1,
                        mode,
                        group_id: group_id.to_string(),
                        error_code: code.wire_code(),
                    }))
                    .await;
            }
            return Err(code);
        }
    };

    untrack_previous_group_and_entrant_streams(entrant.session_id, streams);

    if !track_six_presence_streams(match_id, node, group_id, &entrant, streams) {
        return Err(LobbyErrorCode::InternalError);
    }

    if let Some(label) = lobbies.get(match_id).map(|h| h.label()) {
        if let Some(server_session) = label.server_session_id {
            if let Some(server_session_handle) = sessions.get(server_session) {
                let delivered = deliver_with_soft_timeout(
                    &server_session_handle,
                    success_message(&label, &entrant),
                )
                .await;
                if !delivered {
                    warn!("soft-timeout delivering LobbySessionSuccess to game server (MID: {})", match_id);
                }
            }
        }

        let matchmaking_stream = StreamKey::new(
            to_symbol("matchmaking"),
            entrant.session_id,
            to_symbol("ticket"),
            to_symbol("session"),
        );
        streams.untrack(matchmaking_stream, entrant.session_id);

        tokio::time::sleep(CLIENT_NOTIFY_DELAY).await;

        if let Some(client_session) = sessions.get(entrant.session_id) {
            let delivered = deliver_with_soft_timeout(&client_session, success_message(&label, &entrant)).await;
            if !delivered {
                return Ok(JoinOutcome::SoftTimeout);
            }
        }
    }

    Ok(outcome)
}

fn success_message(label: &crate::lobby::MatchLabel, entrant: &Entrant) -> Message {
    let endpoint = label.server_endpoint.unwrap_or(crate::registry::Endpoint {
        internal_ip: std::net::Ipv4Addr::UNSPECIFIED,
        external_ip: std::net::Ipv4Addr::UNSPECIFIED,
        port: 0,
    });
    Message::LobbySessionSuccess(crate::codec::variants::lobby_service::LobbySessionSuccess {
        protocol_version: 1,
        match_id: label.match_id,
        internal_ip: u32::from_be_bytes(endpoint.internal_ip.octets()),
        external_ip: u32::from_be_bytes(endpoint.external_ip.octets()),
        port: endpoint.port,
        role: entrant.role,
        is_pcvr: entrant.is_pcvr,
    })
}

async fn deliver_with_soft_timeout(session: &crate::session::Session, message: Message) -> bool {
    matches!(
        tokio::time::timeout(DELIVERY_SOFT_TIMEOUT, session.send(message)).await,
        Ok(true)
    )
}

fn untrack_previous_group_and_entrant_streams(session_id: Uuid, streams: &StreamRegistry) {
    streams.untrack_all(session_id);
}

/// A stable UUID derived from a group ID string, since [`StreamKey`]'s
/// subject slot is a `Uuid` but group IDs are arbitrary text.
const GROUP_UUID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x1b, 0x67, 0x15, 0x20, 0x6f, 0x9b, 0x4e, 0x3d, 0x9f, 0x1e, 0x6c, 0x2d, 0x4a, 0x87, 0x3c, 0x55,
]);

fn group_id_to_uuid(group_id: &str) -> Uuid {
    Uuid::new_v5(&GROUP_UUID_NAMESPACE, group_id.as_bytes())
}

/// Tracks the six presence streams spec.md §4.9 step 5 names: lobby-
/// group, entrant, and four service aliases (session ID, login-session
/// ID, user ID, derived account UUID), all `status=matchID, hidden=true`.
fn track_six_presence_streams(
    match_id: Uuid,
    node: &str,
    group_id: &str,
    entrant: &Entrant,
    streams: &StreamRegistry,
) -> bool {
    let node_symbol = to_symbol(node);
    let status = match_id.to_string();
    let meta = PresenceMeta {
        format: "match".to_string(),
        username: entrant.username.clone(),
        status: status.clone(),
        hidden: true,
    };

    let group_key = StreamKey::new(
        to_symbol("lobby-group"),
        group_id_to_uuid(group_id),
        to_symbol("group"),
        to_symbol("session"),
    );
    streams.track(group_key, entrant.session_id, entrant.account_id.derived_uuid(), meta.clone());

    let entrant_key = StreamKey::new(
        to_symbol("entrant"),
        entrant.session_id,
        to_symbol("match"),
        node_symbol,
    );
    streams.track(entrant_key, entrant.session_id, entrant.account_id.derived_uuid(), meta.clone());

    for (subcontext, subject) in [
        (to_symbol("session-id"), entrant.session_id),
        (to_symbol("login-session-id"), entrant.login_session_id),
        (to_symbol("user-id"), entrant.account_id.derived_uuid()),
        (to_symbol("account-uuid"), entrant.account_id.derived_uuid()),
    ] {
        let key = StreamKey::new(to_symbol("service-alias"), subject, subcontext, to_symbol("session"));
        streams.track(key, entrant.session_id, entrant.account_id.derived_uuid(), meta.clone());
    }

    true
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::external::guild::AllowAllGuildAuthClient;
    use crate::identity::{account_id::UserType, AccountId, Platform};
    use crate::lobby::role::Role;
    use crate::matchmaker::rating::Rating;
    use tokio::sync::mpsc;

    fn sample_entrant() -> Entrant {
        let session_id = Uuid::new_v4();
        Entrant {
            session_id,
            account_id: AccountId::new(Platform::OculusOrg, UserType::Standard, 1),
            platform_id: "OVR".into(),
            username: "player".into(),
            display_name: "player".into(),
            login_session_id: Uuid::new_v4(),
            party_id: None,
            role: Role::Any,
            client_addr: "127.0.0.1:0".parse().unwrap(),
            is_pcvr: false,
            rating: Rating::default(),
            rank_percentile: 0.5,
            matchmaker_query: String::new(),
            supported_features: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_join_session_on_unknown_match_returns_match_not_found() {
        let lobbies = LobbyRegistry::new();
        let sessions = SessionRegistry::new();
        let result = join_session(Uuid::new_v4(), sample_entrant(), &lobbies, &sessions).await;
        assert_eq!(result, Err(LobbyErrorCode::MatchNotFound));
    }

    #[tokio::test]
    async fn test_run_join_pipeline_reports_match_not_found_to_client() {
        let lobbies = LobbyRegistry::new();
        let sessions = SessionRegistry::new();
        let streams = StreamRegistry::new();
        let entrant = sample_entrant();

        let (tx, mut rx) = mpsc::channel(8);
        let session = std::sync::Arc::new(crate::session::Session::new(
            entrant.session_id,
            "127.0.0.1".parse().unwrap(),
            tx,
        ));
        sessions.insert(session);

        let guild = AllowAllGuildAuthClient;
        let result = run_join_pipeline(
            Uuid::new_v4(),
            "node-1",
            entrant,
            "default",
            to_symbol("arena_public"),
            &guild,
            &lobbies,
            &sessions,
            &streams,
        )
        .await;

        assert_eq!(result, Err(LobbyErrorCode::MatchNotFound));
        let failure = rx.recv().await.unwrap();
        assert!(matches!(failure, Message::LobbySessionFailure(_)));
    }
}
