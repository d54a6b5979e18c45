//! Per-connection message handling (spec.md §4.11 step 2 onward):
//! bridges a dispatched [`Message`] to the component that owns its
//! behaviour and produces the reply, if any.
//!
//! Grounded in the teacher's `session/router.rs` idiom of one function
//! per inbound variant matched off a coarse enum, but routed here
//! through [`crate::dispatch::route_for`] first since this catalogue's
//! variants map onto components (C4/C6/C7/C8/C9) rather than onto a
//! fixed Blaze component/command pair.

use std::net::Ipv4Addr;
use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use crate::codec::variants::config_doc::{ConfigSuccess, DocumentSuccess};
use crate::codec::variants::game_server::{
    GameServerRegistrationFailure, GameServerRegistrationSuccess,
};
use crate::codec::variants::login::{LoginFailure, LoginSuccess};
use crate::codec::variants::profile::{LoggedInUserProfileFailure, LoggedInUserProfileSuccess};
use crate::codec::Message;
use crate::dispatch::{self, DispatchError, Route};
use crate::errors::LobbyErrorCode;
use crate::finder;
use crate::identity::{AccountId, Symbol};
use crate::join;
use crate::lobby::entrant::Entrant;
use crate::lobby::role::Role;
use crate::matchmaker::candidate::MatchmakerEntry;
use crate::registry::registration::{self, RegistrationRequest};
use crate::session::Session;
use crate::state::AppState;

/// Handles one decoded inbound message for `session`, returning the
/// reply message to send back (if any). A `None` result means the
/// message either has no direct reply (e.g. a fire-and-forget log) or
/// was already handled by sending on a different session's queue (e.g.
/// the game-server notification half of a join).
pub async fn handle_message(state: &Arc<AppState>, session: &Arc<Session>, message: Message) -> Option<Message> {
    let message = match dispatch::dispatch_inbound(message, session, &state.game_servers) {
        Ok(message) => message,
        Err(DispatchError::AuthenticationRequired) => {
            return Some(Message::LoginFailure(LoginFailure::new(
                String::new(),
                401,
                "authentication required",
            )));
        }
        Err(DispatchError::LoginSessionMismatch) => {
            warn!("login session mismatch, terminating session {}", session.session_id);
            return None;
        }
    };

    match dispatch::route_for(&message) {
        Route::Login => handle_login(session, message).await,
        Route::GameServer => handle_game_server(state, session, message).await,
        Route::LobbyClient => handle_lobby_client(state, session, message).await,
        Route::Profile => handle_profile(state, session, message).await,
        Route::ConfigOrDocument => handle_config_or_document(state, message).await,
        Route::Observability => {
            handle_observability(message);
            None
        }
        Route::LobbyService => None,
    }
}

async fn handle_login(session: &Arc<Session>, message: Message) -> Option<Message> {
    let Message::LoginRequest(request) = message else {
        return None;
    };

    match AccountId::parse_text(&request.xpid) {
        Ok(account_id) => {
            session.bind_account(account_id);
            Some(Message::LoginSuccess(LoginSuccess {
                session_id: session.session_id,
                xpid: request.xpid,
            }))
        }
        Err(_) => Some(Message::LoginFailure(LoginFailure::new(
            request.xpid,
            400,
            "malformed account id",
        ))),
    }
}

async fn handle_game_server(state: &Arc<AppState>, session: &Arc<Session>, message: Message) -> Option<Message> {
    let Message::GameServerRegistrationRequest(request) = message else {
        return None;
    };

    let Some(operator_user_id) = session.account_id().map(|id| id.derived_uuid()) else {
        return Some(Message::GameServerRegistrationFailure(GameServerRegistrationFailure {
            reason: "unauthenticated".to_string(),
        }));
    };

    let registration_request = RegistrationRequest {
        operator_user_id,
        session_id: session.session_id,
        internal_ip: Ipv4Addr::from(request.internal_ip),
        external_ip_override: request.external_ip_override.map(Ipv4Addr::from),
        port: request.port,
        group_ids: request.group_ids,
        regions: request.regions,
        feature_flags: Vec::new(),
        version_lock: Symbol(0),
        priority_modes: Vec::new(),
    };

    match registration::register(
        registration_request,
        state.external_ip,
        &state.game_servers,
        &state.lobbies,
        state.audit.as_ref(),
        &state.node,
    )
    .await
    {
        Ok((record, _label)) => Some(Message::GameServerRegistrationSuccess(GameServerRegistrationSuccess {
            session_id: session.session_id,
            server_id: record.server_id,
        })),
        Err(registration::RegistrationError::ProbeFailed) => {
            Some(Message::GameServerRegistrationFailure(GameServerRegistrationFailure {
                reason: "health probe failed".to_string(),
            }))
        }
    }
}

async fn handle_lobby_client(state: &Arc<AppState>, session: &Arc<Session>, message: Message) -> Option<Message> {
    match message {
        Message::LobbyJoinSessionRequest(request) => {
            let Some(account_id) = session.account_id() else {
                return Some(failure(state.modes.arena_public, "default", LobbyErrorCode::Unauthorized));
            };

            let group_id = extract_group_id(&request.session_settings);
            let rating = crate::matchmaker::rating::get_rating_by_user_id(
                state.store.as_ref(),
                account_id.derived_uuid(),
                &group_id,
                state.modes.arena_public,
                true,
            )
            .await
            .unwrap_or_default();

            let entrant = Entrant {
                session_id: session.session_id,
                account_id,
                platform_id: request.platform,
                username: account_id.format_text(),
                display_name: account_id.format_text(),
                login_session_id: request.login_session,
                party_id: None,
                role: Role::Any,
                client_addr: std::net::SocketAddr::new(session.client_ip, 0),
                is_pcvr: session.params().is_pcvr,
                rating,
                rank_percentile: 0.5,
                matchmaker_query: String::new(),
                supported_features: session.params().supported_features,
            };
            match join::run_join_pipeline(
                request.lobby_id,
                &state.node,
                entrant,
                &group_id,
                state.modes.arena_public,
                state.guild_auth.as_ref(),
                &state.lobbies,
                &state.sessions,
                &state.streams,
            )
            .await
            {
                Ok(_) => None,
                Err(code) => Some(failure(state.modes.arena_public, &group_id, code)),
            }
        }
        Message::LobbyFindSessionRequest(request) => {
            let Some(account_id) = session.account_id() else {
                return Some(failure(request.mode, &request.group_id, LobbyErrorCode::Unauthorized));
            };

            match finder::validate_request(
                account_id.derived_uuid(),
                &request.group_id,
                session.client_ip,
                request.mode,
                state.modes.arena_public,
                state.modes.social_public,
                state.modes.combat_public,
                state.guild_auth.as_ref(),
                state.ip_quality.as_ref(),
            )
            .await
            {
                Ok(()) => {
                    let ticket_id = Uuid::new_v4();
                    finder::track_matchmaking_status(&state.streams, session.session_id, account_id.derived_uuid(), ticket_id);
                    let params = session.params();
                    let rating = crate::matchmaker::rating::get_rating_by_user_id(
                        state.store.as_ref(),
                        account_id.derived_uuid(),
                        &request.group_id,
                        request.mode,
                        true,
                    )
                    .await
                    .unwrap_or_default();
                    state.matchmaker_queue.submit(
                        request.mode,
                        MatchmakerEntry {
                            session_id: session.session_id,
                            ticket_id,
                            group_id: request.group_id.clone(),
                            max_rtt: state.config.matchmaker.default_max_rtt_ms,
                            server_rtt: Default::default(),
                            rating,
                            rank_percentile: 0.5,
                            priority_threshold: None,
                            account_id,
                            platform_id: account_id.platform.abbreviation().to_string(),
                            username: account_id.format_text(),
                            display_name: account_id.format_text(),
                            login_session_id: params.login_session_id.unwrap_or_else(Uuid::new_v4),
                            client_addr: std::net::SocketAddr::new(session.client_ip, 0),
                            is_pcvr: params.is_pcvr,
                            supported_features: params.supported_features.clone(),
                        },
                    );
                    // spec.md §4.7 step 6: "enter backfill loop in parallel".
                    spawn_backfill_loop(state.clone(), session.clone(), account_id, request.mode, request.group_id);
                    None
                }
                Err(code) => Some(failure(request.mode, &request.group_id, code)),
            }
        }
        Message::LobbyPendingSessionCancel(request) => {
            state.matchmaker_queue.cancel(state.modes.arena_public, session.session_id);
            let _ = request;
            None
        }
        _ => None,
    }
}

/// Spawns the per-ticket backfill loop (spec.md §4.7.2) alongside the
/// matchmaker ticket submitted for the same request. The loop exits on
/// its own once it joins a match or gives up with a non-retryable
/// error; nothing else needs to observe the spawned task's outcome.
fn spawn_backfill_loop(state: Arc<AppState>, session: Arc<Session>, account_id: AccountId, mode: Symbol, group_id: String) {
    let interval = crate::finder::backfill::ticker_interval(
        mode,
        false,
        state.modes.social_public,
        state.modes.arena_public,
        state.config.matchmaker.disable_arena_backfill,
    );
    let social = mode == state.modes.social_public;

    tokio::spawn(async move {
        let query = crate::finder::backfill::BackfillQuery {
            mode,
            group_id: group_id.clone(),
            party_size: 1,
            rank_percentile: None,
            rank_band: 0.15,
            max_rtt_ms: None,
            social,
        };

        let result = crate::finder::backfill::run_backfill_loop(query, &state.lobbies, interval, |match_id, role| {
            let state = state.clone();
            let session = session.clone();
            let group_id = group_id.clone();
            async move {
                let params = session.params();
                let rating = crate::matchmaker::rating::get_rating_by_user_id(
                    state.store.as_ref(),
                    account_id.derived_uuid(),
                    &group_id,
                    mode,
                    true,
                )
                .await
                .unwrap_or_default();
                let entrant = Entrant {
                    session_id: session.session_id,
                    account_id,
                    platform_id: account_id.platform.abbreviation().to_string(),
                    username: account_id.format_text(),
                    display_name: account_id.format_text(),
                    login_session_id: params.login_session_id.unwrap_or_else(Uuid::new_v4),
                    party_id: None,
                    role,
                    client_addr: std::net::SocketAddr::new(session.client_ip, 0),
                    is_pcvr: params.is_pcvr,
                    rating,
                    rank_percentile: 0.5,
                    matchmaker_query: String::new(),
                    supported_features: params.supported_features,
                };

                join::run_join_pipeline(
                    match_id,
                    &state.node,
                    entrant,
                    &group_id,
                    mode,
                    state.guild_auth.as_ref(),
                    &state.lobbies,
                    &state.sessions,
                    &state.streams,
                )
                .await
                .map(|_| ())
            }
        })
        .await;

        if let Err(code) = result {
            warn!("backfill loop for session {} ended: {:?}", session.session_id, code);
        }
    });
}

fn extract_group_id(session_settings: &serde_json::Value) -> String {
    session_settings
        .get("groupId")
        .and_then(|v| v.as_str())
        .unwrap_or("default")
        .to_string()
}

fn failure(mode: Symbol, group_id: &str, code: LobbyErrorCode) -> Message {
    Message::LobbySessionFailure(crate::codec::variants::lobby_service::LobbySessionFailure {
        protocol_version: 1,
        mode,
        group_id: group_id.to_string(),
        error_code: code.wire_code(),
    })
}

async fn handle_profile(state: &Arc<AppState>, session: &Arc<Session>, message: Message) -> Option<Message> {
    match message {
        Message::LoggedInUserProfileRequest(_) => {
            let Some(account_id) = session.account_id() else {
                return Some(Message::LoggedInUserProfileFailure(LoggedInUserProfileFailure {
                    reason: "unauthenticated".to_string(),
                }));
            };
            match state.store.get_blob("GameProfiles", &format!("gameProfile:{}", account_id.format_text())).await {
                Ok(Some(profile)) => Some(Message::LoggedInUserProfileSuccess(LoggedInUserProfileSuccess { profile })),
                Ok(None) => Some(Message::LoggedInUserProfileFailure(LoggedInUserProfileFailure {
                    reason: "no profile on file".to_string(),
                })),
                Err(_) => Some(Message::LoggedInUserProfileFailure(LoggedInUserProfileFailure {
                    reason: "store unavailable".to_string(),
                })),
            }
        }
        Message::UpdateClientProfile(update) => {
            if let Some(account_id) = session.account_id() {
                let _ = state
                    .store
                    .put_blob("GameProfiles", &format!("gameProfile:{}", account_id.format_text()), update.profile)
                    .await;
            }
            None
        }
        _ => None,
    }
}

async fn handle_config_or_document(state: &Arc<AppState>, message: Message) -> Option<Message> {
    match message {
        Message::ConfigRequest(request) => {
            let key = format!("{:016x}", request.config_type.0);
            match state.store.get_blob("Configs", &key).await {
                Ok(Some(data)) => Some(Message::ConfigSuccess(ConfigSuccess {
                    config_type: request.config_type,
                    data,
                })),
                _ => Some(Message::ConfigSuccess(ConfigSuccess {
                    config_type: request.config_type,
                    data: serde_json::Value::Null,
                })),
            }
        }
        Message::DocumentRequest(request) => {
            let key = format!("{}:{:016x}", request.language, request.document_type.0);
            match state.store.get_blob("Documents", &key).await {
                Ok(Some(data)) => Some(Message::DocumentSuccess(DocumentSuccess {
                    document_type: request.document_type,
                    contents: data.as_str().unwrap_or_default().to_string(),
                })),
                _ => Some(Message::DocumentSuccess(DocumentSuccess {
                    document_type: request.document_type,
                    contents: String::new(),
                })),
            }
        }
        _ => None,
    }
}

fn handle_observability(message: Message) {
    if let Message::RemoteLogSet(log) = message {
        info!("remote log ({}): {:?}", log.xpid, log.strings);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::identity::account_id::UserType;
    use crate::identity::Platform;
    use std::net::IpAddr;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new_with_dev_collaborators(
            RuntimeConfig::default(),
            "node-1".to_string(),
            Ipv4Addr::new(203, 0, 113, 5),
            std::collections::HashMap::new(),
        ))
    }

    fn session() -> Arc<Session> {
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        Arc::new(Session::new(Uuid::new_v4(), IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), tx))
    }

    #[tokio::test]
    async fn test_login_request_binds_account_on_valid_xpid() {
        let state = state();
        let session = session();
        let reply = handle_message(
            &state,
            &session,
            Message::LoginRequest(crate::codec::variants::login::LoginRequest {
                xpid: "OVR-123".to_string(),
                login_blob: vec![],
            }),
        )
        .await;
        assert!(matches!(reply, Some(Message::LoginSuccess(_))));
        assert_eq!(session.account_id(), Some(AccountId::new(Platform::OculusDeprecated, UserType::Standard, 123)));
    }

    #[tokio::test]
    async fn test_login_request_rejects_malformed_xpid() {
        let state = state();
        let session = session();
        let reply = handle_message(
            &state,
            &session,
            Message::LoginRequest(crate::codec::variants::login::LoginRequest {
                xpid: "not-a-valid-xpid-format".to_string(),
                login_blob: vec![],
            }),
        )
        .await;
        assert!(matches!(reply, Some(Message::LoginFailure(_))));
    }

    #[tokio::test]
    async fn test_unauthenticated_non_exempt_message_gets_login_failure() {
        let state = state();
        let session = session();
        let reply = handle_message(
            &state,
            &session,
            Message::LobbyJoinSessionRequest(crate::codec::variants::lobby_client::LobbyJoinSessionRequest {
                lobby_id: Uuid::new_v4(),
                version_lock: 0,
                platform: "OVR".into(),
                login_session: Uuid::new_v4(),
                flags: 0,
                session_settings: serde_json::Value::Null,
                entrants: vec![],
            }),
        )
        .await;
        assert!(matches!(reply, Some(Message::LoginFailure(_))));
    }

    #[tokio::test]
    async fn test_find_session_request_rejects_unmatchmakable_mode() {
        let state = state();
        let session = session();
        session.bind_account(AccountId::new(Platform::Steam, UserType::Standard, 1));
        let reply = handle_message(
            &state,
            &session,
            Message::LobbyFindSessionRequest(crate::codec::variants::lobby_client::LobbyFindSessionRequest {
                mode: crate::identity::to_symbol("private_match"),
                version_lock: 0,
                group_id: "default".to_string(),
                session_settings: serde_json::Value::Null,
            }),
        )
        .await;
        assert!(matches!(reply, Some(Message::LobbySessionFailure(_))));
    }

    #[tokio::test]
    async fn test_registration_without_authentication_is_rejected() {
        let state = state();
        let session = session();
        let reply = handle_message(
            &state,
            &session,
            Message::GameServerRegistrationRequest(crate::codec::variants::game_server::GameServerRegistrationRequest {
                internal_ip: u32::from(Ipv4Addr::new(10, 0, 0, 5)),
                external_ip_override: None,
                port: 6792,
                group_ids: vec!["default".to_string()],
                regions: vec![],
            }),
        )
        .await;
        assert!(matches!(reply, Some(Message::GameServerRegistrationFailure(_))));
    }
}
