//! Lobby finder / backfill (spec.md §4.7, component C7): the entry
//! point for a matchmaking-or-join-existing request, and the
//! party-leader-follow loop non-leaders run while their leader
//! matchmakes.

pub mod backfill;
pub mod party;

use std::time::Duration;

use log::warn;
use uuid::Uuid;

use crate::errors::LobbyErrorCode;
use crate::external::guild::{GuildAuthClient, GuildAuthDecision};
use crate::external::ip_quality::IpQualityClient;
use crate::identity::Symbol;
use crate::lobby::role::Role;
use crate::lobby::{LobbyRegistry, LobbyType};
use crate::presence::registry::{PresenceMeta, StreamRegistry};
use crate::presence::stream_key::StreamKey;

const PARTY_LEADER_WAIT: Duration = Duration::from_secs(10);
const FOLLOW_CADENCE: Duration = Duration::from_secs(3);
const FOLLOW_RETRY_DELAY: Duration = Duration::from_secs(5);

/// The three modes this deployment allows into matchmaking (spec.md
/// §4.7 step 2).
pub fn is_matchmakable_mode(mode: Symbol, arena_public: Symbol, social_public: Symbol, combat_public: Symbol) -> bool {
    mode == arena_public || mode == social_public || mode == combat_public
}

/// One request to find or create a match for `account_id` (spec.md §4.7
/// steps 1-6 entry gate; party handling and ticket submission are
/// driven by the caller once this returns `Ok`).
pub async fn validate_request(
    account_id: Uuid,
    group_id: &str,
    client_ip: std::net::IpAddr,
    mode: Symbol,
    arena_public: Symbol,
    social_public: Symbol,
    combat_public: Symbol,
    guild_auth: &dyn GuildAuthClient,
    ip_quality: &dyn IpQualityClient,
) -> Result<(), LobbyErrorCode> {
    match guild_auth.check(account_id, group_id).await {
        Ok(GuildAuthDecision::Allowed) => {}
        Ok(GuildAuthDecision::RejectedSuspended) => return Err(LobbyErrorCode::Suspended),
        Ok(GuildAuthDecision::RejectedKicked) => return Err(LobbyErrorCode::KickedFromLobbyGroup),
        Ok(GuildAuthDecision::RejectedUnderage) => return Err(LobbyErrorCode::MissingEntitlement),
        Err(_) => return Err(LobbyErrorCode::InternalError),
    }

    if !is_matchmakable_mode(mode, arena_public, social_public, combat_public) {
        return Err(LobbyErrorCode::BadRequest);
    }

    match ip_quality.lookup(client_ip).await {
        Ok(report) if report.is_vpn => return Err(LobbyErrorCode::Suspended),
        Ok(_) => {}
        Err(_) => {}
    }

    Ok(())
}

/// Tracks matchmaking-status presence so an explicit cancel (spec.md
/// §4.7 step 3) can revoke an in-flight timeout. Returns the stream key
/// so the caller can untrack it later.
pub fn track_matchmaking_status(streams: &StreamRegistry, session_id: Uuid, account_id: Uuid, ticket_id: Uuid) -> StreamKey {
    let key = StreamKey::new(
        crate::identity::to_symbol("matchmaking"),
        session_id,
        crate::identity::to_symbol("ticket"),
        crate::identity::to_symbol("status"),
    );
    streams.track(
        key,
        session_id,
        account_id,
        PresenceMeta {
            format: "ticket".to_string(),
            username: String::new(),
            status: ticket_id.to_string(),
            hidden: true,
        },
    );
    key
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    LeaderStillMatchmaking,
    LeaderLost,
    LeaderInPrivateMatch,
    Joined(Uuid, Role),
    JoinTargetFull,
}

/// One party-leader-follow cycle (spec.md §4.7.1): inspects the leader's
/// live match membership via each match's presence list.
pub async fn follow_leader_once(leader_session: Uuid, lobbies: &LobbyRegistry) -> FollowOutcome {
    for match_id in lobbies.list() {
        let Some(handle) = lobbies.get(match_id) else {
            continue;
        };
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        if handle.send(crate::lobby::signal::Signal::GetPresences(reply_tx)).await.is_err() {
            continue;
        }
        let Ok(presences) = reply_rx.await else {
            continue;
        };
        if !presences.contains(&leader_session) {
            continue;
        }

        let label = handle.label();
        return match label.lobby_type {
            LobbyType::Public if label.open => FollowOutcome::Joined(match_id, Role::Any),
            LobbyType::Public => FollowOutcome::JoinTargetFull,
            LobbyType::Private | LobbyType::Unassigned => FollowOutcome::LeaderInPrivateMatch,
        };
    }
    FollowOutcome::LeaderLost
}

/// Runs the party-leader-follow loop until the leader's presence
/// resolves to a join attempt or a terminal rejection (spec.md §4.7.1).
pub async fn run_party_follow(
    leader_session: Uuid,
    lobbies: &LobbyRegistry,
) -> Result<(Uuid, Role), LobbyErrorCode> {
    loop {
        match follow_leader_once(leader_session, lobbies).await {
            FollowOutcome::LeaderStillMatchmaking => {
                tokio::time::sleep(FOLLOW_CADENCE).await;
            }
            FollowOutcome::LeaderLost => return Err(LobbyErrorCode::BadRequest),
            FollowOutcome::LeaderInPrivateMatch => return Err(LobbyErrorCode::ServerIsLocked),
            FollowOutcome::Joined(match_id, role) => return Ok((match_id, role)),
            FollowOutcome::JoinTargetFull => {
                warn!("party follow target full for leader {}, retrying", leader_session);
                tokio::time::sleep(FOLLOW_RETRY_DELAY).await;
            }
        }
    }
}

/// How long a party leader waits for members to converge before
/// representing the party alone (spec.md §4.7 step 4).
pub fn leader_convergence_wait() -> Duration {
    PARTY_LEADER_WAIT
}
