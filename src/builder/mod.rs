//! Lobby builder (spec.md §4.8, component C8): turns one matchmaker-
//! accepted candidate into a prepared match and joins every entrant.
//!
//! Grounded in the teacher's `services/game/matchmaking.rs` idiom of
//! driving a multi-step allocation from a single async function that
//! owns no state of its own beyond what is passed in, delegating the
//! actual server ranking to the allocator (component C10) the same way
//! the teacher hands the final placement decision to `Games::new`.

pub mod levels;
pub mod social;

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime};

use log::warn;
use uuid::Uuid;

use crate::allocator::{self, AllocationRequest, RegionConstraint};
use crate::errors::LobbyErrorCode;
use crate::identity::Symbol;
use crate::join::{self, JoinOutcome};
use crate::lobby::entrant::Entrant;
use crate::lobby::reservation::Reservation;
use crate::lobby::role::Role;
use crate::lobby::signal::Signal;
use crate::lobby::{LobbyRegistry, MatchLabel};
use crate::matchmaker::candidate::RatedMatch;
use crate::registry::GameServerRegistry;
use crate::session::SessionRegistry;

const RESERVATION_LIFETIME: Duration = Duration::from_secs(20);
const ALLOCATE_RETRY_INTERVAL: Duration = Duration::from_secs(5);
const ALLOCATE_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-entrant outcome reported back to the caller for metrics (spec.md
/// §4.8 step 7: "tally success/error per entrant for metrics").
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub match_id: Option<Uuid>,
    pub joined: Vec<Uuid>,
    pub failed: Vec<(Uuid, LobbyErrorCode)>,
}

/// Builds a match for one matchmaker-accepted candidate (spec.md §4.8
/// steps 1-7).
pub async fn build_match(
    rated: RatedMatch,
    rtt_by_ip: HashMap<Ipv4Addr, u32>,
    registry: &GameServerRegistry,
    lobbies: &LobbyRegistry,
    sessions: &SessionRegistry,
    level_rotation: &levels::LevelRotation,
    node: &str,
) -> Result<BuildOutcome, LobbyErrorCode> {
    let all_entries: Vec<_> = rated.team_a.iter().chain(rated.team_b.iter()).collect();

    let group_id = extract_common_group(&all_entries)?;

    let level = level_rotation
        .next(rated.mode)
        .ok_or(LobbyErrorCode::InternalError)?;

    let request = AllocationRequest {
        group_id: group_id.clone(),
        mode: rated.mode,
        level,
        lobby_type: 1,
        required_features: Vec::new(),
        start_time: SystemTime::now(),
        region: RegionConstraint::default(),
        rtt_by_ip,
    };

    let label = allocate_with_retry(&request, registry, lobbies).await?;

    let reservations: Vec<Reservation> = all_entries
        .iter()
        .enumerate()
        .map(|(i, entry)| Reservation {
            session_id: entry.session_id,
            account_id_hint: None,
            role: if i < rated.team_a.len() { Role::TeamA } else { Role::TeamB },
            deadline: std::time::Instant::now() + RESERVATION_LIFETIME,
        })
        .collect();

    if let Some(handle) = lobbies.get(label.match_id) {
        for reservation in &reservations {
            let _ = handle
                .send(Signal::Reserve {
                    session_id: reservation.session_id,
                    account_id_hint: reservation.account_id_hint,
                    role: reservation.role,
                    ttl: RESERVATION_LIFETIME,
                })
                .await;
        }
    }

    let mut joined = Vec::new();
    let mut failed = Vec::new();

    for entry in all_entries {
        let entrant = entrant_from_matchmaker_entry(entry);
        match join::join_session(label.match_id, entrant, lobbies, sessions).await {
            Ok(JoinOutcome::Success) => joined.push(entry.session_id),
            Ok(JoinOutcome::SoftTimeout) => joined.push(entry.session_id),
            Err(code) => {
                warn!("entrant {} failed to join match {}: {:?}", entry.session_id, label.match_id, code);
                failed.push((entry.session_id, code));
            }
        }
    }

    Ok(BuildOutcome {
        match_id: Some(label.match_id),
        joined,
        failed,
    })
}

fn extract_common_group(entries: &[&crate::matchmaker::candidate::MatchmakerEntry]) -> Result<String, LobbyErrorCode> {
    let mut groups = entries.iter().map(|e| e.group_id.as_str());
    let first = groups.next().ok_or(LobbyErrorCode::BadRequest)?;
    if groups.all(|g| g == first) {
        Ok(first.to_string())
    } else {
        Err(LobbyErrorCode::BadRequest)
    }
}

/// Retries allocation every 5s up to a 60s cap (spec.md §4.8 step 6).
async fn allocate_with_retry(
    request: &AllocationRequest,
    registry: &GameServerRegistry,
    lobbies: &LobbyRegistry,
) -> Result<MatchLabel, LobbyErrorCode> {
    let deadline = tokio::time::Instant::now() + ALLOCATE_TIMEOUT;
    loop {
        match allocator::allocate(request, registry, lobbies).await {
            Ok(label) => return Ok(label),
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(ALLOCATE_RETRY_INTERVAL).await;
            }
            Err(_) => return Err(LobbyErrorCode::NoAvailableServers),
        }
    }
}

/// Builds the match's entrant record from its matchmaker queue entry,
/// carrying the real identity/feature data threaded through from ticket
/// submission (`MatchmakerEntry`, populated in the handler that first
/// queues the ticket) instead of a fabricated placeholder.
fn entrant_from_matchmaker_entry(entry: &crate::matchmaker::candidate::MatchmakerEntry) -> Entrant {
    Entrant {
        session_id: entry.session_id,
        account_id: entry.account_id,
        platform_id: entry.platform_id.clone(),
        username: entry.username.clone(),
        display_name: entry.display_name.clone(),
        login_session_id: entry.login_session_id,
        party_id: Some(entry.ticket_id),
        role: Role::Any,
        client_addr: entry.client_addr,
        is_pcvr: entry.is_pcvr,
        rating: entry.rating,
        rank_percentile: entry.rank_percentile,
        matchmaker_query: Symbol(0).to_string(),
        supported_features: entry.supported_features.clone(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::to_symbol;
    use crate::matchmaker::candidate::MatchmakerEntry;
    use crate::matchmaker::rating::Rating;

    fn entry(group: &str) -> crate::matchmaker::candidate::MatchmakerEntry {
        let session_id = Uuid::new_v4();
        MatchmakerEntry {
            session_id,
            ticket_id: Uuid::new_v4(),
            group_id: group.to_string(),
            max_rtt: 500,
            server_rtt: HashMap::new(),
            rating: Rating::default(),
            rank_percentile: 0.5,
            priority_threshold: None,
            account_id: crate::identity::AccountId::new(
                crate::identity::Platform::OculusOrg,
                crate::identity::account_id::UserType::Standard,
                session_id.as_u128() as u64,
            ),
            platform_id: "OVR".into(),
            username: "player".into(),
            display_name: "player".into(),
            login_session_id: Uuid::new_v4(),
            client_addr: "127.0.0.1:0".parse().unwrap(),
            is_pcvr: false,
            supported_features: Vec::new(),
        }
    }

    #[test]
    fn test_extract_common_group_rejects_mixed_groups() {
        let a = entry("alpha");
        let b = entry("beta");
        let entries = vec![&a, &b];
        assert_eq!(extract_common_group(&entries), Err(LobbyErrorCode::BadRequest));
    }

    #[test]
    fn test_extract_common_group_accepts_uniform_groups() {
        let a = entry("alpha");
        let b = entry("alpha");
        let entries = vec![&a, &b];
        assert_eq!(extract_common_group(&entries), Ok("alpha".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_match_fails_without_available_servers() {
        let registry = GameServerRegistry::new();
        let lobbies = LobbyRegistry::new();
        let sessions = SessionRegistry::new();
        let mut pools = HashMap::new();
        pools.insert(to_symbol("arena_public"), vec![to_symbol("dyson_dc")]);
        let levels = levels::LevelRotation::new(pools);

        let rated = RatedMatch {
            mode: to_symbol("arena_public"),
            team_a: vec![entry("default")],
            team_b: vec![entry("default")],
            draw_probability: 0.5,
        };

        // With virtual time paused, the 5s-interval/60s-cap retry loop
        // in `allocate_with_retry` advances instantly instead of
        // consuming real wall-clock time.
        let result = build_match(rated, HashMap::new(), &registry, &lobbies, &sessions, &levels, "node-1").await;
        assert_eq!(result, Err(LobbyErrorCode::NoAvailableServers));
    }
}
