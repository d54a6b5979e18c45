//! Server allocator (spec.md §4.10, component C10): ranks idle game
//! servers for a requested match and signals the winning one to prepare.
//!
//! Grounded in the teacher's `services/game/matchmaking.rs` idiom of a
//! pure ranking function over a snapshot of registered state, with the
//! actual mutation delegated to the target (here, a [`LobbyHandle::send`]
//! round-trip rather than a direct field write).

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::SystemTime;

use uuid::Uuid;

use crate::errors::LobbyErrorCode;
use crate::identity::Symbol;
use crate::lobby::signal::Signal;
use crate::lobby::{LobbyRegistry, MatchLabel};
use crate::registry::{GameServerLifecycle, GameServerRecord, GameServerRegistry};

/// Optional region constraints on a requested allocation (spec.md §4.10
/// input: "optional region constraints (default-required,
/// specific-required)").
#[derive(Debug, Clone, Default)]
pub struct RegionConstraint {
    pub default_required: bool,
    pub specific_regions: Vec<Symbol>,
}

impl RegionConstraint {
    fn accepts(&self, server: &GameServerRecord) -> bool {
        if self.specific_regions.is_empty() {
            return true;
        }
        server
            .regions
            .iter()
            .any(|r| self.specific_regions.contains(r))
    }
}

/// The settings to prepare the winning server with (spec.md §4.8 step 5
/// `MatchSettings`, consumed here via [`Signal::PrepareSession`]).
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub group_id: String,
    pub mode: Symbol,
    pub level: Symbol,
    pub lobby_type: u8,
    pub required_features: Vec<String>,
    pub start_time: SystemTime,
    pub region: RegionConstraint,
    /// Mean RTT to each server's external IP, keyed by IP (spec.md
    /// §4.10 input).
    pub rtt_by_ip: HashMap<Ipv4Addr, u32>,
}

/// Whether `mode` is one this deployment prioritises for server
/// selection (spec.md §4.10 step 3(a), §9 open question: the duplicated
/// tie-break branch in the source is not reproduced here — a server
/// either is or is not prioritised for the mode, never both).
fn priority_for_mode(_mode: Symbol) -> bool {
    false
}

/// One server candidate plus the ranking keys computed for it.
struct RankedServer {
    record: GameServerRecord,
    priority: bool,
    rtt_known: bool,
    rtt_bucket_20ms: u32,
    rating: i32,
    active_matches: usize,
}

/// Ranks unassigned servers for `group_id` and attempts to prepare the
/// best-ranked one (spec.md §4.10 steps 1-5).
pub async fn allocate(
    request: &AllocationRequest,
    registry: &GameServerRegistry,
    lobbies: &LobbyRegistry,
) -> Result<MatchLabel, LobbyErrorCode> {
    let candidates = registry.list_for_group(&request.group_id);
    let mut active_by_ip: HashMap<Ipv4Addr, usize> = HashMap::new();
    for server in &candidates {
        if matches!(server.lifecycle, GameServerLifecycle::Started) {
            *active_by_ip.entry(server.endpoint.external_ip).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<RankedServer> = candidates
        .into_iter()
        .filter(|s| matches!(s.lifecycle, GameServerLifecycle::Parking))
        .filter(|s| request.region.accepts(s))
        .map(|record| {
            let rtt = request.rtt_by_ip.get(&record.endpoint.external_ip).copied();
            RankedServer {
                priority: priority_for_mode(request.mode),
                rtt_known: rtt.is_some(),
                rtt_bucket_20ms: rtt.unwrap_or(u32::MAX) / 20,
                rating: server_rating(&record),
                active_matches: active_by_ip.get(&record.endpoint.external_ip).copied().unwrap_or(0),
                record,
            }
        })
        .collect();

    // Stable sort by (a) mode priority, (b) RTT known before unknown,
    // (c) rounded RTT ascending when the gap exceeds 40ms (two buckets),
    // (d) rating descending, (e) fewer concurrent matches first (spec.md
    // §4.10 step 3).
    ranked.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.rtt_known.cmp(&a.rtt_known))
            .then_with(|| {
                let gap = a.rtt_bucket_20ms.abs_diff(b.rtt_bucket_20ms);
                if gap > 2 {
                    a.rtt_bucket_20ms.cmp(&b.rtt_bucket_20ms)
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .then_with(|| b.rating.cmp(&a.rating))
            .then_with(|| a.active_matches.cmp(&b.active_matches))
    });

    for candidate in ranked {
        let Some(handle) = lobbies.get(candidate.record.bound_match_id) else {
            continue;
        };
        let signal = Signal::PrepareSession {
            mode: request.mode,
            level: request.level,
            lobby_type: request.lobby_type,
            group_id: request.group_id.clone(),
            required_features: request.required_features.clone(),
            start_time: request.start_time,
        };
        // `PrepareSession` is fire-and-forget into the match loop (spec.md
        // §4.5's signal channel carries no reply for this variant); a
        // closed channel is the only observable "signal failure" here, so
        // that is what step 5's "on signal failure, continue" tests.
        if handle.send(signal).await.is_ok() {
            return Ok(handle.label());
        }
    }

    Err(LobbyErrorCode::NoAvailableServers)
}

/// The registered server rating used as tie-break (d) above. Out of
/// scope persistence (spec.md §6 `ServerRatings`) means this reads a
/// placeholder default; a real deployment would source it from the
/// `Store` external collaborator keyed by `byExternalIP`/`byOperatorID`.
fn server_rating(_server: &GameServerRecord) -> i32 {
    0
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::to_symbol;
    use crate::registry::Endpoint;
    use uuid::Uuid as U;

    fn server(group: &str, ip: Ipv4Addr, lifecycle: GameServerLifecycle) -> GameServerRecord {
        GameServerRecord {
            operator_user_id: U::new_v4(),
            session_id: U::new_v4(),
            server_id: 1,
            endpoint: Endpoint {
                internal_ip: Ipv4Addr::new(10, 0, 0, 1),
                external_ip: ip,
                port: 6792,
            },
            group_ids: vec![group.to_string()],
            regions: vec![],
            feature_flags: vec![],
            version_lock: Symbol(0),
            priority_modes: vec![],
            lifecycle,
            bound_match_id: U::new_v4(),
        }
    }

    #[test]
    fn test_region_constraint_accepts_when_unset() {
        let constraint = RegionConstraint::default();
        let server = server("default", Ipv4Addr::new(1, 1, 1, 1), GameServerLifecycle::Parking);
        assert!(constraint.accepts(&server));
    }

    #[test]
    fn test_region_constraint_rejects_non_matching_region() {
        let constraint = RegionConstraint {
            default_required: false,
            specific_regions: vec![to_symbol("eu-west")],
        };
        let server = server("default", Ipv4Addr::new(1, 1, 1, 1), GameServerLifecycle::Parking);
        assert!(!constraint.accepts(&server));
    }

    #[tokio::test]
    async fn test_allocate_returns_no_available_servers_when_empty() {
        let registry = GameServerRegistry::new();
        let lobbies = LobbyRegistry::new();
        let request = AllocationRequest {
            group_id: "default".into(),
            mode: to_symbol("arena_public"),
            level: to_symbol("dyson_dc"),
            lobby_type: 1,
            required_features: vec![],
            start_time: SystemTime::now(),
            region: RegionConstraint::default(),
            rtt_by_ip: HashMap::new(),
        };
        let result = allocate(&request, &registry, &lobbies).await;
        assert_eq!(result, Err(LobbyErrorCode::NoAvailableServers));
    }
}
