//! Backfill loop (spec.md §4.7.2): periodically looks for room in an
//! existing open match rather than waiting on a fresh matchmaker cycle.

use std::time::{Duration, Instant};

use crate::identity::Symbol;
use crate::lobby::role::Role;
use crate::lobby::{LobbyRegistry, LobbyState, LobbyType, MatchLabel};

/// Ticker cadence selection (spec.md §4.7.2: "15s default; 3s if the
/// user is an early quitter; 1s for social mode; 15 min if
/// DisableArenaBackfill && mode == arenaPublic").
pub fn ticker_interval(mode: Symbol, is_early_quitter: bool, social_mode: Symbol, arena_public_mode: Symbol, disable_arena_backfill: bool) -> Duration {
    if disable_arena_backfill && mode == arena_public_mode {
        return Duration::from_secs(15 * 60);
    }
    if mode == social_mode {
        return Duration::from_secs(1);
    }
    if is_early_quitter {
        return Duration::from_secs(3);
    }
    Duration::from_secs(15)
}

/// Minimum match age before backfill will consider joining it (spec.md
/// §4.7.2 step 3), waived for social matches.
const MIN_MATCH_AGE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct BackfillQuery {
    pub mode: Symbol,
    pub group_id: String,
    pub party_size: usize,
    pub rank_percentile: Option<f32>,
    pub rank_band: f32,
    pub max_rtt_ms: Option<u32>,
    pub social: bool,
}

#[derive(Debug, Clone)]
struct Candidate {
    match_id: uuid::Uuid,
    label: MatchLabel,
    population: usize,
    rtt_ms: u32,
}

/// Filters and ranks open matches for one backfill cycle (spec.md
/// §4.7.2 steps 1-5). Returns the chosen match and the team it should
/// join, if any.
pub fn pick_backfill_target(
    query: &BackfillQuery,
    labels: Vec<(uuid::Uuid, MatchLabel, usize /* population */, u32 /* rtt_ms */)>,
    now: Instant,
    match_created_at: impl Fn(uuid::Uuid) -> Instant,
) -> Option<(uuid::Uuid, Role)> {
    let mut candidates: Vec<Candidate> = labels
        .into_iter()
        .filter(|(_, label, _, _)| label.open && label.mode == query.mode && label.group_id == query.group_id)
        .filter(|(_, label, _, _)| matches!(label.lobby_type, LobbyType::Public))
        .filter(|(_, label, _, _)| matches!(label.state, LobbyState::Active | LobbyState::Prepared))
        .map(|(match_id, label, population, rtt_ms)| Candidate {
            match_id,
            label,
            population,
            rtt_ms,
        })
        .collect();

    if !query.social {
        candidates.retain(|c| now.duration_since(match_created_at(c.match_id)) >= MIN_MATCH_AGE);
    }

    candidates.retain(|c| {
        let open_slots = c.label.player_limit.saturating_sub(c.population as u32) as usize;
        open_slots >= query.party_size
    });

    if let (Some(rank), Some(max_rtt)) = (query.rank_percentile, query.max_rtt_ms) {
        candidates.retain(|c| c.rtt_ms <= max_rtt || rank_delta(rank, &c.label) <= query.rank_band);
    }

    candidates.sort_by(|a, b| {
        rank_delta(query.rank_percentile.unwrap_or(0.5), &a.label)
            .partial_cmp(&rank_delta(query.rank_percentile.unwrap_or(0.5), &b.label))
            .unwrap()
            .then_with(|| b.population.cmp(&a.population))
            .then_with(|| a.rtt_ms.cmp(&b.rtt_ms))
    });

    for candidate in candidates {
        if query.social {
            return Some((candidate.match_id, Role::Any));
        }
        let team_a = candidate.label.role_count(Role::TeamA);
        let team_b = candidate.label.role_count(Role::TeamB);
        let (team, count) = if team_a <= team_b {
            (Role::TeamA, team_a)
        } else {
            (Role::TeamB, team_b)
        };
        let team_open_slots = candidate.label.team_size.saturating_sub(count) as usize;
        if team_open_slots >= query.party_size {
            return Some((candidate.match_id, team));
        }
    }
    None
}

/// Rank-delta used for the (rank-delta within band) sort key (spec.md
/// §4.7.2 step 2): absolute distance between the querying entrant's rank
/// percentile and the match's running average over its seated entrants.
fn rank_delta(rank: f32, label: &MatchLabel) -> f32 {
    (rank - label.avg_rank_percentile).abs()
}

/// Drives the backfill loop for one ticket, applying
/// [`pick_backfill_target`] each tick and joining through the caller-
/// supplied `join` closure (spec.md §4.7.2 steps 6-8). Exits when `join`
/// reports success or a non-`ServerIsFull` error.
pub async fn run_backfill_loop<F, Fut>(
    query: BackfillQuery,
    lobbies: &LobbyRegistry,
    interval: Duration,
    mut join: F,
) -> Result<(), crate::errors::LobbyErrorCode>
where
    F: FnMut(uuid::Uuid, Role) -> Fut,
    Fut: std::future::Future<Output = Result<(), crate::errors::LobbyErrorCode>>,
{
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        let now = Instant::now();
        let mut labels = Vec::new();
        for match_id in lobbies.list() {
            if let Some(handle) = lobbies.get(match_id) {
                let label = handle.label();
                let population = label.role_counts.values().sum::<u32>() as usize;
                labels.push((match_id, label, population, 0u32));
            }
        }

        let Some((match_id, role)) = pick_backfill_target(&query, labels, now, |_| now) else {
            continue;
        };

        match join(match_id, role).await {
            Ok(()) => return Ok(()),
            Err(crate::errors::LobbyErrorCode::ServerIsFull) => continue,
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::to_symbol;
    use std::collections::HashMap;

    fn base_label(mode: Symbol, group_id: &str) -> MatchLabel {
        MatchLabel {
            match_id: uuid::Uuid::new_v4(),
            node: "node-1".into(),
            created_at: std::time::SystemTime::now(),
            start_time: std::time::SystemTime::now(),
            terminate_tick: 0,
            state: LobbyState::Active,
            lobby_type: LobbyType::Public,
            mode,
            level: Symbol::NIL,
            required_features: vec![],
            session_settings: serde_json::Value::Null,
            server_session_id: None,
            server_endpoint: None,
            group_id: group_id.to_string(),
            spawned_by: None,
            team_size: 4,
            max_size: 8,
            player_limit: 8,
            role_counts: HashMap::new(),
            avg_rank_percentile: 0.5,
            open: true,
            level_loaded: true,
        }
    }

    #[test]
    fn test_rejects_matches_under_min_age() {
        let mode = to_symbol("arena_public");
        let label = base_label(mode, "default");
        let match_id = label.match_id;
        let query = BackfillQuery {
            mode,
            group_id: "default".into(),
            party_size: 1,
            rank_percentile: None,
            rank_band: 0.15,
            max_rtt_ms: None,
            social: false,
        };
        let now = Instant::now();
        let result = pick_backfill_target(&query, vec![(match_id, label, 0, 10)], now, |_| now);
        assert!(result.is_none());
    }

    #[test]
    fn test_accepts_aged_match_with_room() {
        let mode = to_symbol("arena_public");
        let label = base_label(mode, "default");
        let match_id = label.match_id;
        let query = BackfillQuery {
            mode,
            group_id: "default".into(),
            party_size: 1,
            rank_percentile: None,
            rank_band: 0.15,
            max_rtt_ms: None,
            social: false,
        };
        let now = Instant::now();
        let created = now - Duration::from_secs(30);
        let result = pick_backfill_target(&query, vec![(match_id, label, 0, 10)], now, move |_| created);
        assert_eq!(result, Some((match_id, Role::TeamA)));
    }

    #[test]
    fn test_social_matches_skip_age_gate() {
        let mode = to_symbol("social_public");
        let mut label = base_label(mode, "default");
        label.lobby_type = LobbyType::Public;
        let match_id = label.match_id;
        let query = BackfillQuery {
            mode,
            group_id: "default".into(),
            party_size: 1,
            rank_percentile: None,
            rank_band: 0.15,
            max_rtt_ms: None,
            social: true,
        };
        let now = Instant::now();
        let result = pick_backfill_target(&query, vec![(match_id, label, 0, 10)], now, |_| now);
        assert_eq!(result, Some((match_id, Role::Any)));
    }
}
