//! Background cycle tasks (spec.md §5: "matchmaker cycles are a
//! periodic batch... and produce an atomic set of accepted candidates").
//!
//! Grounded in the teacher's `servers/ticker.rs`/`services/matchmaking`
//! idea of a standalone loop task that periodically drains a pending
//! queue, but here the pure pipeline stages ([`crate::matchmaker::run_cycle`])
//! stay side-effect free and this module is only the `tokio::spawn`'d
//! driver around them, matching how [`crate::lobby::Lobby::run`] is
//! itself the only caller of the match tick loop.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::SystemTime;

use log::{info, warn};

use crate::matchmaker::{self, candidate::RatedMatch};
use crate::state::AppState;

/// Candidate grouping size drained from the queue per matchmaker cycle
/// (spec.md §4.6 step 1: "two equal teams must be possible" ⇒ even-
/// sized, and spec.md §3 `LobbyParameters`/`PartyGroup` cap a party at
/// 4, so 8 gives room for two full parties per side).
const CANDIDATE_GROUP_SIZE: usize = 8;

/// Runs the matchmaker cycle forever at `cycle_interval_ms` cadence
/// (spec.md §4.6, component C6, driven end to end: drain queued
/// tickets into candidates, run the pipeline, then hand every accepted
/// candidate to the lobby builder, component C8).
pub async fn run_matchmaker_cycle(state: Arc<AppState>) {
    let interval = std::time::Duration::from_millis(state.config.matchmaker.cycle_interval_ms.max(1));
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let candidates = state.matchmaker_queue.drain_candidates(CANDIDATE_GROUP_SIZE);
        if candidates.is_empty() {
            continue;
        }

        let known_servers: Vec<Ipv4Addr> = state
            .game_servers
            .list()
            .into_iter()
            .map(|record| record.endpoint.external_ip)
            .collect();

        let (accepted, accounting) = matchmaker::run_cycle(candidates, &known_servers, SystemTime::now());
        if accepted.is_empty() {
            continue;
        }

        info!(
            "matchmaker cycle: {} input, {} accepted, {} odd, {} dup, {} no-server, {} overlap",
            accounting.input,
            accounting.output,
            accounting.odd_size,
            accounting.duplicates,
            accounting.no_matching_servers,
            accounting.unused_by_composition,
        );

        for rated in accepted {
            let state = state.clone();
            tokio::spawn(async move {
                build_accepted_match(state, rated).await;
            });
        }
    }
}

/// Hands one accepted candidate to the builder (spec.md §4.8) and logs
/// the per-entrant outcome without aborting the cycle on partial
/// failure (spec.md §4.8 step 7).
async fn build_accepted_match(state: Arc<AppState>, rated: RatedMatch) {
    let rtt_by_ip = average_server_rtt(&rated);

    match crate::builder::build_match(
        rated,
        rtt_by_ip,
        &state.game_servers,
        &state.lobbies,
        &state.sessions,
        &state.level_rotation,
        &state.node,
    )
    .await
    {
        Ok(outcome) => {
            info!(
                "built match {:?}: {} joined, {} failed",
                outcome.match_id,
                outcome.joined.len(),
                outcome.failed.len()
            );
        }
        Err(err) => warn!("failed to build match for accepted candidate: {err:?}"),
    }
}

/// Averages each entrant's per-server RTT samples into a single map the
/// allocator's ranking (spec.md §4.8 step 3) can sort by.
fn average_server_rtt(rated: &RatedMatch) -> HashMap<Ipv4Addr, u32> {
    let mut sums: HashMap<Ipv4Addr, (u64, u32)> = HashMap::new();
    for entry in rated.team_a.iter().chain(rated.team_b.iter()) {
        for (ip, rtt) in &entry.server_rtt {
            let slot = sums.entry(*ip).or_insert((0, 0));
            slot.0 += *rtt as u64;
            slot.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(ip, (sum, count))| (ip, (sum / count.max(1) as u64) as u32))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::to_symbol;
    use crate::matchmaker::candidate::MatchmakerEntry;
    use crate::matchmaker::rating::Rating;
    use uuid::Uuid;

    fn entry_with_rtt(ip: Ipv4Addr, rtt: u32) -> MatchmakerEntry {
        let session_id = Uuid::new_v4();
        MatchmakerEntry {
            session_id,
            ticket_id: Uuid::new_v4(),
            group_id: "default".into(),
            max_rtt: 500,
            server_rtt: [(ip, rtt)].into_iter().collect(),
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
    fn test_average_server_rtt_across_both_teams() {
        let ip = Ipv4Addr::new(203, 0, 113, 9);
        let rated = RatedMatch {
            mode: to_symbol("arena_public"),
            team_a: vec![entry_with_rtt(ip, 100)],
            team_b: vec![entry_with_rtt(ip, 200)],
            draw_probability: 0.5,
        };
        let averaged = average_server_rtt(&rated);
        assert_eq!(averaged.get(&ip), Some(&150));
    }
}
