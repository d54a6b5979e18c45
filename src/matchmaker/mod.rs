//! Skill-based matchmaker (spec.md §4.6, component C6).
//!
//! A pure filter/sort/compose pipeline over [`Candidate`] lists. Kept
//! free of any async or shared-state concerns so its stages are
//! independently unit-testable, the way the teacher keeps
//! `services/game/rules.rs`'s static rule tables side-effect free and
//! leaves orchestration to the caller.

pub mod candidate;
pub mod queue;
pub mod rating;

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::SystemTime;
use uuid::Uuid;

use candidate::{Candidate, FilterAccounting, MatchmakerEntry, RatedMatch};
use rating::predict_draw;

/// Default max-RTT filter threshold (spec.md §4.6 step 3).
pub const DEFAULT_MAX_RTT_MS: u32 = 500;

/// Runs the full pipeline (spec.md §4.6 steps 1-8) over one cycle's
/// worth of candidates, returning the accepted matches in acceptance
/// order plus accounting for every stage's rejections.
pub fn run_cycle(candidates: Vec<Candidate>, known_servers: &[Ipv4Addr], now: SystemTime) -> (Vec<RatedMatch>, FilterAccounting) {
    let mut accounting = FilterAccounting {
        input: candidates.len(),
        ..Default::default()
    };

    let (even, odd_removed) = remove_odd_sized(candidates);
    accounting.odd_size = odd_removed;

    let (deduped, duplicates_removed) = remove_duplicates(even);
    accounting.duplicates = duplicates_removed;

    let (rtt_filtered, no_server_removed) = filter_max_rtt(deduped, known_servers);
    accounting.no_matching_servers = no_server_removed;

    let mut rated: Vec<RatedMatch> = rtt_filtered.into_iter().map(balance_by_ticket).collect();
    for rm in rated.iter_mut() {
        let team_a_ratings: Vec<_> = rm.team_a.iter().map(|e| e.rating).collect();
        let team_b_ratings: Vec<_> = rm.team_b.iter().map(|e| e.rating).collect();
        rm.draw_probability = predict_draw(&team_a_ratings, &team_b_ratings);
    }

    rated.sort_by(|a, b| b.draw_probability.partial_cmp(&a.draw_probability).unwrap());
    priority_sort(&mut rated, now);

    let (accepted, unused) = compose(rated);
    accounting.unused_by_composition = unused;
    accounting.output = accepted.len();

    (accepted, accounting)
}

fn remove_odd_sized(candidates: Vec<Candidate>) -> (Vec<Candidate>, usize) {
    let mut removed = 0;
    let kept = candidates
        .into_iter()
        .filter(|c| {
            let even = c.entries.len() % 2 == 0 && !c.entries.is_empty();
            if !even {
                removed += 1;
            }
            even
        })
        .collect();
    (kept, removed)
}

fn remove_duplicates(candidates: Vec<Candidate>) -> (Vec<Candidate>, usize) {
    let mut seen: HashSet<Vec<Uuid>> = HashSet::new();
    let mut removed = 0;
    let mut kept = Vec::new();
    for candidate in candidates {
        let key = candidate.session_ids();
        if seen.insert(key) {
            kept.push(candidate);
        } else {
            removed += 1;
        }
    }
    (kept, removed)
}

fn filter_max_rtt(candidates: Vec<Candidate>, known_servers: &[Ipv4Addr]) -> (Vec<Candidate>, usize) {
    let mut removed = 0;
    let kept = candidates
        .into_iter()
        .filter(|c| {
            let has_server = !c.servers_within_max_rtt(known_servers).is_empty();
            if !has_server {
                removed += 1;
            }
            has_server
        })
        .collect();
    (kept, removed)
}

/// Groups entries by ticket (party) ID, places larger parties first,
/// greedily assigns each party to the team with the lower total μ that
/// still has room, then does the same for soloers (spec.md §4.6 step 4).
fn balance_by_ticket(candidate: Candidate) -> RatedMatch {
    let team_size = candidate.entries.len() / 2;

    let mut groups: std::collections::HashMap<Uuid, Vec<MatchmakerEntry>> = std::collections::HashMap::new();
    for entry in candidate.entries {
        groups.entry(entry.ticket_id).or_default().push(entry);
    }

    let mut parties: Vec<Vec<MatchmakerEntry>> = groups.into_values().collect();
    parties.sort_by(|a, b| b.len().cmp(&a.len()));
    let (multi, solo): (Vec<_>, Vec<_>) = parties.into_iter().partition(|p| p.len() > 1);

    let mut team_a: Vec<MatchmakerEntry> = Vec::with_capacity(team_size);
    let mut team_b: Vec<MatchmakerEntry> = Vec::with_capacity(team_size);
    let mut mu_a = 0.0;
    let mut mu_b = 0.0;

    for party in multi.into_iter().chain(solo.into_iter()) {
        let party_mu: f64 = party.iter().map(|e| e.rating.mu).sum();
        let fits_a = team_a.len() + party.len() <= team_size;
        let fits_b = team_b.len() + party.len() <= team_size;

        let place_on_a = match (fits_a, fits_b) {
            (true, false) => true,
            (false, true) => false,
            (true, true) => mu_a <= mu_b,
            (false, false) => continue,
        };

        if place_on_a {
            mu_a += party_mu;
            team_a.extend(party);
        } else {
            mu_b += party_mu;
            team_b.extend(party);
        }
    }

    RatedMatch {
        mode: candidate.mode,
        team_a,
        team_b,
        draw_probability: 0.0,
    }
}

/// Moves any candidate containing a priority-threshold-elevated entry
/// ahead of the rest, preserving relative order within each group
/// (spec.md §4.6 step 7).
fn priority_sort(rated: &mut [RatedMatch], now: SystemTime) {
    let is_priority = |m: &RatedMatch| -> bool {
        m.team_a
            .iter()
            .chain(m.team_b.iter())
            .any(|e| e.is_priority(now))
    };
    rated.sort_by_key(|m| !is_priority(m));
}

/// Walks the sorted list, accepting a candidate only if none of its
/// session IDs were already committed (spec.md §4.6 step 8).
fn compose(rated: Vec<RatedMatch>) -> (Vec<RatedMatch>, usize) {
    let mut committed: HashSet<Uuid> = HashSet::new();
    let mut accepted = Vec::new();
    let mut unused = 0;

    for candidate in rated {
        let ids = candidate.session_ids();
        if ids.iter().any(|id| committed.contains(id)) {
            unused += 1;
            continue;
        }
        committed.extend(ids);
        accepted.push(candidate);
    }

    (accepted, unused)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::to_symbol;
    use crate::matchmaker::rating::Rating;

    fn entry(session_id: Uuid, ticket_id: Uuid, mu: f64) -> MatchmakerEntry {
        MatchmakerEntry {
            session_id,
            ticket_id,
            group_id: "default".into(),
            max_rtt: DEFAULT_MAX_RTT_MS,
            server_rtt: [(Ipv4Addr::new(203, 0, 113, 1), 50)].into_iter().collect(),
            rating: Rating::new(mu, 5.0),
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

    fn candidate_of_size(n: usize) -> Candidate {
        Candidate {
            mode: to_symbol("arena_public"),
            entries: (0..n)
                .map(|i| entry(Uuid::new_v4(), Uuid::new_v4(), 20.0 + i as f64))
                .collect(),
        }
    }

    #[test]
    fn test_odd_sized_candidates_removed() {
        let servers = [Ipv4Addr::new(203, 0, 113, 1)];
        let (accepted, accounting) = run_cycle(vec![candidate_of_size(3)], &servers, SystemTime::now());
        assert!(accepted.is_empty());
        assert_eq!(accounting.odd_size, 1);
    }

    #[test]
    fn test_duplicate_candidates_deduped() {
        let servers = [Ipv4Addr::new(203, 0, 113, 1)];
        let candidate = candidate_of_size(8);
        let (_, accounting) = run_cycle(vec![candidate.clone(), candidate], &servers, SystemTime::now());
        assert_eq!(accounting.duplicates, 1);
    }

    #[test]
    fn test_no_matching_server_filtered() {
        let (_, accounting) = run_cycle(vec![candidate_of_size(8)], &[], SystemTime::now());
        assert_eq!(accounting.no_matching_servers, 1);
    }

    #[test]
    fn test_compose_has_no_overlapping_sessions() {
        let servers = [Ipv4Addr::new(203, 0, 113, 1)];
        let shared_session = Uuid::new_v4();
        let mut a = candidate_of_size(8);
        a.entries[0].session_id = shared_session;
        let mut b = candidate_of_size(8);
        b.entries[0].session_id = shared_session;

        let (accepted, accounting) = run_cycle(vec![a, b], &servers, SystemTime::now());
        assert_eq!(accepted.len(), 1);
        assert_eq!(accounting.unused_by_composition, 1);

        let mut all_ids = Vec::new();
        for m in &accepted {
            all_ids.extend(m.session_ids());
        }
        let unique: HashSet<_> = all_ids.iter().collect();
        assert_eq!(unique.len(), all_ids.len());
    }

    #[test]
    fn test_balance_keeps_teams_within_one() {
        let candidate = candidate_of_size(8);
        let rated = balance_by_ticket(candidate);
        assert_eq!(rated.team_a.len(), rated.team_b.len());
    }
}
