//! Matchmaker candidate data model (spec.md §4.6).

use std::net::Ipv4Addr;
use std::time::SystemTime;
use uuid::Uuid;

use crate::identity::{AccountId, Symbol};
use crate::matchmaker::rating::Rating;

/// One matchmaker entry: a session's queued properties for one
/// candidate grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchmakerEntry {
    pub session_id: Uuid,
    pub ticket_id: Uuid,
    pub group_id: String,
    pub max_rtt: u32,
    /// Measured round-trip time to each server, keyed by external IP.
    pub server_rtt: std::collections::HashMap<Ipv4Addr, u32>,
    pub rating: Rating,
    pub rank_percentile: f32,
    pub priority_threshold: Option<SystemTime>,
    /// Real per-player identity, carried from ticket submission through
    /// to the built match's entrant (spec.md §3 `Entrant`); without this
    /// the builder has no way to construct more than a single genuine
    /// entrant per composed match.
    pub account_id: AccountId,
    pub platform_id: String,
    pub username: String,
    pub display_name: String,
    pub login_session_id: Uuid,
    pub client_addr: std::net::SocketAddr,
    pub is_pcvr: bool,
    pub supported_features: Vec<String>,
}

impl MatchmakerEntry {
    pub fn rtt_to(&self, server: Ipv4Addr) -> Option<u32> {
        self.server_rtt.get(&server).copied()
    }

    pub fn is_priority(&self, now: SystemTime) -> bool {
        matches!(self.priority_threshold, Some(t) if t <= now)
    }
}

/// An even-sized list of entries under consideration as one match.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub mode: Symbol,
    pub entries: Vec<MatchmakerEntry>,
}

impl Candidate {
    pub fn session_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.entries.iter().map(|e| e.session_id).collect();
        ids.sort();
        ids
    }

    /// Servers acceptable to every entry in the candidate: `rtt<S> <=
    /// max_rtt` for all entries (spec.md §4.6 step 3).
    pub fn servers_within_max_rtt<'a>(&self, servers: &'a [Ipv4Addr]) -> Vec<Ipv4Addr> {
        servers
            .iter()
            .copied()
            .filter(|server| {
                self.entries.iter().all(|entry| {
                    entry
                        .rtt_to(*server)
                        .map(|rtt| rtt <= entry.max_rtt)
                        .unwrap_or(false)
                })
            })
            .collect()
    }
}

/// A candidate after team balancing (spec.md §4.6 step 4): two teams of
/// equal intended size.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedMatch {
    pub mode: Symbol,
    pub team_a: Vec<MatchmakerEntry>,
    pub team_b: Vec<MatchmakerEntry>,
    pub draw_probability: f64,
}

impl RatedMatch {
    pub fn session_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .team_a
            .iter()
            .chain(self.team_b.iter())
            .map(|e| e.session_id)
            .collect();
        ids.sort();
        ids
    }
}

/// Accounting for how many input candidates were consumed by each
/// filtering stage (spec.md §8 "Filter accounting" testable property).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterAccounting {
    pub input: usize,
    pub odd_size: usize,
    pub duplicates: usize,
    pub no_matching_servers: usize,
    pub unused_by_composition: usize,
    pub output: usize,
}
