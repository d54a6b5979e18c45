//! Ticket intake for the matchmaker cycle (spec.md §4.6 input: "a list
//! of candidate groupings"; §5: "matchmaker cycles are a periodic batch
//! ... and produce an atomic set of accepted candidates").
//!
//! [`run_cycle`] is a pure pipeline over already-formed [`Candidate`]s;
//! something has to turn queued tickets into those candidates first.
//! Grounded in the teacher's `services/game/matchmaking.rs`
//! `Mutex<VecDeque<_>>` idiom for a pending-ticket queue, but scoped
//! down to "pop ready tickets into fixed-size groupings per mode" since
//! this repository's spec does not otherwise describe candidate
//! generation.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::identity::Symbol;

use super::candidate::{Candidate, MatchmakerEntry};

/// One mode's pending tickets, in submission order.
#[derive(Default)]
struct ModeQueue {
    pending: Vec<MatchmakerEntry>,
}

/// The process-wide matchmaker ticket queue, one FIFO per mode.
#[derive(Default)]
pub struct MatchmakerQueue {
    by_mode: Mutex<HashMap<Symbol, ModeQueue>>,
}

impl MatchmakerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues one ticket (spec.md §4.7 step 6: "submit a matchmaking
    /// ticket to the matchmaker").
    pub fn submit(&self, mode: Symbol, entry: MatchmakerEntry) {
        self.by_mode.lock().entry(mode).or_default().pending.push(entry);
    }

    /// Removes a ticket before it is drawn into a candidate (spec.md
    /// §4.7 step 3: an explicit cancel revokes the matchmaking attempt).
    pub fn cancel(&self, mode: Symbol, session_id: uuid::Uuid) {
        if let Some(queue) = self.by_mode.lock().get_mut(&mode) {
            queue.pending.retain(|e| e.session_id != session_id);
        }
    }

    /// Drains up to `group_size`-sized chunks of pending tickets per
    /// mode into candidates, leaving any remainder (too few tickets to
    /// fill a group) queued for the next cycle. `group_size` should be
    /// even (two equal teams, spec.md §4.6 step 1).
    pub fn drain_candidates(&self, group_size: usize) -> Vec<Candidate> {
        let mut out = Vec::new();
        let mut queues = self.by_mode.lock();
        for (mode, queue) in queues.iter_mut() {
            let full_groups = queue.pending.len() / group_size;
            for _ in 0..full_groups {
                let entries: Vec<_> = queue.pending.drain(0..group_size).collect();
                out.push(Candidate { mode: *mode, entries });
            }
        }
        out
    }

    pub fn pending_count(&self, mode: Symbol) -> usize {
        self.by_mode.lock().get(&mode).map_or(0, |q| q.pending.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::to_symbol;
    use crate::matchmaker::rating::Rating;
    use uuid::Uuid;

    fn entry() -> MatchmakerEntry {
        let session_id = Uuid::new_v4();
        MatchmakerEntry {
            session_id,
            ticket_id: Uuid::new_v4(),
            group_id: "default".into(),
            max_rtt: super::super::DEFAULT_MAX_RTT_MS,
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
    fn test_drain_leaves_partial_group_queued() {
        let queue = MatchmakerQueue::new();
        let mode = to_symbol("arena_public");
        for _ in 0..5 {
            queue.submit(mode, entry());
        }
        let candidates = queue.drain_candidates(8);
        assert!(candidates.is_empty());
        assert_eq!(queue.pending_count(mode), 5);
    }

    #[test]
    fn test_drain_emits_full_group() {
        let queue = MatchmakerQueue::new();
        let mode = to_symbol("arena_public");
        for _ in 0..8 {
            queue.submit(mode, entry());
        }
        let candidates = queue.drain_candidates(8);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].entries.len(), 8);
        assert_eq!(queue.pending_count(mode), 0);
    }

    #[test]
    fn test_cancel_removes_ticket() {
        let queue = MatchmakerQueue::new();
        let mode = to_symbol("social_public");
        let e = entry();
        let session_id = e.session_id;
        queue.submit(mode, e);
        queue.cancel(mode, session_id);
        assert_eq!(queue.pending_count(mode), 0);
    }
}
