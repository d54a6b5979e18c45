//! Lobby state machine (spec.md §4.5, component C5): per-match
//! authoritative state, entrants, reservations, round clock, and
//! termination.
//!
//! Modelled on the teacher's game-state idiom (`services/game/store.rs`'s
//! `Arc<RwLock<T>>` "Ref" pattern for the externally-queryable label,
//! `services/game/matchmaking.rs`'s `Mutex<VecDeque<_>>` style task
//! loop) but driven by an explicit signal channel rather than a
//! reference-counted store of concrete game objects, since spec.md
//! requires a *single authoritative loop* per match (§5: "all mutations
//! happen inside the loop in response to signals or ticks").

pub mod entrant;
pub mod game_state;
pub mod reservation;
pub mod role;
pub mod signal;

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};

use log::{debug, info, warn};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::errors::LobbyErrorCode;
use crate::identity::Symbol;
use crate::registry::Endpoint;

use entrant::{Entrant, EntrantCaches};
use game_state::GameState;
use reservation::Reservation;
use role::Role;
use signal::Signal;

/// Match ticks run at this cadence (spec.md §4.5: "default 10 Hz").
pub const TICK_RATE_HZ: u64 = 10;
const TICK_INTERVAL: Duration = Duration::from_millis(1000 / TICK_RATE_HZ);

/// Server presence absence beyond this triggers a graceful shutdown
/// (spec.md §4.5 tick rule).
const SERVER_ABSENCE_TIMEOUT: Duration = Duration::from_secs(60);
/// Empty-entrant-map timeout after the match has started.
const EMPTY_STARTED_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyState {
    Init,
    Unassigned,
    Prepared,
    Active,
    Terminating,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyType {
    Unassigned,
    Public,
    Private,
}

/// The authoritative, externally-queryable state of one match (spec.md
/// §3 `MatchLabel`). Cloned out to readers through a [`watch`] channel;
/// the loop is the only writer.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchLabel {
    pub match_id: Uuid,
    pub node: String,
    pub created_at: SystemTime,
    pub start_time: SystemTime,
    pub terminate_tick: u64,
    pub state: LobbyState,
    pub lobby_type: LobbyType,
    pub mode: Symbol,
    pub level: Symbol,
    pub required_features: Vec<String>,
    pub session_settings: Value,
    pub server_session_id: Option<Uuid>,
    pub server_endpoint: Option<Endpoint>,
    pub group_id: String,
    pub spawned_by: Option<Uuid>,
    pub team_size: u32,
    pub max_size: u32,
    pub player_limit: u32,
    pub role_counts: HashMap<Role, u32>,
    /// Running average of seated entrants' `rank_percentile`, rebuilt
    /// alongside the entrant caches (spec.md §4.7.2 step 2: the
    /// rank-delta band used by backfill's sort/filter). `0.5` (the
    /// neutral midpoint) when the match has no entrants yet.
    pub avg_rank_percentile: f32,
    pub open: bool,
    pub level_loaded: bool,
}

impl MatchLabel {
    fn new(match_id: Uuid, node: String, group_id: String) -> Self {
        Self {
            match_id,
            node,
            created_at: SystemTime::now(),
            start_time: SystemTime::now(),
            terminate_tick: 0,
            state: LobbyState::Init,
            lobby_type: LobbyType::Unassigned,
            mode: Symbol(0),
            level: Symbol(0),
            required_features: Vec::new(),
            session_settings: Value::Null,
            server_session_id: None,
            server_endpoint: None,
            group_id,
            spawned_by: None,
            team_size: 4,
            max_size: 8,
            player_limit: 8,
            role_counts: HashMap::new(),
            avg_rank_percentile: 0.5,
            open: false,
            level_loaded: false,
        }
    }

    pub fn open_slots(&self, reserved: usize, seated: usize) -> usize {
        self.player_limit
            .saturating_sub((reserved + seated) as u32) as usize
    }

    pub fn role_count(&self, role: Role) -> u32 {
        *self.role_counts.get(&role).unwrap_or(&0)
    }
}

/// Handle used by other components to drive a running match loop.
#[derive(Clone)]
pub struct LobbyHandle {
    pub match_id: Uuid,
    signal_tx: mpsc::Sender<Signal>,
    label_rx: watch::Receiver<MatchLabel>,
}

impl LobbyHandle {
    pub fn label(&self) -> MatchLabel {
        self.label_rx.borrow().clone()
    }

    pub async fn send(&self, signal: Signal) -> Result<(), mpsc::error::SendError<Signal>> {
        self.signal_tx.send(signal).await
    }
}

struct Lobby {
    label: MatchLabel,
    entrants: HashMap<Uuid, Entrant>,
    reservations: HashMap<Uuid, Reservation>,
    join_timestamps: HashMap<Uuid, Instant>,
    team_alignments: HashMap<Uuid, Role>,
    game_state: Option<GameState>,
    caches: EntrantCaches,
    tick: u64,
    terminate_tick: u64,
    server_last_seen: Option<Instant>,
    started_empty_since: Option<Instant>,
    label_tx: watch::Sender<MatchLabel>,
    dirty: bool,
}

impl Lobby {
    fn spawn(match_id: Uuid, node: String, group_id: String) -> LobbyHandle {
        let label = MatchLabel::new(match_id, node, group_id);
        let (label_tx, label_rx) = watch::channel(label.clone());
        let (signal_tx, signal_rx) = mpsc::channel(64);

        let lobby = Lobby {
            label,
            entrants: HashMap::new(),
            reservations: HashMap::new(),
            join_timestamps: HashMap::new(),
            team_alignments: HashMap::new(),
            game_state: None,
            caches: EntrantCaches::default(),
            tick: 0,
            terminate_tick: 0,
            server_last_seen: None,
            started_empty_since: None,
            label_tx,
            dirty: false,
        };

        tokio::spawn(lobby.run(signal_rx));

        LobbyHandle {
            match_id,
            signal_tx,
            label_rx,
        }
    }

    async fn run(mut self, mut signal_rx: mpsc::Receiver<Signal>) {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                maybe_signal = signal_rx.recv() => {
                    match maybe_signal {
                        Some(signal) => {
                            if !self.handle_signal(signal) {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = interval.tick() => {
                    if !self.on_tick() {
                        break;
                    }
                }
            }
            self.publish_if_dirty();
        }
        debug!("match loop exiting (MID: {})", self.label.match_id);
    }

    /// Returns `false` when the loop should exit (spec.md §4.5: a
    /// `Terminate` or a reached `terminateTick` ends the loop).
    fn handle_signal(&mut self, signal: Signal) -> bool {
        match signal {
            Signal::PrepareSession {
                mode,
                level,
                lobby_type,
                group_id,
                required_features,
                start_time,
            } => {
                self.label.mode = mode;
                self.label.level = level;
                self.label.lobby_type = match lobby_type {
                    1 => LobbyType::Public,
                    2 => LobbyType::Private,
                    _ => LobbyType::Unassigned,
                };
                self.label.group_id = group_id;
                self.label.required_features = required_features;
                self.label.start_time = start_time;
                self.label.state = LobbyState::Prepared;
                self.dirty = true;
                true
            }
            Signal::StartSession => {
                self.label.state = LobbyState::Active;
                self.dirty = true;
                true
            }
            Signal::LockSession => {
                self.label.open = false;
                self.dirty = true;
                true
            }
            Signal::UnlockSession => {
                self.label.open = true;
                self.dirty = true;
                true
            }
            Signal::Shutdown {
                grace_seconds,
                disconnect_users: _,
                disconnect_game_server: _,
            } => {
                self.label.open = false;
                self.label.state = LobbyState::Terminating;
                self.terminate_tick = self.tick + (grace_seconds as u64 * TICK_RATE_HZ);
                self.label.terminate_tick = self.terminate_tick;
                self.dirty = true;
                true
            }
            Signal::Terminate => {
                self.label.state = LobbyState::Dead;
                self.dirty = true;
                false
            }
            Signal::PruneUnderutilized => {
                // No-op unless the match is actually empty; the tick
                // loop's empty-match timeout is the real enforcement
                // path. This signal lets the allocator nudge an
                // immediate check rather than waiting for the timeout.
                if self.entrants.is_empty() && matches!(self.label.state, LobbyState::Active) {
                    self.label.open = false;
                }
                true
            }
            Signal::GetEndpoint(reply) => {
                let _ = reply.send(self.label.server_endpoint);
                true
            }
            Signal::GetPresences(reply) => {
                let _ = reply.send(self.entrants.keys().copied().collect());
                true
            }
            Signal::JoinAttempt {
                session_id,
                is_broadcaster,
                entrants,
                required_features,
                reply,
            } => {
                let result = self.join_attempt(session_id, is_broadcaster, entrants, &required_features);
                let _ = reply.send(result);
                true
            }
            Signal::Leave { session_id } => {
                self.leave(session_id);
                true
            }
            Signal::Reserve {
                session_id,
                account_id_hint,
                role,
                ttl,
            } => {
                self.reservations.insert(
                    session_id,
                    Reservation {
                        session_id,
                        account_id_hint,
                        role,
                        deadline: Instant::now() + ttl,
                    },
                );
                self.dirty = true;
                true
            }
        }
    }

    /// Implements the join-attempt decision logic of spec.md §4.5.
    fn join_attempt(
        &mut self,
        session_id: Uuid,
        is_broadcaster: bool,
        entrants: Vec<Entrant>,
        required_features: &[String],
    ) -> Result<(), LobbyErrorCode> {
        if is_broadcaster {
            self.label.server_session_id = Some(session_id);
            self.label.open = true;
            self.server_last_seen = Some(Instant::now());
            self.dirty = true;
            return Ok(());
        }

        if matches!(self.label.state, LobbyState::Terminating) && !self.label.open {
            return Err(LobbyErrorCode::MatchTerminating);
        }
        if matches!(self.label.state, LobbyState::Unassigned | LobbyState::Init) {
            return Err(LobbyErrorCode::UnassignedLobby);
        }

        let missing_feature = required_features
            .iter()
            .any(|f| !self.label.required_features.contains(f));
        if missing_feature {
            return Err(LobbyErrorCode::FeatureMismatch);
        }

        for entrant in &entrants {
            let duplicate = self.entrants.values().any(|e| {
                e.session_id == entrant.session_id || e.account_id == entrant.account_id
            });
            if duplicate {
                return Err(LobbyErrorCode::DuplicateJoin);
            }
        }

        let reserved_count = self.reservations.len();
        let seated_count = self.entrants.len();

        // Assigned up front (instead of re-derived during seating below)
        // so the capacity check and the seating loop agree on exactly
        // which role each entrant lands in; a multi-entrant party join
        // must see its own earlier entrants' roles before seating the
        // rest, not a single stale snapshot from before the join began.
        let mut assigned_roles = Vec::with_capacity(entrants.len());

        match self.label.lobby_type {
            LobbyType::Private => {
                if self.label.open_slots(reserved_count, seated_count) < entrants.len() {
                    return Err(LobbyErrorCode::ServerIsFull);
                }
                for entrant in &entrants {
                    assigned_roles.push(entrant.role);
                }
            }
            LobbyType::Public => {
                let mut simulated_counts = self.label.role_counts.clone();
                for entrant in &entrants {
                    let role = self.assign_role(entrant, &simulated_counts);
                    if role.is_team_slot() && *simulated_counts.get(&role).unwrap_or(&0) >= self.label.team_size {
                        return Err(LobbyErrorCode::ServerIsFull);
                    }
                    *simulated_counts.entry(role).or_insert(0) += 1;
                    assigned_roles.push(role);
                }
            }
            LobbyType::Unassigned => return Err(LobbyErrorCode::UnassignedLobby),
        }

        for (mut entrant, role) in entrants.into_iter().zip(assigned_roles) {
            if self.reservations.remove(&entrant.session_id).is_some() {
                // Consumed a held slot; falls through to seating below.
            }
            entrant.role = role;
            *self.label.role_counts.entry(role).or_insert(0) += 1;
            self.join_timestamps.insert(entrant.session_id, Instant::now());
            self.entrants.insert(entrant.session_id, entrant);
        }

        self.rebuild_caches();
        self.dirty = true;
        Ok(())
    }

    /// Role assignment for public matches (spec.md §4.5 "Role
    /// assignment for public matches"). `role_counts` is the simulated
    /// team-count snapshot as of this entrant's turn within the current
    /// join, not necessarily `self.label.role_counts` (spec.md §8
    /// "balance within 1" requires a multi-entrant join to see its own
    /// earlier seatings before assigning the next one).
    fn assign_role(&self, entrant: &Entrant, role_counts: &HashMap<Role, u32>) -> Role {
        if matches!(entrant.role, Role::Moderator | Role::Spectator) {
            return entrant.role;
        }
        if let Some(hint) = self.team_alignments.get(&entrant.session_id) {
            return *hint;
        }
        if self.label.mode == crate::identity::to_symbol("social_public") {
            return Role::TeamSocial;
        }
        let team_a = *role_counts.get(&Role::TeamA).unwrap_or(&0);
        let team_b = *role_counts.get(&Role::TeamB).unwrap_or(&0);
        if team_a <= team_b {
            Role::TeamA
        } else {
            Role::TeamB
        }
    }

    fn rebuild_caches(&mut self) {
        self.caches = EntrantCaches::rebuild(&self.entrants);
        self.label.avg_rank_percentile = if self.entrants.is_empty() {
            0.5
        } else {
            self.entrants.values().map(|e| e.rank_percentile).sum::<f32>() / self.entrants.len() as f32
        };
    }

    /// Leave handling (spec.md §4.5 "Leave:").
    fn leave(&mut self, session_id: Uuid) {
        if self.label.server_session_id == Some(session_id) {
            self.label.state = LobbyState::Terminating;
            self.terminate_tick = self.tick;
            self.label.terminate_tick = self.terminate_tick;
            self.dirty = true;
            return;
        }

        if let Some(entrant) = self.entrants.remove(&session_id) {
            if let Some(count) = self.label.role_counts.get_mut(&entrant.role) {
                *count = count.saturating_sub(1);
            }
            self.join_timestamps.remove(&session_id);
            self.rebuild_caches();
            if self.entrants.is_empty() {
                self.label.open = false;
            }
            self.dirty = true;
        }
        self.reservations.remove(&session_id);
    }

    /// Per-tick maintenance (spec.md §4.5 "Ticking:"). Returns `false`
    /// when the match should terminate and the loop should exit.
    fn on_tick(&mut self) -> bool {
        self.tick += 1;
        let now = Instant::now();

        let expired: Vec<Uuid> = self
            .reservations
            .iter()
            .filter(|(_, r)| r.is_expired(now))
            .map(|(id, _)| *id)
            .collect();
        if !expired.is_empty() {
            for id in expired {
                self.reservations.remove(&id);
            }
            self.dirty = true;
        }

        if let Some(last_seen) = self.server_last_seen {
            if now.duration_since(last_seen) > SERVER_ABSENCE_TIMEOUT
                && !matches!(self.label.state, LobbyState::Terminating | LobbyState::Dead)
            {
                warn!("broadcaster presence lost, scheduling shutdown (MID: {})", self.label.match_id);
                self.schedule_shutdown(DEFAULT_SHUTDOWN_GRACE);
            }
        }

        if matches!(self.label.state, LobbyState::Active) && self.entrants.is_empty() {
            match self.started_empty_since {
                Some(since) if now.duration_since(since) > EMPTY_STARTED_TIMEOUT => {
                    self.schedule_shutdown(DEFAULT_SHUTDOWN_GRACE);
                }
                Some(_) => {}
                None => self.started_empty_since = Some(now),
            }
        } else {
            self.started_empty_since = None;
        }

        if self.tick % TICK_RATE_HZ == 0 {
            if let Some(game_state) = self.game_state.as_mut() {
                if game_state.advance_one_second() {
                    self.dirty = true;
                }
            }
        }

        if self.terminate_tick != 0 && self.tick >= self.terminate_tick {
            self.label.state = LobbyState::Dead;
            self.dirty = true;
            info!("match terminated (MID: {})", self.label.match_id);
            return false;
        }

        if matches!(self.label.state, LobbyState::Prepared)
            && self.label.start_time <= SystemTime::now()
            && !self.label.level_loaded
        {
            self.label.level_loaded = true;
            self.dirty = true;
            // GameServerSessionStart is emitted by the caller that owns
            // the server's output queue (session.rs); this loop only
            // flips the `level_loaded` flag and leaves a dirty label so
            // that caller can observe the transition on its next poll.
        }

        true
    }

    fn schedule_shutdown(&mut self, grace: Duration) {
        if matches!(self.label.state, LobbyState::Terminating | LobbyState::Dead) {
            return;
        }
        self.label.open = false;
        self.label.state = LobbyState::Terminating;
        self.terminate_tick = self.tick + (grace.as_secs() * TICK_RATE_HZ);
        self.label.terminate_tick = self.terminate_tick;
        self.dirty = true;
    }

    fn publish_if_dirty(&mut self) {
        if self.dirty {
            let _ = self.label_tx.send(self.label.clone());
            self.dirty = false;
        }
    }
}

/// The process-wide lobby registry: maps match IDs to live loop handles
/// (spec.md §5: "The match registry is the only component permitted to
/// mutate match state; other components speak to it via signals/join-
/// attempts").
#[derive(Default)]
pub struct LobbyRegistry {
    handles: RwLock<HashMap<Uuid, LobbyHandle>>,
}

impl LobbyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_match(&self, node: String, group_id: String) -> LobbyHandle {
        let match_id = Uuid::new_v4();
        let handle = Lobby::spawn(match_id, node, group_id);
        self.handles.write().insert(match_id, handle.clone());
        handle
    }

    pub fn get(&self, match_id: Uuid) -> Option<LobbyHandle> {
        self.handles.read().get(&match_id).cloned()
    }

    pub fn remove(&self, match_id: Uuid) {
        self.handles.write().remove(&match_id);
    }

    pub fn list(&self) -> Vec<Uuid> {
        self.handles.read().keys().copied().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::{AccountId, Platform};
    use crate::matchmaker::rating::Rating;

    fn sample_entrant(session_id: Uuid) -> Entrant {
        Entrant {
            session_id,
            account_id: AccountId::new(Platform::OculusOrg, crate::identity::account_id::UserType::Standard, session_id.as_u128() as u64),
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

    fn prepared_lobby() -> Lobby {
        let (label_tx, _label_rx) = watch::channel(MatchLabel::new(Uuid::new_v4(), "node-1".into(), "default".into()));
        let mut lobby = Lobby {
            label: MatchLabel::new(Uuid::new_v4(), "node-1".into(), "default".into()),
            entrants: HashMap::new(),
            reservations: HashMap::new(),
            join_timestamps: HashMap::new(),
            team_alignments: HashMap::new(),
            game_state: None,
            caches: EntrantCaches::default(),
            tick: 0,
            terminate_tick: 0,
            server_last_seen: None,
            started_empty_since: None,
            label_tx,
            dirty: false,
        };
        lobby.label.state = LobbyState::Prepared;
        lobby.label.lobby_type = LobbyType::Public;
        lobby.label.team_size = 4;
        lobby
    }

    #[test]
    fn test_join_attempt_balances_arena_roles() {
        let mut lobby = prepared_lobby();
        for _ in 0..8 {
            let session_id = Uuid::new_v4();
            lobby
                .join_attempt(session_id, false, vec![sample_entrant(session_id)], &[])
                .unwrap();
        }
        let team_a = lobby.label.role_count(Role::TeamA);
        let team_b = lobby.label.role_count(Role::TeamB);
        assert!((team_a as i64 - team_b as i64).abs() <= 1);
    }

    #[test]
    fn test_party_join_does_not_oversubscribe_team() {
        let mut lobby = prepared_lobby();
        // Seat 3 on TeamA and 4 on TeamB individually, leaving TeamA one
        // slot short of team_size=4 and TeamB already full.
        for _ in 0..3 {
            let session_id = Uuid::new_v4();
            lobby.join_attempt(session_id, false, vec![sample_entrant(session_id)], &[]).unwrap();
        }
        *lobby.label.role_counts.entry(Role::TeamB).or_insert(0) = 4;

        // A 2-entrant party join must not both land on TeamA (which only
        // has 1 open slot); simulating incrementally should reject the
        // whole join rather than push role_count(TeamA) to 5.
        let party: Vec<Entrant> = (0..2).map(|_| sample_entrant(Uuid::new_v4())).collect();
        let party_ids: Vec<Uuid> = party.iter().map(|e| e.session_id).collect();
        let result = lobby.join_attempt(party_ids[0], false, party, &[]);
        assert_eq!(result, Err(LobbyErrorCode::ServerIsFull));

        let team_a = lobby.label.role_count(Role::TeamA);
        assert!(team_a <= lobby.label.team_size);
        assert!(!lobby.entrants.values().any(|e| party_ids.contains(&e.session_id)));
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let mut lobby = prepared_lobby();
        let session_id = Uuid::new_v4();
        let entrant = sample_entrant(session_id);
        lobby.join_attempt(session_id, false, vec![entrant.clone()], &[]).unwrap();

        let other_session = Uuid::new_v4();
        let mut dup = entrant;
        dup.session_id = other_session;
        let result = lobby.join_attempt(other_session, false, vec![dup], &[]);
        assert_eq!(result, Err(LobbyErrorCode::DuplicateJoin));
    }

    #[test]
    fn test_unassigned_lobby_rejects_join() {
        let mut lobby = prepared_lobby();
        lobby.label.state = LobbyState::Unassigned;
        let session_id = Uuid::new_v4();
        let result = lobby.join_attempt(session_id, false, vec![sample_entrant(session_id)], &[]);
        assert_eq!(result, Err(LobbyErrorCode::UnassignedLobby));
    }

    #[test]
    fn test_feature_mismatch_rejected() {
        let mut lobby = prepared_lobby();
        lobby.label.required_features = vec!["pcvr".to_string()];
        let session_id = Uuid::new_v4();
        let result = lobby.join_attempt(session_id, false, vec![sample_entrant(session_id)], &["vr_only".to_string()]);
        assert_eq!(result, Err(LobbyErrorCode::FeatureMismatch));
    }

    #[test]
    fn test_reservation_expiry_frees_slot() {
        let mut lobby = prepared_lobby();
        let session_id = Uuid::new_v4();
        lobby.reservations.insert(
            session_id,
            Reservation {
                session_id,
                account_id_hint: None,
                role: Role::Any,
                deadline: Instant::now() - Duration::from_secs(1),
            },
        );
        assert!(lobby.on_tick());
        assert!(lobby.reservations.is_empty());
    }

    #[test]
    fn test_leave_closes_empty_match() {
        let mut lobby = prepared_lobby();
        let session_id = Uuid::new_v4();
        lobby.join_attempt(session_id, false, vec![sample_entrant(session_id)], &[]).unwrap();
        lobby.label.open = true;
        lobby.leave(session_id);
        assert!(lobby.entrants.is_empty());
        assert!(!lobby.label.open);
    }
}
