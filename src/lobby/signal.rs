//! Signals accepted by the per-match authoritative loop (spec.md §4.5).

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::errors::LobbyErrorCode;
use crate::identity::Symbol;
use crate::lobby::entrant::Entrant;
use crate::registry::Endpoint;

#[derive(Debug)]
pub enum Signal {
    PrepareSession {
        mode: Symbol,
        level: Symbol,
        lobby_type: u8,
        group_id: String,
        required_features: Vec<String>,
        start_time: std::time::SystemTime,
    },
    StartSession,
    LockSession,
    UnlockSession,
    Shutdown {
        grace_seconds: u32,
        disconnect_users: bool,
        disconnect_game_server: bool,
    },
    /// Terminates immediately, disconnecting every session without a
    /// grace period (spec.md §4.5: "`Terminate` is immediate").
    Terminate,
    PruneUnderutilized,
    GetEndpoint(oneshot::Sender<Option<Endpoint>>),
    GetPresences(oneshot::Sender<Vec<Uuid>>),
    /// A join attempt, carrying the primary entrant plus slot
    /// reservations (spec.md §4.5 step 4: "the first is the primary,
    /// the rest are slot reservations").
    JoinAttempt {
        session_id: Uuid,
        is_broadcaster: bool,
        /// The primary entrant followed by any party-slot reservations
        /// (spec.md §4.5 step 4).
        entrants: Vec<Entrant>,
        required_features: Vec<String>,
        reply: oneshot::Sender<Result<(), LobbyErrorCode>>,
    },
    Leave {
        session_id: Uuid,
    },
    /// Holds a seat for `session_id` ahead of its `JoinAttempt` (spec.md
    /// §4.8 step 5: a `MatchSettings` reservation list with a
    /// 20-second lifetime, consumed by `join_attempt` on success).
    Reserve {
        session_id: Uuid,
        account_id_hint: Option<Uuid>,
        role: crate::lobby::role::Role,
        ttl: std::time::Duration,
    },
}
