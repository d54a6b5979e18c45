//! Game-server registry (spec.md §4.4, component C4).
//!
//! Holds one [`GameServerRecord`] per live broadcaster connection,
//! keyed by session ID (spec.md §5: "the game-server registration map
//! is keyed by session ID; writes are serialised per session, reads are
//! snapshot-safe"). Modelled on the teacher's `Sessions`/`Games` service
//! pair (`services/sessions.rs`, `services/game/store.rs`): a
//! `parking_lot`-guarded map behind a plain struct, no actor loop.

pub mod health;
pub mod registration;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use uuid::Uuid;

use crate::identity::Symbol;

/// `(internalIP, externalIP, port)` as spec.md §4.4 calls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub internal_ip: Ipv4Addr,
    pub external_ip: Ipv4Addr,
    pub port: u16,
}

/// Lifecycle stage of a registered broadcaster (spec.md §4.4: the
/// `GameServer` lifecycle summary; distinct from the lobby state
/// machine's own states in §4.5, though the two track each other 1:1
/// for the parking match bound to this record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameServerLifecycle {
    Registering,
    Parking,
    Prepared,
    Started,
    Ended,
    RepArking,
    Dead,
}

/// A live game server (broadcaster) registration.
#[derive(Debug, Clone, PartialEq)]
pub struct GameServerRecord {
    pub operator_user_id: Uuid,
    pub session_id: Uuid,
    pub server_id: u64,
    pub endpoint: Endpoint,
    pub group_ids: Vec<String>,
    pub regions: Vec<Symbol>,
    pub feature_flags: Vec<String>,
    pub version_lock: Symbol,
    pub priority_modes: Vec<Symbol>,
    pub lifecycle: GameServerLifecycle,
    /// The match ID of the parking/bound lobby spawned for this server
    /// at registration time (spec.md §4.4 step 4).
    pub bound_match_id: Uuid,
}

impl GameServerRecord {
    /// True if `ip` falls in a private/loopback range (spec.md §4.4 step
    /// 2), the condition under which an explicit override is discarded
    /// in favour of the service's own external IP.
    pub fn is_private_or_loopback(ip: Ipv4Addr) -> bool {
        let octets = ip.octets();
        match octets {
            [127, ..] => true,
            [10, ..] => true,
            [172, b, ..] if (16..=31).contains(&b) => true,
            [192, 168, ..] => true,
            _ => false,
        }
    }

    /// Resolves the external endpoint to advertise, applying the
    /// private-range substitution rule.
    pub fn resolve_external_ip(requested_override: Option<Ipv4Addr>, service_external_ip: Ipv4Addr) -> Ipv4Addr {
        match requested_override {
            Some(ip) if !Self::is_private_or_loopback(ip) => ip,
            _ => service_external_ip,
        }
    }
}

/// The process-wide game-server registry.
#[derive(Default)]
pub struct GameServerRegistry {
    by_session: RwLock<HashMap<Uuid, GameServerRecord>>,
    next_server_id: std::sync::atomic::AtomicU64,
}

impl GameServerRegistry {
    pub fn new() -> Self {
        Self {
            by_session: RwLock::new(HashMap::new()),
            next_server_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    pub fn allocate_server_id(&self) -> u64 {
        self.next_server_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    pub fn insert(&self, record: GameServerRecord) {
        self.by_session.write().insert(record.session_id, record);
    }

    pub fn get(&self, session_id: Uuid) -> Option<GameServerRecord> {
        self.by_session.read().get(&session_id).cloned()
    }

    /// Removes the registration on session end (spec.md §4.4: "On
    /// session end, the registry removes the record").
    pub fn remove(&self, session_id: Uuid) -> Option<GameServerRecord> {
        self.by_session.write().remove(&session_id)
    }

    pub fn set_lifecycle(&self, session_id: Uuid, lifecycle: GameServerLifecycle) {
        if let Some(record) = self.by_session.write().get_mut(&session_id) {
            record.lifecycle = lifecycle;
        }
    }

    pub fn list(&self) -> Vec<GameServerRecord> {
        self.by_session.read().values().cloned().collect()
    }

    /// Servers allowed to host for `group_id`, used by the allocator
    /// (component C10) and the lobby builder (C8).
    pub fn list_for_group(&self, group_id: &str) -> Vec<GameServerRecord> {
        self.by_session
            .read()
            .values()
            .filter(|record| record.group_ids.iter().any(|g| g == group_id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_private_ranges_detected() {
        assert!(GameServerRecord::is_private_or_loopback(Ipv4Addr::new(127, 0, 0, 1)));
        assert!(GameServerRecord::is_private_or_loopback(Ipv4Addr::new(10, 1, 2, 3)));
        assert!(GameServerRecord::is_private_or_loopback(Ipv4Addr::new(172, 20, 0, 1)));
        assert!(GameServerRecord::is_private_or_loopback(Ipv4Addr::new(192, 168, 1, 1)));
        assert!(!GameServerRecord::is_private_or_loopback(Ipv4Addr::new(8, 8, 8, 8)));
        assert!(!GameServerRecord::is_private_or_loopback(Ipv4Addr::new(172, 32, 0, 1)));
    }

    #[test]
    fn test_override_discarded_when_private() {
        let service_ip = Ipv4Addr::new(203, 0, 113, 5);
        let resolved = GameServerRecord::resolve_external_ip(Some(Ipv4Addr::new(192, 168, 0, 1)), service_ip);
        assert_eq!(resolved, service_ip);

        let public_override = Ipv4Addr::new(198, 51, 100, 9);
        let resolved = GameServerRecord::resolve_external_ip(Some(public_override), service_ip);
        assert_eq!(resolved, public_override);
    }

    #[test]
    fn test_insert_get_remove_roundtrip() {
        let registry = GameServerRegistry::new();
        let session_id = Uuid::new_v4();
        let record = GameServerRecord {
            operator_user_id: Uuid::new_v4(),
            session_id,
            server_id: registry.allocate_server_id(),
            endpoint: Endpoint {
                internal_ip: Ipv4Addr::new(10, 0, 0, 5),
                external_ip: Ipv4Addr::new(203, 0, 113, 5),
                port: 6792,
            },
            group_ids: vec!["default".to_string()],
            regions: vec![],
            feature_flags: vec![],
            version_lock: Symbol(0),
            priority_modes: vec![],
            lifecycle: GameServerLifecycle::Registering,
            bound_match_id: Uuid::new_v4(),
        };
        registry.insert(record.clone());
        assert_eq!(registry.get(session_id), Some(record));
        assert!(registry.remove(session_id).is_some());
        assert!(registry.get(session_id).is_none());
    }
}
