//! Live session state (spec.md §3 `Session`): one entry per authenticated
//! connection, its parameter bag, and its output queue.
//!
//! Grounded in the teacher's `services/sessions.rs` idea of a session
//! registry keyed by session ID, but the session struct itself carries
//! an `mpsc::Sender<Message>` output queue directly (spec.md §3: "an
//! output queue to which messages can be dispatched") rather than a
//! socket handle, so the match loop and join pipeline can hand a session
//! a message without owning its connection.

use std::collections::HashMap;
use std::net::IpAddr;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::codec::Message;
use crate::identity::{AccountId, Symbol};

/// Per-session parameter bag (spec.md §3: "login session reference,
/// group memberships, VR/PCVR flag, supported features, server
/// tags/regions for game-server sessions").
#[derive(Debug, Clone, Default)]
pub struct SessionParams {
    pub login_session_id: Option<Uuid>,
    pub groups: Vec<String>,
    pub is_vr: bool,
    pub is_pcvr: bool,
    pub supported_features: Vec<String>,
    /// Populated only for game-server (broadcaster) sessions.
    pub server_regions: Vec<Symbol>,
    pub server_tags: Vec<String>,
}

/// One live, authenticated connection.
pub struct Session {
    pub session_id: Uuid,
    pub client_ip: IpAddr,
    account_id: RwLock<Option<AccountId>>,
    params: RwLock<SessionParams>,
    output_tx: mpsc::Sender<Message>,
}

impl Session {
    pub fn new(session_id: Uuid, client_ip: IpAddr, output_tx: mpsc::Sender<Message>) -> Self {
        Self {
            session_id,
            client_ip,
            account_id: RwLock::new(None),
            params: RwLock::new(SessionParams::default()),
            output_tx,
        }
    }

    pub fn account_id(&self) -> Option<AccountId> {
        *self.account_id.read()
    }

    pub fn bind_account(&self, account_id: AccountId) {
        *self.account_id.write() = Some(account_id);
    }

    pub fn is_authenticated(&self) -> bool {
        self.account_id.read().is_some()
    }

    pub fn params(&self) -> SessionParams {
        self.params.read().clone()
    }

    pub fn update_params(&self, f: impl FnOnce(&mut SessionParams)) {
        f(&mut self.params.write());
    }

    /// Queues `message` for delivery to this session. A full or closed
    /// queue is the caller's signal that the connection is gone; the
    /// dispatcher/join pipeline treat it as a soft failure rather than
    /// panicking (spec.md §4.9: delivery outcome is reported, never
    /// fatal to the broader operation).
    pub async fn send(&self, message: Message) -> bool {
        self.output_tx.send(message).await.is_ok()
    }
}

/// The process-wide session registry, keyed by session ID.
#[derive(Default)]
pub struct SessionRegistry {
    by_id: RwLock<HashMap<Uuid, std::sync::Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: std::sync::Arc<Session>) {
        self.by_id.write().insert(session.session_id, session);
    }

    pub fn get(&self, session_id: Uuid) -> Option<std::sync::Arc<Session>> {
        self.by_id.read().get(&session_id).cloned()
    }

    pub fn remove(&self, session_id: Uuid) -> Option<std::sync::Arc<Session>> {
        self.by_id.write().remove(&session_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_session_starts_unauthenticated() {
        let (tx, _rx) = mpsc::channel(8);
        let session = Session::new(Uuid::new_v4(), IpAddr::V4(Ipv4Addr::LOCALHOST), tx);
        assert!(!session.is_authenticated());
        assert!(session.account_id().is_none());
    }

    #[tokio::test]
    async fn test_bind_account_marks_authenticated() {
        let (tx, _rx) = mpsc::channel(8);
        let session = Session::new(Uuid::new_v4(), IpAddr::V4(Ipv4Addr::LOCALHOST), tx);
        session.bind_account(AccountId::new(
            crate::identity::Platform::Steam,
            crate::identity::account_id::UserType::Standard,
            1,
        ));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let session = Session::new(Uuid::new_v4(), IpAddr::V4(Ipv4Addr::LOCALHOST), tx);
        let delivered = session
            .send(Message::RemoteLogSet(crate::codec::variants::observability::RemoteLogSet {
                xpid: "OVR-1".into(),
                opaque: [0; 4],
                level: crate::codec::variants::observability::LogLevel::Info,
                strings: vec![],
            }))
            .await;
        assert!(!delivered);
    }

    #[test]
    fn test_registry_insert_get_remove() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(8);
        let session_id = Uuid::new_v4();
        let session = std::sync::Arc::new(Session::new(session_id, IpAddr::V4(Ipv4Addr::LOCALHOST), tx));
        registry.insert(session);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(session_id).is_some());
        assert!(registry.remove(session_id).is_some());
        assert!(registry.get(session_id).is_none());
        assert!(registry.is_empty());
    }
}
