//! Broadcaster registration orchestration (spec.md §4.4 steps 1-4):
//! resolves the external endpoint, health-probes the candidate server,
//! and on success stores the record and spawns its parking match.
//!
//! Grounded in the same "free function over shared registries" idiom
//! [`crate::join::run_join_pipeline`] uses, since registration is a
//! one-shot sequence over several registries rather than state owned by
//! any one of them.

use std::net::{Ipv4Addr, SocketAddr};

use log::warn;
use tokio::net::UdpSocket;
use uuid::Uuid;

use crate::external::audit::{AuditNotice, AuditSink};
use crate::identity::Symbol;
use crate::lobby::LobbyRegistry;

use super::health;
use super::{Endpoint, GameServerLifecycle, GameServerRecord, GameServerRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The health probe (spec.md §4.4 step 3) never received a valid ack.
    ProbeFailed,
}

/// Input gathered from the decoded `GameServerRegistrationRequest` plus
/// the session's already-authorised operator identity (spec.md §4.4
/// step 1).
pub struct RegistrationRequest {
    pub operator_user_id: Uuid,
    pub session_id: Uuid,
    pub internal_ip: Ipv4Addr,
    pub external_ip_override: Option<Ipv4Addr>,
    pub port: u16,
    pub group_ids: Vec<String>,
    pub regions: Vec<Symbol>,
    pub feature_flags: Vec<String>,
    pub version_lock: Symbol,
    pub priority_modes: Vec<Symbol>,
}

/// Runs spec.md §4.4 steps 2-4: resolve the endpoint, probe it, and on
/// success store the registration and spawn its parking match. Step 1
/// (authenticated-session + operator-group resolution) is the caller's
/// responsibility since it depends on the session, not the registry.
pub async fn register(
    request: RegistrationRequest,
    service_external_ip: Ipv4Addr,
    registry: &GameServerRegistry,
    lobbies: &LobbyRegistry,
    audit: &dyn AuditSink,
    node: &str,
) -> Result<(GameServerRecord, crate::lobby::MatchLabel), RegistrationError> {
    let external_ip = GameServerRecord::resolve_external_ip(request.external_ip_override, service_external_ip);
    let endpoint = Endpoint {
        internal_ip: request.internal_ip,
        external_ip,
        port: request.port,
    };

    if probe(endpoint).await.is_none() {
        audit
            .notify(AuditNotice {
                subject: request.operator_user_id,
                message: format!(
                    "BroadcasterRegistration_Failure: no ack from {}:{}",
                    endpoint.external_ip, endpoint.port
                ),
            })
            .await;
        return Err(RegistrationError::ProbeFailed);
    }

    let record = GameServerRecord {
        operator_user_id: request.operator_user_id,
        session_id: request.session_id,
        server_id: registry.allocate_server_id(),
        endpoint,
        group_ids: request.group_ids.clone(),
        regions: request.regions,
        feature_flags: request.feature_flags,
        version_lock: request.version_lock,
        priority_modes: request.priority_modes,
        lifecycle: GameServerLifecycle::Parking,
        bound_match_id: Uuid::nil(),
    };

    let group_id = request.group_ids.into_iter().next().unwrap_or_default();
    let handle = lobbies.spawn_match(node.to_string(), group_id);

    let mut record = record;
    record.bound_match_id = handle.match_id;
    registry.insert(record.clone());

    Ok((record, handle.label()))
}

/// Binds an ephemeral local socket and runs the up-to-5-attempt probe
/// against `endpoint` (spec.md §4.4 step 3).
async fn probe(endpoint: Endpoint) -> Option<std::time::Duration> {
    let socket = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
        Ok(socket) => socket,
        Err(err) => {
            warn!("failed to bind probe socket: {err}");
            return None;
        }
    };
    let target = SocketAddr::from((endpoint.external_ip, endpoint.port));
    health::probe_with_retries(&socket, target, 5).await
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_register_fails_when_probe_target_is_silent() {
        let registry = GameServerRegistry::new();
        let lobbies = LobbyRegistry::new();
        let audit = crate::external::audit::NullAuditSink;

        let request = RegistrationRequest {
            operator_user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            internal_ip: Ipv4Addr::new(10, 0, 0, 5),
            external_ip_override: Some(Ipv4Addr::new(127, 0, 0, 1)),
            port: 1, // nothing listens here
            group_ids: vec!["default".to_string()],
            regions: vec![],
            feature_flags: vec![],
            version_lock: Symbol(0),
            priority_modes: vec![],
        };

        let result = register(
            request,
            Ipv4Addr::new(203, 0, 113, 5),
            &registry,
            &lobbies,
            &audit,
            "node-1",
        )
        .await;

        assert_eq!(result, Err(RegistrationError::ProbeFailed));
        assert!(registry.list().is_empty());
    }
}
