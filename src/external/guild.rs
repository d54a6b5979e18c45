//! Social/guild authorisation collaborator (spec.md §1 external
//! collaborators, §4.7 step 1, §4.9 step 1). Out of scope: only the
//! interface matters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GuildAuthError {
    #[error("guild backend unavailable")]
    Unavailable,
}

/// The gates a join/matchmaking attempt must pass before it is allowed
/// to proceed (spec.md §4.7 step 1: "age-gate, membership-gate,
/// VPN-gate, feature-gate, suspension-gate").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuildAuthDecision {
    Allowed,
    RejectedSuspended,
    RejectedKicked,
    RejectedUnderage,
}

#[async_trait]
pub trait GuildAuthClient: Send + Sync {
    async fn check(&self, account_id: Uuid, group_id: &str) -> Result<GuildAuthDecision, GuildAuthError>;
}

/// Always-allow double for local development and tests.
pub struct AllowAllGuildAuthClient;

#[async_trait]
impl GuildAuthClient for AllowAllGuildAuthClient {
    async fn check(&self, _account_id: Uuid, _group_id: &str) -> Result<GuildAuthDecision, GuildAuthError> {
        Ok(GuildAuthDecision::Allowed)
    }
}
