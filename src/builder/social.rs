//! Social-lobby creation (spec.md §4.8.1): picks an unassigned server in
//! a group by player RTT coverage and prepares it at the social level,
//! guarded by a process-wide 5-second creation cool-down.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime};

use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use crate::errors::LobbyErrorCode;
use crate::identity::Symbol;
use crate::lobby::signal::Signal;
use crate::lobby::{LobbyRegistry, MatchLabel};
use crate::registry::{GameServerLifecycle, GameServerRegistry};

const COOLDOWN: Duration = Duration::from_secs(5);

/// Serialises social-lobby creation attempts and tracks the last time one
/// ran, so a burst of simultaneous social-join requests produces at most
/// one new lobby per cool-down window (spec.md §4.8.1: "Under a lock with
/// 5-second cool-down").
pub struct SocialLobbyCreator {
    lock: Mutex<Option<SystemTime>>,
}

impl Default for SocialLobbyCreator {
    fn default() -> Self {
        Self {
            lock: Mutex::new(None),
        }
    }
}

impl SocialLobbyCreator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to create (or join the in-progress creation of) a social
    /// lobby for `group_id`. Returns `Ok(None)` when the cool-down is
    /// still active and no attempt was made this call.
    pub async fn try_create(
        &self,
        group_id: &str,
        social_mode: Symbol,
        social_level: Symbol,
        player_rtt_by_server: &HashMap<Ipv4Addr, Vec<u32>>,
        registry: &GameServerRegistry,
        lobbies: &LobbyRegistry,
    ) -> Result<Option<MatchLabel>, LobbyErrorCode> {
        let mut last_attempt = self.lock.lock().await;
        if let Some(last) = *last_attempt {
            if last.elapsed().unwrap_or(Duration::ZERO) < COOLDOWN {
                return Ok(None);
            }
        }
        *last_attempt = Some(SystemTime::now());
        drop(last_attempt);

        let unassigned: Vec<_> = registry
            .list_for_group(group_id)
            .into_iter()
            .filter(|s| matches!(s.lifecycle, GameServerLifecycle::Parking))
            .collect();
        if unassigned.is_empty() {
            return Err(LobbyErrorCode::NoAvailableServers);
        }

        // Rank by greatest number of players with acceptable RTT, then
        // by ascending mean RTT (spec.md §4.8.1 step 2).
        let mut ranked: Vec<_> = unassigned
            .iter()
            .map(|server| {
                let rtts = player_rtt_by_server
                    .get(&server.endpoint.external_ip)
                    .cloned()
                    .unwrap_or_default();
                let mean = if rtts.is_empty() {
                    u32::MAX
                } else {
                    rtts.iter().sum::<u32>() / rtts.len() as u32
                };
                (server, rtts.len(), mean)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)));

        let chosen = match ranked.first() {
            Some((server, count, _)) if *count > 0 => *server,
            _ => unassigned.choose(&mut rand::thread_rng()).unwrap(),
        };

        let Some(handle) = lobbies.get(chosen.bound_match_id) else {
            return Err(LobbyErrorCode::ServerDoesNotExist);
        };

        let signal = Signal::PrepareSession {
            mode: social_mode,
            level: social_level,
            lobby_type: 1,
            group_id: group_id.to_string(),
            required_features: Vec::new(),
            start_time: SystemTime::now(),
        };
        if handle.send(signal).await.is_err() {
            return Err(LobbyErrorCode::ServerDoesNotExist);
        }

        Ok(Some(handle.label()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::to_symbol;

    #[tokio::test]
    async fn test_try_create_errors_with_no_unassigned_servers() {
        let registry = GameServerRegistry::new();
        let lobbies = LobbyRegistry::new();
        let creator = SocialLobbyCreator::new();
        let result = creator
            .try_create(
                "default",
                to_symbol("social_public"),
                to_symbol("the_plaza"),
                &HashMap::new(),
                &registry,
                &lobbies,
            )
            .await;
        assert_eq!(result, Err(LobbyErrorCode::NoAvailableServers));
    }

    #[tokio::test]
    async fn test_second_call_within_cooldown_is_skipped() {
        let registry = GameServerRegistry::new();
        let lobbies = LobbyRegistry::new();
        let creator = SocialLobbyCreator::new();
        let _ = creator
            .try_create(
                "default",
                to_symbol("social_public"),
                to_symbol("the_plaza"),
                &HashMap::new(),
                &registry,
                &lobbies,
            )
            .await;
        let second = creator
            .try_create(
                "default",
                to_symbol("social_public"),
                to_symbol("the_plaza"),
                &HashMap::new(),
                &registry,
                &lobbies,
            )
            .await;
        assert_eq!(second, Ok(None));
    }
}
