//! Entrant records (spec.md §3 `Entrant`).

use serde_json::Value;
use uuid::Uuid;

use crate::identity::AccountId;
use crate::lobby::role::Role;
use crate::matchmaker::rating::Rating;

/// An intent-to-join record. Owned by the entrant's session; the match
/// only references it (spec.md §3: "Owned by the entrant's session;
/// referenced (not owned) by the match's entrant map; removed on match
/// leave").
#[derive(Debug, Clone, PartialEq)]
pub struct Entrant {
    pub session_id: Uuid,
    pub account_id: AccountId,
    pub platform_id: String,
    pub username: String,
    pub display_name: String,
    pub login_session_id: Uuid,
    pub party_id: Option<Uuid>,
    pub role: Role,
    pub client_addr: std::net::SocketAddr,
    pub is_pcvr: bool,
    pub rating: Rating,
    pub rank_percentile: f32,
    pub matchmaker_query: String,
    /// Client-advertised feature set, checked against the match's
    /// `required_features` on join (spec.md §4.5 step 4).
    pub supported_features: Vec<String>,
}

/// Derived, rebuilt-on-change caches the lobby keeps alongside its
/// entrant map (spec.md §3: "internal derived caches (player-info
/// array, role counts) rebuilt whenever the presence or reservation
/// maps change").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntrantCaches {
    pub player_info: Vec<Value>,
    pub role_counts: std::collections::HashMap<Role, u32>,
}

impl EntrantCaches {
    pub fn rebuild(entrants: &std::collections::HashMap<Uuid, Entrant>) -> Self {
        let mut role_counts: std::collections::HashMap<Role, u32> = std::collections::HashMap::new();
        let mut player_info = Vec::with_capacity(entrants.len());
        for entrant in entrants.values() {
            *role_counts.entry(entrant.role).or_insert(0) += 1;
            player_info.push(serde_json::json!({
                "accountId": entrant.account_id.format_text(),
                "username": entrant.username,
                "role": entrant.role as u8,
            }));
        }
        Self {
            player_info,
            role_counts,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_caches_rebuild_counts_roles() {
        let mut entrants = std::collections::HashMap::new();
        for (role, n) in [(Role::TeamA, 2usize), (Role::TeamB, 1)] {
            for _ in 0..n {
                let session_id = Uuid::new_v4();
                entrants.insert(
                    session_id,
                    Entrant {
                        session_id,
                        account_id: AccountId {
                            platform: crate::identity::Platform::OculusOrg,
                            user_type: crate::identity::account_id::UserType::Standard,
                            account_number: 1,
                        },
                        platform_id: "OVR".into(),
                        username: "p".into(),
                        display_name: "p".into(),
                        login_session_id: Uuid::new_v4(),
                        party_id: None,
                        role,
                        client_addr: "127.0.0.1:0".parse().unwrap(),
                        is_pcvr: false,
                        rating: Rating::default(),
                        rank_percentile: 0.5,
                        matchmaker_query: String::new(),
                        supported_features: Vec::new(),
                    },
                );
            }
        }
        let caches = EntrantCaches::rebuild(&entrants);
        assert_eq!(caches.role_counts[&Role::TeamA], 2);
        assert_eq!(caches.role_counts[&Role::TeamB], 1);
        assert_eq!(caches.player_info.len(), 3);
    }
}
