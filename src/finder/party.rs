//! Party groups (spec.md §3 `PartyGroup`): named cooperative units whose
//! members follow their leader's matchmaking ticket into a match.

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

pub const MAX_PARTY_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct PartyGroup {
    pub party_id: Uuid,
    pub name: String,
    pub leader_session: Uuid,
    pub members: Vec<Uuid>,
    pub open: bool,
}

impl PartyGroup {
    pub fn is_leader(&self, session_id: Uuid) -> bool {
        self.leader_session == session_id
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= MAX_PARTY_SIZE
    }
}

/// The process-wide party registry, keyed by the party's display name
/// (spec.md §4.7 step 4: "if the user belongs to a named party group,
/// join or create the corresponding party").
#[derive(Default)]
pub struct PartyRegistry {
    by_name: RwLock<HashMap<String, PartyGroup>>,
}

impl PartyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the named party if it exists and has room, otherwise
    /// creates it with `session_id` as leader.
    pub fn join_or_create(&self, name: &str, session_id: Uuid) -> PartyGroup {
        let mut by_name = self.by_name.write();
        let group = by_name.entry(name.to_string()).or_insert_with(|| PartyGroup {
            party_id: Uuid::new_v4(),
            name: name.to_string(),
            leader_session: session_id,
            members: Vec::new(),
            open: true,
        });
        if group.open && !group.members.contains(&session_id) && group.members.len() < MAX_PARTY_SIZE {
            group.members.push(session_id);
        }
        group.clone()
    }

    pub fn get(&self, name: &str) -> Option<PartyGroup> {
        self.by_name.read().get(name).cloned()
    }

    /// Removes `session_id` from its party. The party itself is removed
    /// once empty; a departing leader hands leadership to the next
    /// remaining member.
    pub fn leave(&self, name: &str, session_id: Uuid) {
        let mut by_name = self.by_name.write();
        let Some(group) = by_name.get_mut(name) else {
            return;
        };
        group.members.retain(|&m| m != session_id);
        if group.members.is_empty() {
            by_name.remove(name);
            return;
        }
        if group.leader_session == session_id {
            group.leader_session = group.members[0];
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_join_or_create_makes_first_member_leader() {
        let registry = PartyRegistry::new();
        let leader = Uuid::new_v4();
        let group = registry.join_or_create("squad-a", leader);
        assert_eq!(group.leader_session, leader);
        assert_eq!(group.members, vec![leader]);
    }

    #[test]
    fn test_second_join_does_not_replace_leader() {
        let registry = PartyRegistry::new();
        let leader = Uuid::new_v4();
        let follower = Uuid::new_v4();
        registry.join_or_create("squad-a", leader);
        let group = registry.join_or_create("squad-a", follower);
        assert_eq!(group.leader_session, leader);
        assert_eq!(group.members.len(), 2);
    }

    #[test]
    fn test_leave_promotes_next_member_to_leader() {
        let registry = PartyRegistry::new();
        let leader = Uuid::new_v4();
        let follower = Uuid::new_v4();
        registry.join_or_create("squad-a", leader);
        registry.join_or_create("squad-a", follower);
        registry.leave("squad-a", leader);
        let group = registry.get("squad-a").unwrap();
        assert_eq!(group.leader_session, follower);
    }

    #[test]
    fn test_leave_last_member_removes_party() {
        let registry = PartyRegistry::new();
        let leader = Uuid::new_v4();
        registry.join_or_create("squad-a", leader);
        registry.leave("squad-a", leader);
        assert!(registry.get("squad-a").is_none());
    }

    #[test]
    fn test_full_party_rejects_additional_members() {
        let registry = PartyRegistry::new();
        for _ in 0..MAX_PARTY_SIZE {
            registry.join_or_create("squad-a", Uuid::new_v4());
        }
        let overflow = Uuid::new_v4();
        let group = registry.join_or_create("squad-a", overflow);
        assert!(!group.members.contains(&overflow));
    }
}
