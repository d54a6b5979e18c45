//! Stream-tracker registry (spec.md §4.3, component C3): the
//! multi-subscriber presence tracker other components consult to
//! observe system state ("this user is in match M", "this game server
//! is service-bound", ...).
//!
//! Modelled on the teacher's `Sessions` service
//! (`services/sessions.rs`): a single struct holding `parking_lot`-guarded
//! maps, exposed behind `&self` methods so it can be shared as one
//! `Arc` in [`crate::state::AppState`] without an actor loop of its own.
//! Presence changes are visible to any subsequent call on the same
//! process immediately, satisfying the single-node consistency
//! requirement in spec.md §4.3; there is no cross-node replication here
//! because spec.md's Non-goals scope clustering out.

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::stream_key::StreamKey;

/// Metadata carried by a tracked presence, mirroring spec.md §4.3's
/// `meta{format, username, status, hidden}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresenceMeta {
    pub format: String,
    pub username: String,
    /// Free-form status string; conventionally a match ID, ticket ID,
    /// or party ID rendered as text, depending on the stream it's on.
    pub status: String,
    /// Hidden presences are tracked and counted but excluded from the
    /// non-hidden checks matchmaking uses to avoid double-queuing
    /// (spec.md §4.6 side effects).
    pub hidden: bool,
}

/// One entry on a stream: which session/user is present and with what
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub meta: PresenceMeta,
}

#[derive(Default)]
struct Channel {
    /// Keyed by session ID: a session has at most one presence per
    /// stream, and `track` on an already-present session behaves as an
    /// update (matching `update`'s semantics being a superset of `track`).
    presences: HashMap<Uuid, Presence>,
}

/// The process-wide stream tracker.
#[derive(Default)]
pub struct StreamRegistry {
    channels: RwLock<HashMap<StreamKey, Channel>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks (or re-tracks) a presence on `key`.
    pub fn track(&self, key: StreamKey, session_id: Uuid, user_id: Uuid, meta: PresenceMeta) {
        let mut channels = self.channels.write();
        let channel = channels.entry(key).or_default();
        channel.presences.insert(
            session_id,
            Presence {
                session_id,
                user_id,
                meta,
            },
        );
    }

    /// Updates the metadata of an existing presence in place. A no-op if
    /// the session is not currently tracked on this stream.
    pub fn update(&self, key: StreamKey, session_id: Uuid, meta: PresenceMeta) {
        let mut channels = self.channels.write();
        if let Some(channel) = channels.get_mut(&key) {
            if let Some(presence) = channel.presences.get_mut(&session_id) {
                presence.meta = meta;
            }
        }
    }

    /// Removes a presence from a stream. Returns whether a presence was
    /// actually removed.
    pub fn untrack(&self, key: StreamKey, session_id: Uuid) -> bool {
        let mut channels = self.channels.write();
        match channels.get_mut(&key) {
            Some(channel) => {
                let removed = channel.presences.remove(&session_id).is_some();
                if channel.presences.is_empty() {
                    channels.remove(&key);
                }
                removed
            }
            None => false,
        }
    }

    /// Removes every presence belonging to `session_id` across all
    /// streams. Used when a session disconnects (spec.md §9 shutdown
    /// paths).
    pub fn untrack_all(&self, session_id: Uuid) {
        let mut channels = self.channels.write();
        channels.retain(|_, channel| {
            channel.presences.remove(&session_id);
            !channel.presences.is_empty()
        });
    }

    pub fn list(&self, key: &StreamKey) -> Vec<Presence> {
        self.channels
            .read()
            .get(key)
            .map(|channel| channel.presences.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, key: &StreamKey) -> usize {
        self.channels
            .read()
            .get(key)
            .map(|channel| channel.presences.len())
            .unwrap_or(0)
    }

    /// Whether any non-hidden presence is tracked on `key` (spec.md
    /// §4.6: a non-hidden matchmaker-stream presence for the group
    /// suppresses match production this cycle).
    pub fn has_visible(&self, key: &StreamKey) -> bool {
        self.channels
            .read()
            .get(key)
            .map(|channel| channel.presences.values().any(|p| !p.meta.hidden))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::to_symbol;

    fn key() -> StreamKey {
        StreamKey::new(
            to_symbol("service"),
            Uuid::new_v4(),
            to_symbol("match"),
            to_symbol("session"),
        )
    }

    #[test]
    fn test_track_then_list_is_immediately_visible() {
        let registry = StreamRegistry::new();
        let key = key();
        let session_id = Uuid::new_v4();
        registry.track(key, session_id, Uuid::new_v4(), PresenceMeta::default());
        assert_eq!(registry.count(&key), 1);
        assert_eq!(registry.list(&key)[0].session_id, session_id);
    }

    #[test]
    fn test_track_twice_updates_not_duplicates() {
        let registry = StreamRegistry::new();
        let key = key();
        let session_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        registry.track(key, session_id, user_id, PresenceMeta::default());
        registry.track(
            key,
            session_id,
            user_id,
            PresenceMeta {
                status: "match-123".into(),
                ..Default::default()
            },
        );
        assert_eq!(registry.count(&key), 1);
        assert_eq!(registry.list(&key)[0].meta.status, "match-123");
    }

    #[test]
    fn test_untrack_removes_empty_channel() {
        let registry = StreamRegistry::new();
        let key = key();
        let session_id = Uuid::new_v4();
        registry.track(key, session_id, Uuid::new_v4(), PresenceMeta::default());
        assert!(registry.untrack(key, session_id));
        assert_eq!(registry.count(&key), 0);
        assert!(!registry.untrack(key, session_id));
    }

    #[test]
    fn test_hidden_presence_is_not_visible() {
        let registry = StreamRegistry::new();
        let key = key();
        registry.track(
            key,
            Uuid::new_v4(),
            Uuid::new_v4(),
            PresenceMeta {
                hidden: true,
                ..Default::default()
            },
        );
        assert!(!registry.has_visible(&key));
    }

    #[test]
    fn test_untrack_all_clears_every_stream() {
        let registry = StreamRegistry::new();
        let session_id = Uuid::new_v4();
        let key_a = key();
        let key_b = StreamKey::new(
            to_symbol("party"),
            Uuid::new_v4(),
            to_symbol("membership"),
            to_symbol("session"),
        );
        registry.track(key_a, session_id, Uuid::new_v4(), PresenceMeta::default());
        registry.track(key_b, session_id, Uuid::new_v4(), PresenceMeta::default());
        registry.untrack_all(session_id);
        assert_eq!(registry.count(&key_a), 0);
        assert_eq!(registry.count(&key_b), 0);
    }
}
