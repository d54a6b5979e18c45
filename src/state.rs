//! Shared application state (SPEC_FULL §1, §5): every registry and
//! collaborator handle a connection handler or background task needs,
//! passed explicitly as one `Arc<AppState>` rather than reached for
//! through a global, mirroring the explicit-registry-argument idiom
//! every component module in this crate already uses (`join::run_join_pipeline`,
//! `builder::build_match`, `finder::validate_request`, ...).

use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::builder::levels::LevelRotation;
use crate::builder::social::SocialLobbyCreator;
use crate::config::RuntimeConfig;
use crate::external::audit::AuditSink;
use crate::external::guild::GuildAuthClient;
use crate::external::ip_quality::IpQualityClient;
use crate::external::store::Store;
use crate::finder::party::PartyRegistry;
use crate::identity::Symbol;
use crate::lobby::LobbyRegistry;
use crate::matchmaker::queue::MatchmakerQueue;
use crate::presence::registry::StreamRegistry;
use crate::registry::GameServerRegistry;
use crate::session::SessionRegistry;

/// Modes this deployment allows into matchmaking (spec.md §4.7 step 2).
/// Resolved once at startup from their textual names rather than
/// hard-coded symbol constants, the same way [`crate::identity::symbol`]
/// hashes any other wire string.
pub struct MatchmakingModes {
    pub arena_public: Symbol,
    pub social_public: Symbol,
    pub combat_public: Symbol,
}

impl Default for MatchmakingModes {
    fn default() -> Self {
        Self {
            arena_public: crate::identity::to_symbol("arena_public"),
            social_public: crate::identity::to_symbol("social_public"),
            combat_public: crate::identity::to_symbol("combat_public"),
        }
    }
}

/// Everything a connection handler, the matchmaker cycle task, or the
/// admin HTTP surface needs. One instance is built at startup and
/// shared behind an `Arc`.
pub struct AppState {
    pub config: RuntimeConfig,
    /// Stable identifier for this process, used as `MatchLabel::node`
    /// and as the presence-tracking node symbol (spec.md §3, §4.9).
    pub node: String,
    /// The external IPv4 address this service advertises to
    /// broadcasters that register without an explicit override
    /// (spec.md §4.4 step 2).
    pub external_ip: Ipv4Addr,
    pub modes: MatchmakingModes,

    pub sessions: SessionRegistry,
    pub game_servers: GameServerRegistry,
    pub lobbies: LobbyRegistry,
    pub streams: StreamRegistry,
    pub parties: PartyRegistry,
    pub matchmaker_queue: MatchmakerQueue,
    pub level_rotation: LevelRotation,
    pub social_lobby_creator: SocialLobbyCreator,

    pub store: Arc<dyn Store>,
    pub guild_auth: Arc<dyn GuildAuthClient>,
    pub audit: Arc<dyn AuditSink>,
    pub ip_quality: Arc<dyn IpQualityClient>,
}

impl AppState {
    /// Builds the process-wide state for local development and tests:
    /// every collaborator is the always-succeeding in-memory double
    /// (spec.md §1: the external collaborators are out of scope, only
    /// the interfaces matter).
    pub fn new_with_dev_collaborators(config: RuntimeConfig, node: String, external_ip: Ipv4Addr, level_pools: std::collections::HashMap<Symbol, Vec<Symbol>>) -> Self {
        Self {
            config,
            node,
            external_ip,
            modes: MatchmakingModes::default(),
            sessions: SessionRegistry::new(),
            game_servers: GameServerRegistry::new(),
            lobbies: LobbyRegistry::new(),
            streams: StreamRegistry::new(),
            parties: PartyRegistry::new(),
            matchmaker_queue: MatchmakerQueue::new(),
            level_rotation: LevelRotation::new(level_pools),
            social_lobby_creator: SocialLobbyCreator::new(),
            store: Arc::new(crate::external::store::InMemoryStore::new()),
            guild_auth: Arc::new(crate::external::guild::AllowAllGuildAuthClient),
            audit: Arc::new(crate::external::audit::NullAuditSink),
            ip_quality: Arc::new(crate::external::ip_quality::AlwaysCleanIpQualityClient),
        }
    }
}
