//! Legacy message shapes and their V1 canonical targets (spec.md §4.11,
//! §6). Older clients send the legacy shapes below; the pipeline
//! dispatcher (component C11) rewrites them transparently into the V1
//! canonical forms before routing, pulling any field the legacy shape
//! doesn't carry (such as `lobby_session_id`) from the session's bound
//! game server record.

use uuid::Uuid;

use crate::codec::stream::{Reader, Writer};
use crate::codec::CodecError;
use crate::lobby::role::Role;

/// Pre-V1 session-success shape. Lacks the `lobby_session_id` field
/// that `EchoToolsLobbySessionStartV1` carries; legacy rewriting fills
/// it in from the session's bound game server.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyLobbySessionSuccess {
    pub match_id: Uuid,
    pub port: u16,
}

impl LegacyLobbySessionSuccess {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.match_id);
        w.write_u16(self.port);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            match_id: r.read_guid()?,
            port: r.read_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoToolsLobbySessionStartV1 {
    pub match_id: Uuid,
    pub lobby_session_id: Uuid,
    pub port: u16,
}

impl EchoToolsLobbySessionStartV1 {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.match_id);
        w.write_guid(self.lobby_session_id);
        w.write_u16(self.port);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            match_id: r.read_guid()?,
            lobby_session_id: r.read_guid()?,
            port: r.read_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoToolsLobbyEntrantNewV1 {
    pub match_id: Uuid,
    pub entrant_id: Uuid,
    pub role: Role,
}

impl EchoToolsLobbyEntrantNewV1 {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.match_id);
        w.write_guid(self.entrant_id);
        w.write_u8(self.role as u8);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            match_id: r.read_guid()?,
            entrant_id: r.read_guid()?,
            role: Role::from_u8(r.read_u8()?),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoToolsSessionEndedV1 {
    pub match_id: Uuid,
}

impl EchoToolsSessionEndedV1 {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.match_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            match_id: r.read_guid()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoToolsSessionLockV1 {
    pub match_id: Uuid,
}

impl EchoToolsSessionLockV1 {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.match_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            match_id: r.read_guid()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoToolsSessionUnlockV1 {
    pub match_id: Uuid,
}

impl EchoToolsSessionUnlockV1 {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.match_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            match_id: r.read_guid()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoToolsEntrantRejectV1 {
    pub entrant_id: Uuid,
    pub reason: u16,
}

impl EchoToolsEntrantRejectV1 {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.entrant_id);
        w.write_u16(self.reason);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            entrant_id: r.read_guid()?,
            reason: r.read_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoToolsEntrantRemovedV1 {
    pub entrant_id: Uuid,
}

impl EchoToolsEntrantRemovedV1 {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.entrant_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            entrant_id: r.read_guid()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoToolsLobbyStatusV1 {
    pub match_id: Uuid,
    pub status: String,
}

impl EchoToolsLobbyStatusV1 {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.match_id);
        w.write_cstring(&self.status);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            match_id: r.read_guid()?,
            status: r.read_cstring()?,
        })
    }
}
