//! Lobby client→service message category (spec.md §6).

use serde_json::Value;
use uuid::Uuid;

use crate::codec::stream::{Reader, Writer};
use crate::codec::variants::EntrantRequest;
use crate::codec::CodecError;
use crate::identity::Symbol;

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyFindSessionRequest {
    pub mode: Symbol,
    pub version_lock: u64,
    pub group_id: String,
    pub session_settings: Value,
}

impl LobbyFindSessionRequest {
    pub fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.write_symbol(self.mode);
        w.write_u64(self.version_lock);
        w.write_cstring(&self.group_id);
        w.write_json(&self.session_settings, false)
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            mode: r.read_symbol()?,
            version_lock: r.read_u64()?,
            group_id: r.read_cstring()?,
            session_settings: r.read_json()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyCreateSessionRequest {
    pub mode: Symbol,
    pub level: Symbol,
    pub lobby_type: u8,
    pub group_id: String,
    pub session_settings: Value,
}

impl LobbyCreateSessionRequest {
    pub fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.write_symbol(self.mode);
        w.write_symbol(self.level);
        w.write_u8(self.lobby_type);
        w.write_cstring(&self.group_id);
        w.write_json(&self.session_settings, false)
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            mode: r.read_symbol()?,
            level: r.read_symbol()?,
            lobby_type: r.read_u8()?,
            group_id: r.read_cstring()?,
            session_settings: r.read_json()?,
        })
    }
}

/// A client's request to join a specific, already-known match. This is
/// the message decoded in spec.md §8 end-to-end scenario 1.
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyJoinSessionRequest {
    pub lobby_id: Uuid,
    pub version_lock: u64,
    pub platform: String,
    pub login_session: Uuid,
    pub flags: u32,
    pub session_settings: Value,
    pub entrants: Vec<EntrantRequest>,
}

impl LobbyJoinSessionRequest {
    pub fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.write_guid(self.lobby_id);
        w.write_u64(self.version_lock);
        w.write_cstring(&self.platform);
        w.write_guid(self.login_session);
        w.write_u32(self.flags);
        w.write_json(&self.session_settings, false)?;
        EntrantRequest::encode_list(&self.entrants, w);
        Ok(())
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            lobby_id: r.read_guid()?,
            version_lock: r.read_u64()?,
            platform: r.read_cstring()?,
            login_session: r.read_guid()?,
            flags: r.read_u32()?,
            session_settings: r.read_json()?,
            entrants: EntrantRequest::decode_list(r)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyPlayerSessionsRequest {
    pub lobby_id: Uuid,
}

impl LobbyPlayerSessionsRequest {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.lobby_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            lobby_id: r.read_guid()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyMatchmakerStatusRequest {
    pub ticket_id: Uuid,
}

impl LobbyMatchmakerStatusRequest {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.ticket_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            ticket_id: r.read_guid()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyPingResponse {
    pub results: Vec<(String, i32)>,
}

impl LobbyPingResponse {
    pub fn encode(&self, w: &mut Writer) {
        w.write_u32(self.results.len() as u32);
        for (ip, rtt) in &self.results {
            w.write_cstring(ip);
            w.write_i32(*rtt);
        }
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let count = r.read_u32()? as usize;
        let mut results = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            results.push((r.read_cstring()?, r.read_i32()?));
        }
        Ok(Self { results })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyPendingSessionCancel {
    pub ticket_id: Uuid,
}

impl LobbyPendingSessionCancel {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.ticket_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            ticket_id: r.read_guid()?,
        })
    }
}
