//! Lobby service→client message category (spec.md §6).

use uuid::Uuid;

use crate::codec::stream::{Reader, Writer};
use crate::codec::CodecError;
use crate::identity::Symbol;
use crate::lobby::role::Role;

/// Connection settings handed to a successfully-joined client or game
/// server (spec.md §4.9 step 6/8). Both `v4` and `v5` wire variants on
/// the original catalogue collapse to this one struct plus a
/// `protocol_version` tag, since the fields they carry are identical in
/// meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct LobbySessionSuccess {
    pub protocol_version: u8,
    pub match_id: Uuid,
    pub internal_ip: u32,
    pub external_ip: u32,
    pub port: u16,
    pub role: Role,
    pub is_pcvr: bool,
}

impl LobbySessionSuccess {
    pub fn encode(&self, w: &mut Writer) {
        w.write_u8(self.protocol_version);
        w.write_guid(self.match_id);
        w.write_u32(self.internal_ip);
        w.write_u32(self.external_ip);
        w.write_u16(self.port);
        w.write_u8(self.role as u8);
        w.write_bool(self.is_pcvr);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            protocol_version: r.read_u8()?,
            match_id: r.read_guid()?,
            internal_ip: r.read_u32()?,
            external_ip: r.read_u32()?,
            port: r.read_u16()?,
            role: Role::from_u8(r.read_u8()?),
            is_pcvr: r.read_bool()?,
        })
    }
}

/// Failure response for a join/find/create attempt, carrying one of
/// the `LobbyErrorCode` surface values (spec.md §7). The `v1..v4`
/// catalogue entries collapse to this struct plus `protocol_version`
/// the same way `LobbySessionSuccess` does.
#[derive(Debug, Clone, PartialEq)]
pub struct LobbySessionFailure {
    pub protocol_version: u8,
    pub mode: Symbol,
    pub group_id: String,
    pub error_code: u16,
}

impl LobbySessionFailure {
    pub fn encode(&self, w: &mut Writer) {
        w.write_u8(self.protocol_version);
        w.write_symbol(self.mode);
        w.write_cstring(&self.group_id);
        w.write_u16(self.error_code);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            protocol_version: r.read_u8()?,
            mode: r.read_symbol()?,
            group_id: r.read_cstring()?,
            error_code: r.read_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyStatusNotify {
    pub match_id: Uuid,
    pub status: String,
}

impl LobbyStatusNotify {
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

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyMatchmakerStatus {
    pub ticket_id: Uuid,
    pub status: u8,
}

impl LobbyMatchmakerStatus {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.ticket_id);
        w.write_u8(self.status);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            ticket_id: r.read_guid()?,
            status: r.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyPingRequest {
    pub targets: Vec<String>,
}

impl LobbyPingRequest {
    pub fn encode(&self, w: &mut Writer) {
        w.write_u32(self.targets.len() as u32);
        for target in &self.targets {
            w.write_cstring(target);
        }
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let count = r.read_u32()? as usize;
        let mut targets = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            targets.push(r.read_cstring()?);
        }
        Ok(Self { targets })
    }
}
