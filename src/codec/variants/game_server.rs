//! Game server (broadcaster) message category (spec.md §6, §4.4).

use uuid::Uuid;

use crate::codec::stream::{Reader, Writer};
use crate::codec::CodecError;
use crate::identity::Symbol;

#[derive(Debug, Clone, PartialEq)]
pub struct GameServerRegistrationRequest {
    pub internal_ip: u32,
    pub external_ip_override: Option<u32>,
    pub port: u16,
    pub group_ids: Vec<String>,
    pub regions: Vec<Symbol>,
}

impl GameServerRegistrationRequest {
    pub fn encode(&self, w: &mut Writer) {
        w.write_u32(self.internal_ip);
        w.write_bool(self.external_ip_override.is_some());
        w.write_u32(self.external_ip_override.unwrap_or(0));
        w.write_u16(self.port);
        w.write_u32(self.group_ids.len() as u32);
        for group_id in &self.group_ids {
            w.write_cstring(group_id);
        }
        w.write_u32(self.regions.len() as u32);
        for region in &self.regions {
            w.write_symbol(*region);
        }
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let internal_ip = r.read_u32()?;
        let has_override = r.read_bool()?;
        let raw_override = r.read_u32()?;
        let external_ip_override = has_override.then_some(raw_override);
        let port = r.read_u16()?;
        let group_count = r.read_u32()? as usize;
        let mut group_ids = Vec::with_capacity(group_count.min(64));
        for _ in 0..group_count {
            group_ids.push(r.read_cstring()?);
        }
        let region_count = r.read_u32()? as usize;
        let mut regions = Vec::with_capacity(region_count.min(64));
        for _ in 0..region_count {
            regions.push(r.read_symbol()?);
        }
        Ok(Self {
            internal_ip,
            external_ip_override,
            port,
            group_ids,
            regions,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameServerRegistrationSuccess {
    pub session_id: Uuid,
    pub server_id: u64,
}

impl GameServerRegistrationSuccess {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.session_id);
        w.write_u64(self.server_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            session_id: r.read_guid()?,
            server_id: r.read_u64()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameServerRegistrationFailure {
    pub reason: String,
}

impl GameServerRegistrationFailure {
    pub fn encode(&self, w: &mut Writer) {
        w.write_cstring(&self.reason);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            reason: r.read_cstring()?,
        })
    }
}

/// Instructs a prepared server to load its level and begin accepting
/// the named entrants (spec.md §4.5 tick rule, emitted when
/// `startTime <= now` and the level has not yet loaded).
#[derive(Debug, Clone, PartialEq)]
pub struct GameServerSessionStart {
    pub match_id: Uuid,
    pub group_id: String,
    pub max_size: u32,
    pub lobby_type: u8,
    pub app_id: String,
    pub mode: Symbol,
    pub level: Symbol,
    pub required_features: Vec<String>,
    pub entrant_ids: Vec<Uuid>,
}

impl GameServerSessionStart {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.match_id);
        w.write_cstring(&self.group_id);
        w.write_u32(self.max_size);
        w.write_u8(self.lobby_type);
        w.write_cstring(&self.app_id);
        w.write_symbol(self.mode);
        w.write_symbol(self.level);
        w.write_string_table(&self.required_features);
        w.write_u32(self.entrant_ids.len() as u32);
        for entrant_id in &self.entrant_ids {
            w.write_guid(*entrant_id);
        }
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let match_id = r.read_guid()?;
        let group_id = r.read_cstring()?;
        let max_size = r.read_u32()?;
        let lobby_type = r.read_u8()?;
        let app_id = r.read_cstring()?;
        let mode = r.read_symbol()?;
        let level = r.read_symbol()?;
        let required_features = r.read_string_table()?;
        let count = r.read_u32()? as usize;
        let mut entrant_ids = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            entrant_ids.push(r.read_guid()?);
        }
        Ok(Self {
            match_id,
            group_id,
            max_size,
            lobby_type,
            app_id,
            mode,
            level,
            required_features,
            entrant_ids,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BroadcasterSessionStarted {
    pub match_id: Uuid,
}

impl BroadcasterSessionStarted {
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
pub struct BroadcasterSessionEnded {
    pub match_id: Uuid,
}

impl BroadcasterSessionEnded {
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
pub struct GameServerJoinAttempt {
    pub match_id: Uuid,
    pub entrant_id: Uuid,
}

impl GameServerJoinAttempt {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.match_id);
        w.write_guid(self.entrant_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            match_id: r.read_guid()?,
            entrant_id: r.read_guid()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameServerEntrantRejected {
    pub entrant_id: Uuid,
    pub reason: u16,
}

impl GameServerEntrantRejected {
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
pub struct GameServerPlayerRemoved {
    pub entrant_id: Uuid,
}

impl GameServerPlayerRemoved {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.entrant_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            entrant_id: r.read_guid()?,
        })
    }
}
