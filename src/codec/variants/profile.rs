//! Profile message category (spec.md §6). Profile payloads are opaque
//! JSON blobs from the core's point of view — their schema is owned by
//! the client/game, not by the relay.

use serde_json::Value;
use uuid::Uuid;

use crate::codec::stream::{Reader, Writer};
use crate::codec::CodecError;

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedInUserProfileRequest {
    pub session_id: Uuid,
}

impl LoggedInUserProfileRequest {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.session_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            session_id: r.read_guid()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedInUserProfileSuccess {
    pub profile: Value,
}

impl LoggedInUserProfileSuccess {
    pub fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.write_json(&self.profile, true)
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            profile: r.read_json()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedInUserProfileFailure {
    pub reason: String,
}

impl LoggedInUserProfileFailure {
    pub fn encode(&self, w: &mut Writer) {
        w.write_cstring(&self.reason);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            reason: r.read_cstring()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateClientProfile {
    pub profile: Value,
}

impl UpdateClientProfile {
    pub fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.write_json(&self.profile, true)
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            profile: r.read_json()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtherUserProfileRequest {
    pub account_id: String,
}

impl OtherUserProfileRequest {
    pub fn encode(&self, w: &mut Writer) {
        w.write_cstring(&self.account_id);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            account_id: r.read_cstring()?,
        })
    }
}
