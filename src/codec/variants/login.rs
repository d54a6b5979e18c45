//! Login message category (spec.md §6).

use crate::codec::stream::{Reader, Writer};
use crate::codec::CodecError;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct LoginRequest {
    pub xpid: String,
    pub login_blob: Vec<u8>,
}

impl LoginRequest {
    pub fn encode(&self, w: &mut Writer) {
        w.write_cstring(&self.xpid);
        w.write_bytes(&self.login_blob);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            xpid: r.read_cstring()?,
            login_blob: r.read_bytes()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginSuccess {
    pub session_id: Uuid,
    pub xpid: String,
}

impl LoginSuccess {
    pub fn encode(&self, w: &mut Writer) {
        w.write_guid(self.session_id);
        w.write_cstring(&self.xpid);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            session_id: r.read_guid()?,
            xpid: r.read_cstring()?,
        })
    }
}

/// Login failure message. The human-readable message is truncated at
/// 160 characters, per spec.md §6.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginFailure {
    pub xpid: String,
    pub http_status: u16,
    pub message: String,
}

impl LoginFailure {
    pub const MESSAGE_MAX_LEN: usize = 160;

    pub fn new(xpid: String, http_status: u16, message: impl Into<String>) -> Self {
        let mut message: String = message.into();
        if message.len() > Self::MESSAGE_MAX_LEN {
            message.truncate(Self::MESSAGE_MAX_LEN);
        }
        Self {
            xpid,
            http_status,
            message,
        }
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_cstring(&self.xpid);
        w.write_u16(self.http_status);
        w.write_bounded_string(&self.message, Self::MESSAGE_MAX_LEN);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            xpid: r.read_cstring()?,
            http_status: r.read_u16()?,
            message: r.read_bounded_string()?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::stream::{Reader, Writer};

    #[test]
    fn test_login_failure_truncates_message() {
        let failure = LoginFailure::new("OVR-1".into(), 403, "x".repeat(500));
        assert_eq!(failure.message.len(), LoginFailure::MESSAGE_MAX_LEN);

        let mut w = Writer::new();
        failure.encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let decoded = LoginFailure::decode(&mut r).unwrap();
        assert_eq!(decoded, failure);
    }
}
