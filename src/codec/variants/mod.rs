//! Message payload structs grouped by the catalogue categories named in
//! spec.md §6. Each category module defines its structs plus an
//! `encode`/`decode` pair used by [`super::message`]'s dispatch table.

pub mod config_doc;
pub mod game_server;
pub mod legacy;
pub mod lobby_client;
pub mod lobby_service;
pub mod login;
pub mod observability;
pub mod profile;

use crate::codec::stream::{Reader, Writer};
use crate::codec::CodecError;

/// A join-intent entry as carried in a lobby find/create/join request:
/// the account to seat and an optional explicit role hint (`-1` means
/// "let the lobby assign one", per spec.md §4.5 role assignment rules).
#[derive(Debug, Clone, PartialEq)]
pub struct EntrantRequest {
    pub account_id: String,
    pub role: i32,
}

impl EntrantRequest {
    pub fn encode(&self, w: &mut Writer) {
        w.write_cstring(&self.account_id);
        w.write_i32(self.role);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            account_id: r.read_cstring()?,
            role: r.read_i32()?,
        })
    }

    pub fn encode_list(values: &[EntrantRequest], w: &mut Writer) {
        w.write_u32(values.len() as u32);
        for value in values {
            value.encode(w);
        }
    }

    pub fn decode_list(r: &mut Reader) -> Result<Vec<EntrantRequest>, CodecError> {
        let count = r.read_u32()? as usize;
        let mut out = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            out.push(EntrantRequest::decode(r)?);
        }
        Ok(out)
    }
}
