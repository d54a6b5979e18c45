//! Config/EULA/Document message category (spec.md §6).

use serde_json::Value;

use crate::codec::stream::{Reader, Writer};
use crate::codec::CodecError;
use crate::identity::Symbol;

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigRequest {
    pub config_type: Symbol,
}

impl ConfigRequest {
    pub fn encode(&self, w: &mut Writer) {
        w.write_symbol(self.config_type);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            config_type: r.read_symbol()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSuccess {
    pub config_type: Symbol,
    pub data: Value,
}

impl ConfigSuccess {
    pub fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.write_symbol(self.config_type);
        w.write_json(&self.data, false)
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            config_type: r.read_symbol()?,
            data: r.read_json()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRequest {
    pub language: String,
    pub document_type: Symbol,
}

impl DocumentRequest {
    pub fn encode(&self, w: &mut Writer) {
        w.write_cstring(&self.language);
        w.write_symbol(self.document_type);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            language: r.read_cstring()?,
            document_type: r.read_symbol()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSuccess {
    pub document_type: Symbol,
    pub contents: String,
}

impl DocumentSuccess {
    pub fn encode(&self, w: &mut Writer) {
        w.write_symbol(self.document_type);
        w.write_bytes(self.contents.as_bytes());
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let document_type = r.read_symbol()?;
        let bytes = r.read_bytes()?;
        let contents = String::from_utf8(bytes).map_err(|_| CodecError::InvalidPacket)?;
        Ok(Self {
            document_type,
            contents,
        })
    }
}
