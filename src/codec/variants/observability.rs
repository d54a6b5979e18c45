//! Observability message category (spec.md §6): remote client logging.

use crate::codec::stream::{Reader, Writer};
use crate::codec::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 1,
    Info = 2,
    Warning = 4,
    Error = 8,
    Default = 14,
    Any = 15,
}

impl LogLevel {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            4 => LogLevel::Warning,
            8 => LogLevel::Error,
            14 => LogLevel::Default,
            _ => LogLevel::Any,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteLogSet {
    pub xpid: String,
    pub opaque: [u64; 4],
    pub level: LogLevel,
    pub strings: Vec<String>,
}

impl RemoteLogSet {
    pub fn encode(&self, w: &mut Writer) {
        w.write_cstring(&self.xpid);
        for value in self.opaque {
            w.write_u64(value);
        }
        w.write_u8(self.level as u8);
        w.write_string_table(&self.strings);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let xpid = r.read_cstring()?;
        let mut opaque = [0u64; 4];
        for slot in opaque.iter_mut() {
            *slot = r.read_u64()?;
        }
        let level = LogLevel::from_u8(r.read_u8()?);
        let strings = r.read_string_table()?;
        Ok(Self {
            xpid,
            opaque,
            level,
            strings,
        })
    }
}
