//! Platform enumeration and the account-ID platform abbreviations from
//! spec.md §6.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The platform an account originates from, packed into the high nibble
/// of byte 0 of the binary [`super::account_id::AccountId`] form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Platform {
    Unknown = 0x0,
    Steam = 0x1,
    Playstation = 0x2,
    Xbox = 0x3,
    OculusOrg = 0x4,
    OculusDeprecated = 0x5,
    Bot = 0x6,
    Demo = 0x7,
    Tencent = 0x8,
}

impl Platform {
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Platform::Unknown => "UNK",
            Platform::Steam => "STM",
            Platform::Playstation => "PSN",
            Platform::Xbox => "XBX",
            Platform::OculusOrg => "OVR-ORG",
            Platform::OculusDeprecated => "OVR",
            Platform::Bot => "BOT",
            Platform::Demo => "DMO",
            Platform::Tencent => "TEN",
        }
    }

    pub const fn from_nibble(nibble: u8) -> Self {
        match nibble & 0xF {
            0x1 => Platform::Steam,
            0x2 => Platform::Playstation,
            0x3 => Platform::Xbox,
            0x4 => Platform::OculusOrg,
            0x5 => Platform::OculusDeprecated,
            0x6 => Platform::Bot,
            0x7 => Platform::Demo,
            0x8 => Platform::Tencent,
            _ => Platform::Unknown,
        }
    }

    pub fn from_abbreviation(s: &str) -> Result<Self, PlatformParseError> {
        // OVR-ORG must be matched before OVR since it shares the prefix.
        Ok(match s {
            "UNK" => Platform::Unknown,
            "STM" => Platform::Steam,
            "PSN" => Platform::Playstation,
            "XBX" => Platform::Xbox,
            "OVR-ORG" => Platform::OculusOrg,
            "OVR" => Platform::OculusDeprecated,
            "BOT" => Platform::Bot,
            "DMO" => Platform::Demo,
            "TEN" => Platform::Tencent,
            other => return Err(PlatformParseError::Unknown(other.to_string())),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

#[derive(Debug, Error)]
pub enum PlatformParseError {
    #[error("unknown platform abbreviation: {0}")]
    Unknown(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_abbreviation_roundtrip() {
        for platform in [
            Platform::Unknown,
            Platform::Steam,
            Platform::Playstation,
            Platform::Xbox,
            Platform::OculusOrg,
            Platform::OculusDeprecated,
            Platform::Bot,
            Platform::Demo,
            Platform::Tencent,
        ] {
            let abbr = platform.abbreviation();
            let parsed = Platform::from_abbreviation(abbr).unwrap();
            assert_eq!(parsed, platform);
        }
    }

    #[test]
    fn test_ovr_org_not_confused_with_ovr() {
        assert_eq!(
            Platform::from_abbreviation("OVR-ORG").unwrap(),
            Platform::OculusOrg
        );
        assert_eq!(
            Platform::from_abbreviation("OVR").unwrap(),
            Platform::OculusDeprecated
        );
    }
}
