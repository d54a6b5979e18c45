//! Platform-qualified account identifiers (spec.md §3, §4.2).
//!
//! Textual form: `"<PLATFORM_ABBR>-<uint64>"`. Binary form: exactly 16
//! bytes, platform in the high nibble of byte 0, user type in bits 2-3
//! of byte 0, and the account number big-endian in the remaining bytes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::platform::{Platform, PlatformParseError};

/// Namespace used to derive a stable UUID from an account's textual
/// form. Arbitrary but fixed for the lifetime of the service.
const ACCOUNT_UUID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0xa7, 0xb8, 0x14, 0x9d, 0xad, 0x11, 0xd1, 0x80, 0xb4, 0x00, 0xc0, 0x4f, 0xd4, 0x30, 0xc8,
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum UserType {
    Standard = 0,
    Guest = 1,
    Service = 2,
    Moderator = 3,
}

impl UserType {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => UserType::Standard,
            1 => UserType::Guest,
            2 => UserType::Service,
            _ => UserType::Moderator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId {
    pub platform: Platform,
    pub user_type: UserType,
    pub account_number: u64,
}

impl AccountId {
    pub fn new(platform: Platform, user_type: UserType, account_number: u64) -> Self {
        Self {
            platform,
            user_type,
            account_number,
        }
    }

    /// Formats the textual form, `"<PLATFORM>-<number>"`.
    pub fn format_text(&self) -> String {
        format!("{}-{}", self.platform, self.account_number)
    }

    /// Parses the textual form produced by [`AccountId::format_text`].
    pub fn parse_text(s: &str) -> Result<Self, AccountIdParseError> {
        let (platform_str, number_str) = s
            .rsplit_once('-')
            .ok_or(AccountIdParseError::MalformedText)?;

        let platform = Platform::from_abbreviation(platform_str)?;
        let account_number: u64 = number_str
            .parse()
            .map_err(|_| AccountIdParseError::MalformedText)?;

        Ok(Self {
            platform,
            // Textual form carries no user-type information; standard
            // accounts are the overwhelming common case.
            user_type: UserType::Standard,
            account_number,
        })
    }

    /// Encodes the 16-byte binary form. Never fails.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        let platform_nibble = (self.platform as u8) << 4;
        let user_type_bits = (self.user_type as u8 & 0b11) << 2;
        out[0] = platform_nibble | user_type_bits;
        out[8..16].copy_from_slice(&self.account_number.to_be_bytes());
        out
    }

    /// Decodes the 16-byte binary form. Fails only on short input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AccountIdParseError> {
        if bytes.len() < 16 {
            return Err(AccountIdParseError::ShortInput);
        }
        let platform = Platform::from_nibble(bytes[0] >> 4);
        let user_type = UserType::from_bits(bytes[0] >> 2);
        let mut number_bytes = [0u8; 8];
        number_bytes.copy_from_slice(&bytes[8..16]);
        let account_number = u64::from_be_bytes(number_bytes);

        Ok(Self {
            platform,
            user_type,
            account_number,
        })
    }

    /// A stable, opaque UUID derived by namespaced hashing of the
    /// textual form. Used as a presence-stream subject so observers can
    /// key on identity without caring about platform/account-number
    /// plumbing.
    pub fn derived_uuid(&self) -> Uuid {
        Uuid::new_v5(&ACCOUNT_UUID_NAMESPACE, self.format_text().as_bytes())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_text())
    }
}

#[derive(Debug, Error)]
pub enum AccountIdParseError {
    #[error("malformed account id text")]
    MalformedText,
    #[error("input too short for binary account id")]
    ShortInput,
    #[error(transparent)]
    Platform(#[from] PlatformParseError),
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> AccountId {
        AccountId::new(Platform::OculusOrg, UserType::Standard, 3_963_667_097_037_078)
    }

    #[test]
    fn test_text_roundtrip() {
        let id = sample();
        let text = id.format_text();
        assert_eq!(text, "OVR-ORG-3963667097037078");
        let parsed = AccountId::parse_text(&text).unwrap();
        assert_eq!(parsed.platform, id.platform);
        assert_eq!(parsed.account_number, id.account_number);
    }

    #[test]
    fn test_binary_roundtrip() {
        let id = sample();
        let bytes = id.to_bytes();
        assert_eq!(bytes.len(), 16);
        let parsed = AccountId::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_binary_always_sixteen_bytes() {
        let id = AccountId::new(Platform::Steam, UserType::Guest, 0);
        assert_eq!(id.to_bytes().len(), 16);
    }

    #[test]
    fn test_binary_decode_fails_on_short_input() {
        let short = [0u8; 8];
        assert!(matches!(
            AccountId::from_bytes(&short),
            Err(AccountIdParseError::ShortInput)
        ));
    }

    #[test]
    fn test_derived_uuid_is_stable() {
        let id = sample();
        assert_eq!(id.derived_uuid(), id.derived_uuid());
    }
}
