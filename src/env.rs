//! Typed environment variable accessors (SPEC_FULL §1), grounded in the
//! teacher's `env.rs` `(key, default)` pair idiom, prefixed for this
//! crate instead of `PR_`.

use log::LevelFilter;
use std::net::IpAddr;
use std::str::FromStr;

pub const LOG_LEVEL: (&str, LevelFilter) = ("ECHELON_LOG_LEVEL", LevelFilter::Info);
pub const LOGGING_DIR: (&str, &str) = ("ECHELON_LOGGING_DIR", "data/logs");
pub const EXT_HOST: (&str, &str) = ("ECHELON_EXT_HOST", "relay.local");
pub const MAIN_PORT: (&str, u16) = ("ECHELON_MAIN_PORT", 42127);
pub const ADMIN_PORT: (&str, u16) = ("ECHELON_ADMIN_PORT", 8080);
pub const DISABLE_ARENA_BACKFILL: (&str, bool) = ("ECHELON_DISABLE_ARENA_BACKFILL", false);

pub fn logging_level() -> LevelFilter {
    std::env::var(LOG_LEVEL.0).map_or(LOG_LEVEL.1, |value| {
        LevelFilter::from_str(&value).unwrap_or(LOG_LEVEL.1)
    })
}

#[inline]
pub fn str_env(pair: (&str, &str)) -> String {
    std::env::var(pair.0).unwrap_or_else(|_| pair.1.to_string())
}

#[inline]
pub fn u16_env(pair: (&str, u16)) -> u16 {
    std::env::var(pair.0).map_or(pair.1, |value| value.parse::<u16>().unwrap_or(pair.1))
}

#[inline]
pub fn bool_env(pair: (&str, bool)) -> bool {
    std::env::var(pair.0).map_or(pair.1, |value| value.to_lowercase().parse::<bool>().unwrap_or(pair.1))
}

#[inline]
pub fn ip_env(pair: (&str, IpAddr)) -> IpAddr {
    std::env::var(pair.0).map_or(pair.1, |value| value.parse::<IpAddr>().unwrap_or(pair.1))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_u16_env_falls_back_on_missing_var() {
        std::env::remove_var("ECHELON_TEST_MISSING_U16");
        assert_eq!(u16_env(("ECHELON_TEST_MISSING_U16", 7)), 7);
    }

    #[test]
    fn test_bool_env_parses_case_insensitively() {
        std::env::set_var("ECHELON_TEST_BOOL", "TRUE");
        assert!(bool_env(("ECHELON_TEST_BOOL", false)));
        std::env::remove_var("ECHELON_TEST_BOOL");
    }
}
