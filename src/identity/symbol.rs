//! 64-bit case-insensitive string symbols.
//!
//! A [`Symbol`] is the compact identifier used everywhere a mode, level,
//! region, or wire message type needs a stable, hashable tag. The same
//! string always hashes to the same value regardless of case, and a
//! `0x`-prefixed 16 hex-digit literal is parsed as the value directly
//! rather than hashed, which lets wire constants round-trip through their
//! textual form without drift.

use std::fmt;
use std::sync::RwLock;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Fixed 256-entry substitution table used to fold each input byte into
/// the accumulator. Values are arbitrary but must never change once
/// shipped, since every symbol derived from a string depends on them.
const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0usize;
    // A fixed, reproducible pseudo-random permutation seeded from a
    // simple LCG so the table is generated once at compile time instead
    // of checked in as an opaque 256-entry literal.
    let mut seed: u32 = 0x9E3779B9;
    while i < 256 {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        table[i] = (seed >> 24) as u8;
        i += 1;
    }
    table
}

/// A 64-bit, case-insensitive string symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub u64);

impl Symbol {
    pub const NIL: Symbol = Symbol(0);

    /// Hashes a string into a [`Symbol`], or parses it directly if it is
    /// a `0x`-prefixed 16 hex digit literal.
    pub fn new(s: &str) -> Self {
        if let Some(value) = parse_hex_literal(s) {
            return Symbol(value);
        }
        Symbol(hash_str(s))
    }

    pub fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match SYMBOL_CACHE.reverse_lookup(*self) {
            Some(name) => f.write_str(&name),
            None => write!(f, "0x{:016x}", self.0),
        }
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::new(&s)
    }
}

fn parse_hex_literal(s: &str) -> Option<u64> {
    let rest = s.strip_prefix("0x")?;
    if rest.len() != 16 {
        return None;
    }
    u64::from_str_radix(rest, 16).ok()
}

fn hash_str(s: &str) -> u64 {
    if s.is_empty() {
        return 0;
    }

    let mut acc: u64 = 0xFFFF_FFFF_FFFF_FFFF;
    for byte in s.bytes() {
        let lower = byte.to_ascii_lowercase();
        let table_entry = TABLE[((acc >> 56) & 0xFF) as usize] as u64;
        acc = (lower as u64) ^ table_entry ^ (acc << 8);
    }
    acc
}

/// Process-wide cache mapping a [`Symbol`] back to the string it was
/// derived from, so logs and diagnostics can render a human-readable
/// name instead of a raw hex value. Populated lazily as strings are
/// hashed; never removed from, since symbols are immutable for the life
/// of the process.
pub struct SymbolCache {
    reverse: RwLock<HashMap<u64, String>>,
}

impl SymbolCache {
    const fn new() -> Self {
        Self {
            reverse: RwLock::new(HashMap::new()),
        }
    }

    /// Hashes `s`, registering it in the reverse cache, and returns the
    /// resulting symbol.
    pub fn intern(&self, s: &str) -> Symbol {
        let symbol = Symbol::new(s);
        if parse_hex_literal(s).is_none() {
            self.reverse.write().unwrap().insert(symbol.0, s.to_string());
        }
        symbol
    }

    pub fn reverse_lookup(&self, symbol: Symbol) -> Option<String> {
        self.reverse.read().unwrap().get(&symbol.0).cloned()
    }
}

/// The process-wide symbol reverse cache. Safe to read concurrently;
/// writes only ever add entries, never mutate existing ones.
pub static SYMBOL_CACHE: SymbolCache = SymbolCache::new();

/// Interns `s` and returns its [`Symbol`], registering the reverse
/// mapping for later display.
pub fn to_symbol(s: &str) -> Symbol {
    SYMBOL_CACHE.intern(s)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_case_insensitive() {
        let a = to_symbol("ECHO_ARENA_PUBLIC");
        let b = to_symbol("echo_arena_public");
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_string_is_nil() {
        assert_eq!(to_symbol(""), Symbol::NIL);
    }

    #[test]
    fn test_hex_literal_roundtrip() {
        let s = to_symbol("some_mode_name");
        let text = format!("0x{:016x}", s.0);
        let parsed = Symbol::new(&text);
        assert_eq!(parsed, s);
    }

    #[test]
    fn test_reverse_lookup_renders_name() {
        let s = to_symbol("combat_public");
        assert_eq!(s.to_string(), "combat_public");
    }

    #[test]
    fn test_unknown_symbol_renders_hex() {
        let s = Symbol(0xDEAD_BEEF_0000_0001);
        assert_eq!(s.to_string(), "0xdeadbeef00000001");
    }
}
