//! Identity primitives (spec.md §4.2, component C2): platform-qualified
//! account IDs and the symbol hashing scheme used throughout the wire
//! protocol and the rest of the core.

pub mod account_id;
pub mod platform;
pub mod symbol;

pub use account_id::AccountId;
pub use platform::Platform;
pub use symbol::{to_symbol, Symbol};
