//! Presence & streams (spec.md §4.3, component C3).

pub mod registry;
pub mod stream_key;

pub use registry::{Presence, PresenceMeta, StreamRegistry};
pub use stream_key::{StreamKey, StreamMode};
