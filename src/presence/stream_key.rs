//! Stream identity (spec.md §4.3): the `(mode, subject, subcontext, label)`
//! key that names a logical channel.

use uuid::Uuid;

use crate::identity::Symbol;

/// Names which logical channel family a [`StreamKey`] belongs to. Kept
/// as a symbol (rather than a closed enum) so new stream modes can be
/// introduced by callers without touching this module, matching the
/// open-ended "mode" field spec.md §4.3 describes.
pub type StreamMode = Symbol;

/// A `(mode, subject, subcontext, label)` tuple identifying a stream.
/// `subcontext` distinguishes multiple streams sharing the same subject
/// (e.g. a game server's service-bound stream vs its match-label
/// stream); `label` further distinguishes service aliases such as
/// session ID vs login-session ID vs account UUID (spec.md §4.9 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub mode: StreamMode,
    pub subject: Uuid,
    pub subcontext: Symbol,
    pub label: Symbol,
}

impl StreamKey {
    pub fn new(mode: StreamMode, subject: Uuid, subcontext: Symbol, label: Symbol) -> Self {
        Self {
            mode,
            subject,
            subcontext,
            label,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::to_symbol;

    #[test]
    fn test_stream_keys_with_different_labels_are_distinct() {
        let subject = Uuid::new_v4();
        let a = StreamKey::new(to_symbol("service"), subject, to_symbol("match"), to_symbol("session"));
        let b = StreamKey::new(to_symbol("service"), subject, to_symbol("match"), to_symbol("account"));
        assert_ne!(a, b);
    }
}
