//! Session identifier type.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TermhubError;

/// Unique identifier for a terminal session.
///
/// Wraps a `u64`. The text form is lowercase hexadecimal without padding,
/// and [`SessionId::parse`] is its inverse. Ordering follows the integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a SessionId from a raw u64 value.
    pub const fn of(value: u64) -> Self {
        Self(value)
    }

    /// Parse hexadecimal text, either case, into a SessionId.
    pub fn parse(text: &str) -> crate::Result<Self> {
        if text.is_empty() {
            return Err(TermhubError::InvalidFormat("empty session id".into()));
        }
        // from_str_radix tolerates a leading '+', hex text never has one
        if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TermhubError::InvalidFormat(format!(
                "invalid session id {text:?}"
            )));
        }
        u64::from_str_radix(text, 16)
            .map(SessionId)
            .map_err(|e| TermhubError::InvalidFormat(format!("invalid session id {text:?}: {e}")))
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = TermhubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for SessionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Supplies the ids a registry hands to session factories.
pub trait IdSource: Send + Sync {
    /// Produce the next id.
    fn next_id(&self) -> SessionId;
}

impl<F> IdSource for F
where
    F: Fn() -> SessionId + Send + Sync,
{
    fn next_id(&self) -> SessionId {
        self()
    }
}

/// Counter-backed id source, unique within the lifetime of one instance.
#[derive(Debug)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl SequentialIds {
    /// Start counting at 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start counting at `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> SessionId {
        SessionId(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uniqueness() {
        let ids = SequentialIds::new();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = ids.next_id();
            assert!(seen.insert(id), "Duplicate ID generated: {}", id);
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn test_display_format() {
        assert_eq!(SessionId::of(255).to_string(), "ff");
        assert_eq!(SessionId::of(0x12345678).to_string(), "12345678");
        assert_eq!(SessionId::of(0).to_string(), "0");
        assert_eq!(SessionId::of(u64::MAX).to_string(), "ffffffffffffffff");
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(SessionId::parse("ff").unwrap().as_u64(), 255);
        assert_eq!(SessionId::parse("00ff").unwrap().as_u64(), 255);
        assert_eq!(SessionId::parse("ABCdef").unwrap().as_u64(), 0xabcdef);

        let id: SessionId = "12345678".parse().unwrap();
        assert_eq!(id, SessionId::of(0x12345678));
    }

    #[test]
    fn test_parse_invalid() {
        for text in ["", "xyz", "sess-ff", "+ff", "-1", "ff ", "10000000000000000"] {
            let err = SessionId::parse(text).unwrap_err();
            assert!(
                matches!(err, TermhubError::InvalidFormat(_)),
                "{text:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_normalizes_case_and_padding() {
        for (text, canonical) in [("0A", "a"), ("000", "0"), ("DeadBeef", "deadbeef")] {
            assert_eq!(SessionId::parse(text).unwrap().to_string(), canonical);
        }
    }

    #[test]
    fn test_ordering_by_value() {
        let mut ids = vec![SessionId::of(16), SessionId::of(2), SessionId::of(0xa)];
        ids.sort();
        assert_eq!(ids, vec![SessionId::of(2), SessionId::of(0xa), SessionId::of(16)]);
    }

    #[test]
    fn test_closure_id_source() {
        let source = || SessionId::of(7);
        assert_eq!(source.next_id(), SessionId::of(7));
    }

    #[test]
    fn test_sequential_starting_at() {
        let ids = SequentialIds::starting_at(0x10);
        assert_eq!(ids.next_id().to_string(), "10");
        assert_eq!(ids.next_id().to_string(), "11");
    }
}
