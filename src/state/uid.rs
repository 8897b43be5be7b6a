//! Identifier generation for connections and rooms.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a room (UUID v4 string, or client supplied on implicit creation).
pub type RoomId = String;

/// Caller-supplied user identifier. Trusted as-is.
pub type UserId = String;

/// Identifier of one live transport connection.
pub type ConnId = String;

/// Generates unique connection IDs.
///
/// Format: prefix + 6 chars base36 counter. Example: "wsAAAAAC".
/// IDs are process-local and never reused during the process lifetime.
pub struct ConnIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl ConnIdGenerator {
    /// Create a new generator with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Generate the next unique connection ID.
    pub fn next(&self) -> ConnId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, base36_encode_6(n))
    }
}

/// Allocate a fresh room identifier.
pub fn new_room_id() -> RoomId {
    uuid::Uuid::new_v4().to_string()
}

/// Encode a number as a 6-character base36 string.
fn base36_encode_6(mut n: u64) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut result = [b'A'; 6];

    for slot in result.iter_mut().rev() {
        *slot = CHARS[(n % 36) as usize];
        n /= 36;
    }

    String::from_utf8_lossy(&result).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_id_generation() {
        let generator = ConnIdGenerator::new("ws");
        assert_eq!(generator.next(), "wsAAAAAA");
        assert_eq!(generator.next(), "wsAAAAAB");
        assert_eq!(generator.next(), "wsAAAAAC");
    }

    #[test]
    fn test_base36_encode() {
        assert_eq!(base36_encode_6(0), "AAAAAA");
        assert_eq!(base36_encode_6(35), "AAAAA9");
        assert_eq!(base36_encode_6(36), "AAAABA");
    }

    #[test]
    fn test_room_ids_are_distinct() {
        let a = new_room_id();
        let b = new_room_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
