//! # Message Snapshot
//!
//! Fixed-capacity payload buffer with an explicit length.
//!
//! The buffer is allocated once, at construction. Every later write is a
//! bounded copy into the same storage, so the producer path never touches
//! the allocator. The length is recorded at copy time; nothing scans the
//! buffer for a terminator.

use std::borrow::Cow;
use std::fmt;

/// The most recently captured message payload.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageSnapshot {
    /// Backing storage, `capacity` bytes long.
    data: Box<[u8]>,
    /// Number of valid bytes at the front of `data`.
    len: usize,
}

impl MessageSnapshot {
    /// Creates an empty snapshot able to hold `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "Message capacity must be greater than zero");
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Maximum payload length this snapshot keeps.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of valid payload bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the snapshot holds no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid payload bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Replaces the contents with `payload`, truncated to capacity.
    ///
    /// Returns the number of bytes dropped by truncation.
    #[inline]
    pub fn overwrite(&mut self, payload: &[u8]) -> usize {
        let len = payload.len().min(self.data.len());
        self.data[..len].copy_from_slice(&payload[..len]);
        self.len = len;
        payload.len() - len
    }

    /// Copies another snapshot's payload into this one.
    #[inline]
    pub fn copy_from(&mut self, other: &MessageSnapshot) {
        self.overwrite(other.as_bytes());
    }

    /// Returns up to `max_length` bytes of the payload.
    #[inline]
    #[must_use]
    pub fn read_latest(&self, max_length: usize) -> &[u8] {
        &self.data[..self.len.min(max_length)]
    }

    /// Copies as much of the payload as fits into `buf`.
    ///
    /// Returns the number of bytes written.
    #[inline]
    pub fn read_into(&self, buf: &mut [u8]) -> usize {
        let bytes = self.read_latest(buf.len());
        buf[..bytes.len()].copy_from_slice(bytes);
        bytes.len()
    }

    /// Decodes the payload as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Forgets the payload without releasing storage.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl fmt::Debug for MessageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSnapshot")
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_snapshot_is_empty() {
        let snap = MessageSnapshot::with_capacity(16);
        assert!(snap.is_empty());
        assert_eq!(snap.capacity(), 16);
        assert_eq!(snap.as_bytes(), b"");
    }

    #[test]
    fn test_overwrite_replaces_previous() {
        let mut snap = MessageSnapshot::with_capacity(16);
        snap.overwrite(b"HELLO WORLD");
        snap.overwrite(b"PING");
        assert_eq!(snap.as_bytes(), b"PING");
    }

    #[test]
    fn test_overwrite_truncates_to_capacity() {
        let mut snap = MessageSnapshot::with_capacity(4);
        let dropped = snap.overwrite(b"ABCDEFG");
        assert_eq!(dropped, 3);
        assert_eq!(snap.as_bytes(), b"ABCD");
    }

    #[test]
    fn test_payload_keeps_interior_nul() {
        let mut snap = MessageSnapshot::with_capacity(8);
        snap.overwrite(b"A\0B");
        assert_eq!(snap.len(), 3);
    }

    #[test]
    fn test_read_latest_respects_max_length() {
        let mut snap = MessageSnapshot::with_capacity(8);
        snap.overwrite(b"ABCDEF");
        assert_eq!(snap.read_latest(2), b"AB");
        assert_eq!(snap.read_latest(100), b"ABCDEF");
    }

    #[test]
    fn test_read_into_small_buffer() {
        let mut snap = MessageSnapshot::with_capacity(8);
        snap.overwrite(b"ABCDEF");
        let mut buf = [0u8; 3];
        assert_eq!(snap.read_into(&mut buf), 3);
        assert_eq!(&buf, b"ABC");
    }

    #[test]
    fn test_copy_from_smaller_target_truncates() {
        let mut src = MessageSnapshot::with_capacity(8);
        src.overwrite(b"ABCDEFGH");
        let mut dst = MessageSnapshot::with_capacity(4);
        dst.copy_from(&src);
        assert_eq!(dst.as_bytes(), b"ABCD");
    }

    #[test]
    #[should_panic(expected = "Message capacity must be greater than zero")]
    fn test_zero_capacity_panics() {
        let _ = MessageSnapshot::with_capacity(0);
    }
}
