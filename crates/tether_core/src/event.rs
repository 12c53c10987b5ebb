//! # Event Kinds
//!
//! The three kinds of event the mailbox can hold, and the set type that
//! records which of them are pending.
//!
//! ## Dispatch Order
//!
//! ```text
//! Status ──▶ Message ──▶ Disable
//! ```
//!
//! The order is fixed. It does not depend on the order in which producers
//! raised the events between two drains.

use std::fmt;

/// A kind of event carried through the mailbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    /// The driver reported a new status value.
    Status = 0b001,
    /// The driver captured a new message payload.
    Message = 0b010,
    /// Some thread asked the consumer to wake up and stop.
    Disable = 0b100,
}

impl EventKind {
    /// All kinds, in dispatch order.
    pub const DISPATCH_ORDER: [EventKind; 3] =
        [EventKind::Status, EventKind::Message, EventKind::Disable];

    /// Returns the bit this kind occupies in a [`PendingEventSet`].
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Returns true if this kind carries a payload snapshot.
    #[inline]
    #[must_use]
    pub const fn carries_payload(self) -> bool {
        !matches!(self, EventKind::Disable)
    }
}

/// Set of pending event kinds.
///
/// At most three members. Iteration always yields members in
/// [`EventKind::DISPATCH_ORDER`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PendingEventSet {
    bits: u8,
}

impl PendingEventSet {
    /// The empty set.
    pub const EMPTY: Self = Self { bits: 0 };

    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Adds a kind. Returns true if it was already present.
    #[inline]
    pub fn insert(&mut self, kind: EventKind) -> bool {
        let present = self.contains(kind);
        self.bits |= kind.bit();
        present
    }

    /// Returns true if the kind is in the set.
    #[inline]
    #[must_use]
    pub const fn contains(&self, kind: EventKind) -> bool {
        self.bits & kind.bit() != 0
    }

    /// Returns true if no kind is pending.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of pending kinds.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Moves the contents out, leaving the set empty.
    #[inline]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Iterates the pending kinds in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = EventKind> {
        let set = *self;
        EventKind::DISPATCH_ORDER
            .into_iter()
            .filter(move |kind| set.contains(*kind))
    }
}

impl FromIterator<EventKind> for PendingEventSet {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        let mut set = Self::new();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl fmt::Debug for PendingEventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A status value reported by the driver.
///
/// The bridge does not interpret the value; its meaning belongs to the
/// surrounding system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    /// Returns the raw status code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Self(code)
    }
}
