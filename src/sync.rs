//! Cross-controller phase synchronization.
//!
//! Several independently-ticked controllers can keep their blink or oscillate
//! phases aligned by sharing a single [`SyncWord`]. The word carries two
//! registers: a membership register recording which participant bits are
//! claimed, and the barrier word itself. At each phase boundary a participant
//! marks its bit in the barrier and holds until every member bit is present,
//! at which point the reserved synced flag releases all of them and the
//! barrier drains back to zero, re-arming itself for the next boundary.
//!
//! This is a cooperative convention for controllers advanced from one
//! non-preemptive execution context, not a mutual-exclusion primitive.

use core::cell::Cell;

/// Bit reserved to signal that all participants have rendezvoused.
const SYNCED_BIT: usize = 1 << (usize::BITS - 1);

/// A caller-owned shared word for the synchronization handshake.
///
/// Create one per group of controllers that should transition in phase and
/// pass a reference to each controller's `attach_sync_handshake`.
#[derive(Debug, Default)]
pub struct SyncWord {
    barrier: Cell<usize>,
    members: Cell<usize>,
}

impl SyncWord {
    /// Creates a cleared sync word.
    pub const fn new() -> Self {
        SyncWord {
            barrier: Cell::new(0),
            members: Cell::new(0),
        }
    }

    /// Current raw barrier value, for inspection in tests and diagnostics.
    pub fn value(&self) -> usize {
        self.barrier.get()
    }

    /// Claim bits of all attached participants.
    pub fn member_bits(&self) -> usize {
        self.members.get()
    }

    fn get(&self) -> usize {
        self.barrier.get()
    }

    fn set(&self, value: usize) {
        self.barrier.set(value);
    }
}

/// One controller's view of the shared handshake word.
#[derive(Debug)]
pub(crate) struct SyncHandshake<'s> {
    word: Option<&'s SyncWord>,
    me_bit: usize,
    check_mask: usize,
}

impl<'s> SyncHandshake<'s> {
    /// A handshake that participates in nothing; `sync_achieved` is always
    /// true.
    pub(crate) fn detached() -> Self {
        Self {
            word: None,
            me_bit: 0,
            check_mask: 0,
        }
    }

    /// Joins the shared word, claiming the first free non-reserved member
    /// bit. Returns the claim bit (0 if no bit was free).
    ///
    /// The first participant to attach passes `is_first` to reset the word.
    pub(crate) fn attach(&mut self, word: &'s SyncWord, is_first: bool) -> usize {
        if is_first {
            word.members.set(0);
            word.barrier.set(0);
        }

        let mut test_pos: usize = 0x1;
        while test_pos != SYNCED_BIT && word.members.get() & test_pos != 0 {
            test_pos <<= 1;
        }
        test_pos &= !SYNCED_BIT;

        self.word = Some(word);
        self.me_bit = test_pos;
        self.check_mask = 0;
        word.members.set(word.members.get() | self.me_bit);

        self.me_bit
    }

    /// Drops this controller's association with the shared word. Its claim
    /// bit is left standing in the barrier as a permanent arrival, so the
    /// remaining participants are not stranded waiting on it.
    pub(crate) fn detach(&mut self) {
        if let Some(word) = self.word {
            word.set(word.get() | self.me_bit);
        }
        self.word = None;
        self.me_bit = 0;
        self.check_mask = 0;
    }

    /// Snapshots the current membership as this participant's rendezvous
    /// set. Call once on each participant after every participant has
    /// attached, before ticking begins; the order of `init` calls does not
    /// matter.
    pub(crate) fn init(&mut self) {
        if let Some(word) = self.word {
            self.check_mask = word.member_bits() & !SYNCED_BIT;
        }
    }

    /// One barrier probe, called at each potential phase transition.
    ///
    /// Marks this participant's bit; once all expected bits are present the
    /// synced flag is raised and each participant, observing it, clears its
    /// own bit and passes. The last one out resets the barrier to zero.
    /// Non-participating handshakes always pass.
    pub(crate) fn sync_achieved(&self) -> bool {
        let (Some(word), me_bit) = (self.word, self.me_bit) else {
            return true;
        };
        if me_bit == 0 {
            return true;
        }

        word.set(word.get() | me_bit);
        if word.get() & self.check_mask == self.check_mask {
            word.set(word.get() | SYNCED_BIT);
        }

        if word.get() & SYNCED_BIT != 0 {
            word.set(word.get() & !me_bit);
            if word.get() & self.check_mask == 0 {
                word.set(0);
            }
            true
        } else {
            false
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.word.is_some()
    }
}
