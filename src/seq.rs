//! Cyclic sequence-number arithmetic.
//!
//! Sequence numbers live in the fixed cyclic range `[0, seq_space)` and wrap
//! around, so two of them can only be compared through modular distance —
//! never raw subtraction.  [`SeqSpace`] centralises that arithmetic for both
//! engines and validates the configuration at construction time.
//!
//! # Why `seq_space ≥ 2 × window_size`
//!
//! After wraparound a receiver must distinguish a genuinely new packet that
//! reuses a sequence number from a stale retransmission of the old packet
//! that carried the same number.  With a window of `W`, the receiver's window
//! `[expected_base, expected_base + W)` and the just-left-behind range
//! `[expected_base - W, expected_base)` must never overlap; that requires at
//! least `2W` distinct numbers.  `seq_space = window_size + 1` — enough for
//! Go-Back-N — is rejected here rather than silently widened, because
//! widening would change observable wire behaviour.

use thiserror::Error;

/// Alias for a sequence number as carried in packet headers.
pub type SeqNum = i32;

/// Invalid window/sequence-space combinations.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The window must hold at least one packet.
    #[error("window_size must be at least 1, got {0}")]
    WindowTooSmall(i32),
    /// Selective Repeat needs twice the window in sequence numbers.
    #[error("seq_space {seq_space} is too small for window_size {window_size}: selective repeat requires seq_space >= 2 * window_size")]
    SpaceTooSmall { window_size: i32, seq_space: i32 },
}

/// A validated cyclic sequence space plus window size.
///
/// Cheap to copy; both engines hold one and route every sequence-number
/// comparison through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpace {
    window_size: i32,
    seq_space: i32,
}

impl SeqSpace {
    /// Validate and build a sequence space.
    ///
    /// Fails when `window_size < 1` or `seq_space < 2 * window_size`.
    pub fn new(window_size: i32, seq_space: i32) -> Result<Self, ConfigError> {
        if window_size < 1 {
            return Err(ConfigError::WindowTooSmall(window_size));
        }
        if seq_space < 2 * window_size {
            return Err(ConfigError::SpaceTooSmall {
                window_size,
                seq_space,
            });
        }
        Ok(Self {
            window_size,
            seq_space,
        })
    }

    /// Maximum number of packets outstanding at once.
    pub fn window_size(&self) -> i32 {
        self.window_size
    }

    /// Total number of distinct sequence numbers.
    pub fn seq_space(&self) -> i32 {
        self.seq_space
    }

    /// `true` when `seq` is a legal sequence number, i.e. in `[0, seq_space)`.
    ///
    /// Headers arriving off the channel may carry anything; engines drop
    /// packets that fail this check before doing any modular arithmetic.
    pub fn contains(&self, seq: SeqNum) -> bool {
        (0..self.seq_space).contains(&seq)
    }

    /// Forward modular distance from `from` to `to`.
    ///
    /// How many increments (mod `seq_space`) it takes to walk from `from`
    /// to `to`; always in `[0, seq_space)`.  Callers must have range-checked
    /// both arguments with [`contains`](Self::contains) first.
    pub fn distance(&self, from: SeqNum, to: SeqNum) -> i32 {
        (to - from + self.seq_space) % self.seq_space
    }

    /// The sequence number immediately after `seq`, wrapping at `seq_space`.
    pub fn next(&self, seq: SeqNum) -> SeqNum {
        (seq + 1) % self.seq_space
    }

    /// `true` when `seq` lies in the window of `window_size` numbers
    /// starting at `base`, i.e. `distance(base, seq) < window_size`.
    pub fn in_window(&self, base: SeqNum, seq: SeqNum) -> bool {
        self.distance(base, seq) < self.window_size
    }

    /// `true` when `seq` lies in the `window_size` numbers *behind* `base` —
    /// the zone a receiver has already delivered but whose acks may have
    /// been lost, so retransmissions from there must be re-acknowledged.
    pub fn behind_window(&self, base: SeqNum, seq: SeqNum) -> bool {
        self.distance(base, seq) >= self.seq_space - self.window_size
    }

    /// Slot-store index for `seq` (stores are sized `seq_space`).
    pub fn index(&self, seq: SeqNum) -> usize {
        debug_assert!(self.contains(seq), "index of out-of-range seq {seq}");
        seq as usize % self.seq_space as usize
    }
}
