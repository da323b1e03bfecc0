//! Selective-Repeat receive-side state machine.
//!
//! [`ReceiverEngine`] buffers out-of-order packets inside its window and
//! releases payloads to the application strictly in sequence-number order.
//!
//! # Protocol contract
//!
//! - A packet inside the receive window `[expected_base, expected_base + W)`
//!   is buffered (once) and acknowledged with **its own** sequence number —
//!   per-packet acks, never cumulative — then the contiguous prefix at
//!   `expected_base` drains to the application.
//! - A packet in the `W` numbers just *behind* the window was already
//!   delivered; its earlier ack must have been lost, so it is re-acked but
//!   neither re-buffered nor re-delivered.
//! - Corrupted packets are **dropped without acknowledgment**: once the
//!   checksum fails the sequence field itself cannot be trusted, so the only
//!   sound recovery path is the sender's own timeout.
//! - Anything else (the dead zone between the two ranges, or a sequence
//!   number outside `[0, seq_space)`) is dropped silently.
//!
//! This module only manages state; ack transmission and application delivery
//! go through the collaborators in [`crate::link`].

use crate::link::{Application, Channel};
use crate::packet::Packet;
use crate::seq::{SeqNum, SeqSpace};

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Observable counters maintained by the receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Uncorrupted packets accepted far enough to be acknowledged
    /// (in-window arrivals plus re-acked behind-window retransmissions).
    pub packets_received: u64,
    /// Payloads handed to the application, in order.
    pub delivered: u64,
}

// ---------------------------------------------------------------------------
// ReceiverEngine
// ---------------------------------------------------------------------------

/// Selective-Repeat receive-side state for one simplex link.
///
/// Slot lifecycle: `None` (unused) → `Some(packet)` (buffered, ack sent) →
/// `None` again once the contiguous prefix beginning at `expected_base`
/// drains to the application.
#[derive(Debug)]
pub struct ReceiverEngine {
    /// Validated window/sequence-space configuration (same as the sender's).
    space: SeqSpace,

    /// Lowest sequence number not yet delivered in order.
    expected_base: SeqNum,

    /// Buffered packets indexed `seq mod seq_space`; presence == received.
    slots: Vec<Option<Packet>>,

    /// Observable counters.
    stats: ReceiverStats,
}

impl ReceiverEngine {
    /// Create an idle receiver: `expected_base = 0`, all slots clear.
    pub fn new(space: SeqSpace) -> Self {
        Self {
            space,
            expected_base: 0,
            slots: vec![None; space.seq_space() as usize],
            stats: ReceiverStats::default(),
        }
    }

    /// Lowest sequence number not yet delivered to the application.
    pub fn expected_base(&self) -> SeqNum {
        self.expected_base
    }

    /// Observable counters.
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Process one packet arriving off the channel.
    ///
    /// Emits at most one acknowledgment through `channel` and zero or more
    /// in-order payloads through `app` (a single arrival can release a whole
    /// run of previously buffered packets).
    pub fn on_packet<C, A>(&mut self, packet: &Packet, channel: &mut C, app: &mut A)
    where
        C: Channel,
        A: Application,
    {
        if packet.is_corrupted() {
            // No ack: the sequence field is as untrustworthy as the payload.
            log::debug!("[rcv] ← corrupted packet, dropped");
            return;
        }

        let seq = packet.seqnum;
        if !self.space.contains(seq) {
            log::debug!("[rcv] ← seq {seq} outside sequence space, dropped");
            return;
        }

        if self.space.in_window(self.expected_base, seq) {
            // New or duplicate arrival inside the receive window.
            let idx = self.space.index(seq);
            if self.slots[idx].is_none() {
                log::debug!("[rcv] ← DATA seq={seq}, buffered");
                self.slots[idx] = Some(*packet);
            } else {
                log::debug!("[rcv] ← DATA seq={seq}, duplicate in window");
            }

            // Drain the contiguous prefix to the application.
            while let Some(ready) = self.slots[self.space.index(self.expected_base)].take() {
                log::debug!("[rcv] ↑ deliver seq={}", ready.seqnum);
                app.deliver(ready.payload);
                self.stats.delivered += 1;
                self.expected_base = self.space.next(self.expected_base);
            }
        } else if self.space.behind_window(self.expected_base, seq) {
            // Already delivered; the sender retransmitted because our ack was
            // lost.  Re-ack, do not re-buffer or re-deliver.
            log::debug!("[rcv] ← DATA seq={seq} behind window, re-acking");
        } else {
            // Dead zone: unreachable when seq_space >= 2 * window_size holds
            // on both endpoints.  Acknowledging would be ambiguous.
            log::debug!("[rcv] ← DATA seq={seq} in dead zone, dropped");
            return;
        }

        self.stats.packets_received += 1;
        // Per-packet acknowledgment: the arriving sequence number, not the
        // last delivered one, so the sender can retire exactly this slot.
        channel.send(Packet::ack(seq));
    }

    /// Reset to the just-constructed state (counters included).
    pub fn reset(&mut self) {
        self.expected_base = 0;
        self.slots.iter_mut().for_each(|s| *s = None);
        self.stats = ReceiverStats::default();
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
