//! Selective-Repeat send-side state machine.
//!
//! [`SenderEngine`] maintains a sliding window of up to `window_size`
//! in-flight packets, each individually acknowledgeable.
//!
//! # Protocol contract
//!
//! - At most `window_size` packets may be outstanding at once; a submission
//!   arriving at a full window is dropped (counted, not queued).
//! - Acks are **per-packet**, not cumulative: an ack names exactly one
//!   sequence number, and the matching slot is marked even when it lies
//!   beyond `base`.  `base` then slides over the maximal contiguous acked
//!   prefix, which is what makes out-of-order completion possible.
//! - On timeout, only the **oldest** unacknowledged packet is retransmitted.
//!   Retransmitting the whole window would degrade to Go-Back-N and is
//!   deliberately not done.
//! - Sequence numbers are cyclic in `[0, seq_space)`; all comparisons go
//!   through [`SeqSpace`] modular distance.
//!
//! This module only manages state; packet delivery and timer scheduling are
//! the collaborators' responsibility (see [`crate::link`]).  One shared
//! retransmit timer tracks the oldest outstanding packet.

use std::time::Duration;

use crate::link::{Channel, TimerControl};
use crate::packet::{Message, Packet};
use crate::seq::{SeqNum, SeqSpace};

// ---------------------------------------------------------------------------
// SendSlot
// ---------------------------------------------------------------------------

/// One outstanding packet occupying a slot in the send window.
///
/// Lifecycle: created unacked on submit, marked on ack, retired (the store
/// entry reverts to `None`) once `base` slides past it.
#[derive(Debug, Clone)]
struct SendSlot {
    /// The packet as originally transmitted, kept for retransmission.
    packet: Packet,
    /// Whether an uncorrupted ack for this packet has been recorded.
    acked: bool,
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Observable counters maintained by the sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Submissions rejected because the window was full.
    pub window_full: u64,
    /// Data packets handed to the channel for the first time.
    pub packets_sent: u64,
    /// Uncorrupted, in-range acks seen (including stale duplicates).
    pub total_acks_received: u64,
    /// Acks that newly marked an outstanding slot.
    pub new_acks: u64,
    /// Timeout-driven retransmissions.
    pub packets_resent: u64,
}

// ---------------------------------------------------------------------------
// SenderEngine
// ---------------------------------------------------------------------------

/// Selective-Repeat send-side state for one simplex link.
///
/// # Sequence-number layout
///
/// ```text
///      base            next_seq
///       │                  │
///  ─────┼──────────────────┼──────────────────▶ seq space (cyclic)
///       │ ◀── in flight ──▶│ ◀── sendable ──▶
/// ```
#[derive(Debug)]
pub struct SenderEngine {
    /// Validated window/sequence-space configuration.
    space: SeqSpace,

    /// Retransmit timeout handed to the timer collaborator.
    timeout: Duration,

    /// Sequence number of the oldest unacknowledged packet (left window edge).
    base: SeqNum,

    /// Sequence number to assign to the next submission.
    next_seq: SeqNum,

    /// Slot store indexed `seq mod seq_space`; `None` means unused/retired.
    slots: Vec<Option<SendSlot>>,

    /// Whether the shared retransmit timer is currently scheduled.
    timer_running: bool,

    /// Observable counters.
    stats: SenderStats,
}

impl SenderEngine {
    /// Create an idle sender: `base = next_seq = 0`, no slots, no timer.
    pub fn new(space: SeqSpace, timeout: Duration) -> Self {
        Self {
            space,
            timeout,
            base: 0,
            next_seq: 0,
            slots: vec![None; space.seq_space() as usize],
            timer_running: false,
            stats: SenderStats::default(),
        }
    }

    /// Oldest unacknowledged sequence number.
    pub fn base(&self) -> SeqNum {
        self.base
    }

    /// Sequence number the next accepted submission will get.
    pub fn next_seq(&self) -> SeqNum {
        self.next_seq
    }

    /// Number of packets currently awaiting acknowledgement.
    pub fn in_flight(&self) -> i32 {
        self.space.distance(self.base, self.next_seq)
    }

    /// `true` when there is room for at least one more outstanding packet.
    pub fn can_submit(&self) -> bool {
        self.in_flight() < self.space.window_size()
    }

    /// Observable counters.
    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Submit one application message for reliable delivery.
    ///
    /// When the window has room: builds a data packet with the next sequence
    /// number, hands it to `channel`, records an unacked slot, makes sure the
    /// retransmit timer is running, and returns the assigned sequence number.
    ///
    /// When the window is full the message is **dropped**: the `window_full`
    /// counter increments and `None` is returned.  There is no retry queue —
    /// backpressure is the caller's concern.
    pub fn submit<C, T>(
        &mut self,
        message: &Message,
        channel: &mut C,
        timer: &mut T,
    ) -> Option<SeqNum>
    where
        C: Channel,
        T: TimerControl,
    {
        if !self.can_submit() {
            log::debug!(
                "[snd] window full ({} in flight), message dropped",
                self.in_flight()
            );
            self.stats.window_full += 1;
            return None;
        }

        let seq = self.next_seq;
        let packet = Packet::data(seq, message);
        channel.send(packet);
        self.stats.packets_sent += 1;

        self.slots[self.space.index(seq)] = Some(SendSlot {
            packet,
            acked: false,
        });

        // One shared timer covers the oldest outstanding packet; arm it when
        // the window transitions from empty.
        if !self.timer_running {
            timer.start(self.timeout);
            self.timer_running = true;
        }

        self.next_seq = self.space.next(self.next_seq);
        log::debug!("[snd] → DATA seq={seq} in_flight={}", self.in_flight());
        Some(seq)
    }

    /// Process an inbound acknowledgment packet.
    ///
    /// Corrupted or out-of-range packets are discarded without any state
    /// change.  Acks outside the outstanding window `[base, next_seq)` are
    /// stale duplicates: counted, otherwise ignored.  A new in-window ack
    /// marks its slot, after which `base` slides over the contiguous acked
    /// prefix and the timer is re-armed for the new oldest packet (or
    /// stopped when the window drained).
    pub fn on_packet<T>(&mut self, packet: &Packet, timer: &mut T)
    where
        T: TimerControl,
    {
        if packet.is_corrupted() {
            log::debug!("[snd] ← corrupted ack, dropped");
            return;
        }

        let ack = packet.acknum;
        if !self.space.contains(ack) {
            log::debug!("[snd] ← ack {ack} outside sequence space, dropped");
            return;
        }

        self.stats.total_acks_received += 1;

        if self.space.distance(self.base, ack) >= self.in_flight() {
            // Behind the window (or nothing outstanding): a retransmitted ack
            // for a slot that already retired.
            log::debug!("[snd] ← stale ACK {ack} (base={})", self.base);
            return;
        }

        match &mut self.slots[self.space.index(ack)] {
            Some(slot) if !slot.acked => {
                slot.acked = true;
                self.stats.new_acks += 1;
                log::debug!("[snd] ← ACK {ack} (new)");
            }
            _ => {
                log::debug!("[snd] ← duplicate ACK {ack}");
                return;
            }
        }

        // Slide base over the maximal contiguous acked prefix, retiring slots.
        let old_base = self.base;
        loop {
            let idx = self.space.index(self.base);
            match &self.slots[idx] {
                Some(slot) if slot.acked => {
                    self.slots[idx] = None;
                    self.base = self.space.next(self.base);
                }
                _ => break,
            }
        }

        if self.base != old_base {
            log::debug!("[snd] base {} → {}", old_base, self.base);
            // The timer tracked the retired oldest packet; re-arm it for the
            // new oldest, or stop it when nothing is left outstanding.
            timer.stop();
            self.timer_running = false;
            if self.base != self.next_seq {
                timer.start(self.timeout);
                self.timer_running = true;
            }
        }
    }

    /// Handle expiry of the retransmit timer.
    ///
    /// Retransmits only the oldest unacknowledged packet and re-arms the
    /// timer.  An expiry arriving after the window drained (the event was
    /// already in flight when the last ack landed) is spurious and ignored.
    pub fn on_timer_expired<C, T>(&mut self, channel: &mut C, timer: &mut T)
    where
        C: Channel,
        T: TimerControl,
    {
        // The collaborator's pending callback just fired.
        self.timer_running = false;

        if self.base == self.next_seq {
            log::debug!("[snd] spurious timeout, nothing outstanding");
            return;
        }

        let Some(slot) = &self.slots[self.space.index(self.base)] else {
            log::debug!("[snd] spurious timeout, slot {} already retired", self.base);
            return;
        };

        log::debug!("[snd] timeout — resending packet {}", slot.packet.seqnum);
        channel.send(slot.packet);
        self.stats.packets_resent += 1;
        timer.start(self.timeout);
        self.timer_running = true;
    }

    /// Reset to the just-constructed state (counters included).
    pub fn reset(&mut self) {
        self.base = 0;
        self.next_seq = 0;
        self.slots.iter_mut().for_each(|s| *s = None);
        self.timer_running = false;
        self.stats = SenderStats::default();
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::TimerCommand;
    use crate::packet::PAYLOAD_LEN;

    const TIMEOUT: Duration = Duration::from_millis(16);

    fn engine() -> SenderEngine {
        SenderEngine::new(SeqSpace::new(6, 13).unwrap(), TIMEOUT)
    }

    fn msg(tag: u8) -> Message {
        Message::new(&[tag; PAYLOAD_LEN])
    }

    /// Submit `n` messages, returning the emitted packets.
    fn fill(s: &mut SenderEngine, n: usize) -> Vec<Packet> {
        let mut ch = Vec::new();
        let mut tm = Vec::new();
        for i in 0..n {
            assert!(s.submit(&msg(i as u8), &mut ch, &mut tm).is_some());
        }
        ch
    }

    #[test]
    fn initial_state() {
        let s = engine();
        assert_eq!(s.base(), 0);
        assert_eq!(s.next_seq(), 0);
        assert_eq!(s.in_flight(), 0);
        assert!(s.can_submit());
        assert_eq!(*s.stats(), SenderStats::default());
    }

    #[test]
    fn submit_emits_data_packet_and_starts_timer() {
        let mut s = engine();
        let mut ch = Vec::new();
        let mut tm = Vec::new();

        let seq = s.submit(&msg(1), &mut ch, &mut tm);
        assert_eq!(seq, Some(0));
        assert_eq!(ch.len(), 1);
        assert_eq!(ch[0].seqnum, 0);
        assert!(!ch[0].is_corrupted());
        assert_eq!(tm, vec![TimerCommand::Start(TIMEOUT)]);
        assert_eq!(s.next_seq(), 1);
        assert_eq!(s.in_flight(), 1);
    }

    #[test]
    fn second_submit_does_not_rearm_timer() {
        let mut s = engine();
        let mut ch = Vec::new();
        let mut tm = Vec::new();
        s.submit(&msg(1), &mut ch, &mut tm).unwrap();
        s.submit(&msg(2), &mut ch, &mut tm).unwrap();
        // Only the transition from an empty window arms the shared timer.
        assert_eq!(tm, vec![TimerCommand::Start(TIMEOUT)]);
    }

    #[test]
    fn full_window_rejects_and_counts() {
        let mut s = engine();
        fill(&mut s, 6);
        assert!(!s.can_submit());

        let mut ch = Vec::new();
        let mut tm = Vec::new();
        assert_eq!(s.submit(&msg(9), &mut ch, &mut tm), None);
        assert!(ch.is_empty(), "rejected submission must not reach the channel");
        assert_eq!(s.stats().window_full, 1);
        assert_eq!(s.next_seq(), 6, "next_seq must not advance on rejection");
    }

    #[test]
    fn ack_for_base_slides_window() {
        let mut s = engine();
        fill(&mut s, 3);
        let mut tm = Vec::new();

        s.on_packet(&Packet::ack(0), &mut tm);
        assert_eq!(s.base(), 1);
        assert_eq!(s.stats().new_acks, 1);
        assert_eq!(s.stats().total_acks_received, 1);
        // Timer restarted for the new oldest packet.
        assert_eq!(tm, vec![TimerCommand::Stop, TimerCommand::Start(TIMEOUT)]);
    }

    #[test]
    fn out_of_order_ack_recorded_without_sliding() {
        let mut s = engine();
        fill(&mut s, 3);
        let mut tm = Vec::new();

        // Ack for 2 first: base must stay put.
        s.on_packet(&Packet::ack(2), &mut tm);
        assert_eq!(s.base(), 0);
        assert_eq!(s.stats().new_acks, 1);
        assert!(tm.is_empty(), "no slide, timer untouched");

        // Ack for 0: base slides to 1, not past the still-unacked 1.
        s.on_packet(&Packet::ack(0), &mut tm);
        assert_eq!(s.base(), 1);

        // Ack for 1: base jumps over the pre-acked 2.
        s.on_packet(&Packet::ack(1), &mut tm);
        assert_eq!(s.base(), 3);
        assert_eq!(s.in_flight(), 0);
    }

    #[test]
    fn window_drain_stops_timer() {
        let mut s = engine();
        fill(&mut s, 1);
        let mut tm = Vec::new();
        s.on_packet(&Packet::ack(0), &mut tm);
        // Stopped and NOT restarted: nothing outstanding.
        assert_eq!(tm, vec![TimerCommand::Stop]);
    }

    #[test]
    fn duplicate_ack_counts_total_not_new() {
        let mut s = engine();
        fill(&mut s, 3);
        let mut tm = Vec::new();

        s.on_packet(&Packet::ack(2), &mut tm);
        s.on_packet(&Packet::ack(2), &mut tm);
        assert_eq!(s.stats().total_acks_received, 2);
        assert_eq!(s.stats().new_acks, 1);
    }

    #[test]
    fn stale_ack_behind_window_ignored() {
        let mut s = engine();
        fill(&mut s, 2);
        let mut tm = Vec::new();
        s.on_packet(&Packet::ack(0), &mut tm);
        s.on_packet(&Packet::ack(1), &mut tm);
        assert_eq!(s.base(), 2);

        // Retransmitted ack for the retired 0: counted, no other change.
        s.on_packet(&Packet::ack(0), &mut tm);
        assert_eq!(s.base(), 2);
        assert_eq!(s.stats().total_acks_received, 3);
        assert_eq!(s.stats().new_acks, 2);
    }

    #[test]
    fn corrupted_ack_fully_ignored() {
        let mut s = engine();
        fill(&mut s, 1);
        let mut tm = Vec::new();

        let mut ack = Packet::ack(0);
        ack.checksum ^= 0x55;
        s.on_packet(&ack, &mut tm);

        assert_eq!(s.base(), 0);
        assert_eq!(
            s.stats().total_acks_received,
            0,
            "corrupted acks are not counted"
        );
        assert!(tm.is_empty());
    }

    #[test]
    fn out_of_range_acknum_dropped() {
        let mut s = engine();
        fill(&mut s, 1);
        let mut tm = Vec::new();

        // In-range checksums, out-of-range acknums.
        s.on_packet(&Packet::ack(13), &mut tm);
        s.on_packet(&Packet::ack(-1), &mut tm);
        assert_eq!(s.stats().total_acks_received, 0);
        assert_eq!(s.base(), 0);
    }

    #[test]
    fn timeout_resends_oldest_only() {
        let mut s = engine();
        let sent = fill(&mut s, 3);
        let mut ch = Vec::new();
        let mut tm = Vec::new();

        s.on_timer_expired(&mut ch, &mut tm);
        assert_eq!(ch.len(), 1, "selective repeat resends a single packet");
        assert_eq!(ch[0], sent[0]);
        assert_eq!(s.stats().packets_resent, 1);
        assert_eq!(tm, vec![TimerCommand::Start(TIMEOUT)]);
    }

    #[test]
    fn spurious_timeout_ignored() {
        let mut s = engine();
        let mut ch = Vec::new();
        let mut tm = Vec::new();

        // Expiry with nothing outstanding (ack landed while it was in flight).
        s.on_timer_expired(&mut ch, &mut tm);
        assert!(ch.is_empty());
        assert!(tm.is_empty());
        assert_eq!(s.stats().packets_resent, 0);
    }

    #[test]
    fn resend_then_ack_completes() {
        let mut s = engine();
        fill(&mut s, 1);
        let mut ch = Vec::new();
        let mut tm = Vec::new();

        s.on_timer_expired(&mut ch, &mut tm);
        assert_eq!(s.base(), 0, "base holds until a clean ack arrives");

        s.on_packet(&Packet::ack(0), &mut tm);
        assert_eq!(s.base(), 1);
        assert_eq!(s.in_flight(), 0);
    }

    #[test]
    fn sequence_numbers_wrap_cleanly() {
        let mut s = engine();
        let mut ch = Vec::new();
        let mut tm = Vec::new();

        // 26 clean submit/ack cycles: two full trips around seq_space = 13.
        for i in 0..26 {
            let seq = s.submit(&msg(i as u8), &mut ch, &mut tm).unwrap();
            assert_eq!(seq, i % 13);
            s.on_packet(&Packet::ack(seq), &mut tm);
            assert_eq!(s.base(), (i + 1) % 13);
        }
        assert_eq!(s.stats().packets_sent, 26);
        assert_eq!(s.stats().new_acks, 26);
        assert_eq!(s.stats().packets_resent, 0);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut s = engine();
        fill(&mut s, 4);
        s.reset();
        assert_eq!(s.base(), 0);
        assert_eq!(s.next_seq(), 0);
        assert_eq!(*s.stats(), SenderStats::default());
        assert!(s.can_submit());
    }
}
