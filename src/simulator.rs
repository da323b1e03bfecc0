//! Deterministic network simulator for exercising the engines end to end.
//!
//! Real channels drop, corrupt, and delay packets.  To test the reliability
//! mechanisms without real network conditions, this module provides a
//! single-threaded discrete-event [`Simulation`] that owns one
//! [`SenderEngine`] and one [`ReceiverEngine`] and plays the part of every
//! collaborator between them, applying a configurable fault model:
//!
//! | Fault       | Description                                            |
//! |-------------|--------------------------------------------------------|
//! | Packet loss | Drop a packet with probability `loss_rate`.            |
//! | Corruption  | Damage one field with probability `corrupt_rate`.      |
//! | Delay       | Transit time = `base_delay` plus uniform jitter.       |
//!
//! The channel **never reorders**: per direction, a packet's arrival time is
//! clamped to be no earlier than the previously scheduled arrival, so jitter
//! stretches gaps but cannot overtake.
//!
//! A "timer" here is a scheduled future event.  Cancellation uses a
//! generation counter: `stop` (and every fresh `start`) bumps the
//! generation, and a popped timeout whose generation is stale is discarded.
//! An expiry already popped when the cancelling ack is still queued will
//! still reach the sender — exactly the cancellation race the engine is
//! required to absorb.
//!
//! All randomness comes from a seeded [`StdRng`], so any run is reproducible
//! from its seed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::link::TimerCommand;
use crate::packet::{Message, Packet, PAYLOAD_LEN};
use crate::receiver::{ReceiverEngine, ReceiverStats};
use crate::seq::SeqSpace;
use crate::sender::{SenderEngine, SenderStats};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Fault model for the simulated channel.
///
/// Probabilities are independent per packet, in `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Probability that any given packet is silently dropped.
    pub loss_rate: f64,
    /// Probability that a surviving packet is corrupted in transit.
    pub corrupt_rate: f64,
    /// Minimum one-way transit time.
    pub base_delay: Duration,
    /// Upper bound on additional uniformly random transit time.
    pub jitter: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        // Fault-free by default; transit takes 5-10 time units (ms).
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            base_delay: Duration::from_millis(5),
            jitter: Duration::from_millis(5),
        }
    }
}

/// Channel-level tallies (what the fault model actually did).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelTally {
    /// Packets the channel dropped.
    pub lost: u64,
    /// Packets the channel damaged before delivery.
    pub corrupted: u64,
}

// ---------------------------------------------------------------------------
// Event queue
// ---------------------------------------------------------------------------

/// Which endpoint an in-flight packet is travelling towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dest {
    Sender,
    Receiver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EventKind {
    /// Application hands a message to the sender.
    Submit(Message),
    /// A packet (an ack) arrives at the sender.
    SenderRx(Packet),
    /// A packet (data) arrives at the receiver.
    ReceiverRx(Packet),
    /// The sender's retransmit timer fires.
    Timeout { generation: u64 },
}

/// A scheduled event.  `id` is an insertion counter so that events sharing a
/// timestamp are processed in FIFO order, keeping runs deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Event {
    at: Duration,
    id: u64,
    kind: EventKind,
}

// BinaryHeap is a max-heap; invert the ordering to pop the earliest event.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.at.cmp(&self.at).then(other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// A complete simplex Selective-Repeat link under a simulated channel.
///
/// Typical use: schedule submissions, [`run`](Self::run) to completion, then
/// inspect [`delivered`](Self::delivered) and the engines' counters.
pub struct Simulation {
    clock: Duration,
    queue: BinaryHeap<Event>,
    next_id: u64,

    sender: SenderEngine,
    receiver: ReceiverEngine,

    config: ChannelConfig,
    rng: StdRng,
    tally: ChannelTally,

    /// Per-direction floor on the next arrival time (non-reordering channel).
    arrival_floor: [Duration; 2],

    /// Current timer generation; queued timeouts from older generations are
    /// cancelled.
    timer_generation: u64,

    /// Payloads the receiver delivered to the application, in order.
    delivered: Vec<[u8; PAYLOAD_LEN]>,
}

impl Simulation {
    /// Build a simulation around freshly initialised engines.
    ///
    /// `timeout` is the sender's retransmit interval; `seed` fixes the fault
    /// model's randomness.
    pub fn new(space: SeqSpace, timeout: Duration, config: ChannelConfig, seed: u64) -> Self {
        Self {
            clock: Duration::ZERO,
            queue: BinaryHeap::new(),
            next_id: 0,
            sender: SenderEngine::new(space, timeout),
            receiver: ReceiverEngine::new(space),
            config,
            rng: StdRng::seed_from_u64(seed),
            tally: ChannelTally::default(),
            arrival_floor: [Duration::ZERO; 2],
            timer_generation: 0,
            delivered: Vec::new(),
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// Payloads delivered to the application layer so far, in order.
    pub fn delivered(&self) -> &[[u8; PAYLOAD_LEN]] {
        &self.delivered
    }

    /// Sender-side counters.
    pub fn sender_stats(&self) -> &SenderStats {
        self.sender.stats()
    }

    /// Receiver-side counters.
    pub fn receiver_stats(&self) -> &ReceiverStats {
        self.receiver.stats()
    }

    /// What the channel did to traffic so far.
    pub fn channel_tally(&self) -> &ChannelTally {
        &self.tally
    }

    /// Direct access to the sender engine (for assertions on `base` etc.).
    pub fn sender(&self) -> &SenderEngine {
        &self.sender
    }

    /// Direct access to the receiver engine.
    pub fn receiver(&self) -> &ReceiverEngine {
        &self.receiver
    }

    /// Schedule an application submission at absolute simulated time `at`.
    pub fn submit_at(&mut self, at: Duration, message: Message) {
        self.push(at, EventKind::Submit(message));
    }

    /// Schedule `messages` one `interval` apart, starting at `interval`.
    pub fn submit_spaced(&mut self, messages: impl IntoIterator<Item = Message>, interval: Duration) {
        let mut at = Duration::ZERO;
        for message in messages {
            at += interval;
            self.submit_at(at, message);
        }
    }

    /// Process the single earliest pending event.
    ///
    /// Returns `false` when the queue is empty.
    pub fn step(&mut self) -> bool {
        let Some(event) = self.queue.pop() else {
            return false;
        };
        self.clock = event.at;
        log::trace!("[sim] t={:?} {:?}", self.clock, event.kind);

        match event.kind {
            EventKind::Submit(message) => {
                let mut ch = Vec::new();
                let mut tm = Vec::new();
                // A full-window rejection already shows up in `window_full`.
                let _ = self.sender.submit(&message, &mut ch, &mut tm);
                self.apply_timer_commands(tm);
                for packet in ch {
                    self.transmit(packet, Dest::Receiver);
                }
            }
            EventKind::SenderRx(packet) => {
                let mut tm = Vec::new();
                self.sender.on_packet(&packet, &mut tm);
                self.apply_timer_commands(tm);
            }
            EventKind::ReceiverRx(packet) => {
                let mut ch = Vec::new();
                self.receiver.on_packet(&packet, &mut ch, &mut self.delivered);
                for ack in ch {
                    self.transmit(ack, Dest::Sender);
                }
            }
            EventKind::Timeout { generation } => {
                if generation != self.timer_generation {
                    // Cancelled before it fired; the heap entry just lingered.
                    log::trace!("[sim] stale timeout gen={generation}");
                } else {
                    let mut ch = Vec::new();
                    let mut tm = Vec::new();
                    self.sender.on_timer_expired(&mut ch, &mut tm);
                    self.apply_timer_commands(tm);
                    for packet in ch {
                        self.transmit(packet, Dest::Receiver);
                    }
                }
            }
        }
        true
    }

    /// Run until no events remain, bounded by `max_events`.
    ///
    /// Returns the number of events processed.  Hitting the bound with work
    /// still queued means the configuration cannot quiesce (e.g. 100% loss);
    /// callers treat that as a test/tooling failure, not a protocol state.
    pub fn run(&mut self, max_events: usize) -> usize {
        let mut processed = 0;
        while processed < max_events && self.step() {
            processed += 1;
        }
        processed
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn push(&mut self, at: Duration, kind: EventKind) {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(Event { at, id, kind });
    }

    /// Replay the sender's recorded timer commands against the event queue.
    fn apply_timer_commands(&mut self, commands: Vec<TimerCommand>) {
        for command in commands {
            // Every command invalidates whatever timeout was pending.
            self.timer_generation += 1;
            if let TimerCommand::Start(timeout) = command {
                let generation = self.timer_generation;
                self.push(self.clock + timeout, EventKind::Timeout { generation });
            }
        }
    }

    /// Pass one packet through the fault model towards `dest`.
    fn transmit(&mut self, mut packet: Packet, dest: Dest) {
        if self.rng.random::<f64>() < self.config.loss_rate {
            log::debug!("[sim] channel lost packet (seq={} ack={})", packet.seqnum, packet.acknum);
            self.tally.lost += 1;
            return;
        }

        if self.rng.random::<f64>() < self.config.corrupt_rate {
            self.corrupt(&mut packet);
            self.tally.corrupted += 1;
        }

        let jitter_ns = self.config.jitter.as_nanos() as u64;
        let jitter = if jitter_ns == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.rng.random_range(0..=jitter_ns))
        };

        // Clamp to the previous arrival in this direction: the channel may
        // delay but never reorder.
        let floor = &mut self.arrival_floor[dest as usize];
        let at = (self.clock + self.config.base_delay + jitter).max(*floor);
        *floor = at;

        let kind = match dest {
            Dest::Sender => EventKind::SenderRx(packet),
            Dest::Receiver => EventKind::ReceiverRx(packet),
        };
        self.push(at, kind);
    }

    /// Damage one field, mostly the payload, sometimes a header field.
    ///
    /// Every mutation changes the additive checksum's input, so corruption is
    /// always detectable by the engines.
    fn corrupt(&mut self, packet: &mut Packet) {
        let roll: f64 = self.rng.random();
        if roll < 0.75 {
            let i = self.rng.random_range(0..PAYLOAD_LEN);
            packet.payload[i] ^= 0xff;
        } else if roll < 0.875 {
            packet.seqnum = packet.seqnum.wrapping_add(1);
        } else {
            packet.acknum = packet.acknum.wrapping_add(1);
        }
        log::debug!("[sim] channel corrupted packet (seq={} ack={})", packet.seqnum, packet.acknum);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
