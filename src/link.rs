//! Collaborator seams between the engines and the outside world.
//!
//! The engines are pure state machines: they never perform I/O, never block,
//! and never own a clock.  Everything they emit goes through one of three
//! traits, supplied by the caller on each entry point:
//!
//! - [`Channel`] — the unreliable link; carries [`Packet`]s in both roles
//!   (data sender→receiver, acks receiver→sender).
//! - [`TimerControl`] — schedules/cancels the retransmit callback.  A
//!   "timer" is a scheduled future event, not a wait: `start` schedules,
//!   `stop` cancels a pending callback and is a no-op if none is pending.
//! - [`Application`] — the layer above the receiver, taking in-order
//!   payloads.
//!
//! `Vec` implementations are provided so tests (and simple callers) can use
//! plain buffers as recording collaborators.

use std::time::Duration;

use crate::packet::{Packet, PAYLOAD_LEN};

/// Outbound side of the unreliable channel.
pub trait Channel {
    /// Hand one packet to the channel for (unreliable) delivery.
    fn send(&mut self, packet: Packet);
}

/// Retransmit-timer collaborator used by the sender engine.
pub trait TimerControl {
    /// Schedule the timer to fire after `timeout`.
    fn start(&mut self, timeout: Duration);

    /// Cancel any pending timer; no-op when none is running.
    fn stop(&mut self);
}

/// Application layer above the receiver engine.
pub trait Application {
    /// Accept the next in-order payload.
    fn deliver(&mut self, payload: [u8; PAYLOAD_LEN]);
}

/// A command recorded by the `Vec<TimerCommand>` timer implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start(Duration),
    Stop,
}

impl Channel for Vec<Packet> {
    fn send(&mut self, packet: Packet) {
        self.push(packet);
    }
}

impl TimerControl for Vec<TimerCommand> {
    fn start(&mut self, timeout: Duration) {
        self.push(TimerCommand::Start(timeout));
    }

    fn stop(&mut self) {
        self.push(TimerCommand::Stop);
    }
}

impl Application for Vec<[u8; PAYLOAD_LEN]> {
    fn deliver(&mut self, payload: [u8; PAYLOAD_LEN]) {
        self.push(payload);
    }
}
