//! `sr-arq` — Selective-Repeat ARQ over an unreliable simplex channel.
//!
//! Reliable, in-order delivery of fixed-size application messages across a
//! link that may delay, corrupt, or lose packets (but never reorders them).
//! Data flows sender → receiver; acknowledgments flow receiver → sender.
//!
//! # Architecture
//!
//! ```text
//!  Application                              Application
//!      │ submit(Message)                        ▲ deliver(payload)
//!      ▼                                        │
//!  ┌──────────────┐    data packets    ┌────────┴───────┐
//!  │ SenderEngine │───────────────────▶│ ReceiverEngine │
//!  └──────┬───────┘                    └────────┬───────┘
//!         │            per-packet ACKs          │
//!         │◀────────────────────────────────────┘
//!         │
//!   start/stop ──▶ timer collaborator (onTimerExpired callback)
//! ```
//!
//! Both engines are pure, single-threaded state machines driven by an
//! external event source; every outbound effect goes through the
//! collaborator traits in [`link`].  Correctness comes entirely from cyclic
//! sequence numbers, per-packet acknowledgment, and timeout-driven
//! retransmission — never from assumptions about the channel.
//!
//! Each module has a single responsibility:
//! - [`packet`]    — wire format, additive checksum, fixed 20-byte payloads
//! - [`seq`]       — modular sequence-number arithmetic and window config
//! - [`link`]      — collaborator traits (channel, timer, application)
//! - [`sender`]    — send window, slot buffering, retransmission
//! - [`receiver`]  — receive window, out-of-order buffering, in-order delivery
//! - [`simulator`] — deterministic lossy/corrupting event-driven test harness

pub mod link;
pub mod packet;
pub mod receiver;
pub mod seq;
pub mod sender;
pub mod simulator;

pub use link::{Application, Channel, TimerCommand, TimerControl};
pub use packet::{Message, Packet, PacketError, NOT_IN_USE, PAYLOAD_LEN};
pub use receiver::{ReceiverEngine, ReceiverStats};
pub use seq::{ConfigError, SeqNum, SeqSpace};
pub use sender::{SenderEngine, SenderStats};
