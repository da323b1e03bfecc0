//! Wire-format definitions for protocol packets.
//!
//! Every unit handed to the channel is a [`Packet`].  This module is
//! responsible for:
//! - Defining the packet value type and its fixed 20-byte [`Message`] payload.
//! - The additive checksum used by both engines to detect corruption.
//! - Serialising a [`Packet`] into its bit-exact 32-byte wire layout and
//!   deserialising it back.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Acknowledgment Number                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      Payload (20 bytes)                       |
//! |                             ...                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Checksum                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total packet size: [`PACKET_LEN`] = 32 bytes.
//! seqnum(4) + acknum(4) + payload(20) + checksum(4)
//!
//! Unlike a transport that discards bad datagrams at the parsing boundary,
//! [`Packet::decode`] does **not** verify the checksum: the channel is allowed
//! to deliver corrupted packets, and deciding what to do with them belongs to
//! the sender/receiver engines (via [`Packet::is_corrupted`]).

use thiserror::Error;

/// Number of payload bytes in every packet and message.
pub const PAYLOAD_LEN: usize = 20;

/// Byte length of a serialised packet on the wire.
pub const PACKET_LEN: usize = 32;

/// Sentinel for a header field that carries no information.
///
/// Data packets use it for `acknum`; acknowledgment packets for `seqnum`.
pub const NOT_IN_USE: i32 = -1;

// Byte offsets of each field within the serialised packet.
const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 4;
const OFF_PAYLOAD: usize = 8;
const OFF_CHECKSUM: usize = 28;

/// Fixed-size application payload submitted by the application layer.
///
/// Immutable once created; shorter inputs are zero-padded, longer inputs
/// truncated, so a [`Message`] is always exactly [`PAYLOAD_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    data: [u8; PAYLOAD_LEN],
}

impl Message {
    /// Build a message from up to [`PAYLOAD_LEN`] bytes, zero-padding the rest.
    pub fn new(bytes: &[u8]) -> Self {
        let mut data = [0u8; PAYLOAD_LEN];
        let n = bytes.len().min(PAYLOAD_LEN);
        data[..n].copy_from_slice(&bytes[..n]);
        Self { data }
    }

    /// The full padded payload.
    pub fn data(&self) -> &[u8; PAYLOAD_LEN] {
        &self.data
    }
}

impl From<[u8; PAYLOAD_LEN]> for Message {
    fn from(data: [u8; PAYLOAD_LEN]) -> Self {
        Self { data }
    }
}

/// A complete protocol packet: header fields + fixed payload.
///
/// Packets are immutable value objects once constructed; the constructors
/// below compute the checksum over the final field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Sequence number of this data packet, or [`NOT_IN_USE`] on a pure ack.
    pub seqnum: i32,
    /// Sequence number being acknowledged, or [`NOT_IN_USE`] on data.
    pub acknum: i32,
    /// Fixed-size payload (all zeroes on a pure ack).
    pub payload: [u8; PAYLOAD_LEN],
    /// Additive checksum over `seqnum`, `acknum`, and every payload byte.
    pub checksum: i32,
}

impl Packet {
    /// Build a data packet carrying `message` with the given sequence number.
    pub fn data(seqnum: i32, message: &Message) -> Self {
        let mut pkt = Self {
            seqnum,
            acknum: NOT_IN_USE,
            payload: *message.data(),
            checksum: 0,
        };
        pkt.checksum = pkt.compute_checksum();
        pkt
    }

    /// Build a pure acknowledgment for the given sequence number.
    pub fn ack(acknum: i32) -> Self {
        let mut pkt = Self {
            seqnum: NOT_IN_USE,
            acknum,
            payload: [0u8; PAYLOAD_LEN],
            checksum: 0,
        };
        pkt.checksum = pkt.compute_checksum();
        pkt
    }

    /// Additive checksum over the packet's *current* field values.
    ///
    /// `seqnum + acknum + Σ payload bytes`, with payload bytes taken as
    /// unsigned.  Wrapping arithmetic keeps the sum total even for hostile
    /// field values injected by a corrupting channel.
    pub fn compute_checksum(&self) -> i32 {
        let mut sum = self.seqnum.wrapping_add(self.acknum);
        for &b in &self.payload {
            sum = sum.wrapping_add(i32::from(b));
        }
        sum
    }

    /// `true` when the stored checksum disagrees with a fresh computation.
    ///
    /// Used identically by both engines; a corrupted packet's header fields
    /// cannot be trusted, so callers must check this before reading them.
    pub fn is_corrupted(&self) -> bool {
        self.compute_checksum() != self.checksum
    }

    /// Serialise this packet into its fixed 32-byte wire layout.
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buf = [0u8; PACKET_LEN];
        buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&self.seqnum.to_be_bytes());
        buf[OFF_ACK..OFF_ACK + 4].copy_from_slice(&self.acknum.to_be_bytes());
        buf[OFF_PAYLOAD..OFF_PAYLOAD + PAYLOAD_LEN].copy_from_slice(&self.payload);
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 4].copy_from_slice(&self.checksum.to_be_bytes());
        buf
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// Fails only when `buf` is not exactly [`PACKET_LEN`] bytes.  The
    /// checksum is *not* verified here — corruption detection is the engines'
    /// decision, via [`Packet::is_corrupted`].
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() != PACKET_LEN {
            return Err(PacketError::WrongLength(buf.len()));
        }

        let seqnum = i32::from_be_bytes(buf[OFF_SEQ..OFF_SEQ + 4].try_into().unwrap());
        let acknum = i32::from_be_bytes(buf[OFF_ACK..OFF_ACK + 4].try_into().unwrap());
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&buf[OFF_PAYLOAD..OFF_PAYLOAD + PAYLOAD_LEN]);
        let checksum = i32::from_be_bytes(buf[OFF_CHECKSUM..OFF_CHECKSUM + 4].try_into().unwrap());

        Ok(Packet {
            seqnum,
            acknum,
            payload,
            checksum,
        })
    }
}

/// Errors that can arise when parsing a raw packet buffer.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum PacketError {
    /// Buffer is not exactly [`PACKET_LEN`] bytes.
    #[error("packet buffer is {0} bytes, expected {PACKET_LEN}")]
    WrongLength(usize),
}
