//! Packet definitions for the Handshake, Status and Login phases of the front end.
//!
//! Each packet type owns its own wire decoding and a `handle` method that drives the
//! owning [`crate::connection::Connection`], mirroring how a single packet-module per
//! phase dispatches on `(phase, packet_id)` in this codebase's protocol layer.

pub mod handshake;
pub mod login;
pub mod status;

use crate::codec::CodecError;

#[derive(thiserror::Error, Debug)]
pub enum ProtocolError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("packet {packet_id:#04x} is not valid in phase {phase}")]
    IllegalState { phase: &'static str, packet_id: i32 },
    #[error("handshake requested an unsupported next-state {0}")]
    InvalidNextState(i32),
}

/// Result of handling one inbound packet.
pub enum Outcome {
    /// Keep reading packets in the current phase.
    Continue,
    /// The peer is done (disconnect sent, or the client is expected to close on its own).
    Close,
    /// Login succeeded; the caller should hand the raw stream off to the tunnel layer
    /// using the given shared secret.
    Authenticated { secret: String, identifier: String },
}
