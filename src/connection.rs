//! Per-connection front-end state machine: Handshake → Status | Login.
//!
//! Drives one accepted TCP connection through the three front-end phases, dispatching
//! inbound packets on `(phase, packet_id)`, mirroring this codebase's existing
//! connection-driver shape (a `Phase` enum plus a dispatch loop keyed on the current
//! phase and the packet's own ID) while dropping everything downstream of login — that
//! hand-off is owned by [`crate::transport::DisguisedTransport`].

use crate::auth::Authenticator;
use crate::codec::AsyncReadPacket;
use crate::protocol::{Outcome, ProtocolError, handshake, login, status};
use crate::status::StatusState;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::instrument;

/// Front-end connection state. `Tunnel` and `Closed` are not represented here: a
/// successful login or a closed socket both end [`Connection::run`] directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Handshake,
    Status,
    Login,
}

/// Outcome of running a connection's front-end phases to completion.
pub enum RunResult {
    /// The socket closed, was rejected, or completed a status/ping exchange.
    Closed,
    /// Login succeeded; `secret` is the resolved shared secret and `identifier` is the
    /// login name the client presented.
    Authenticated { secret: String, identifier: String },
}

pub struct Connection<S> {
    pub stream: S,
    pub phase: Phase,
    pub authenticator: Arc<Authenticator>,
    pub status: Arc<StatusState>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    pub fn new(stream: S, authenticator: Arc<Authenticator>, status: Arc<StatusState>) -> Self {
        Self {
            stream,
            phase: Phase::Handshake,
            authenticator,
            status,
        }
    }

    /// Runs the front-end state machine until the socket closes or login succeeds.
    ///
    /// Codec/IO errors bubble up as [`ProtocolError`]; every such error means the same
    /// thing to the caller: close the socket and stop.
    #[instrument(skip_all)]
    pub async fn run(&mut self) -> Result<RunResult, ProtocolError> {
        loop {
            let (packet_id, mut cursor) = self.stream.read_frame().await?;

            let outcome = match self.phase {
                Phase::Handshake => match packet_id {
                    0x00 => {
                        let packet = handshake::HandshakePacket::read_from_buffer(&mut cursor).await?;
                        packet.handle(self).await?
                    }
                    other => {
                        return Err(ProtocolError::IllegalState {
                            phase: "handshake",
                            packet_id: other,
                        });
                    }
                },
                Phase::Status => match packet_id {
                    0x00 => {
                        let packet = status::StatusRequestPacket::read_from_buffer(&mut cursor).await?;
                        packet.handle(self).await?
                    }
                    0x01 => {
                        let packet = status::PingPacket::read_from_buffer(&mut cursor).await?;
                        packet.handle(self).await?
                    }
                    _ => Outcome::Continue,
                },
                Phase::Login => match packet_id {
                    0x00 => {
                        let packet = login::LoginStartPacket::read_from_buffer(&mut cursor).await?;
                        packet.handle(self).await?
                    }
                    _ => Outcome::Continue,
                },
            };

            match outcome {
                Outcome::Continue => continue,
                Outcome::Close => return Ok(RunResult::Closed),
                Outcome::Authenticated { secret, identifier } => {
                    return Ok(RunResult::Authenticated { secret, identifier });
                }
            }
        }
    }
}
