//! The single Handshake-phase packet: selects Status or Login for the rest of the
//! connection's lifetime.

use crate::codec::{AsyncReadPacket, CodecError, InboundPacket, Packet};
use crate::connection::{Connection, Phase};
use crate::protocol::{Outcome, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

#[derive(Debug)]
pub struct HandshakePacket {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: i32,
}

impl Packet for HandshakePacket {
    fn packet_id() -> usize {
        0x00
    }
}

impl InboundPacket for HandshakePacket {
    async fn read_from_buffer<R>(buffer: &mut R) -> Result<Self, CodecError>
    where
        R: AsyncRead + Unpin + Send + Sync,
    {
        Ok(Self {
            protocol_version: buffer.read_varint().await?,
            server_address: buffer.read_string().await?,
            server_port: buffer.read_u16().await?,
            next_state: buffer.read_varint().await?,
        })
    }
}

impl HandshakePacket {
    pub async fn handle<S>(self, con: &mut Connection<S>) -> Result<Outcome, ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
    {
        con.phase = match self.next_state {
            1 => Phase::Status,
            2 => Phase::Login,
            other => return Err(ProtocolError::InvalidNextState(other)),
        };
        Ok(Outcome::Continue)
    }
}
