//! Status-phase packets: the server-list ping exchange.

use crate::codec::{AsyncReadPacket, AsyncWritePacket, CodecError, InboundPacket, OutboundPacket, Packet};
use crate::connection::Connection;
use crate::protocol::{Outcome, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug)]
pub struct StatusRequestPacket;

impl Packet for StatusRequestPacket {
    fn packet_id() -> usize {
        0x00
    }
}

impl InboundPacket for StatusRequestPacket {
    async fn read_from_buffer<R>(_buffer: &mut R) -> Result<Self, CodecError>
    where
        R: AsyncRead + Unpin + Send + Sync,
    {
        Ok(Self)
    }
}

impl StatusRequestPacket {
    pub async fn handle<S>(self, con: &mut Connection<S>) -> Result<Outcome, ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
    {
        let status = con.status.build().await;
        let json = serde_json::to_string(&status).expect("status serializes to JSON");
        con.stream
            .write_packet(StatusResponsePacket { json })
            .await?;
        Ok(Outcome::Continue)
    }
}

#[derive(Debug)]
pub struct StatusResponsePacket {
    pub json: String,
}

impl Packet for StatusResponsePacket {
    fn packet_id() -> usize {
        0x00
    }
}

impl OutboundPacket for StatusResponsePacket {
    async fn write_to_buffer<W>(&self, buffer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin + Send + Sync,
    {
        buffer.write_string(&self.json).await
    }
}

#[derive(Debug)]
pub struct PingPacket {
    pub payload: i64,
}

impl Packet for PingPacket {
    fn packet_id() -> usize {
        0x01
    }
}

impl InboundPacket for PingPacket {
    async fn read_from_buffer<R>(buffer: &mut R) -> Result<Self, CodecError>
    where
        R: AsyncRead + Unpin + Send + Sync,
    {
        Ok(Self {
            payload: buffer.read_i64().await?,
        })
    }
}

impl PingPacket {
    pub async fn handle<S>(self, con: &mut Connection<S>) -> Result<Outcome, ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
    {
        con.stream
            .write_packet(PongPacket {
                payload: self.payload,
            })
            .await?;
        Ok(Outcome::Close)
    }
}

#[derive(Debug)]
pub struct PongPacket {
    pub payload: i64,
}

impl Packet for PongPacket {
    fn packet_id() -> usize {
        0x01
    }
}

impl OutboundPacket for PongPacket {
    async fn write_to_buffer<W>(&self, buffer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin + Send + Sync,
    {
        buffer.write_i64(self.payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn ping_payload_roundtrips() {
        let mut buf: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        buf.write_i64(-559038737).await.unwrap();
        buf.set_position(0);
        let packet = PingPacket::read_from_buffer(&mut buf).await.unwrap();
        assert_eq!(packet.payload, -559038737);
    }
}
