//! Minecraft wire-format primitives: `VarInt`, length-prefixed strings, fixed-width
//! numerics, and the outer packet frame.
//!
//! This mirrors the packet layer of a typical Minecraft proxy: codec operations are
//! exposed as extension traits over any [`AsyncRead`]/[`AsyncWrite`], and individual
//! packets implement [`InboundPacket`]/[`OutboundPacket`] on top of those primitives.
//! The codec itself is pure and deterministic; it never inspects connection state.

use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Minecraft's protocol cap on string length, in bytes.
pub const MAX_STRING_LEN: usize = 32_773;

/// Maximum accepted outer packet length (§3 of the spec). Larger frames close the connection.
pub const MAX_PACKET_LENGTH: usize = 1_048_576;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("error reading or writing data: {0}")]
    Io(#[from] std::io::Error),
    #[error("VarInt did not terminate within 5 bytes")]
    Overlong,
    #[error("declared length {0} exceeds the protocol maximum")]
    TooLarge(usize),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("illegal packet length: {0}")]
    IllegalPacketLength(usize),
    #[error("illegal packet ID: {actual:#04x} (expected {expected:#04x})")]
    IllegalPacketId { expected: usize, actual: usize },
}

/// A network packet identified by a fixed ID within its direction and phase.
pub trait Packet {
    fn packet_id() -> usize;
}

/// Packets written from the server side.
pub trait OutboundPacket: Packet {
    async fn write_to_buffer<W>(&self, buffer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin + Send + Sync;
}

/// Packets read from the client side.
pub trait InboundPacket: Packet + Sized {
    async fn read_from_buffer<R>(buffer: &mut R) -> Result<Self, CodecError>
    where
        R: AsyncRead + Unpin + Send + Sync;
}

/// Extension trait writing the Minecraft primitives onto any [`AsyncWrite`].
pub trait AsyncWritePacket {
    async fn write_packet<T: OutboundPacket + Send + Sync>(
        &mut self,
        packet: T,
    ) -> Result<(), CodecError>;
    async fn write_varint(&mut self, value: i32) -> Result<(), CodecError>;
    async fn write_string(&mut self, value: &str) -> Result<(), CodecError>;
    async fn write_short_string(&mut self, value: &str) -> Result<(), CodecError>;
    async fn write_bool(&mut self, value: bool) -> Result<(), CodecError>;
    async fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError>;
}

impl<W: AsyncWrite + Unpin + Send + Sync> AsyncWritePacket for W {
    async fn write_packet<T: OutboundPacket + Send + Sync>(
        &mut self,
        packet: T,
    ) -> Result<(), CodecError> {
        // buffer the packet id and payload so the outer length prefix can be computed
        let mut body: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        body.write_varint(T::packet_id() as i32).await?;
        packet.write_to_buffer(&mut body).await?;

        let inner = body.into_inner();
        self.write_varint(inner.len() as i32).await?;
        self.write_all(&inner).await?;

        Ok(())
    }

    async fn write_varint(&mut self, value: i32) -> Result<(), CodecError> {
        let mut int = value as u32;
        loop {
            let mut byte = (int & 0b0111_1111) as u8;
            int >>= 7;
            if int != 0 {
                byte |= 0b1000_0000;
            }
            self.write_u8(byte).await?;
            if int == 0 {
                break;
            }
        }
        Ok(())
    }

    async fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_varint(value.len() as i32).await?;
        self.write_all(value.as_bytes()).await?;
        Ok(())
    }

    async fn write_short_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_u16(value.len() as u16).await?;
        self.write_all(value.as_bytes()).await?;
        Ok(())
    }

    async fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.write_u8(value as u8).await?;
        Ok(())
    }

    async fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
        self.write_varint(value.len() as i32).await?;
        self.write_all(value).await?;
        Ok(())
    }
}

/// Extension trait reading the Minecraft primitives from any [`AsyncRead`].
pub trait AsyncReadPacket {
    async fn read_packet<T: InboundPacket + Send + Sync>(&mut self) -> Result<T, CodecError>;
    /// Reads one length-prefixed frame and splits off its packet ID, returning the ID and
    /// a cursor over the remaining payload. Used where the packet type isn't known until
    /// the ID has been inspected (connection-level dispatch).
    async fn read_frame(&mut self) -> Result<(i32, Cursor<Vec<u8>>), CodecError>;
    async fn read_varint(&mut self) -> Result<i32, CodecError>;
    async fn read_string(&mut self) -> Result<String, CodecError>;
    async fn read_bool(&mut self) -> Result<bool, CodecError>;
    async fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError>;
}

impl<R: AsyncRead + Unpin + Send + Sync> AsyncReadPacket for R {
    async fn read_packet<T: InboundPacket + Send + Sync>(&mut self) -> Result<T, CodecError> {
        let (packet_id, mut cursor) = self.read_frame().await?;
        let expected = T::packet_id();
        if packet_id as usize != expected {
            return Err(CodecError::IllegalPacketId {
                expected,
                actual: packet_id as usize,
            });
        }

        T::read_from_buffer(&mut cursor).await
    }

    async fn read_frame(&mut self) -> Result<(i32, Cursor<Vec<u8>>), CodecError> {
        let length = self.read_varint().await?;
        if length <= 0 || length as usize > MAX_PACKET_LENGTH {
            return Err(CodecError::IllegalPacketLength(length.max(0) as usize));
        }

        let mut buffer = vec![0u8; length as usize];
        self.read_exact(&mut buffer).await?;
        let mut cursor = Cursor::new(buffer);

        let packet_id = cursor.read_varint().await?;
        Ok((packet_id, cursor))
    }

    async fn read_varint(&mut self) -> Result<i32, CodecError> {
        let mut result: u32 = 0;
        for i in 0..5 {
            let byte = self.read_u8().await?;
            result |= ((byte & 0b0111_1111) as u32) << (7 * i);
            if byte & 0b1000_0000 == 0 {
                return Ok(result as i32);
            }
        }
        Err(CodecError::Overlong)
    }

    async fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_varint().await?;
        if len < 0 || len as usize > MAX_STRING_LEN {
            return Err(CodecError::TooLarge(len.max(0) as usize));
        }

        let mut buffer = vec![0u8; len as usize];
        self.read_exact(&mut buffer).await?;
        String::from_utf8(buffer).map_err(|_| CodecError::InvalidUtf8)
    }

    async fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8().await? != 0)
    }

    async fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_varint().await?;
        if len < 0 {
            return Err(CodecError::TooLarge(0));
        }

        let mut buffer = vec![0u8; len as usize];
        self.read_exact(&mut buffer).await?;
        Ok(buffer)
    }
}
