//! Login-phase packets: name-based authentication against the configured secrets.

use crate::codec::{AsyncReadPacket, AsyncWritePacket, CodecError, InboundPacket, OutboundPacket, Packet};
use crate::connection::Connection;
use crate::protocol::{Outcome, ProtocolError};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug)]
pub struct LoginStartPacket {
    pub name: String,
}

impl Packet for LoginStartPacket {
    fn packet_id() -> usize {
        0x00
    }
}

impl InboundPacket for LoginStartPacket {
    async fn read_from_buffer<R>(buffer: &mut R) -> Result<Self, CodecError>
    where
        R: AsyncRead + Unpin + Send + Sync,
    {
        Ok(Self {
            name: buffer.read_string().await?,
        })
    }
}

impl LoginStartPacket {
    pub async fn handle<S>(self, con: &mut Connection<S>) -> Result<Outcome, ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
    {
        match con.authenticator.secret_for_identifier(&self.name) {
            Some(secret) => Ok(Outcome::Authenticated {
                secret: secret.to_string(),
                identifier: self.name,
            }),
            None => {
                con.stream
                    .write_packet(LoginDisconnectPacket {
                        reason: "Unauthorized".to_string(),
                    })
                    .await?;
                Ok(Outcome::Close)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct DisconnectReason<'a> {
    text: &'a str,
}

#[derive(Debug)]
pub struct LoginDisconnectPacket {
    pub reason: String,
}

impl Packet for LoginDisconnectPacket {
    fn packet_id() -> usize {
        0x00
    }
}

impl OutboundPacket for LoginDisconnectPacket {
    async fn write_to_buffer<W>(&self, buffer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin + Send + Sync,
    {
        let json = serde_json::to_string(&DisconnectReason { text: &self.reason })
            .expect("disconnect reason serializes to JSON");
        buffer.write_string(&json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn login_start_reads_name() {
        let mut buf: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        buf.write_string("Evil").await.unwrap();
        buf.set_position(0);
        let packet = LoginStartPacket::read_from_buffer(&mut buf).await.unwrap();
        assert_eq!(packet.name, "Evil");
    }

    #[tokio::test]
    async fn disconnect_payload_is_json_text() {
        let mut buf: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        let packet = LoginDisconnectPacket {
            reason: "Unauthorized".to_string(),
        };
        packet.write_to_buffer(&mut buf).await.unwrap();
        buf.set_position(0);
        let json = buf.read_string().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["text"], "Unauthorized");
    }
}
