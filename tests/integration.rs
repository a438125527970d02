//! End-to-end test of the front end and the disguised transport together: a simulated
//! client drives a handshake and login over a duplex pipe, then exchanges encrypted
//! tunnel payloads with the transport's plaintext boundary (the same boundary
//! `crate::mux` wraps in a yamux session in production).
//!
//! Mirrors this crate's own duplex-based "simulate a client" tests, just driven past
//! the front end into the tunnel.

use minewire::auth::{Authenticator, Credential, derive_identifier};
use minewire::codec::{AsyncReadPacket, AsyncWritePacket};
use minewire::config::Config;
use minewire::connection::{Connection, RunResult};
use minewire::crypto;
use minewire::status::StatusState;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, duplex};

const SECRET: &str = "hunter2";

fn status_state() -> Arc<StatusState> {
    let config: Config = serde_yml::from_str(
        r#"
listen_port: "25565"
passwords: []
version_name: "Minewire"
motd: "hello"
online_min: 1
online_max: 1
"#,
    )
    .unwrap();
    Arc::new(StatusState::new(&config))
}

fn authenticator() -> Arc<Authenticator> {
    Arc::new(
        Authenticator::new(vec![Credential {
            secret: SECRET.to_string(),
            nickname: None,
        }])
        .unwrap(),
    )
}

async fn send_handshake<S: AsyncWrite + Unpin>(client: &mut S, next_state: i32) {
    let mut body: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    body.write_varint(0x00).await.unwrap();
    body.write_varint(773).await.unwrap();
    body.write_string("localhost").await.unwrap();
    body.write_u16(25565).await.unwrap();
    body.write_varint(next_state).await.unwrap();
    let body = body.into_inner();
    client.write_varint(body.len() as i32).await.unwrap();
    client.write_all(&body).await.unwrap();
}

async fn send_login<S: AsyncWrite + Unpin>(client: &mut S, name: &str) {
    let mut body: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    body.write_varint(0x00).await.unwrap();
    body.write_string(name).await.unwrap();
    let body = body.into_inner();
    client.write_varint(body.len() as i32).await.unwrap();
    client.write_all(&body).await.unwrap();
}

/// Decodes one outer frame and asserts it carries the given packet ID.
async fn expect_frame<S: AsyncRead + Unpin>(client: &mut S, expected_id: i32) -> Cursor<Vec<u8>> {
    let (packet_id, cursor) = client.read_frame().await.unwrap();
    assert_eq!(packet_id, expected_id, "unexpected packet id");
    cursor
}

/// Seals `plaintext` into a serverbound Plugin Message frame, as a disguised client
/// sending tunnel data would.
async fn send_tunnel_plaintext<S: AsyncWrite + Unpin>(
    client: &mut S,
    key: &aes_gcm::Key<aes_gcm::Aes256Gcm>,
    plaintext: &[u8],
) {
    let sealed = crypto::seal(key, plaintext);
    let mut body: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    body.write_varint(0x0D).await.unwrap();
    body.write_string("minewire:tunnel").await.unwrap();
    body.write_all(&sealed).await.unwrap();
    let body = body.into_inner();
    client.write_varint(body.len() as i32).await.unwrap();
    client.write_all(&body).await.unwrap();
}

/// Reads outer frames until a Chunk Data packet (0x25) arrives, skipping Keep-Alive /
/// Time-Update housekeeping packets, and returns its decrypted tunnel payload. Panics
/// if any packet outside the disguise's allowed ID set (spec.md's "disguise
/// integrity" scenario) shows up.
async fn recv_tunnel_plaintext<S: AsyncRead + Unpin>(
    client: &mut S,
    key: &aes_gcm::Key<aes_gcm::Aes256Gcm>,
) -> Vec<u8> {
    loop {
        let (packet_id, mut cursor) = client.read_frame().await.unwrap();
        match packet_id {
            0x24 | 0x62 => continue,
            0x25 => {
                let _chunk_x = cursor.read_i32().await.unwrap();
                let _chunk_z = cursor.read_i32().await.unwrap();
                assert_eq!(cursor.read_u8().await.unwrap(), 0x0A);
                assert_eq!(cursor.read_u16().await.unwrap(), 0);
                assert_eq!(cursor.read_u8().await.unwrap(), 0x0C);
                let name_len = cursor.read_u16().await.unwrap();
                let mut name = vec![0u8; name_len as usize];
                cursor.read_exact(&mut name).await.unwrap();
                assert_eq!(String::from_utf8(name).unwrap(), "MOTION_BLOCKING");
                let count = cursor.read_i32().await.unwrap();
                assert_eq!(count, 37);
                for _ in 0..37 {
                    cursor.read_i64().await.unwrap();
                }
                assert_eq!(cursor.read_u8().await.unwrap(), 0x00);
                let sealed = cursor.read_bytes().await.unwrap();
                return crypto::open(key, &sealed).expect("tunnel payload must decrypt");
            }
            other => panic!("disguise integrity violated: unexpected packet id {other:#04x}"),
        }
    }
}

#[tokio::test]
async fn login_accepted_then_transport_handshake() {
    let (mut client_stream, server_stream) = duplex(64 * 1024);
    let mut connection = Connection::new(server_stream, authenticator(), status_state());

    send_handshake(&mut client_stream, 2).await;
    let identifier = derive_identifier(SECRET);
    send_login(&mut client_stream, &identifier).await;

    let RunResult::Authenticated { secret, identifier: got } = connection.run().await.unwrap() else {
        panic!("expected login to succeed");
    };
    assert_eq!(secret, SECRET);
    assert_eq!(got, identifier);

    let (_mux_io, transport_handle) =
        minewire::transport::spawn(connection.stream, &secret, identifier)
            .await
            .unwrap();

    expect_frame(&mut client_stream, 0x02).await; // Login Success
    expect_frame(&mut client_stream, 0x29).await; // Join Game
    expect_frame(&mut client_stream, 0x3E).await; // Player Position

    transport_handle.abort();
}

#[tokio::test]
async fn login_rejected_then_connection_closes() {
    let (mut client_stream, server_stream) = duplex(4096);
    let mut connection = Connection::new(server_stream, authenticator(), status_state());

    send_handshake(&mut client_stream, 2).await;
    send_login(&mut client_stream, "Evil").await;

    let mut cursor = expect_frame(&mut client_stream, 0x00).await;
    let json = cursor.read_string().await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["text"], "Unauthorized");

    assert!(matches!(connection.run().await.unwrap(), RunResult::Closed));
}

#[tokio::test]
async fn tunnel_round_trip_through_disguised_transport() {
    let (mut client_stream, server_stream) = duplex(64 * 1024);
    let mut connection = Connection::new(server_stream, authenticator(), status_state());

    send_handshake(&mut client_stream, 2).await;
    let identifier = derive_identifier(SECRET);
    send_login(&mut client_stream, &identifier).await;

    let RunResult::Authenticated { secret, identifier } = connection.run().await.unwrap() else {
        panic!("expected login to succeed");
    };

    let (mux_io, transport_handle) =
        minewire::transport::spawn(connection.stream, &secret, identifier)
            .await
            .unwrap();
    let (mut mux_read, mut mux_write) = tokio::io::split(mux_io);

    expect_frame(&mut client_stream, 0x02).await;
    expect_frame(&mut client_stream, 0x29).await;
    expect_frame(&mut client_stream, 0x3E).await;

    let key = crypto::derive_key(&secret);

    // inbound: client -> encrypted plugin message -> decrypted onto the mux pipe.
    send_tunnel_plaintext(&mut client_stream, &key, b"hello from the client").await;
    let mut received = vec![0u8; "hello from the client".len()];
    mux_read.read_exact(&mut received).await.unwrap();
    assert_eq!(&received, b"hello from the client");

    // outbound: mux pipe -> chunk-data packet -> client decrypts.
    mux_write.write_all(b"hello from the server").await.unwrap();
    let plaintext = recv_tunnel_plaintext(&mut client_stream, &key).await;
    assert_eq!(plaintext, b"hello from the server");

    // a corrupted MAC is dropped silently; later correctly-sealed packets still
    // arrive (spec.md's "authentication drop" scenario).
    let mut tampered: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    tampered.write_varint(0x0D).await.unwrap();
    tampered.write_string("minewire:tunnel").await.unwrap();
    let mut sealed = crypto::seal(&key, b"tampered");
    let last = sealed.len() - 1;
    sealed[last] ^= 0xFF;
    tampered.write_all(&sealed).await.unwrap();
    let tampered = tampered.into_inner();
    client_stream.write_varint(tampered.len() as i32).await.unwrap();
    client_stream.write_all(&tampered).await.unwrap();

    send_tunnel_plaintext(&mut client_stream, &key, b"still here").await;
    let mut received = vec![0u8; "still here".len()];
    mux_read.read_exact(&mut received).await.unwrap();
    assert_eq!(&received, b"still here");

    transport_handle.abort();
}
