//! The disguised tunnel transport: post-login handshake, encrypted inner stream
//! carried inside fabricated Chunk Data packets, and Keep-Alive/Time-Update
//! housekeeping.
//!
//! Rather than implementing `AsyncRead`/`AsyncWrite` by hand over the raw socket (as
//! this codebase's own `cipher_stream` wrapper does for its simpler per-byte cipher),
//! the encode/decode work here runs in dedicated tasks either side of a
//! `tokio::io::duplex` pipe — the "one bounded byte-channel between ingest and mux"
//! this crate's design calls for. The duplex's outward half is handed to
//! [`crate::mux::MuxSession`]; its inward half is read and written only by the tasks
//! spawned here.

use crate::codec::{AsyncReadPacket, AsyncWritePacket, CodecError, OutboundPacket, Packet};
use crate::crypto;
use crate::motion::MotionState;
use aes_gcm::{Aes256Gcm, Key};
use std::io::Cursor;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{Duration, interval};
use tracing::debug;
use uuid::Uuid;

/// Inner pipe capacity between packet ingest/encode and the mux session.
const PIPE_CAPACITY: usize = 256 * 1024;
/// Largest plaintext chunk sealed into a single Chunk Data packet.
const MAX_CHUNK_PLAINTEXT: usize = 16 * 1024;

const PLUGIN_MESSAGE_ID: i32 = 0x0D;
const TUNNEL_CHANNELS: [&str; 2] = ["minecraft:brand", "minewire:tunnel"];

/// Spawns the handshake sequence and all housekeeping/codec tasks for one
/// authenticated connection, returning the duplex half that [`crate::mux::MuxSession`]
/// should wrap. Dropping or aborting the returned task ends every task it spawned and,
/// since the raw socket is only reachable from within them, closes the connection.
pub async fn spawn<S>(
    socket: S,
    secret: &str,
    username: String,
) -> std::io::Result<(DuplexStream, tokio::task::JoinHandle<()>)>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let key = crypto::derive_key(secret);
    let (read_half, write_half) = tokio::io::split(socket);
    let write_half = Arc::new(Mutex::new(write_half));
    let motion = Arc::new(Mutex::new(MotionState::new()));

    {
        let mut guard = write_half.lock().await;
        guard
            .write_packet(LoginSuccessPacket {
                uuid: Uuid::new_v4(),
                username,
            })
            .await?;
        guard.write_packet(JoinGamePacket).await?;
        let snapshot = *motion.lock().await;
        guard
            .write_packet(PlayerPositionPacket::from(&snapshot))
            .await?;
    }

    let (mux_io, internal_io) = tokio::io::duplex(PIPE_CAPACITY);
    let (internal_read, internal_write) = tokio::io::split(internal_io);

    let handle = tokio::spawn(run_session(
        read_half,
        write_half,
        internal_read,
        internal_write,
        motion,
        key,
    ));

    Ok((mux_io, handle))
}

async fn run_session<S>(
    read_half: ReadHalf<S>,
    write_half: Arc<Mutex<WriteHalf<S>>>,
    internal_read: ReadHalf<DuplexStream>,
    internal_write: WriteHalf<DuplexStream>,
    motion: Arc<Mutex<MotionState>>,
    key: Key<Aes256Gcm>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut tasks = JoinSet::new();
    tasks.spawn(ingest_loop(read_half, internal_write, key));
    tasks.spawn(outbound_loop(internal_read, write_half.clone(), motion.clone(), key));
    tasks.spawn(keep_alive_loop(write_half.clone()));
    tasks.spawn(time_update_loop(write_half, motion));

    // any task ending (error or the socket closing) means the session is over; tear
    // down the rest so nothing outlives it.
    tasks.join_next().await;
    tasks.abort_all();
}

async fn ingest_loop<S>(
    mut read_half: ReadHalf<S>,
    mut internal_write: WriteHalf<DuplexStream>,
    key: Key<Aes256Gcm>,
) where
    S: AsyncRead + Unpin + Send + 'static,
{
    loop {
        let (packet_id, cursor) = match read_half.read_frame().await {
            Ok(frame) => frame,
            Err(_) => return,
        };

        if packet_id != PLUGIN_MESSAGE_ID {
            continue;
        }

        if let Err(err) = handle_plugin_message(cursor, &mut internal_write, &key).await {
            debug!(?err, "dropping malformed inbound plugin message");
        }
    }
}

async fn handle_plugin_message(
    mut cursor: Cursor<Vec<u8>>,
    internal_write: &mut WriteHalf<DuplexStream>,
    key: &Key<Aes256Gcm>,
) -> Result<(), CodecError> {
    let channel = cursor.read_string().await?;
    if !TUNNEL_CHANNELS.contains(&channel.as_str()) {
        return Ok(());
    }

    let position = cursor.position() as usize;
    let body = &cursor.get_ref()[position..];
    if body.len() < crypto::NONCE_LEN {
        debug!("dropping plugin message shorter than the nonce");
        return Ok(());
    }

    match crypto::open(key, body) {
        Ok(plaintext) => {
            internal_write.write_all(&plaintext).await?;
            Ok(())
        }
        Err(_) => {
            debug!("dropping plugin message that failed authentication");
            Ok(())
        }
    }
}

async fn outbound_loop<S>(
    mut internal_read: ReadHalf<DuplexStream>,
    write_half: Arc<Mutex<WriteHalf<S>>>,
    motion: Arc<Mutex<MotionState>>,
    key: Key<Aes256Gcm>,
) where
    S: AsyncWrite + Unpin + Send + 'static,
{
    let mut buffer = vec![0u8; MAX_CHUNK_PLAINTEXT];
    loop {
        let n = match internal_read.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };

        let sealed = crypto::seal(&key, &buffer[..n]);
        let snapshot = *motion.lock().await;
        let packet = ChunkDataPacket::new(&snapshot, sealed);

        let mut guard = write_half.lock().await;
        if guard.write_packet(packet).await.is_err() {
            return;
        }
    }
}

async fn keep_alive_loop<S>(write_half: Arc<Mutex<WriteHalf<S>>>)
where
    S: AsyncWrite + Unpin + Send + 'static,
{
    let mut ticker = interval(Duration::from_secs(10));
    loop {
        ticker.tick().await;
        let payload = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);

        let mut guard = write_half.lock().await;
        if guard.write_packet(KeepAlivePacket { payload }).await.is_err() {
            return;
        }
    }
}

async fn time_update_loop<S>(write_half: Arc<Mutex<WriteHalf<S>>>, motion: Arc<Mutex<MotionState>>)
where
    S: AsyncWrite + Unpin + Send + 'static,
{
    let mut ticker = interval(Duration::from_secs(20));
    let mut world_age: i64 = 0;
    loop {
        ticker.tick().await;
        world_age += 400;
        let time_of_day = (-world_age).rem_euclid(24000);

        {
            let mut guard = write_half.lock().await;
            let result = guard
                .write_packet(TimeUpdatePacket {
                    world_age,
                    time_of_day,
                })
                .await;
            if result.is_err() {
                return;
            }
        }

        motion.lock().await.update();
    }
}

#[derive(Debug)]
struct LoginSuccessPacket {
    uuid: Uuid,
    username: String,
}

impl Packet for LoginSuccessPacket {
    fn packet_id() -> usize {
        0x02
    }
}

impl OutboundPacket for LoginSuccessPacket {
    async fn write_to_buffer<W>(&self, buffer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin + Send + Sync,
    {
        buffer.write_all(self.uuid.as_bytes()).await?;
        buffer.write_string(&self.username).await?;
        buffer.write_varint(0).await?;
        Ok(())
    }
}

#[derive(Debug)]
struct JoinGamePacket;

impl Packet for JoinGamePacket {
    fn packet_id() -> usize {
        0x29
    }
}

impl OutboundPacket for JoinGamePacket {
    async fn write_to_buffer<W>(&self, buffer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin + Send + Sync,
    {
        buffer.write_i32(100).await?;
        buffer.write_bool(false).await?;
        buffer.write_varint(1).await?;
        buffer.write_string("minecraft:overworld").await?;
        buffer.write_varint(0).await?;
        buffer.write_varint(8).await?;
        buffer.write_varint(8).await?;
        buffer.write_bool(false).await?;
        buffer.write_bool(true).await?;
        buffer.write_bool(false).await?;
        buffer.write_varint(0).await?;
        buffer.write_string("minecraft:overworld").await?;
        buffer.write_i64(123_456_789).await?;
        buffer.write_u8(1).await?;
        buffer.write_u8(0xFF).await?;
        buffer.write_bool(false).await?;
        buffer.write_bool(false).await?;
        buffer.write_bool(false).await?;
        buffer.write_varint(0).await?;
        buffer.write_varint(63).await?;
        buffer.write_bool(false).await?;
        Ok(())
    }
}

#[derive(Debug)]
struct PlayerPositionPacket {
    x: f64,
    y: f64,
    z: f64,
    yaw: f32,
}

impl PlayerPositionPacket {
    fn from(motion: &MotionState) -> Self {
        Self {
            x: motion.x,
            y: motion.y,
            z: motion.z,
            yaw: motion.angle.to_degrees() as f32,
        }
    }
}

impl Packet for PlayerPositionPacket {
    fn packet_id() -> usize {
        0x3E
    }
}

impl OutboundPacket for PlayerPositionPacket {
    async fn write_to_buffer<W>(&self, buffer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin + Send + Sync,
    {
        buffer.write_f64(self.x).await?;
        buffer.write_f64(self.y).await?;
        buffer.write_f64(self.z).await?;
        buffer.write_f32(self.yaw).await?;
        buffer.write_f32(0.0).await?; // pitch
        buffer.write_u8(0).await?; // flags
        buffer.write_varint(0).await?; // teleport_id
        Ok(())
    }
}

#[derive(Debug)]
struct KeepAlivePacket {
    payload: i64,
}

impl Packet for KeepAlivePacket {
    fn packet_id() -> usize {
        0x24
    }
}

impl OutboundPacket for KeepAlivePacket {
    async fn write_to_buffer<W>(&self, buffer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin + Send + Sync,
    {
        buffer.write_i64(self.payload).await?;
        Ok(())
    }
}

#[derive(Debug)]
struct TimeUpdatePacket {
    world_age: i64,
    time_of_day: i64,
}

impl Packet for TimeUpdatePacket {
    fn packet_id() -> usize {
        0x62
    }
}

impl OutboundPacket for TimeUpdatePacket {
    async fn write_to_buffer<W>(&self, buffer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin + Send + Sync,
    {
        buffer.write_i64(self.world_age).await?;
        buffer.write_i64(self.time_of_day).await?;
        Ok(())
    }
}

#[derive(Debug)]
struct ChunkDataPacket {
    chunk_x: i32,
    chunk_z: i32,
    sealed: Vec<u8>,
}

impl ChunkDataPacket {
    fn new(motion: &MotionState, sealed: Vec<u8>) -> Self {
        Self {
            chunk_x: (motion.x.floor() as i32) >> 4,
            chunk_z: (motion.z.floor() as i32) >> 4,
            sealed,
        }
    }
}

impl Packet for ChunkDataPacket {
    fn packet_id() -> usize {
        0x25
    }
}

impl OutboundPacket for ChunkDataPacket {
    async fn write_to_buffer<W>(&self, buffer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin + Send + Sync,
    {
        buffer.write_i32(self.chunk_x).await?;
        buffer.write_i32(self.chunk_z).await?;

        buffer.write_u8(0x0A).await?; // TAG_Compound
        buffer.write_u8(0x00).await?;
        buffer.write_u8(0x00).await?; // empty name

        buffer.write_u8(0x0C).await?; // TAG_Long_Array
        buffer.write_short_string("MOTION_BLOCKING").await?;
        buffer.write_i32(37).await?;
        for long in pack_heights(64) {
            buffer.write_i64(long).await?;
        }

        buffer.write_u8(0x00).await?; // TAG_End

        buffer.write_bytes(&self.sealed).await?;

        for _ in 0..7 {
            buffer.write_varint(0).await?;
        }

        Ok(())
    }
}

/// Packs 256 9-bit values (all equal to `value`) into the 37-long `MOTION_BLOCKING`
/// layout: 7 values per long at bit offsets `0, 9, 18, ..., 54`; the last long is
/// only partially filled.
fn pack_heights(value: u16) -> [i64; 37] {
    let mut longs = [0i64; 37];
    for position in 0..256usize {
        let long_index = position / 7;
        let shift = (position % 7) * 9;
        longs[long_index] |= ((value & 0x1FF) as i64) << shift;
    }
    longs
}

/// Inverse of [`pack_heights`], used only by tests to verify the packing invariant.
#[cfg(test)]
fn unpack_heights(longs: &[i64; 37]) -> [u16; 256] {
    let mut values = [0u16; 256];
    for position in 0..256usize {
        let long_index = position / 7;
        let shift = (position % 7) * 9;
        values[position] = ((longs[long_index] >> shift) & 0x1FF) as u16;
    }
    values
}
