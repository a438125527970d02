//! For each accepted inner stream, reads its destination address and copies bytes
//! bidirectionally to a freshly dialed TCP connection.

use crate::codec::AsyncReadPacket;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tracing::debug;

const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Drives one inner stream end-to-end: reads its destination, dials it, and copies
/// bytes both ways until either side closes. Malformed destinations and dial failures
/// only drop this stream — the session stays healthy.
pub async fn serve<T>(mut stream: T)
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let destination = match stream.read_string().await {
        Ok(destination) => destination,
        Err(err) => {
            debug!(?err, "dropping inner stream with a malformed destination frame");
            return;
        }
    };

    let mut outbound = match timeout(DIAL_TIMEOUT, TcpStream::connect(&destination)).await {
        Ok(Ok(outbound)) => outbound,
        Ok(Err(err)) => {
            debug!(%destination, ?err, "dropping inner stream after a dial failure");
            return;
        }
        Err(_) => {
            debug!(%destination, "dropping inner stream after a dial timeout");
            return;
        }
    };

    if let Err(err) = tokio::io::copy_bidirectional(&mut stream, &mut outbound).await {
        debug!(%destination, ?err, "inner stream proxy ended with an error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::AsyncWritePacket;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn proxies_bytes_to_dialed_destination() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let echo = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });

        let (mut client, inner) = duplex(1024);
        client.write_string(&addr.to_string()).await.unwrap();
        client.write_all(b"hello").await.unwrap();

        let serve_task = tokio::spawn(serve(inner));

        let mut echoed = [0u8; 5];
        client.read_exact(&mut echoed).await.unwrap();
        assert_eq!(&echoed, b"hello");

        drop(client);
        let _ = serve_task.await;
        echo.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_destination_drops_stream_without_panicking() {
        let (client, inner) = duplex(1024);
        drop(client); // EOF before any destination frame arrives
        serve(inner).await;
    }
}
