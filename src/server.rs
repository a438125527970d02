//! TCP accept loop: one task per connection, independent of its peers.

use crate::auth::Authenticator;
use crate::connection::{Connection, RunResult};
use crate::status::StatusState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};

/// Binds the listener and runs the accept loop until `ctrl_c` or a fatal accept error.
/// Each accepted connection runs in its own task and never takes the listener down.
pub async fn serve(
    listen_port: &str,
    authenticator: Arc<Authenticator>,
    status: Arc<StatusState>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", listen_port.parse::<u16>().map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "listen_port is not a valid port number")
    })?))
    .await?;
    info!(%listen_port, "listening");

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                let authenticator = authenticator.clone();
                let status = status.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(socket, authenticator, status).await {
                        debug!(%peer, ?err, "connection ended with an error");
                    }
                });
            }
        }
    }
}

#[instrument(skip_all, fields(peer))]
async fn handle_connection(
    socket: tokio::net::TcpStream,
    authenticator: Arc<Authenticator>,
    status: Arc<StatusState>,
) -> Result<(), crate::protocol::ProtocolError> {
    let mut connection = Connection::new(socket, authenticator, status);

    match connection.run().await {
        Ok(RunResult::Closed) => Ok(()),
        Ok(RunResult::Authenticated { secret, identifier }) => {
            let socket = connection.stream;
            socket.set_nodelay(true).ok();
            socket2::SockRef::from(&socket)
                .set_keepalive(true)
                .ok();

            let (mux_io, transport_handle) = match crate::transport::spawn(socket, &secret, identifier).await {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(?err, "failed to start disguised transport");
                    return Ok(());
                }
            };

            crate::mux::run(mux_io).await;
            transport_handle.abort();
            Ok(())
        }
        Err(err) => Err(err),
    }
}
