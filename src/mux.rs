//! Wraps the disguised transport in a `yamux` server-role session and hands each
//! accepted inner stream off to [`crate::proxy`].
//!
//! `yamux` (the multiplexer spec.md names as its reference implementation) speaks the
//! `futures` I/O traits rather than tokio's; `tokio_util::compat` bridges both
//! directions, exactly as this codebase already uses it to bridge `tonic`/`hyper`
//! style async I/O elsewhere.

use tokio_util::compat::{FuturesAsyncReadCompatExt, TokioAsyncReadCompatExt};
use tracing::{debug, instrument, warn};
use yamux::{Config as YamuxConfig, Connection, Mode};

/// Runs a yamux server session over `io` until the transport closes, spawning one
/// [`crate::proxy::serve`] task per accepted inner stream.
#[instrument(skip_all)]
pub async fn run<T>(io: T)
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let mut connection = Connection::new(io.compat(), YamuxConfig::default(), Mode::Server);

    loop {
        let accepted = futures::future::poll_fn(|cx| connection.poll_next_inbound(cx)).await;
        match accepted {
            Some(Ok(stream)) => {
                tokio::spawn(crate::proxy::serve(stream.compat()));
            }
            Some(Err(err)) => {
                warn!(?err, "mux session ended with an error");
                return;
            }
            None => {
                debug!("mux session closed");
                return;
            }
        }
    }
}
