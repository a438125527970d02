//! Minewire: a TCP tunneling proxy disguised as a Minecraft Java Edition server.

pub mod auth;
pub mod codec;
pub mod config;
pub mod connection;
pub mod crypto;
pub mod motion;
pub mod mux;
pub mod protocol;
pub mod proxy;
pub mod server;
pub mod status;
pub mod subs;
pub mod transport;

use std::sync::Arc;
use tracing::{error, info};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("authenticator configuration error: {0}")]
    Auth(#[from] auth::Error),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Boots the authenticator and status state from `config`, then runs the main listener
/// (and, if configured, the subscription endpoint) until shutdown.
pub async fn start(config: config::Config) -> Result<(), Error> {
    let authenticator = Arc::new(auth::Authenticator::new(config.credentials())?);
    let status = Arc::new(status::StatusState::new(&config));

    tokio::spawn(status.clone().run_simulator());

    if let Some(subs_listen_port) = config.subs_listen_port.clone() {
        let authenticator = authenticator.clone();
        let listen_port = config.listen_port.clone();
        tokio::spawn(async move {
            if let Err(err) = subs::serve(&subs_listen_port, &listen_port, authenticator).await {
                error!(?err, "subscription endpoint exited");
            }
        });
    }

    info!(listen_port = %config.listen_port, "minewire starting");
    server::serve(&config.listen_port, authenticator, status).await?;
    Ok(())
}
