//! Status JSON shape and the ambient online-count simulator.
//!
//! Mirrors this codebase's existing status types one-for-one, trimmed to the fields
//! spec'd here and extended with a `favicon` populated from a PNG read once per
//! status request.

use crate::config::Config;
use base64::Engine;
use rand::Rng;
use rand::rand_core::UnwrapErr;
use rand::rngs::OsRng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, interval};

#[derive(Debug, Serialize)]
pub struct ServerVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Serialize)]
pub struct ServerPlayers {
    pub max: i32,
    pub online: i32,
}

#[derive(Debug, Serialize)]
pub struct Description {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub version: ServerVersion,
    pub players: ServerPlayers,
    pub description: Description,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

/// Shared status state: the handful of config fields a status response needs, plus the
/// mutex-guarded online-count the simulator task nudges over time.
pub struct StatusState {
    version_name: String,
    protocol_id: i32,
    max_players: i32,
    motd: String,
    icon_path: Option<String>,
    online_min: i32,
    online_max: i32,
    current_online: Mutex<i32>,
}

impl StatusState {
    pub fn new(config: &Config) -> Self {
        let current_online = (config.online_min + config.online_max) / 2;
        Self {
            version_name: config.version_name.clone(),
            protocol_id: config.protocol_id,
            max_players: config.max_players,
            motd: config.motd.clone(),
            icon_path: config.icon_path.clone(),
            online_min: config.online_min,
            online_max: config.online_max,
            current_online: Mutex::new(current_online),
        }
    }

    /// Builds the status JSON payload, reading the current online count under the lock
    /// and the favicon file (if configured) fresh on every call.
    pub async fn build(&self) -> ServerStatus {
        let online = *self.current_online.lock().await;
        let favicon = self.load_favicon().await;

        ServerStatus {
            version: ServerVersion {
                name: self.version_name.clone(),
                protocol: self.protocol_id,
            },
            players: ServerPlayers {
                max: self.max_players,
                online,
            },
            description: Description {
                text: self.motd.clone(),
            },
            favicon,
        }
    }

    async fn load_favicon(&self) -> Option<String> {
        let path = self.icon_path.as_ref()?;
        let bytes = tokio::fs::read(path).await.ok()?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Some(format!("data:image/png;base64,{encoded}"))
    }

    /// Background task nudging `current_online` within `[online_min, online_max]`
    /// on a timer; the only writer of the shared count.
    pub async fn run_simulator(self: Arc<Self>) {
        let mut ticker = interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            let mut online = self.current_online.lock().await;
            let mut rng = UnwrapErr(OsRng);
            let step = rng.random_range(-1..=1);
            *online = (*online + step).clamp(self.online_min, self.online_max);
        }
    }
}
