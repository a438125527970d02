//! Layered configuration loading.
//!
//! Reads `server.yaml` from the working directory, overridable by `MINEWIRE_*`
//! environment variables, following this codebase's existing `Config::read`
//! layering convention (environment on top of a config file, both optional,
//! falling back to field defaults).

use serde::Deserialize;
use std::collections::HashMap;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// One `passwords` list entry: either a bare secret, or a `{secret: nickname}` mapping
/// where the map's single key is the secret and its value is the nickname.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PasswordEntry {
    Bare(String),
    Labeled(HashMap<String, String>),
}

impl PasswordEntry {
    fn into_credential(self) -> crate::auth::Credential {
        match self {
            PasswordEntry::Bare(secret) => crate::auth::Credential {
                secret,
                nickname: None,
            },
            PasswordEntry::Labeled(map) => {
                let (secret, nickname) = map
                    .into_iter()
                    .next()
                    .expect("a labeled password entry has exactly one key");
                crate::auth::Credential {
                    secret,
                    nickname: Some(nickname),
                }
            }
        }
    }
}

fn default_protocol_id() -> i32 {
    773
}

fn default_max_players() -> i32 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub listen_port: String,
    passwords: Vec<PasswordEntry>,
    pub version_name: String,
    #[serde(default = "default_protocol_id")]
    pub protocol_id: i32,
    pub icon_path: Option<String>,
    pub motd: String,
    #[serde(default = "default_max_players")]
    pub max_players: i32,
    pub online_min: i32,
    pub online_max: i32,
    pub subs_listen_port: Option<String>,
}

impl Config {
    /// Loads configuration from `server.yaml` in the working directory, layered under
    /// `MINEWIRE_`-prefixed environment variables. The separator is `__` (not `_`) so
    /// that multi-word keys like `listen_port` stay flat fields instead of `config`
    /// reading each underscore as a nesting boundary.
    pub fn read() -> Result<Self, Error> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("MINEWIRE").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Consumes the raw `passwords` list into [`crate::auth::Credential`] values.
    pub fn credentials(&self) -> Vec<crate::auth::Credential> {
        self.passwords
            .iter()
            .cloned()
            .map(PasswordEntry::into_credential)
            .collect()
    }
}
