//! Shared-secret authentication: derives a login identifier from each configured
//! secret and resolves client-presented identifiers back to their secret.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("duplicate login identifier derived from two configured secrets (nickname {0:?})")]
    DuplicateIdentifier(Option<String>),
}

/// Derives the login-name identifier for a shared secret:
/// `"Player" ∥ lowerhex(SHA-256(secret))[0:8]`.
pub fn derive_identifier(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    format!("Player{}", hex::encode(&digest[..4]))
}

/// One configured credential: a shared secret, optionally labeled with a nickname
/// used for the `/subs/<nickname>` lookup endpoint.
#[derive(Debug, Clone)]
pub struct Credential {
    pub secret: String,
    pub nickname: Option<String>,
}

/// Resolves login identifiers and nicknames back to their shared secret.
///
/// Built once at startup; the maps are immutable for the process lifetime, so lookups
/// never need to be guarded against concurrent mutation.
#[derive(Debug)]
pub struct Authenticator {
    by_identifier: HashMap<String, Credential>,
    by_nickname: HashMap<String, String>,
}

impl Authenticator {
    /// Builds the lookup tables, rejecting the configuration if two secrets collide
    /// on the same derived identifier.
    pub fn new(credentials: Vec<Credential>) -> Result<Self, Error> {
        let mut by_identifier = HashMap::with_capacity(credentials.len());
        let mut by_nickname = HashMap::new();

        for credential in credentials {
            let identifier = derive_identifier(&credential.secret);
            if by_identifier.contains_key(&identifier) {
                return Err(Error::DuplicateIdentifier(credential.nickname));
            }
            if let Some(nickname) = &credential.nickname {
                by_nickname.insert(nickname.clone(), credential.secret.clone());
            }
            by_identifier.insert(identifier, credential);
        }

        Ok(Self {
            by_identifier,
            by_nickname,
        })
    }

    /// Looks up the shared secret for a login identifier presented as the player name.
    pub fn secret_for_identifier(&self, identifier: &str) -> Option<&str> {
        self.by_identifier.get(identifier).map(|c| c.secret.as_str())
    }

    /// Looks up the shared secret for a configured nickname.
    pub fn secret_for_nickname(&self, nickname: &str) -> Option<&str> {
        self.by_nickname.get(nickname).map(String::as_str)
    }
}
