pub mod store;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

pub use store::{FileStore, KeyValueStore, MemoryStore};

const USER_ID_PREFIX: &str = "user_";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Identity storage is corrupt: {0}")]
    Corrupt(String),
}

/// Anonymous per-installation correlation key sent with every request.
///
/// Not a credential: it is generated locally and never validated by the
/// backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    fn generate() -> Self {
        Self(format!("{}{}", USER_ID_PREFIX, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct IdentityManager<S: KeyValueStore> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> IdentityManager<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Returns the stored identity, creating and persisting one on first use.
    pub fn resolve(&mut self) -> Result<UserId, IdentityError> {
        if let Some(existing) = self.store.get(&self.key)? {
            if !existing.trim().is_empty() {
                debug!("Reusing anonymous identity under key {}", self.key);
                return Ok(UserId(existing));
            }
        }

        let id = UserId::generate();
        self.store.set(&self.key, id.as_str())?;
        info!("Created anonymous identity {}", id);
        Ok(id)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
