// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Keyed JSON settings on top of a byte-blob storage port.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Byte-blob storage addressed by a flat key (`runner`, `accounts`, ...).
pub trait ConfigStore {
    /// Blob stored under `key`, or [`ConfigError::NotFound`].
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replace the blob stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Settings load/save failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("[FORMS_CONFIG_NOT_FOUND] no settings stored under this key")]
    NotFound,
    /// Backing storage failed.
    #[error("[FORMS_CONFIG_IO] {0}")]
    Io(#[from] std::io::Error),
    /// Stored blob is not valid JSON for the requested type.
    #[error("[FORMS_CONFIG_SERDE] {0}")]
    Serde(#[from] serde_json::Error),
    /// Rejected key or unavailable store.
    #[error("[FORMS_CONFIG_OTHER] {0}")]
    Other(String),
}

/// Typed JSON view over a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wrap `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unwrap the underlying store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Value stored under `key`; missing and empty blobs read as `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        let bytes = match self.store.load_raw(key) {
            Err(ConfigError::NotFound) => return Ok(None),
            other => other?,
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Value stored under `key`, or `T::default()`.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Store `value` under `key` as pretty JSON.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        self.store.save_raw(key, &serde_json::to_vec_pretty(value)?)
    }

    /// Load (or default) the value under `key`, let `edit` change it, and
    /// store it again when `edit` returns `true`. Returns the final value.
    pub fn update<T, F>(&self, key: &str, edit: F) -> Result<T, ConfigError>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> bool,
    {
        let mut value: T = self.load_or_default(key)?;
        if edit(&mut value) {
            self.save(key, &value)?;
        }
        Ok(value)
    }
}
