//! Redis connection and the [`KeyValueStore`] implementation.
//!
//! Tick records are stored as plain string values:
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `{sim_id}-{iteration}-state` | JSON | Full population after the tick |
//! | `{sim_id}-{iteration}-update` | JSON | Per-organism id and state |
//!
//! No expiry is set. Keys accumulate for the life of the Redis instance.
//!
//! A dropped connection is re-established in the background with
//! exponential backoff. Every command is bounded by a timeout, so a write
//! issued while Redis is unreachable fails instead of waiting forever.

use std::time::Duration;

use egol_core::{KeyValueStore, StoreError};
use fred::prelude::*;
use serde::de::DeserializeOwned;

use crate::error::DbError;

/// Upper bound on any single command, including time spent queued while
/// the client reconnects.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Reconnect backoff: retry forever, 100 ms doubling up to 5 s.
const RECONNECT_MIN_DELAY_MS: u32 = 100;
const RECONNECT_MAX_DELAY_MS: u32 = 5_000;
const RECONNECT_BASE: u32 = 2;

/// Connection handle to a Redis instance.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    /// Connect to Redis at the given URL (`redis://host:port`) with
    /// [`DEFAULT_COMMAND_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Redis`] if the first connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        Self::connect_with_timeout(url, DEFAULT_COMMAND_TIMEOUT).await
    }

    /// Connect with an explicit per-command timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed or the
    /// timeout is zero. Returns [`DbError::Redis`] if the first connection
    /// fails.
    pub async fn connect_with_timeout(
        url: &str,
        command_timeout: Duration,
    ) -> Result<Self, DbError> {
        if command_timeout.is_zero() {
            return Err(DbError::Config("command timeout must be non-zero".to_owned()));
        }
        let config =
            Config::from_url(url).map_err(|e| DbError::Config(format!("Invalid Redis URL: {e}")))?;

        let client = Builder::from_config(config)
            .set_policy(ReconnectPolicy::new_exponential(
                0,
                RECONNECT_MIN_DELAY_MS,
                RECONNECT_MAX_DELAY_MS,
                RECONNECT_BASE,
            ))
            .with_performance_config(|perf| {
                perf.default_command_timeout = command_timeout;
            })
            .build()?;
        client.init().await?;

        tracing::info!(url, ?command_timeout, "Connected to Redis");
        Ok(Self { client })
    }

    /// Store a UTF-8 string at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the write fails.
    pub async fn set_str(&self, key: &str, value: &str) -> Result<(), DbError> {
        let _: () = self.client.set(key, value, None, None, false).await?;
        Ok(())
    }

    /// Read the raw string at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the read fails.
    pub async fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        Ok(self.client.get(key).await?)
    }

    /// Read the value at `key` and deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::KeyNotFound`] if the key does not exist.
    /// Returns [`DbError::Serialization`] if deserialization fails.
    /// Returns [`DbError::Redis`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, DbError> {
        let value = self.get(key).await?;
        value.map_or_else(
            || Err(DbError::KeyNotFound(key.to_owned())),
            |s| Ok(serde_json::from_str(&s)?),
        )
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the quit command fails.
    pub async fn quit(&self) -> Result<(), DbError> {
        self.client.quit().await?;
        Ok(())
    }
}

impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let text = String::from_utf8(value).map_err(|e| StoreError::Write {
            key: key.to_owned(),
            reason: format!("value is not UTF-8: {e}"),
        })?;
        self.set_str(key, &text)
            .await
            .map_err(|e| e.into_store_error(key))
    }
}
