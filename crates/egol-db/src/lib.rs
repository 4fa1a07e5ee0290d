//! Redis persistence for the Egol simulation.
//!
//! [`RedisStore`] is the production [`egol_core::KeyValueStore`]. Each tick
//! writes two string keys and never reads them back; the getters exist for
//! inspection and tests.
//!
//! # Modules
//!
//! - [`redis`] -- Connection handle and key-value operations
//! - [`error`] -- Error types

pub mod error;
pub mod redis;

pub use error::DbError;
pub use redis::RedisStore;
