//! Storage module for devnet persistence

pub mod persistence;

pub use persistence::{Storage, StorageConfig, StorageError};
