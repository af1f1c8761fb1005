//! Command-line interface for a local devnet

pub mod commands;

pub use commands::*;
