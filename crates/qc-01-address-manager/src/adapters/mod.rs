//! # Adapters Layer
//!
//! Concrete implementations of the driven ports:
//!
//! - `network` - clock and configuration sources
//! - `security` - randomness
//! - `storage` - the peers file

pub mod network;
pub mod security;
pub mod storage;

pub use network::{StaticConfigProvider, SystemTimeSource};
pub use security::{FixedRandomSource, OsRandomSource, SeededRandomSource};
pub use storage::PeersFile;

#[cfg(feature = "toml-config")]
pub use network::TomlConfigProvider;
