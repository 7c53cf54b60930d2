//! # Host Adapters
//!
//! - `SystemTimeSource` - Production time source using system clock
//! - `StaticConfigProvider` - In-code configuration
//! - `TomlConfigProvider` - Config file loading (requires "toml-config" feature)

/// Configuration providers
pub mod config;
/// Time source adapters
pub mod time;

pub use config::StaticConfigProvider;
pub use time::SystemTimeSource;

#[cfg(feature = "toml-config")]
pub use config::TomlConfigProvider;
