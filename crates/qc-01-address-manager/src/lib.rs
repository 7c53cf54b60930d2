//! # Address Manager Subsystem
//!
//! **Subsystem ID:** 1
//!
//! This crate implements the peer-address table ("addrman") a node uses to
//! remember, score, persist and sample the endpoints it has heard about, so
//! it can bootstrap and keep its connectivity without a directory service.
//!
//! ## Anti-Eclipse Design
//!
//! - Addresses are split into a **New** table (heard of) and a **Tried**
//!   table (connected to at least once).
//! - Bucket placement is a keyed double-SHA256 over network groups, so an
//!   attacker cannot aim addresses at chosen buckets and one network can
//!   only reach a bounded number of them.
//! - Selection is weighted by a per-entry chance that decays with failures.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Pure table logic (placement, eviction, selection, checker)
//! - **Codec:** Versioned binary persistence of the table
//! - **Ports Layer:** Trait definitions for external dependencies
//! - **Service Layer:** Thread-safe wiring of domain, clock and storage
//! - **Adapters Layer:** Concrete clock, randomness, config and file store
//!
//! ## Example
//!
//! ```rust
//! use qc_01_address_manager::{
//!     AddressManager, AddressManagerConfig, FixedRandomSource, IpAddr, PeerAddress,
//!     ServiceFlags, SocketAddr, Timestamp,
//! };
//!
//! let mut manager = AddressManager::new(
//!     AddressManagerConfig::for_testing(),
//!     Box::new(FixedRandomSource::first()),
//! );
//! let now = Timestamp::new(1_700_000_000);
//!
//! let endpoint = SocketAddr::new(IpAddr::v4(8, 8, 8, 8), 8333);
//! let source = IpAddr::v4(9, 9, 9, 9);
//! let address = PeerAddress::new(endpoint, ServiceFlags::NETWORK, now);
//!
//! assert!(manager.add(address, &source, 0, now));
//! manager.good(&endpoint, now);
//! assert_eq!(manager.tried_count(), 1);
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod codec;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

/// Test utilities (FixedTimeSource, ManualTimeSource)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Domain entities
pub use domain::{
    AddressEntry, AddressManager, AddressManagerConfig, AddressManagerStats, AddressTable, EntryId,
    IpAddr, NetworkGroup, PeerAddress, ServiceFlags, SocketAddr, Timestamp,
};

// Errors
pub use error::{AddressManagerError, CodecError, ConfigError, ConsistencyViolation, StoreError};

// Port traits
pub use ports::{AddressManagerApi, ConfigProvider, PeersStore, RandomSource, TimeSource};

// Service
pub use service::AddressManagerService;

// Adapters
pub use adapters::{
    FixedRandomSource, OsRandomSource, PeersFile, SeededRandomSource, StaticConfigProvider,
    SystemTimeSource,
};

#[cfg(feature = "toml-config")]
pub use adapters::TomlConfigProvider;
