//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the address manager requires from its host: a clock, a
//! randomness source, configuration and durable storage for the table.

use crate::domain::{AddressManagerConfig, Timestamp};
use crate::error::StoreError;

/// Abstract interface for time-related operations.
///
/// Enables deterministic testing by injecting controllable time sources.
/// Production implementations use system time; tests use fixed timestamps.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Abstract interface for randomness.
///
/// # Security
///
/// The table key is drawn from `fill_bytes`, so production implementations
/// must be cryptographically secure. Tests inject seeded or fixed sources to
/// make eviction and selection reproducible.
pub trait RandomSource: Send + Sync {
    /// Uniform integer in `0..max`. Returns 0 when `max` is 0.
    fn random_below(&self, max: u64) -> u64;

    /// Fill `dest` with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Abstract interface for configuration loading.
///
/// Allows different configuration sources (file, environment, etc.)
pub trait ConfigProvider: Send + Sync {
    /// Get address manager configuration parameters.
    fn address_manager_config(&self) -> AddressManagerConfig;
}

/// Durable storage for the serialized table.
///
/// The payload is opaque to the store; integrity framing (network magic,
/// checksum) is the store's responsibility.
pub trait PeersStore: Send + Sync {
    /// Read the last saved payload. `Ok(None)` if nothing was saved yet.
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the saved payload.
    fn write(&self, payload: &[u8]) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test-only TimeSource returning a fixed timestamp for deterministic assertions.
    struct FixedTimeSource(u64);

    impl TimeSource for FixedTimeSource {
        fn now(&self) -> Timestamp {
            Timestamp::new(self.0)
        }
    }

    /// Store that never holds anything.
    struct EmptyStore;

    impl PeersStore for EmptyStore {
        fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(None)
        }

        fn write(&self, _payload: &[u8]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn test_fixed_time_source_returns_configured_value() {
        let source = FixedTimeSource(1000);
        assert_eq!(source.now().as_secs(), 1000);
    }

    #[test]
    fn test_store_trait_object_is_usable() {
        let store: Box<dyn PeersStore> = Box::new(EmptyStore);
        assert!(store.read().unwrap().is_none());
        assert!(store.write(b"payload").is_ok());
    }
}
