//! Address Manager configuration.
//!
//! Grid geometry is compiled in because the persisted layout is checked
//! against it. Scoring and sampling thresholds are tunable.

/// Number of buckets in the New table.
pub const NEW_BUCKET_COUNT: usize = 1024;
/// Number of buckets in the Tried table.
pub const TRIED_BUCKET_COUNT: usize = 256;
/// Slots per bucket in both tables.
pub const BUCKET_SIZE: usize = 64;
/// New buckets a single source group can spread its gossip over.
pub const SOURCE_GROUPS_PER_BUCKET: u64 = 64;
/// Tried buckets a single address group can land in.
pub const TRIED_GROUPS_PER_GROUP: u64 = 8;
/// Maximum number of New slots referencing one entry.
pub const MAX_REFS_PER_ADDRESS: u32 = 8;

/// Seconds in a day.
pub(crate) const DAY_SECS: u64 = 24 * 60 * 60;

/// Configuration for the address manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressManagerConfig {
    /// Entries not seen for this many days are terrible.
    pub horizon_days: u64,
    /// Attempts without a single success before an entry is terrible.
    pub retry_limit: u32,
    /// Failed attempts that make an entry terrible once its last success is old.
    pub max_failures: u32,
    /// Age in days a last success must exceed for `max_failures` to apply.
    pub min_fail_days: u64,
    /// Hard cap on the size of a `get_addr` answer.
    pub getaddr_max: usize,
    /// Share of the table (percent) returned by `get_addr`.
    pub getaddr_max_pct: usize,
    /// Run the full invariant checker after every mutating call.
    pub consistency_checks: bool,
}

impl Default for AddressManagerConfig {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            retry_limit: 3,
            max_failures: 10,
            min_fail_days: 7,
            getaddr_max: 2500,
            getaddr_max_pct: 23,
            consistency_checks: cfg!(debug_assertions),
        }
    }
}

impl AddressManagerConfig {
    /// Testing config: production thresholds with the checker always on.
    pub fn for_testing() -> Self {
        Self {
            consistency_checks: true,
            ..Self::default()
        }
    }

    pub(crate) fn horizon_secs(&self) -> u64 {
        self.horizon_days.saturating_mul(DAY_SECS)
    }

    pub(crate) fn min_fail_secs(&self) -> u64 {
        self.min_fail_days.saturating_mul(DAY_SECS)
    }
}
